use crate::{IntoResponse, Uri};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Field reported when a body error does not name one.
const BODY_FIELD: &str = "body";

lazy_static! {
    static ref MISSING_FIELD: Regex = Regex::new(r"missing field `([^`]+)`").unwrap();
}

/// Longest driver message echoed back to a client.
const MAX_DETAIL: usize = 50;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    InvalidPayload { message: String },
    ValidationError { field: String, message: String },
    NotFound { message: String },
    StoreUnavailable { message: String },
    PersistenceError { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn validation<S: Into<String>>(field: &str, msg: S) -> Error {
        Error::ValidationError {
            field: field.to_string(),
            message: msg.into(),
        }
    }

    pub fn store_unavailable() -> Error {
        Error::StoreUnavailable {
            message: "Database not available".to_string(),
        }
    }

    /// Wraps a driver failure, keeping only the head of its message.
    pub fn persistence<S: AsRef<str>>(msg: S) -> Error {
        Error::PersistenceError {
            message: truncate(msg.as_ref()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidPayload { .. } | Error::ValidationError { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::StoreUnavailable { .. }
            | Error::PersistenceError { .. }
            | Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn truncate(msg: &str) -> String {
    msg.chars().take(MAX_DETAIL).collect()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {:?}", self);
        } else {
            log::debug!("request rejected: {:?}", self);
        }
        (status, Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            kind: "SerializationError",
            message: truncate(&err.to_string()),
        }
    }
}

/// Innermost error of a source chain; for body rejections this is the
/// serde error naming the offending field.
fn root_cause(err: &dyn std::error::Error) -> String {
    let mut cause = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}

pub fn missing_field(detail: &str) -> Option<&str> {
    MISSING_FIELD
        .captures(detail)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match &rejection {
            JsonRejection::JsonDataError(_) => {
                let detail = root_cause(&rejection);
                let field = missing_field(&detail).unwrap_or(BODY_FIELD).to_string();
                Self::ValidationError {
                    field,
                    message: detail,
                }
            }
            _ => Self::InvalidPayload {
                message: rejection.to_string(),
            },
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidPayload {
            message: rejection.to_string(),
        }
    }
}
