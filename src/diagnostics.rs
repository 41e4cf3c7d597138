use std::sync::Arc;

use axum::{Extension, Json};
use serde::Serialize;

use crate::config::Config;
use crate::err::truncate;
use crate::store::Store;

/// How many collection names the report lists.
const MAX_COLLECTIONS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub message: &'static str,
}

pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "TeachEase Backend is running",
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub backend: &'static str,
    pub database: String,
    pub database_url: Option<&'static str>,
    pub database_name: Option<String>,
    pub connection_status: &'static str,
    pub collections: Vec<String>,
}

/// Reports store connectivity. Store errors end up in `database` instead
/// of failing the request.
pub async fn report(store: &Store, config: &Config) -> Diagnostics {
    let mut diagnostics = Diagnostics {
        backend: "Running",
        database: "Not Available".to_string(),
        database_url: None,
        database_name: None,
        connection_status: "Not Connected",
        collections: Vec::new(),
    };

    if !store.is_connected() {
        return diagnostics;
    }

    diagnostics.database = "Connected & Working".to_string();
    diagnostics.database_url = Some(if config.database_url.is_some() {
        "Set"
    } else {
        "Not Set"
    });
    diagnostics.database_name = store.name().map(str::to_string);
    diagnostics.connection_status = "Connected";

    match store.collection_names().await {
        Ok(mut names) => {
            names.truncate(MAX_COLLECTIONS);
            diagnostics.collections = names;
        }
        Err(err) => {
            log::warn!("listing collections failed: {:?}", err);
            let detail = match err {
                crate::Error::PersistenceError { message } => message,
                other => format!("{:?}", other),
            };
            diagnostics.database = format!("Connected but Error: {}", truncate(&detail));
        }
    }
    diagnostics
}

pub async fn test_database(
    Extension(store): Extension<Store>,
    Extension(config): Extension<Arc<Config>>,
) -> Json<Diagnostics> {
    Json(report(&store, &config).await)
}
