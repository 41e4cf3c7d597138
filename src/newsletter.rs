use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::document::{Document, INTERNAL_ID};
use crate::models::{
    CreateNewsletterSubscribe, Kind, NewsletterSubscriber, SubscriptionStatus, Validate,
};
use crate::store::Store;
use crate::{proceeds, Error, Payload};

/// 32 random bytes run through SHA-256, hex encoded: URL safe, 256 bits.
pub fn generate_token() -> String {
    let token_bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(&token_bytes);
    hex::encode(hasher.finalize())
}

pub fn confirm_url(backend_url: &str, token: &str) -> String {
    format!(
        "{}/newsletter/confirm?token={}",
        backend_url.trim_end_matches('/'),
        token
    )
}

/// Stores a new `pending` subscriber and hands back the link that
/// confirms it.
pub async fn subscribe(
    store: &Store,
    backend_url: &str,
    request: CreateNewsletterSubscribe,
) -> Result<Subscribed, Error> {
    request.validate()?;

    let token = generate_token();
    let subscriber = NewsletterSubscriber {
        email: request.email,
        status: SubscriptionStatus::Pending,
        token: Some(token.clone()),
        confirmed_at: None,
    };
    let id = store.create(&subscriber).await?;
    log::info!("newsletter subscriber {} pending confirmation", id);

    Ok(Subscribed {
        id,
        status: SubscriptionStatus::Pending,
        confirm_url: confirm_url(backend_url, &token),
    })
}

/// Moves the subscriber holding `token` to `confirmed`.
///
/// Prior status is not checked: confirming twice succeeds and only
/// refreshes `confirmed_at`.
pub async fn confirm(store: &Store, token: &str) -> Result<Confirmed, Error> {
    if !store.is_connected() {
        return Err(Error::store_unavailable());
    }

    let mut filter = Document::new();
    filter.insert("token".to_string(), Value::String(token.to_string()));
    let doc = match store.find_one(Kind::NewsletterSubscriber, &filter).await? {
        Some(doc) => doc,
        None => {
            return Err(Error::NotFound {
                message: "Invalid token".to_string(),
            })
        }
    };

    let id = doc
        .get(INTERNAL_ID)
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| Error::InternalError {
            kind: "DatabaseError",
            message: "Stored subscriber has no usable id".to_string(),
        })?;

    let confirmed_at = Utc::now();
    let mut set = Document::new();
    set.insert(
        "status".to_string(),
        serde_json::to_value(SubscriptionStatus::Confirmed)?,
    );
    set.insert("confirmed_at".to_string(), serde_json::to_value(confirmed_at)?);
    store
        .update_one(Kind::NewsletterSubscriber, id, set)
        .await?;
    log::info!("newsletter subscriber {} confirmed", id);

    Ok(Confirmed {
        status: SubscriptionStatus::Confirmed,
        confirmed_at,
    })
}

pub async fn subscribe_handler(
    Extension(store): Extension<Store>,
    Extension(config): Extension<Arc<Config>>,
    payload: Result<Json<CreateNewsletterSubscribe>, JsonRejection>,
) -> Payload<Subscribed> {
    let Json(request) = payload?;
    proceeds(subscribe(&store, &config.backend_url, request).await?)
}

pub async fn confirm_handler(
    Extension(store): Extension<Store>,
    query: Result<Query<ConfirmQuery>, QueryRejection>,
) -> Payload<Confirmed> {
    let Query(ConfirmQuery { token }) = query?;
    proceeds(confirm(&store, &token).await?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscribed {
    pub id: String,
    pub status: SubscriptionStatus,
    pub confirm_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Confirmed {
    pub status: SubscriptionStatus,
    #[serde(skip)]
    pub confirmed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::serialize_docs;

    fn request(email: &str) -> CreateNewsletterSubscribe {
        CreateNewsletterSubscribe {
            email: email.to_string(),
        }
    }

    async fn stored(store: &Store) -> Vec<Document> {
        serialize_docs(
            store
                .list::<NewsletterSubscriber>(&Document::new())
                .await
                .unwrap(),
        )
    }

    #[test]
    fn tokens_are_long_url_safe_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn confirm_url_joins_base_and_token() {
        assert_eq!(
            confirm_url("https://api.teachease.app/", "abc"),
            "https://api.teachease.app/newsletter/confirm?token=abc"
        );
        assert_eq!(confirm_url("", "abc"), "/newsletter/confirm?token=abc");
    }

    #[tokio::test]
    async fn subscribe_stores_pending_subscriber_with_token() {
        let store = Store::memory();
        let subscribed = subscribe(&store, "http://localhost:8000", request("a@b.com"))
            .await
            .unwrap();
        assert_eq!(subscribed.status, SubscriptionStatus::Pending);

        let docs = stored(&store).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["id"], subscribed.id.as_str());
        assert_eq!(docs[0]["status"], "pending");
        assert_eq!(docs[0]["email"], "a@b.com");
        assert!(docs[0]["confirmed_at"].is_null());

        let token = docs[0]["token"].as_str().unwrap();
        assert!(subscribed.confirm_url.ends_with(&format!("?token={}", token)));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected_before_storing() {
        let store = Store::memory();
        let err = subscribe(&store, "", request("not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError { ref field, .. } if field == "email"));
        assert!(stored(&store).await.is_empty());
    }

    #[tokio::test]
    async fn confirm_moves_subscriber_to_confirmed() {
        let store = Store::memory();
        subscribe(&store, "", request("a@b.com")).await.unwrap();
        let token = stored(&store).await[0]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let confirmed = confirm(&store, &token).await.unwrap();
        assert_eq!(confirmed.status, SubscriptionStatus::Confirmed);

        let docs = stored(&store).await;
        assert_eq!(docs[0]["status"], "confirmed");
        let at: DateTime<Utc> = serde_json::from_value(docs[0]["confirmed_at"].clone()).unwrap();
        assert_eq!(at, confirmed.confirmed_at);
    }

    #[tokio::test]
    async fn confirming_twice_succeeds_and_refreshes_timestamp() {
        let store = Store::memory();
        subscribe(&store, "", request("a@b.com")).await.unwrap();
        let token = stored(&store).await[0]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let first = confirm(&store, &token).await.unwrap();
        let second = confirm(&store, &token).await.unwrap();
        assert_eq!(second.status, SubscriptionStatus::Confirmed);
        assert!(second.confirmed_at >= first.confirmed_at);

        let docs = stored(&store).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["status"], "confirmed");
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let store = Store::memory();
        subscribe(&store, "", request("a@b.com")).await.unwrap();
        let err = confirm(&store, "nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn confirm_without_store_fails_first() {
        let err = confirm(&Store::unavailable(), "anything").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }
}
