//! In-process document store.
//!
//! Nothing survives a restart. Used by the test suite and for local runs
//! with `DATABASE_URL=memory://`.
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::DocumentDriver;
use crate::document::{matches, Document, INTERNAL_ID};
use crate::models::Kind;

#[derive(Default)]
pub struct MemoryDriver {
    collections: RwLock<HashMap<Kind, Vec<(Uuid, Document)>>>,
}

fn with_id(id: Uuid, doc: &Document) -> Document {
    let mut raw = doc.clone();
    raw.insert(INTERNAL_ID.to_string(), Value::String(id.to_string()));
    raw
}

#[async_trait]
impl DocumentDriver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, kind: Kind, doc: Document) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.collections
            .write()
            .await
            .entry(kind)
            .or_default()
            .push((id, doc));
        Ok(id)
    }

    async fn find(
        &self,
        kind: Kind,
        filter: &Document,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let docs = match collections.get(&kind) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };
        Ok(docs
            .iter()
            .filter(|(_, doc)| matches(doc, filter))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, doc)| with_id(*id, doc))
            .collect())
    }

    async fn update_one(&self, kind: Kind, id: Uuid, set: Document) -> anyhow::Result<bool> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(&kind)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id));
        match doc {
            Some((_, doc)) => {
                doc.extend(set);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn collection_names(&self) -> anyhow::Result<Vec<String>> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(kind, _)| kind.collection().to_string())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[tokio::test]
    async fn find_keeps_insertion_order() {
        let driver = MemoryDriver::default();
        for topic in ["Limits", "Derivatives", "Integrals"] {
            driver
                .insert(Kind::Lecture, doc(json!({"topic": topic})))
                .await
                .unwrap();
        }
        let topics: Vec<_> = driver
            .find(Kind::Lecture, &Document::new(), None)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["topic"].clone())
            .collect();
        assert_eq!(topics, [json!("Limits"), json!("Derivatives"), json!("Integrals")]);
    }

    #[tokio::test]
    async fn find_respects_filter_and_limit() {
        let driver = MemoryDriver::default();
        for (roll, code) in [("R-1", "MATH101"), ("R-2", "MATH101"), ("R-1", "PHY200")] {
            driver
                .insert(
                    Kind::Grade,
                    doc(json!({"roll_number": roll, "subject_code": code})),
                )
                .await
                .unwrap();
        }
        let maths = driver
            .find(Kind::Grade, &doc(json!({"subject_code": "MATH101"})), None)
            .await
            .unwrap();
        assert_eq!(maths.len(), 2);

        let both = driver
            .find(
                Kind::Grade,
                &doc(json!({"subject_code": "MATH101", "roll_number": "R-1"})),
                None,
            )
            .await
            .unwrap();
        assert_eq!(both.len(), 1);

        let first = driver
            .find(Kind::Grade, &Document::new(), Some(1))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["roll_number"], "R-1");
        assert!(first[0].contains_key(INTERNAL_ID));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let driver = MemoryDriver::default();
        let id = driver
            .insert(
                Kind::NewsletterSubscriber,
                doc(json!({"email": "a@b.com", "status": "pending"})),
            )
            .await
            .unwrap();
        assert!(driver
            .update_one(Kind::NewsletterSubscriber, id, doc(json!({"status": "confirmed"})))
            .await
            .unwrap());
        let found = driver
            .find(Kind::NewsletterSubscriber, &Document::new(), None)
            .await
            .unwrap();
        assert_eq!(found[0]["status"], "confirmed");
        assert_eq!(found[0]["email"], "a@b.com");

        assert!(!driver
            .update_one(Kind::NewsletterSubscriber, Uuid::new_v4(), Document::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn lists_only_populated_collections() {
        let driver = MemoryDriver::default();
        driver.insert(Kind::Teacher, Document::new()).await.unwrap();
        driver.insert(Kind::Exam, Document::new()).await.unwrap();
        assert_eq!(driver.collection_names().await.unwrap(), ["exam", "teacher"]);
    }
}
