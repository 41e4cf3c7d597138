use serde_json::{Map, Value};

/// Key under which drivers hand back the store-assigned identifier.
pub const INTERNAL_ID: &str = "_id";
pub const PUBLIC_ID: &str = "id";

/// A raw stored record, or a filter of exact-match field values.
pub type Document = Map<String, Value>;

/// Converts a raw stored record into its public form: `_id` is removed
/// and re-added as a string `id`.
pub fn serialize(mut raw: Document) -> Document {
    if let Some(id) = raw.remove(INTERNAL_ID) {
        let id = match id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        raw.insert(PUBLIC_ID.to_string(), Value::String(id));
    }
    raw
}

pub fn serialize_docs(docs: Vec<Document>) -> Vec<Document> {
    docs.into_iter().map(serialize).collect()
}

/// Builds an exact-match filter from optional query parameters, skipping
/// absent and empty values.
pub fn filter<'a, I>(params: I) -> Document
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    params
        .into_iter()
        .filter_map(|(field, value)| match value {
            Some(value) if !value.is_empty() => {
                Some((field.to_string(), Value::String(value.to_string())))
            }
            _ => None,
        })
        .collect()
}

/// True when every pair of `filter` is present and equal in `doc`.
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
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

    #[test]
    fn internal_id_becomes_public_id() {
        let raw = doc(json!({"_id": "abc", "name": "Ada", "is_active": true}));
        let public = serialize(raw);
        assert!(!public.contains_key(INTERNAL_ID));
        assert_eq!(public["id"], "abc");
        assert_eq!(public["name"], "Ada");
        assert_eq!(public.len(), 3);
    }

    #[test]
    fn non_string_ids_are_stringified() {
        let public = serialize(doc(json!({"_id": 42})));
        assert_eq!(public["id"], "42");
    }

    #[test]
    fn stored_id_field_is_replaced_by_internal_one() {
        let public = serialize(doc(json!({"_id": "real", "id": "spoofed"})));
        assert_eq!(public["id"], "real");
        assert_eq!(public.keys().filter(|k| *k == PUBLIC_ID).count(), 1);
    }

    #[test]
    fn filter_skips_missing_and_empty_params() {
        let built = filter([
            ("roll_number", Some("R-7")),
            ("subject_code", Some("")),
            ("class_name", None),
        ]);
        assert_eq!(Value::Object(built), json!({"roll_number": "R-7"}));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let record = doc(json!({"subject_code": "MATH101"}));
        assert!(matches(&record, &Document::new()));
        assert!(matches(&record, &doc(json!({"subject_code": "MATH101"}))));
        assert!(!matches(&record, &doc(json!({"subject_code": "PHY200"}))));
        assert!(!matches(&record, &doc(json!({"topic": "Limits"}))));
    }
}
