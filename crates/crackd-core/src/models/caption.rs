//! Caption records produced by the generation step.
//!
//! The caption service is loose about the name of the display-text field. Responses are
//! normalized here, once, into a [`Caption`] with a single canonical `text`.

use serde::Serialize;
use serde_json::Value;

/// Field names that may carry the display text, in order of preference.
const TEXT_FIELDS: [&str; 3] = ["content", "caption", "text"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Caption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    /// The object exactly as the service returned it
    pub raw: Value,
}

impl Caption {
    /// Normalize one caption object. When no text field is usable the compact JSON of
    /// the object becomes the text.
    pub fn from_value(raw: Value) -> Self {
        let id = match raw.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let text = TEXT_FIELDS
            .iter()
            .find_map(|field| match raw.get(*field) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .or_else(|| match &raw {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| raw.to_string());

        Self { id, text, raw }
    }
}

/// A single caption object is treated as a one-element sequence.
pub fn normalize_captions(value: Value) -> Vec<Caption> {
    match value {
        Value::Array(items) => items.into_iter().map(Caption::from_value).collect(),
        other => vec![Caption::from_value(other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_object_becomes_one_element_sequence() {
        let captions = normalize_captions(json!({"content": "hello"}));
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "hello");
        assert_eq!(captions[0].raw, json!({"content": "hello"}));
    }

    #[test]
    fn array_order_is_preserved() {
        let captions = normalize_captions(json!([
            {"id": "a", "content": "first"},
            {"id": 7, "caption": "second"},
            {"text": "third"}
        ]));
        let texts: Vec<&str> = captions.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(captions[0].id.as_deref(), Some("a"));
        assert_eq!(captions[1].id.as_deref(), Some("7"));
        assert_eq!(captions[2].id, None);
    }

    #[test]
    fn empty_preferred_field_falls_through() {
        let caption = Caption::from_value(json!({"content": "", "caption": "backup"}));
        assert_eq!(caption.text, "backup");
    }

    #[test]
    fn unknown_shape_falls_back_to_json_dump() {
        let caption = Caption::from_value(json!({"humor": 3}));
        assert_eq!(caption.text, r#"{"humor":3}"#);
    }

    #[test]
    fn empty_array_yields_no_captions() {
        assert!(normalize_captions(json!([])).is_empty());
    }
}
