//! JSON extraction from model text
//!
//! Models are asked for bare JSON but often wrap it in Markdown code fences.
//! This is the one place that turns model text into structured data.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```json\n?|```\n?").expect("valid fence regex"));

/// Remove Markdown code fences anywhere in the trimmed text
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text.trim(), "").into_owned()
}

/// Strip fences and parse; `Err` carries the original text unchanged
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    debug!(text_len = text.len(), "extract_json: called");
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        debug!(error = %e, "extract_json: parse failed");
        text.to_string()
    })
}

/// Model text that could not be parsed, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RawOutput {
    pub raw: String,
    pub parse_error: bool,
}

impl RawOutput {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            parse_error: true,
        }
    }
}

/// Structured model output, or the opaque `{ raw, parseError: true }` leaf
///
/// Serializes untagged, so JSON consumers see either the parsed value or the
/// fallback object. `Unparsed` is listed first so that deserialization only
/// picks it for the exact fallback shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelJson<T> {
    Unparsed(RawOutput),
    Parsed(T),
}

impl<T: DeserializeOwned> ModelJson<T> {
    /// Parse model text, degrading to [`RawOutput`] instead of failing
    pub fn from_text(text: &str) -> Self {
        match extract_json(text) {
            Ok(value) => ModelJson::Parsed(value),
            Err(raw) => ModelJson::Unparsed(RawOutput::new(raw)),
        }
    }
}

impl<T> ModelJson<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            ModelJson::Parsed(value) => Some(value),
            ModelJson::Unparsed(_) => None,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, ModelJson::Unparsed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}\n");
        assert_eq!(strip_code_fences("  ```\n[1]```  "), "[1]");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_fenced_json() {
        let value: Value = extract_json("Here:\n```json\n{\"x\": [1, 2]}\n```").unwrap_or(Value::Null);
        // Leading prose is not stripped, so this one fails to parse
        assert_eq!(value, Value::Null);

        let value: Value = extract_json("```json\n{\"x\": [1, 2]}\n```").unwrap();
        assert_eq!(value, json!({ "x": [1, 2] }));
    }

    #[test]
    fn test_extract_error_returns_raw_text() {
        let err = extract_json::<Value>("not json at all").unwrap_err();
        assert_eq!(err, "not json at all");
    }

    #[test]
    fn test_model_json_fallback_shape() {
        let out: ModelJson<Value> = ModelJson::from_text("oops");
        assert!(out.is_parse_error());
        assert_eq!(serde_json::to_value(&out).unwrap(), json!({ "raw": "oops", "parseError": true }));
    }

    #[test]
    fn test_model_json_deserializes_fallback_first() {
        let fallback: ModelJson<Value> = serde_json::from_value(json!({ "raw": "x", "parseError": true })).unwrap();
        assert!(fallback.is_parse_error());

        let parsed: ModelJson<Value> = serde_json::from_value(json!({ "raw": "x", "other": 1 })).unwrap();
        assert!(parsed.parsed().is_some());
    }
}
