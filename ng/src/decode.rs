//! Structured-response decoder
//!
//! Pulls a JSON payload out of free-text model output. The model is asked
//! to answer in a ```json fenced block but sometimes replies with bare JSON,
//! so several candidate slices are tried in order:
//!
//! 1. the first ```json block (shortest match)
//! 2. the whole text
//! 3. everything between the first ```json and the last ``` (for payloads
//!    whose string values contain fences of their own)

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("JSON_FENCE pattern is valid"));

static JSON_FENCE_GREEDY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*)\s*```").expect("JSON_FENCE_GREEDY pattern is valid"));

/// Decoder failures
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No candidate slice parsed as the expected JSON shape
    #[error("Invalid JSON response from completion service: {0}")]
    Malformed(String),

    /// JSON parsed but violates the response schema
    #[error("Response failed validation: {0}")]
    Invalid(String),
}

/// A decoded response that can check its own invariants
pub trait ResponseSchema: DeserializeOwned {
    /// Reject shapes serde accepts but the pipeline cannot use
    fn validate(&self) -> Result<(), String>;
}

/// Decode the JSON payload embedded in `text`
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    debug!(len = text.len(), "decode: called");
    let mut last_error = None;
    for (strategy, candidate) in candidates(text) {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => {
                debug!(strategy, "decode: parsed");
                return Ok(value);
            }
            Err(e) => {
                debug!(strategy, error = %e, "decode: candidate rejected");
                last_error = Some(e.to_string());
            }
        }
    }
    warn!(raw = %text, "decode: no parseable JSON in response");
    Err(DecodeError::Malformed(
        last_error.unwrap_or_else(|| "empty response".to_string()),
    ))
}

/// Decode and then validate against the response schema
pub fn decode_validated<T: ResponseSchema>(text: &str) -> Result<T, DecodeError> {
    let value: T = decode(text)?;
    value.validate().map_err(|reason| {
        warn!(%reason, raw = %text, "decode_validated: schema violation");
        DecodeError::Invalid(reason)
    })?;
    Ok(value)
}

fn candidates(text: &str) -> Vec<(&'static str, &str)> {
    let mut out = Vec::new();
    if let Some(m) = JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        out.push(("fenced", m.as_str()));
    }
    let whole = text.trim();
    if !whole.is_empty() {
        out.push(("whole", whole));
    }
    if let Some(m) = JSON_FENCE_GREEDY.captures(text).and_then(|c| c.get(1))
        && out.iter().all(|(_, c)| *c != m.as_str())
    {
        out.push(("fenced-greedy", m.as_str()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::{Value, json};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    impl ResponseSchema for Vec<Item> {
        fn validate(&self) -> Result<(), String> {
            if self.is_empty() {
                return Err("no items".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_decode_fenced() {
        let text = "Here you go:\n```json\n{\"name\": \"a\"}\n```\nThanks";
        let item: Item = decode(text).unwrap();
        assert_eq!(item.name, "a");
    }

    #[test]
    fn test_decode_unfenced() {
        let item: Item = decode("  {\"name\": \"b\"}\n").unwrap();
        assert_eq!(item.name, "b");
    }

    #[test]
    fn test_decode_nested_fence_in_string_value() {
        let text = "```json\n{\"name\": \"see ```json\\n{}\\n``` above\"}\n```";
        let item: Item = decode(text).unwrap();
        assert_eq!(item.name, "see ```json\n{}\n``` above");
    }

    #[test]
    fn test_decode_prefers_first_fenced_block() {
        let text = "```json\n{\"name\": \"first\"}\n```\n\n```json\n{\"name\": \"second\"}\n```";
        let item: Item = decode(text).unwrap();
        assert_eq!(item.name, "first");
    }

    #[test]
    fn test_decode_no_json_is_malformed() {
        let err = decode::<Value>("I could not come up with anything.").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let err = decode::<Value>("").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(ref m) if m == "empty response"));
    }

    #[test]
    fn test_decode_wrong_shape_is_malformed() {
        let err = decode::<Item>("```json\n{\"title\": \"x\"}\n```").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_validated_rejects_empty() {
        let err = decode_validated::<Vec<Item>>("```json\n[]\n```").unwrap_err();
        assert!(matches!(err, DecodeError::Invalid(ref r) if r == "no items"));

        let items = decode_validated::<Vec<Item>>("[{\"name\": \"x\"}]").unwrap();
        assert_eq!(items, vec![Item { name: "x".to_string() }]);
    }

    proptest! {
        #[test]
        fn prop_fenced_and_bare_decode_equal(
            key in "[a-z]{1,8}",
            text in "[a-zA-Z0-9 ]{0,24}",
            num in any::<i32>(),
        ) {
            let mut original = json!({ "n": num, "list": [num, key.clone()] });
            original[key.as_str()] = Value::String(text);
            let bare = serde_json::to_string_pretty(&original).unwrap();
            let fenced = format!("Sure.\n\n```json\n{}\n```\n", bare);

            prop_assert_eq!(decode::<Value>(&fenced).unwrap(), original.clone());
            prop_assert_eq!(decode::<Value>(&bare).unwrap(), original);
        }
    }
}
