//! Pulls a JSON object out of free-text model output.
//!
//! Accepts bare JSON, JSON wrapped in ```json / ``` fences, and as a last
//! resort the outermost `{ ... }` slice of surrounding prose. Anything else is
//! an `Unparseable` error, never a silent default.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("output was empty")]
    Empty,

    #[error("no JSON object found: {0}")]
    Unparseable(String),
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Extracts the single JSON object an agent was asked to return.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractError> {
    let body = strip_json_fences(text);
    if body.is_empty() {
        return Err(ExtractError::Empty);
    }

    let first_error = match serde_json::from_str::<Value>(body) {
        Ok(value) if value.is_object() => return Ok(value),
        Ok(_) => "top-level value is not an object".to_string(),
        Err(e) => e.to_string(),
    };

    // Prose around the object: take the outermost braces.
    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                if value.is_object() {
                    return Ok(value);
                }
            }
        }
    }

    Err(ExtractError::Unparseable(first_error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_unfenced_object() {
        let value = extract_json_object(r#"{"score": 71}"#).unwrap();
        assert_eq!(value["score"], 71);
    }

    #[test]
    fn test_extract_fenced_object() {
        let value = extract_json_object("```json\n{\"skills\": [\"Rust\"]}\n```").unwrap();
        assert_eq!(value["skills"][0], "Rust");
    }

    #[test]
    fn test_extract_object_surrounded_by_prose() {
        let value =
            extract_json_object("Here is the result:\n{\"verdict\": \"pass\"}\nHope this helps.")
                .unwrap();
        assert_eq!(value["verdict"], "pass");
    }

    #[test]
    fn test_extract_rejects_broken_json() {
        let err = extract_json_object("{\"score\": 71, \"explanation\": ").unwrap_err();
        assert!(matches!(err, ExtractError::Unparseable(_)));
    }

    #[test]
    fn test_extract_rejects_array_and_empty() {
        assert!(matches!(
            extract_json_object("[1, 2, 3]"),
            Err(ExtractError::Unparseable(_))
        ));
        assert_eq!(extract_json_object("```json\n```"), Err(ExtractError::Empty));
        assert_eq!(extract_json_object("   "), Err(ExtractError::Empty));
    }
}
