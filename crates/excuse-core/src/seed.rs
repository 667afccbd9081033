//! Seed file parsing
//!
//! Seed files are JSON and come in two shapes: a bare array of excuses, or an
//! object wrapping the array in an `excuses` field.

use crate::{Excuse, ExcuseError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct Wrapped {
    excuses: Vec<Excuse>,
}

/// The leading character picks the shape, so a bad record is reported with
/// its own error and position.
pub fn parse_seed(content: &str) -> Result<Vec<Excuse>> {
    match content.trim_start().chars().next() {
        Some('[') => Ok(serde_json::from_str(content)?),
        Some('{') => {
            let wrapped: Wrapped = serde_json::from_str(content)?;
            Ok(wrapped.excuses)
        }
        _ => Err(ExcuseError::Serialization(
            "seed must be a JSON array or an object with an \"excuses\" field".to_string(),
        )),
    }
}

pub async fn read_seed_file(path: &Path) -> Result<Vec<Excuse>> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_seed(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "id": "a",
        "text": "Internet is down",
        "category": "tech",
        "language": "en",
        "severity": "high",
        "created_at": "2024-01-01T09:00:00Z"
    }"#;

    #[test]
    fn test_bare_array() {
        let excuses = parse_seed(&format!("[{}]", RECORD)).unwrap();
        assert_eq!(excuses.len(), 1);
        assert_eq!(excuses[0].id, "a");
        assert_eq!(excuses[0].rating, 0);
    }

    #[test]
    fn test_wrapped_object() {
        let excuses = parse_seed(&format!(r#"{{"excuses": [{}]}}"#, RECORD)).unwrap();
        assert_eq!(excuses.len(), 1);
        assert_eq!(excuses[0].category, "tech");
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            parse_seed(r#"{"items": []}"#),
            Err(ExcuseError::Serialization(_))
        ));
    }

    #[test]
    fn test_record_without_timestamp_loads() {
        let undated = r#"{
            "id": "b",
            "text": "Printer on fire",
            "category": "work",
            "language": "en",
            "severity": "urgent"
        }"#;
        let excuses = parse_seed(&format!("[{}, {}]", RECORD, undated)).unwrap();
        assert_eq!(excuses.len(), 2);
        assert_eq!(excuses[1].created_at.timestamp(), 0);
    }

    #[test]
    fn test_bad_record_reports_field() {
        let broken = r#"{"excuses": [{"id": "c", "category": "work"}]}"#;
        match parse_seed(broken) {
            Err(ExcuseError::Serialization(msg)) => {
                assert!(msg.contains("missing field `text`"), "{}", msg);
                assert!(!msg.contains("untagged"), "{}", msg);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_not_a_document() {
        assert!(matches!(
            parse_seed("  \"excuses\""),
            Err(ExcuseError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = read_seed_file(Path::new("/nonexistent/excuses.json")).await;
        assert!(matches!(result, Err(ExcuseError::Io(_))));
    }
}
