//! Tolerant extraction of JSON arrays from model output.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::LlmError;

/// Parse the first `[` .. last `]` span of `raw` as an array of `T`.
///
/// Code fences and prose around the array are ignored. Elements that do not
/// match `T` are dropped; a missing or malformed array is an error.
pub fn parse_json_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, LlmError> {
    let (start, end) = match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(LlmError::Parse("no JSON array in response".into())),
    };

    let values: Vec<Value> = serde_json::from_str(&raw[start..=end])
        .map_err(|e| LlmError::Parse(format!("malformed JSON array: {}", e)))?;

    let total = values.len();
    let items: Vec<T> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if items.len() < total {
        debug!("Dropped {} malformed entries", total - items.len());
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Entry {
        index: usize,
        comment: String,
    }

    #[test]
    fn test_plain_array() {
        let items: Vec<Entry> = parse_json_array(r#"[{"index": 0, "comment": "ok"}]"#).unwrap();
        assert_eq!(
            items,
            vec![Entry {
                index: 0,
                comment: "ok".into()
            }]
        );
    }

    #[test]
    fn test_fenced_array_with_prose() {
        let raw = "Here you go:\n```json\n[{\"index\": 1, \"comment\": \"gap\"}]\n```\nDone.";
        let items: Vec<Entry> = parse_json_array(raw).unwrap();
        assert_eq!(items[0].index, 1);
    }

    #[test]
    fn test_malformed_entries_dropped() {
        let raw = r#"[{"index": 0, "comment": "ok"}, {"comment": "no index"}, 3]"#;
        let items: Vec<Entry> = parse_json_array(raw).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_no_array_is_error() {
        assert!(matches!(
            parse_json_array::<Entry>("I cannot help with that."),
            Err(LlmError::Parse(_))
        ));
        assert!(parse_json_array::<Entry>("[{\"index\": 0,").is_err());
    }
}
