//! Payload sanitization
//!
//! Produces the size- and depth-bounded copy of an upstream payload stored
//! next to its call row for debugging. The verbatim payload stays in the
//! queue row; only the per-call copy is shrunk.
//!
//! Rules:
//! - recursion depth capped at 5; deeper containers collapse to a marker
//! - arrays keep their first 10 elements plus a marker object carrying the
//!   original length
//! - string values under keys containing `transcript` are capped at 500
//!   characters with an explicit suffix
//! - `binary_data` / `audio_data` / `file_data` values become placeholders
//! - a `metadata` object with more than 20 keys is replaced by a summary of
//!   five sample keys and the total count

use serde_json::{json, Map, Value};

const MAX_DEPTH: usize = 5;
const MAX_ARRAY_LEN: usize = 10;
const MAX_TRANSCRIPT_CHARS: usize = 500;
const MAX_METADATA_KEYS: usize = 20;
const METADATA_SAMPLE_KEYS: usize = 5;

const TRANSCRIPT_SUFFIX: &str = "...[truncated]";
const BINARY_PLACEHOLDER: &str = "[binary data omitted]";
const DEPTH_PLACEHOLDER: &str = "[truncated: max depth]";

/// Produce the bounded copy of a payload.
pub fn sanitize_payload(payload: &Value) -> Value {
    sanitize_value(payload, 0)
}

fn sanitize_value(value: &Value, depth: usize) -> Value {
    match value {
        Value::Object(map) => {
            if depth >= MAX_DEPTH {
                return Value::String(DEPTH_PLACEHOLDER.to_string());
            }
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                out.insert(key.clone(), sanitize_entry(key, val, depth));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            if depth >= MAX_DEPTH {
                return Value::String(DEPTH_PLACEHOLDER.to_string());
            }
            sanitize_array(items, depth)
        }
        other => other.clone(),
    }
}

fn sanitize_entry(key: &str, value: &Value, depth: usize) -> Value {
    if matches!(key, "binary_data" | "audio_data" | "file_data") {
        return Value::String(BINARY_PLACEHOLDER.to_string());
    }

    if key.contains("transcript") {
        if let Value::String(s) = value {
            if s.chars().count() > MAX_TRANSCRIPT_CHARS {
                let truncated: String = s.chars().take(MAX_TRANSCRIPT_CHARS).collect();
                return Value::String(format!("{truncated}{TRANSCRIPT_SUFFIX}"));
            }
        }
    }

    if key == "metadata" {
        if let Value::Object(map) = value {
            if map.len() > MAX_METADATA_KEYS {
                let sample_keys: Vec<&String> = map.keys().take(METADATA_SAMPLE_KEYS).collect();
                return json!({
                    "_truncated": true,
                    "sample_keys": sample_keys,
                    "total_keys": map.len(),
                });
            }
        }
    }

    sanitize_value(value, depth + 1)
}

fn sanitize_array(items: &[Value], depth: usize) -> Value {
    if items.len() > MAX_ARRAY_LEN {
        let mut out: Vec<Value> = items
            .iter()
            .take(MAX_ARRAY_LEN)
            .map(|v| sanitize_value(v, depth + 1))
            .collect();
        out.push(json!({
            "_truncated": true,
            "original_length": items.len(),
        }));
        Value::Array(out)
    } else {
        Value::Array(items.iter().map(|v| sanitize_value(v, depth + 1)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_of(value: &Value) -> usize {
        match value {
            Value::Object(map) => 1 + map.values().map(depth_of).max().unwrap_or(0),
            Value::Array(items) => 1 + items.iter().map(depth_of).max().unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn test_long_array_truncated_with_marker() {
        let payload = json!({ "items": (0..11).collect::<Vec<i64>>() });
        let sanitized = sanitize_payload(&payload);
        let items = sanitized["items"].as_array().unwrap();
        assert_eq!(items.len(), 11); // 10 kept + marker
        assert_eq!(items[9], json!(9));
        assert_eq!(items[10]["_truncated"], json!(true));
        assert_eq!(items[10]["original_length"], json!(11));
    }

    #[test]
    fn test_short_array_untouched() {
        let payload = json!({ "items": [1, 2, 3] });
        let sanitized = sanitize_payload(&payload);
        assert_eq!(sanitized["items"], json!([1, 2, 3]));
    }

    #[test]
    fn test_depth_capped_at_five() {
        // Seven nested objects.
        let mut payload = json!("leaf");
        for _ in 0..7 {
            let mut map = serde_json::Map::new();
            map.insert("nested".to_string(), payload);
            payload = Value::Object(map);
        }
        let sanitized = sanitize_payload(&payload);
        assert!(depth_of(&sanitized) <= MAX_DEPTH);
    }

    #[test]
    fn test_transcript_truncated_with_suffix() {
        let long = "x".repeat(1000);
        let payload = json!({ "voicemail_transcript": long });
        let sanitized = sanitize_payload(&payload);
        let text = sanitized["voicemail_transcript"].as_str().unwrap();
        assert!(text.ends_with(TRANSCRIPT_SUFFIX));
        assert_eq!(
            text.chars().count(),
            MAX_TRANSCRIPT_CHARS + TRANSCRIPT_SUFFIX.chars().count()
        );
    }

    #[test]
    fn test_short_transcript_untouched() {
        let payload = json!({ "transcript": "brief note" });
        let sanitized = sanitize_payload(&payload);
        assert_eq!(sanitized["transcript"], json!("brief note"));
    }

    #[test]
    fn test_binary_keys_replaced() {
        let payload = json!({
            "binary_data": "AAAA",
            "audio_data": [1, 2, 3],
            "file_data": { "inline": true },
            "other": "kept"
        });
        let sanitized = sanitize_payload(&payload);
        assert_eq!(sanitized["binary_data"], json!(BINARY_PLACEHOLDER));
        assert_eq!(sanitized["audio_data"], json!(BINARY_PLACEHOLDER));
        assert_eq!(sanitized["file_data"], json!(BINARY_PLACEHOLDER));
        assert_eq!(sanitized["other"], json!("kept"));
    }

    #[test]
    fn test_oversized_metadata_summarized() {
        let mut metadata = serde_json::Map::new();
        for i in 0..30 {
            metadata.insert(format!("key{i:02}"), json!(i));
        }
        let payload = json!({ "metadata": metadata });
        let sanitized = sanitize_payload(&payload);
        assert_eq!(sanitized["metadata"]["_truncated"], json!(true));
        assert_eq!(sanitized["metadata"]["total_keys"], json!(30));
        assert_eq!(
            sanitized["metadata"]["sample_keys"].as_array().unwrap().len(),
            METADATA_SAMPLE_KEYS
        );
    }

    #[test]
    fn test_small_metadata_untouched() {
        let payload = json!({ "metadata": { "a": 1, "b": 2 } });
        let sanitized = sanitize_payload(&payload);
        assert_eq!(sanitized["metadata"], json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn test_composite_payload() {
        // The worst case from every rule at once.
        let mut deep = json!("leaf");
        for _ in 0..7 {
            deep = json!({ "nested": deep });
        }
        let mut metadata = serde_json::Map::new();
        for i in 0..30 {
            metadata.insert(format!("key{i}"), json!(i));
        }
        let payload = json!({
            "items": (0..11).collect::<Vec<i64>>(),
            "deep": deep,
            "transcript": "y".repeat(1000),
            "metadata": metadata,
        });

        let sanitized = sanitize_payload(&payload);

        assert_eq!(sanitized["items"].as_array().unwrap().len(), 11);
        assert!(depth_of(&sanitized) <= MAX_DEPTH);
        assert!(sanitized["transcript"]
            .as_str()
            .unwrap()
            .ends_with(TRANSCRIPT_SUFFIX));
        assert_eq!(sanitized["metadata"]["total_keys"], json!(30));
        // The input is never mutated: the queue copy stays byte-equal.
        assert_eq!(payload["transcript"].as_str().unwrap().len(), 1000);
        assert_eq!(payload["items"].as_array().unwrap().len(), 11);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(sanitize_payload(&json!(42)), json!(42));
        assert_eq!(sanitize_payload(&json!("text")), json!("text"));
        assert_eq!(sanitize_payload(&json!(null)), json!(null));
    }
}
