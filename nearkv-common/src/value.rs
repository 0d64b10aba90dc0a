//! # Value Codec
//!
//! Purpose: Implement the value-preserving encoding rule shared by client
//! and server: text and bytes travel verbatim, anything structured is
//! JSON-serialized before transmission.
//!
//! ## Design Principles
//! 1. **Explicit Tagging**: A tagged enum replaces runtime type inspection.
//! 2. **Pass-Through First**: Plain text and bytes never pay for serialization.
//! 3. **Best-Effort Decode**: Reads try JSON, then UTF-8, then raw bytes.
//!
//! The scheme cannot distinguish an intentionally stored JSON-looking string
//! from a structured value encoded as JSON; the text `1` decodes as the JSON
//! number 1. That ambiguity is part of the wire contract.

use serde::{Deserialize, Serialize};

/// A value stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    /// Plain text, transmitted verbatim.
    Text(String),
    /// Raw bytes, transmitted verbatim.
    Bytes(Vec<u8>),
    /// Structured data, JSON-serialized for transmission.
    Structured(serde_json::Value),
}

impl IndexValue {
    /// Encodes the value into its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            IndexValue::Text(text) => text.clone().into_bytes(),
            IndexValue::Bytes(data) => data.clone(),
            IndexValue::Structured(value) => {
                serde_json::to_vec(value).expect("json value serializes")
            }
        }
    }

    /// Decodes a wire value.
    ///
    /// A successful JSON parse takes priority, non-JSON UTF-8 becomes text,
    /// anything else stays raw bytes.
    pub fn decode(raw: &[u8]) -> IndexValue {
        if let Ok(value) = serde_json::from_slice(raw) {
            return IndexValue::Structured(value);
        }
        match std::str::from_utf8(raw) {
            Ok(text) => IndexValue::Text(text.to_string()),
            Err(_) => IndexValue::Bytes(raw.to_vec()),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(text: &str) -> Self {
        IndexValue::Text(text.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(text: String) -> Self {
        IndexValue::Text(text)
    }
}

impl From<Vec<u8>> for IndexValue {
    fn from(data: Vec<u8>) -> Self {
        IndexValue::Bytes(data)
    }
}

impl From<serde_json::Value> for IndexValue {
    fn from(value: serde_json::Value) -> Self {
        IndexValue::Structured(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_passes_through_verbatim() {
        let value = IndexValue::from("hello world");
        assert_eq!(value.encode(), b"hello world");
    }

    #[test]
    fn bytes_pass_through_verbatim() {
        let raw = vec![0x00, 0xFF, 0x7F];
        let value = IndexValue::from(raw.clone());
        assert_eq!(value.encode(), raw);
    }

    #[test]
    fn structured_round_trips_through_json() {
        let value = IndexValue::from(json!({"retries": 2, "hosts": ["a", "b"]}));
        let decoded = IndexValue::decode(&value.encode());
        assert_eq!(decoded, value);
    }

    #[test]
    fn numeric_text_decodes_as_json_number() {
        // Matches the wire contract: the stored text "1" reads back as 1.
        let encoded = IndexValue::from("1").encode();
        assert_eq!(IndexValue::decode(&encoded), IndexValue::Structured(json!(1)));
    }

    #[test]
    fn non_json_text_decodes_as_text() {
        let decoded = IndexValue::decode(b"plain words");
        assert_eq!(decoded, IndexValue::Text("plain words".to_string()));
    }

    #[test]
    fn invalid_utf8_decodes_as_bytes() {
        let raw = vec![0xC3, 0x28];
        assert_eq!(IndexValue::decode(&raw), IndexValue::Bytes(raw.clone()));
    }

    #[test]
    fn json_string_ambiguity_is_preserved() {
        // A stored JSON string and a text value holding the same quoted
        // characters are indistinguishable after one round trip.
        let structured = IndexValue::from(json!("hi"));
        let text = IndexValue::Text("\"hi\"".to_string());
        assert_eq!(structured.encode(), text.encode());
        assert_eq!(IndexValue::decode(&text.encode()), structured);
    }
}
