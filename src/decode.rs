//! Message body decoding.
//!
//! Stored bodies are opaque until a topic-specific schema turns them into a
//! typed in-memory value. Decoding failures are ordinary `Err` values, never
//! panics: the engine treats them as per-message events and keeps going.

use std::collections::HashMap;

use crate::error::Error;

/// A decoded message body, handed to handlers as their sole argument.
pub type DecodedMessage = serde_json::Value;

/// Turns a raw stored payload plus a topic name into a typed message.
pub trait MessageDecoder: Send + Sync {
    fn decode(&self, topic: &str, body: &str) -> Result<DecodedMessage, Error>;
}

/// How a topic's payloads are encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSchema {
    /// Body is a JSON document.
    Json,
    /// Body is plain text, passed through as a JSON string value.
    Text,
}

/// Schema-registry decoder: topics are registered with their payload schema,
/// and an optional fallback covers everything else.
#[derive(Default)]
pub struct TopicDecoder {
    schemas: HashMap<String, PayloadSchema>,
    fallback: Option<PayloadSchema>,
}

impl TopicDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that treats any unregistered topic as JSON. The command
    /// surface uses this so arbitrary stored topics decode without prior
    /// registration.
    pub fn permissive() -> Self {
        Self {
            schemas: HashMap::new(),
            fallback: Some(PayloadSchema::Json),
        }
    }

    pub fn register(mut self, topic: impl Into<String>, schema: PayloadSchema) -> Self {
        self.schemas.insert(topic.into(), schema);
        self
    }

    pub fn with_fallback(mut self, schema: PayloadSchema) -> Self {
        self.fallback = Some(schema);
        self
    }

    fn schema_for(&self, topic: &str) -> Option<PayloadSchema> {
        self.schemas.get(topic).copied().or(self.fallback)
    }
}

impl MessageDecoder for TopicDecoder {
    fn decode(&self, topic: &str, body: &str) -> Result<DecodedMessage, Error> {
        let schema = self
            .schema_for(topic)
            .ok_or_else(|| Error::unknown_topic(topic))?;

        match schema {
            PayloadSchema::Json => {
                serde_json::from_str(body).map_err(|e| Error::decode(topic, e))
            }
            PayloadSchema::Text => Ok(DecodedMessage::String(body.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_registered_json_topic() {
        let decoder = TopicDecoder::new().register("order_created", PayloadSchema::Json);

        let decoded = decoder
            .decode("order_created", r#"{"order_id": 7}"#)
            .unwrap();
        assert_eq!(decoded["order_id"], 7);
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let decoder = TopicDecoder::new().register("order_created", PayloadSchema::Json);

        let err = decoder.decode("order_created", "{not json").unwrap_err();
        assert!(err.is_decode(), "expected decode-class error, got {err}");
    }

    #[test]
    fn test_unregistered_topic_without_fallback() {
        let decoder = TopicDecoder::new();

        let err = decoder.decode("mystery_topic", "{}").unwrap_err();
        assert!(matches!(err, Error::UnknownTopic { .. }));
    }

    #[test]
    fn test_text_schema_passes_body_through() {
        let decoder = TopicDecoder::new().register("audit_log", PayloadSchema::Text);

        let decoded = decoder.decode("audit_log", "plain old text").unwrap();
        assert_eq!(decoded, DecodedMessage::String("plain old text".into()));
    }

    #[test]
    fn test_permissive_decoder_covers_any_topic() {
        let decoder = TopicDecoder::permissive();

        assert!(decoder.decode("anything", r#"[1, 2, 3]"#).is_ok());
        assert!(decoder.decode("anything", "still not json").is_err());
    }
}
