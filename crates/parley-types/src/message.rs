//! Data channel envelopes.
//!
//! Outbound envelopes are UTF-8 JSON objects tagged by a `type` field:
//!
//! ```json
//! {"type": "user_text_message", "text": "hello", "timestamp": 1700000000000}
//! {"type": "context_update", "context": "user opened settings", "timestamp": 1700000000000}
//! ```
//!
//! Inbound payloads come from the assistant agent and have no fixed schema;
//! they are kept as raw JSON values.

use serde::{Deserialize, Serialize};

/// A control message sent from the local participant to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Text typed by the user, handled like a spoken utterance.
    UserTextMessage {
        text: String,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
    },
    /// Background context that should inform, but not trigger, a reply.
    ContextUpdate {
        context: String,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
    },
}

impl OutboundMessage {
    pub fn user_text(text: impl Into<String>, timestamp: i64) -> Self {
        Self::UserTextMessage {
            text: text.into(),
            timestamp,
        }
    }

    pub fn context_update(context: impl Into<String>, timestamp: i64) -> Self {
        Self::ContextUpdate {
            context: context.into(),
            timestamp,
        }
    }

    /// Returns the wire tag of this envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserTextMessage { .. } => "user_text_message",
            Self::ContextUpdate { .. } => "context_update",
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::UserTextMessage { timestamp, .. } | Self::ContextUpdate { timestamp, .. } => {
                *timestamp
            }
        }
    }

    /// Serializes the envelope into the bytes published on the data channel.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A data packet received from another room participant.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Identity of the sender, if the SDK reported one.
    pub participant: Option<String>,
    /// Parsed JSON payload.
    pub payload: serde_json::Value,
}

impl InboundMessage {
    /// Parses a raw data channel payload.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the payload is not valid UTF-8 JSON.
    pub fn parse(payload: &[u8], participant: Option<String>) -> Result<Self, serde_json::Error> {
        let payload = serde_json::from_slice(payload)?;
        Ok(Self {
            participant,
            payload,
        })
    }

    /// Returns the `type` tag of the payload, if it has one.
    pub fn kind(&self) -> Option<&str> {
        self.payload.get("type").and_then(|value| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_text_wire_shape() {
        let message = OutboundMessage::user_text("hello", 1_700_000_000_000);
        let value: serde_json::Value = serde_json::from_slice(&message.to_bytes().unwrap()).unwrap();
        assert_eq!(value["type"], "user_text_message");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["timestamp"].as_i64(), Some(1_700_000_000_000));
        assert!(value.get("context").is_none());
    }

    #[test]
    fn test_context_update_wire_shape() {
        let message = OutboundMessage::context_update("viewing diff", 42);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "context_update");
        assert_eq!(value["context"], "viewing diff");
        assert_eq!(value["timestamp"], 42);
        assert_eq!(message.kind(), "context_update");
        assert_eq!(message.timestamp(), 42);
    }

    #[test]
    fn test_inbound_parse_keeps_sender() {
        let inbound = InboundMessage::parse(
            br#"{"type":"transcript","text":"hi there"}"#,
            Some("agent-1".to_string()),
        )
        .unwrap();
        assert_eq!(inbound.participant.as_deref(), Some("agent-1"));
        assert_eq!(inbound.kind(), Some("transcript"));
        assert_eq!(inbound.payload["text"], "hi there");
    }

    #[test]
    fn test_inbound_parse_rejects_malformed_payload() {
        assert!(InboundMessage::parse(b"{not json", None).is_err());
        assert!(InboundMessage::parse(&[0xff, 0xfe], None).is_err());
    }
}
