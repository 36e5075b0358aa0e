//! Shared types for the Parley voice session workspace.
//!
//! This crate holds the data model that both the voice coordinator and its
//! hosts agree on: the coarse connection status shown to the UI, the
//! per-session configuration supplied at start, and the JSON envelopes
//! exchanged over the room data channel.
//!
//! It deliberately has no async or networking dependencies so that UI-side
//! code can depend on it without pulling in the media stack.

pub mod message;

use serde::{Deserialize, Serialize};

pub use message::{InboundMessage, OutboundMessage};

/// Coarse lifecycle indicator for the voice connection.
///
/// The UI can only observe these four values; the reason behind an
/// `Error` is reported to the caller separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection and none in progress.
    #[default]
    Disconnected,
    /// A session start or SDK reconnection is in progress.
    Connecting,
    /// Joined the room with the microphone published.
    Connected,
    /// The last start attempt failed.
    Error,
}

impl ConnectionStatus {
    /// Returns the canonical string label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }

    /// Returns `true` while a connection is established or being established.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(Self::Disconnected),
            "connecting" => Ok(Self::Connecting),
            "connected" => Ok(Self::Connected),
            "error" => Ok(Self::Error),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown connection status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connection status: {0}")]
pub struct ParseStatusError(pub String);

/// Caller-supplied parameters for a single voice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Application session this voice conversation belongs to.
    pub session_id: String,
    /// Context handed to the assistant before the first utterance.
    #[serde(default)]
    pub initial_context: Option<String>,
    /// User's preferred assistant language (locale tag such as `zh-Hant`).
    #[serde(default)]
    pub language_preference: Option<String>,
}

impl SessionConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            initial_context: None,
            language_preference: None,
        }
    }

    pub fn with_initial_context(mut self, context: impl Into<String>) -> Self {
        self.initial_context = Some(context.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_preference = Some(language.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_parse_back() {
        for status in [
            ConnectionStatus::Disconnected,
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ConnectionStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "open".parse::<ConnectionStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown connection status: open");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
    }

    #[test]
    fn test_only_connecting_and_connected_are_active() {
        assert!(ConnectionStatus::Connecting.is_active());
        assert!(ConnectionStatus::Connected.is_active());
        assert!(!ConnectionStatus::Disconnected.is_active());
        assert!(!ConnectionStatus::Error.is_active());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("sess-1")
            .with_initial_context("editing main.rs")
            .with_language("ja");
        assert_eq!(config.session_id, "sess-1");
        assert_eq!(config.initial_context.as_deref(), Some("editing main.rs"));
        assert_eq!(config.language_preference.as_deref(), Some("ja"));
    }
}
