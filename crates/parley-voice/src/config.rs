use crate::error::VoiceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token server used during local development.
pub const DEV_TOKEN_SERVER_URL: &str = "http://localhost:8082/token";
/// LiveKit server used during local development.
pub const DEV_LIVEKIT_URL: &str = "ws://localhost:7880";
/// Language sent to the token server when the user has no preference.
pub const DEFAULT_LANGUAGE: &str = "zh";

fn default_token_server_url() -> String {
    DEV_TOKEN_SERVER_URL.to_string()
}

fn default_livekit_url() -> String {
    DEV_LIVEKIT_URL.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Client-side settings for the LiveKit voice integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Endpoint that trades session metadata for a room token.
    #[serde(default = "default_token_server_url")]
    pub token_server_url: String,

    /// LiveKit server URL. The token server returns the URL actually used
    /// for connecting; this value is informational.
    #[serde(default = "default_livekit_url")]
    pub livekit_url: String,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Language tag sent when the session has no language preference.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Verbose logging of the voice pipeline.
    #[serde(default)]
    pub debug: bool,
}

/// Capture processing flags for the published microphone track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub echo_cancellation: bool,
    #[serde(default = "default_true")]
    pub noise_suppression: bool,
    #[serde(default = "default_true")]
    pub auto_gain_control: bool,
}

/// Connection tuning.
///
/// Reconnection is handled by the LiveKit SDK; `reconnect_attempts` and
/// `reconnect_delay_ms` are carried for hosts that want to surface them but
/// are not enforced here. `timeout_ms` bounds the token exchange request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            token_server_url: default_token_server_url(),
            livekit_url: default_livekit_url(),
            audio: AudioConfig::default(),
            connection: ConnectionConfig::default(),
            default_language: default_language(),
            debug: false,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ConnectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl VoiceConfig {
    /// Config pointing at deployed token and LiveKit servers.
    pub fn new(token_server_url: impl Into<String>, livekit_url: impl Into<String>) -> Self {
        Self {
            token_server_url: token_server_url.into(),
            livekit_url: livekit_url.into(),
            ..Self::default()
        }
    }

    /// Checks the settings the coordinator cannot work without.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::Config`] for an empty or non-HTTP token server
    /// URL, an empty default language, or a zero timeout.
    pub fn validate(&self) -> Result<(), VoiceError> {
        let url = self.token_server_url.trim();
        if url.is_empty() {
            return Err(VoiceError::Config(
                "token_server_url must not be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(VoiceError::Config(format!(
                "token_server_url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.default_language.trim().is_empty() {
            return Err(VoiceError::Config(
                "default_language must not be empty".to_string(),
            ));
        }
        if self.connection.timeout_ms == 0 {
            return Err(VoiceError::Config(
                "connection.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
