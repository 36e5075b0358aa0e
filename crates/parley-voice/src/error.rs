use parley_types::ConnectionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("token exchange failed: {message}")]
    TokenExchange {
        /// HTTP status returned by the token endpoint, if one was received.
        status: Option<u16>,
        message: String,
    },

    #[error("room connection error: {0}")]
    Connection(String),

    #[error("failed to send data message: {0}")]
    Send(String),

    #[error("failed to serialize data message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("voice session already {0}")]
    AlreadyActive(ConnectionStatus),

    #[error("voice session start was superseded by a teardown")]
    Superseded,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VoiceError {
    pub(crate) fn token_exchange(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::TokenExchange {
            status,
            message: message.into(),
        }
    }
}
