use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Body posted to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub session_id: String,
    pub language: String,
    /// Sent as an empty string when the session has no initial context.
    pub initial_context: String,
}

impl TokenRequest {
    pub fn new(
        session_id: impl Into<String>,
        language: impl Into<String>,
        initial_context: Option<&str>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            language: language.into(),
            initial_context: initial_context.unwrap_or_default().to_string(),
        }
    }
}

/// Credentials returned by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCredentials {
    pub token: String,
    pub room_name: String,
    /// LiveKit server to connect to.
    #[serde(rename = "url")]
    pub server_url: String,
}

impl fmt::Debug for ConnectionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredentials")
            .field("token", &"[REDACTED]")
            .field("room_name", &self.room_name)
            .field("server_url", &self.server_url)
            .finish()
    }
}

/// Source of room credentials for a session.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn exchange(&self, request: &TokenRequest) -> Result<ConnectionCredentials, VoiceError>;
}

/// HTTP client for the remote token-issuing service.
///
/// Performs a single POST per exchange. Non-2xx responses, transport
/// failures and malformed bodies all surface as
/// [`VoiceError::TokenExchange`]; nothing is retried.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TokenClient {
    /// # Errors
    ///
    /// Returns [`VoiceError::Config`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, VoiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenSource for TokenClient {
    async fn exchange(&self, request: &TokenRequest) -> Result<ConnectionCredentials, VoiceError> {
        debug!(
            endpoint = %self.endpoint,
            session_id = %request.session_id,
            language = %request.language,
            "requesting room token"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| VoiceError::token_exchange(None, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::token_exchange(
                Some(status.as_u16()),
                format!("token server responded with {}", status),
            ));
        }

        let credentials: ConnectionCredentials = response.json().await.map_err(|e| {
            VoiceError::token_exchange(
                Some(status.as_u16()),
                format!("invalid token response: {}", e),
            )
        })?;

        info!(room = %credentials.room_name, "received room token");
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case_and_empty_context() {
        let request = TokenRequest::new("sess-9", "en", None);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["sessionId"], "sess-9");
        assert_eq!(value["language"], "en");
        assert_eq!(value["initialContext"], "");
    }

    #[test]
    fn test_credentials_read_url_field() {
        let credentials: ConnectionCredentials = serde_json::from_str(
            r#"{"token":"jwt","roomName":"voice-sess-9","url":"wss://lk.example.com"}"#,
        )
        .unwrap();
        assert_eq!(credentials.room_name, "voice-sess-9");
        assert_eq!(credentials.server_url, "wss://lk.example.com");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = ConnectionCredentials {
            token: "super-secret-jwt".to_string(),
            room_name: "room".to_string(),
            server_url: "ws://localhost:7880".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("super-secret-jwt"));
        assert!(debug.contains("[REDACTED]"));
    }
}
