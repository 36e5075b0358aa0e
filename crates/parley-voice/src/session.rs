//! Voice session lifecycle coordination.
//!
//! [`VoiceCoordinator`] owns at most one live room connection. Starting a
//! session runs token exchange, microphone permission, room join and
//! microphone publish in order; any failure aborts the sequence, leaves no
//! connection behind and marks the shared status as `Error`. The typed error
//! is returned to the caller as well.

use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::relay::EventRelay;
use crate::room::{
    AudioPlayback, ConnectOptions, DrainPlayback, GrantedMicrophone, MicrophoneAccess,
    RoomConnector, RoomHandle, SignalStream,
};
use crate::status::{StatusCell, StatusSnapshot};
use crate::token::{TokenRequest, TokenSource};
use async_trait::async_trait;
use parley_types::{ConnectionStatus, InboundMessage, OutboundMessage, SessionConfig};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the inbound data message broadcast channel.
const INBOUND_BROADCAST_CAPACITY: usize = 256;

/// The capability set the application drives a voice session through.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    async fn start(&self, config: SessionConfig) -> Result<(), VoiceError>;

    /// Ends the active session. Succeeds without doing anything when no
    /// session is active.
    async fn end(&self) -> Result<(), VoiceError>;

    /// Sends a `user_text_message` envelope. Dropped with a warning when no
    /// session is active.
    async fn send_text(&self, message: &str) -> Result<(), VoiceError>;

    /// Sends a `context_update` envelope. Dropped with a warning when no
    /// session is active.
    async fn send_contextual_update(&self, update: &str) -> Result<(), VoiceError>;
}

struct ActiveSession {
    session_id: String,
    room_name: String,
    handle: Box<dyn RoomHandle>,
    relay: JoinHandle<()>,
}

impl ActiveSession {
    async fn close(self) {
        self.relay.abort();
        if let Err(e) = self.handle.disconnect().await {
            warn!(room = %self.room_name, error = %e, "error while closing room");
        }
    }
}

pub struct VoiceCoordinator {
    config: VoiceConfig,
    tokens: Arc<dyn TokenSource>,
    connector: Arc<dyn RoomConnector>,
    microphone: Arc<dyn MicrophoneAccess>,
    playback: Arc<dyn AudioPlayback>,
    status: StatusCell,
    messages: broadcast::Sender<InboundMessage>,
    active: Mutex<Option<ActiveSession>>,
}

impl VoiceCoordinator {
    /// Creates a coordinator with a fresh status cell, a silent microphone
    /// and a draining playback sink. Hosts with audio devices swap both in
    /// through [`Self::with_microphone`] and [`Self::with_playback`].
    pub fn new(
        config: VoiceConfig,
        tokens: Arc<dyn TokenSource>,
        connector: Arc<dyn RoomConnector>,
    ) -> Self {
        let (messages, _) = broadcast::channel(INBOUND_BROADCAST_CAPACITY);
        Self {
            config,
            tokens,
            connector,
            microphone: Arc::new(GrantedMicrophone),
            playback: Arc::new(DrainPlayback),
            status: StatusCell::new(),
            messages,
            active: Mutex::new(None),
        }
    }

    pub fn with_microphone(mut self, microphone: Arc<dyn MicrophoneAccess>) -> Self {
        self.microphone = microphone;
        self
    }

    pub fn with_playback(mut self, playback: Arc<dyn AudioPlayback>) -> Self {
        self.playback = playback;
        self
    }

    /// Publishes status into an existing cell, e.g. one owned by the UI.
    pub fn with_status(mut self, status: StatusCell) -> Self {
        self.status = status;
        self
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn status_cell(&self) -> &StatusCell {
        &self.status
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    /// Subscribes to JSON messages received from other participants.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<InboundMessage> {
        self.messages.subscribe()
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn room_name(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|session| session.room_name.clone())
    }

    /// The caller's preference exactly as given, else the configured default.
    /// The token server owns any mapping of the tag.
    fn resolve_language(&self, preference: Option<&str>) -> String {
        match preference.map(str::trim).filter(|p| !p.is_empty()) {
            Some(preference) => preference.to_string(),
            None => self.config.default_language.clone(),
        }
    }

    async fn establish(
        &self,
        config: &SessionConfig,
    ) -> Result<(Box<dyn RoomHandle>, SignalStream), VoiceError> {
        let language = self.resolve_language(config.language_preference.as_deref());
        let request = TokenRequest::new(
            config.session_id.as_str(),
            language,
            config.initial_context.as_deref(),
        );
        let credentials = self.tokens.exchange(&request).await?;

        // The token is already issued at this point; a denial leaves it unused.
        let capture = self.microphone.request_access(&self.config.audio).await?;

        info!(room = %credentials.room_name, url = %credentials.server_url, "connecting to room");
        let options = ConnectOptions {
            audio: self.config.audio,
            auto_subscribe: true,
        };
        let (handle, signals) = self
            .connector
            .connect(&credentials.server_url, &credentials.token, &options)
            .await?;

        if let Err(e) = handle.enable_microphone(&self.config.audio, capture).await {
            if let Err(close_err) = handle.disconnect().await {
                warn!(error = %close_err, "failed to close room after microphone error");
            }
            return Err(e);
        }
        debug!("microphone enabled");

        Ok((handle, signals))
    }

    /// Sends `message` on the reliable data channel of the active session.
    async fn publish(&self, message: OutboundMessage) -> Result<(), VoiceError> {
        let active = self.active.lock().await;
        let Some(session) = active.as_ref() else {
            warn!(kind = message.kind(), "no active voice session, dropping message");
            return Ok(());
        };

        let payload = message.to_bytes().map_err(|e| {
            error!(kind = message.kind(), error = %e, "failed to encode data message");
            VoiceError::from(e)
        })?;

        if let Err(e) = session.handle.publish_data(payload, true).await {
            error!(kind = message.kind(), room = %session.room_name, error = %e, "failed to send data message");
            return Err(e);
        }
        debug!(kind = message.kind(), room = %session.room_name, "sent data message");
        Ok(())
    }

    /// Disconnects and forgets the active connection regardless of what is
    /// in flight, then reports `Disconnected`.
    ///
    /// A `start` still running when this is called notices the status write
    /// and discards its connection.
    pub async fn teardown(&self) {
        let session = self.active.lock().await.take();
        if let Some(session) = session {
            info!(session_id = %session.session_id, room = %session.room_name, "tearing down voice session");
            session.close().await;
        }
        self.status.set(ConnectionStatus::Disconnected);
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl VoiceSession for VoiceCoordinator {
    async fn start(&self, config: SessionConfig) -> Result<(), VoiceError> {
        let version = match self.status.compare_and_set(
            &[ConnectionStatus::Disconnected, ConnectionStatus::Error],
            ConnectionStatus::Connecting,
        ) {
            Ok(version) => version,
            Err(current) => {
                warn!(session_id = %config.session_id, status = %current, "voice session already active, ignoring start");
                return Err(VoiceError::AlreadyActive(current));
            }
        };

        // A room dropped by the server leaves its handle behind.
        let stale = self.active.lock().await.take();
        if let Some(stale) = stale {
            debug!(room = %stale.room_name, "closing stale room before starting");
            stale.close().await;
        }

        info!(session_id = %config.session_id, "starting voice session");

        let (handle, signals) = match self.establish(&config).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(session_id = %config.session_id, error = %e, "failed to start voice session");
                self.status.set_if_version(version, ConnectionStatus::Error);
                return Err(e);
            }
        };

        let mut active = self.active.lock().await;
        if self
            .status
            .set_if_version(version, ConnectionStatus::Connected)
            .is_none()
        {
            drop(active);
            warn!(session_id = %config.session_id, "voice session torn down while starting");
            if let Err(e) = handle.disconnect().await {
                warn!(error = %e, "failed to close superseded room");
            }
            return Err(VoiceError::Superseded);
        }

        let room_name = handle.room_name();
        let relay = EventRelay::new(
            self.status.clone(),
            self.messages.clone(),
            self.playback.clone(),
        )
        .spawn(signals);
        *active = Some(ActiveSession {
            session_id: config.session_id.clone(),
            room_name: room_name.clone(),
            handle,
            relay,
        });

        info!(session_id = %config.session_id, room = %room_name, "voice session connected");
        Ok(())
    }

    async fn end(&self) -> Result<(), VoiceError> {
        let mut active = self.active.lock().await;
        let Some(session) = active.take() else {
            debug!("no active voice session to end");
            return Ok(());
        };

        match session.handle.disconnect().await {
            Ok(()) => {
                session.relay.abort();
                self.status.set(ConnectionStatus::Disconnected);
                info!(session_id = %session.session_id, room = %session.room_name, "voice session ended");
                Ok(())
            }
            Err(e) => {
                error!(room = %session.room_name, error = %e, "failed to end voice session");
                *active = Some(session);
                Err(e)
            }
        }
    }

    async fn send_text(&self, message: &str) -> Result<(), VoiceError> {
        self.publish(OutboundMessage::user_text(message, now_millis()))
            .await
    }

    async fn send_contextual_update(&self, update: &str) -> Result<(), VoiceError> {
        self.publish(OutboundMessage::context_update(update, now_millis()))
            .await
    }
}
