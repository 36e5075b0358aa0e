//! Forwards room signals to the status cell, the playback sink and inbound
//! message subscribers.

use crate::room::{AudioPlayback, RoomSignal, SignalStream};
use crate::status::StatusCell;
use parley_types::{ConnectionStatus, InboundMessage};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct EventRelay {
    status: StatusCell,
    messages: broadcast::Sender<InboundMessage>,
    playback: Arc<dyn AudioPlayback>,
}

impl EventRelay {
    pub fn new(
        status: StatusCell,
        messages: broadcast::Sender<InboundMessage>,
        playback: Arc<dyn AudioPlayback>,
    ) -> Self {
        Self {
            status,
            messages,
            playback,
        }
    }

    pub fn handle(&self, signal: RoomSignal) {
        match signal {
            RoomSignal::Disconnected { reason } => {
                info!(reason = reason.as_deref().unwrap_or("unknown"), "disconnected from room");
                self.status.set(ConnectionStatus::Disconnected);
            }
            RoomSignal::Reconnecting => {
                info!("reconnecting to room");
                self.status.set(ConnectionStatus::Connecting);
            }
            RoomSignal::Reconnected => {
                info!("reconnected to room");
                self.status.set(ConnectionStatus::Connected);
            }
            RoomSignal::ParticipantConnected { identity } => {
                info!(%identity, "participant connected");
            }
            RoomSignal::AudioTrackSubscribed(track) => {
                debug!(sid = %track.sid, participant = %track.participant, "audio track subscribed");
                self.playback.attach(track);
            }
            RoomSignal::DataReceived {
                payload,
                participant,
            } => match InboundMessage::parse(&payload, participant) {
                Ok(message) => {
                    debug!(
                        participant = message.participant.as_deref().unwrap_or("server"),
                        kind = message.kind().unwrap_or("untyped"),
                        "data received"
                    );
                    // No subscribers is fine.
                    let _ = self.messages.send(message);
                }
                Err(e) => {
                    warn!(error = %e, bytes = payload.len(), "dropping malformed data message");
                }
            },
        }
    }

    /// Drains `signals` on a background task until the stream closes.
    pub fn spawn(self, mut signals: SignalStream) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                self.handle(signal);
            }
            debug!("room signal stream closed");
        })
    }
}
