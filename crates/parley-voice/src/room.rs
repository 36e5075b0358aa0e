//! SDK-neutral view of a real-time media room.
//!
//! The coordinator talks to rooms only through these traits. The LiveKit
//! adapter lives in [`crate::livekit`] behind the `livekit` feature; tests
//! use in-memory implementations.

use crate::config::AudioConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A block of decoded PCM16 samples from a remote track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub num_channels: u32,
}

/// Sample rate reported by a capture with no device behind it.
const SILENT_SAMPLE_RATE: u32 = 48_000;

/// Local microphone audio handed to the room for publishing.
#[derive(Debug)]
pub struct MicrophoneCapture {
    pub sample_rate: u32,
    pub num_channels: u32,
    pub frames: mpsc::Receiver<PcmFrame>,
}

impl MicrophoneCapture {
    /// A capture that never yields a frame. The published track stays silent.
    pub fn silent() -> Self {
        let (_, frames) = mpsc::channel(1);
        Self {
            sample_rate: SILENT_SAMPLE_RATE,
            num_channels: 1,
            frames,
        }
    }
}

/// A subscribed remote audio track, ready to be attached for playback.
#[derive(Debug)]
pub struct RemoteAudioTrack {
    pub sid: String,
    pub participant: String,
    pub frames: mpsc::Receiver<PcmFrame>,
}

/// Lifecycle and data notifications emitted by a connected room.
#[derive(Debug)]
pub enum RoomSignal {
    Disconnected { reason: Option<String> },
    Reconnecting,
    Reconnected,
    ParticipantConnected { identity: String },
    AudioTrackSubscribed(RemoteAudioTrack),
    DataReceived {
        payload: Vec<u8>,
        participant: Option<String>,
    },
}

/// Signals for one connection, in SDK delivery order.
pub type SignalStream = mpsc::UnboundedReceiver<RoomSignal>;

/// Options applied when joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub audio: AudioConfig,
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            auto_subscribe: true,
        }
    }
}

/// Joins rooms.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    /// Connects to `url` with `token`.
    ///
    /// # Errors
    ///
    /// Implementations return [`VoiceError::Connection`] when the join fails.
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: &ConnectOptions,
    ) -> Result<(Box<dyn RoomHandle>, SignalStream), VoiceError>;
}

/// A joined room.
#[async_trait]
pub trait RoomHandle: Send + Sync {
    fn room_name(&self) -> String;

    /// Publishes the local microphone track and feeds it from `capture`
    /// until the capture ends or the room closes.
    async fn enable_microphone(
        &self,
        audio: &AudioConfig,
        capture: MicrophoneCapture,
    ) -> Result<(), VoiceError>;

    /// Publishes bytes on the data channel. `reliable` selects ordered,
    /// guaranteed delivery.
    async fn publish_data(&self, payload: Vec<u8>, reliable: bool) -> Result<(), VoiceError>;

    async fn disconnect(&self) -> Result<(), VoiceError>;
}

/// Host platform gate for microphone capture.
#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    /// Opens the capture device once the user or platform allows it.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::PermissionDenied`] when the user or platform
    /// refuses capture.
    async fn request_access(&self, audio: &AudioConfig) -> Result<MicrophoneCapture, VoiceError>;
}

/// Headless hosts have no permission prompt and no input device. The
/// microphone track is published silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantedMicrophone;

#[async_trait]
impl MicrophoneAccess for GrantedMicrophone {
    async fn request_access(&self, _audio: &AudioConfig) -> Result<MicrophoneCapture, VoiceError> {
        Ok(MicrophoneCapture::silent())
    }
}

/// Local playback of remote audio.
pub trait AudioPlayback: Send + Sync {
    fn attach(&self, track: RemoteAudioTrack);
}

/// Consumes remote audio without rendering it, so the SDK never stalls on a
/// full frame queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainPlayback;

impl AudioPlayback for DrainPlayback {
    fn attach(&self, track: RemoteAudioTrack) {
        let RemoteAudioTrack {
            sid,
            participant,
            mut frames,
        } = track;
        info!(%sid, %participant, "attached remote audio track");
        tokio::spawn(async move {
            let mut samples: usize = 0;
            while let Some(frame) = frames.recv().await {
                samples += frame.samples.len();
            }
            debug!(%sid, samples, "remote audio track ended");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_granted_microphone_yields_silent_capture() {
        let mut capture = GrantedMicrophone
            .request_access(&AudioConfig::default())
            .await
            .unwrap();

        assert_eq!((capture.sample_rate, capture.num_channels), (48_000, 1));
        assert!(capture.frames.recv().await.is_none());
    }
}
