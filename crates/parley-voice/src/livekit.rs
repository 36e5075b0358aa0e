//! LiveKit implementation of the room traits.
//!
//! Requires the **`livekit`** feature. The microphone track is backed by a
//! [`NativeAudioSource`] fed from the [`MicrophoneCapture`] handed to
//! [`RoomHandle::enable_microphone`].

use crate::config::AudioConfig;
use crate::error::VoiceError;
use crate::room::{
    ConnectOptions, MicrophoneCapture, PcmFrame, RemoteAudioTrack, RoomConnector, RoomHandle,
    RoomSignal, SignalStream,
};
use async_trait::async_trait;
use futures::StreamExt;
use livekit::options::TrackPublishOptions;
use livekit::prelude::{
    DataPacket, LocalAudioTrack, LocalTrack, RemoteTrack, Room, RoomEvent, RoomOptions,
    TrackSource,
};
use livekit::webrtc::audio_frame::AudioFrame;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_source::{AudioSourceOptions, RtcAudioSource};
use livekit::webrtc::audio_stream::native::NativeAudioStream;
use std::borrow::Cow;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Buffering inside the native source before frames are dropped.
const MICROPHONE_QUEUE_MS: u32 = 100;
/// Playback format requested from subscribed remote tracks.
const PLAYBACK_SAMPLE_RATE: i32 = 48_000;
const PLAYBACK_NUM_CHANNELS: i32 = 1;
/// Frames buffered between the SDK stream and the playback sink.
const PLAYBACK_FRAME_BUFFER: usize = 64;

/// Joins LiveKit rooms.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveKitConnector;

#[async_trait]
impl RoomConnector for LiveKitConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: &ConnectOptions,
    ) -> Result<(Box<dyn RoomHandle>, SignalStream), VoiceError> {
        let mut room_options = RoomOptions::default();
        room_options.auto_subscribe = options.auto_subscribe;

        let (room, events) = Room::connect(url, token, room_options)
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))?;
        debug!(room = %room.name(), "joined LiveKit room");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_events(events, tx));

        let handle = LiveKitRoom {
            room,
            microphone_feed: Mutex::new(None),
        };
        Ok((Box::new(handle), rx))
    }
}

/// A joined LiveKit room.
pub struct LiveKitRoom {
    room: Room,
    microphone_feed: Mutex<Option<JoinHandle<()>>>,
}

impl LiveKitRoom {
    fn stop_microphone(&self) {
        if let Some(feed) = self
            .microphone_feed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            feed.abort();
        }
    }
}

#[async_trait]
impl RoomHandle for LiveKitRoom {
    fn room_name(&self) -> String {
        self.room.name()
    }

    async fn enable_microphone(
        &self,
        audio: &AudioConfig,
        capture: MicrophoneCapture,
    ) -> Result<(), VoiceError> {
        let source = NativeAudioSource::new(
            AudioSourceOptions {
                echo_cancellation: audio.echo_cancellation,
                noise_suppression: audio.noise_suppression,
                auto_gain_control: audio.auto_gain_control,
            },
            capture.sample_rate,
            capture.num_channels,
            MICROPHONE_QUEUE_MS,
        );
        let track = LocalAudioTrack::create_audio_track(
            "microphone",
            RtcAudioSource::Native(source.clone()),
        );
        let publish_options = TrackPublishOptions {
            source: TrackSource::Microphone,
            ..Default::default()
        };
        self.room
            .local_participant()
            .publish_track(LocalTrack::Audio(track), publish_options)
            .await
            .map_err(|e| VoiceError::Connection(format!("failed to publish microphone: {}", e)))?;

        let feed = tokio::spawn(feed_microphone(source, capture));
        self.stop_microphone();
        *self
            .microphone_feed
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(feed);
        Ok(())
    }

    async fn publish_data(&self, payload: Vec<u8>, reliable: bool) -> Result<(), VoiceError> {
        let packet = DataPacket {
            payload,
            reliable,
            ..Default::default()
        };
        self.room
            .local_participant()
            .publish_data(packet)
            .await
            .map_err(|e| VoiceError::Send(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        self.stop_microphone();
        self.room
            .close()
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))
    }
}

async fn feed_microphone(source: NativeAudioSource, capture: MicrophoneCapture) {
    let MicrophoneCapture {
        sample_rate,
        num_channels,
        mut frames,
    } = capture;
    while let Some(frame) = frames.recv().await {
        if frame.sample_rate != sample_rate || frame.num_channels != num_channels {
            warn!(
                rate = frame.sample_rate,
                channels = frame.num_channels,
                "captured frame does not match the microphone track format, dropping"
            );
            continue;
        }
        let samples_per_channel = frame.samples.len() as u32 / num_channels.max(1);
        let audio = AudioFrame {
            data: Cow::Owned(frame.samples),
            sample_rate,
            num_channels,
            samples_per_channel,
        };
        if let Err(e) = source.capture_frame(&audio).await {
            warn!(error = %e, "failed to push microphone audio to LiveKit");
        }
    }
    debug!("microphone capture ended");
}

async fn forward_events(
    mut events: mpsc::UnboundedReceiver<RoomEvent>,
    tx: mpsc::UnboundedSender<RoomSignal>,
) {
    while let Some(event) = events.recv().await {
        let signal = match event {
            RoomEvent::Disconnected { reason } => RoomSignal::Disconnected {
                reason: Some(format!("{:?}", reason)),
            },
            RoomEvent::Reconnecting => RoomSignal::Reconnecting,
            RoomEvent::Reconnected => RoomSignal::Reconnected,
            RoomEvent::ParticipantConnected(participant) => RoomSignal::ParticipantConnected {
                identity: participant.identity().to_string(),
            },
            RoomEvent::TrackSubscribed {
                track: RemoteTrack::Audio(track),
                participant,
                ..
            } => {
                let (frames_tx, frames) = mpsc::channel(PLAYBACK_FRAME_BUFFER);
                let mut stream = NativeAudioStream::new(
                    track.rtc_track(),
                    PLAYBACK_SAMPLE_RATE,
                    PLAYBACK_NUM_CHANNELS,
                );
                tokio::spawn(async move {
                    while let Some(frame) = stream.next().await {
                        let frame = PcmFrame {
                            samples: frame.data.to_vec(),
                            sample_rate: frame.sample_rate,
                            num_channels: frame.num_channels,
                        };
                        if frames_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                });
                RoomSignal::AudioTrackSubscribed(RemoteAudioTrack {
                    sid: track.sid().to_string(),
                    participant: participant.identity().to_string(),
                    frames,
                })
            }
            RoomEvent::DataReceived {
                payload,
                participant,
                ..
            } => RoomSignal::DataReceived {
                payload: payload.to_vec(),
                participant: participant.map(|p| p.identity().to_string()),
            },
            _ => continue,
        };

        if tx.send(signal).is_err() {
            warn!("room signal receiver dropped, stopping event forwarding");
            break;
        }
    }
}
