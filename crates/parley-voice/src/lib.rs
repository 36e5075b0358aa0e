//! Voice assistant session coordination for Parley.
//!
//! Connects the application's voice assistant to a LiveKit room: trades
//! session metadata for a room token, joins the room with the microphone
//! published, relays JSON control messages over the reliable data channel
//! and reports a coarse connection status to the UI.
//!
//! Transport, reconnection and media encoding belong to the LiveKit SDK.
//! This crate only sequences the calls and keeps exactly one connection per
//! [`VoiceCoordinator`].

pub mod config;
#[cfg(feature = "desktop-audio")]
pub mod desktop;
pub mod error;
pub mod language;
#[cfg(feature = "livekit")]
pub mod livekit;
pub mod pcm;
pub mod provider;
pub mod registry;
pub mod relay;
pub mod room;
pub mod session;
pub mod status;
pub mod token;

pub use config::{
    AudioConfig, ConnectionConfig, VoiceConfig, DEFAULT_LANGUAGE, DEV_LIVEKIT_URL,
    DEV_TOKEN_SERVER_URL,
};
pub use error::VoiceError;
pub use language::{language_for_livekit, FALLBACK_LANGUAGE};
pub use provider::VoiceProvider;
pub use registry::{Registration, RegistrationId, SessionRegistry};
pub use relay::EventRelay;
pub use room::{
    AudioPlayback, ConnectOptions, DrainPlayback, GrantedMicrophone, MicrophoneAccess,
    MicrophoneCapture, PcmFrame, RemoteAudioTrack, RoomConnector, RoomHandle, RoomSignal,
    SignalStream,
};
pub use session::{VoiceCoordinator, VoiceSession};
pub use status::{StatusCell, StatusSnapshot};
pub use token::{ConnectionCredentials, TokenClient, TokenRequest, TokenSource};

pub use parley_types::{ConnectionStatus, InboundMessage, OutboundMessage, SessionConfig};
