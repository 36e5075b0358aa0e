#![allow(dead_code)]

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use parley_voice::{
    AudioConfig, ConnectOptions, ConnectionCredentials, MicrophoneAccess, MicrophoneCapture,
    PcmFrame, RoomConnector, RoomHandle, RoomSignal, SignalStream, TokenRequest, TokenSource,
    VoiceError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};

pub const TEST_ROOM: &str = "voice-room-1";
pub const TEST_URL: &str = "ws://livekit.test:7880";

/// Shared record of everything the fake rooms observed.
#[derive(Default)]
pub struct RoomLog {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub microphone_enabled: AtomicUsize,
    pub capture_format: Mutex<Option<(u32, u32)>>,
    pub captured_samples: AtomicUsize,
    pub published: Mutex<Vec<(Vec<u8>, bool)>>,
    pub last_url: Mutex<Option<String>>,
    pub last_token: Mutex<Option<String>>,
    pub signals: Mutex<Option<mpsc::UnboundedSender<RoomSignal>>>,
}

impl RoomLog {
    pub fn published_json(&self) -> Vec<Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(bytes, _)| serde_json::from_slice(bytes).unwrap())
            .collect()
    }

    /// Injects a signal into the most recent connection.
    pub fn emit(&self, signal: RoomSignal) {
        self.signals
            .lock()
            .unwrap()
            .as_ref()
            .expect("no connection to emit on")
            .send(signal)
            .expect("signal stream closed");
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub log: Arc<RoomLog>,
    pub fail_connect: AtomicBool,
    pub fail_microphone: AtomicBool,
    pub fail_publish: AtomicBool,
    pub fail_disconnect: Arc<AtomicBool>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RoomConnector for FakeConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        _options: &ConnectOptions,
    ) -> Result<(Box<dyn RoomHandle>, SignalStream), VoiceError> {
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        *self.log.last_url.lock().unwrap() = Some(url.to_string());
        *self.log.last_token.lock().unwrap() = Some(token.to_string());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(VoiceError::Connection("connection refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.log.signals.lock().unwrap() = Some(tx);
        let room = FakeRoom {
            log: self.log.clone(),
            fail_microphone: self.fail_microphone.load(Ordering::SeqCst),
            fail_publish: self.fail_publish.load(Ordering::SeqCst),
            fail_disconnect: self.fail_disconnect.clone(),
        };
        Ok((Box::new(room), rx))
    }
}

pub struct FakeRoom {
    log: Arc<RoomLog>,
    fail_microphone: bool,
    fail_publish: bool,
    fail_disconnect: Arc<AtomicBool>,
}

#[async_trait]
impl RoomHandle for FakeRoom {
    fn room_name(&self) -> String {
        TEST_ROOM.to_string()
    }

    async fn enable_microphone(
        &self,
        _audio: &AudioConfig,
        capture: MicrophoneCapture,
    ) -> Result<(), VoiceError> {
        if self.fail_microphone {
            return Err(VoiceError::Connection("track publish rejected".into()));
        }
        self.log.microphone_enabled.fetch_add(1, Ordering::SeqCst);
        *self.log.capture_format.lock().unwrap() = Some((capture.sample_rate, capture.num_channels));

        let log = self.log.clone();
        let mut frames = capture.frames;
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                log.captured_samples
                    .fetch_add(frame.samples.len(), Ordering::SeqCst);
            }
        });
        Ok(())
    }

    async fn publish_data(&self, payload: Vec<u8>, reliable: bool) -> Result<(), VoiceError> {
        if self.fail_publish {
            return Err(VoiceError::Send("data channel closed".into()));
        }
        self.log.published.lock().unwrap().push((payload, reliable));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), VoiceError> {
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(VoiceError::Connection("signal connection lost".into()));
        }
        self.log.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Token source that records requests and returns fixed credentials.
#[derive(Default)]
pub struct FakeTokens {
    pub requests: Mutex<Vec<TokenRequest>>,
    pub fail: AtomicBool,
}

impl FakeTokens {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenSource for FakeTokens {
    async fn exchange(&self, request: &TokenRequest) -> Result<ConnectionCredentials, VoiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::TokenExchange {
                status: Some(503),
                message: "token server unavailable".into(),
            });
        }
        Ok(ConnectionCredentials {
            token: format!("token-for-{}", request.session_id),
            room_name: TEST_ROOM.to_string(),
            server_url: TEST_URL.to_string(),
        })
    }
}

/// Token source that waits for `release` before issuing credentials.
#[derive(Default)]
pub struct GatedTokens {
    pub inner: FakeTokens,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedTokens {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl TokenSource for GatedTokens {
    async fn exchange(&self, request: &TokenRequest) -> Result<ConnectionCredentials, VoiceError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.exchange(request).await
    }
}

pub struct DeniedMicrophone;

#[async_trait]
impl MicrophoneAccess for DeniedMicrophone {
    async fn request_access(&self, _audio: &AudioConfig) -> Result<MicrophoneCapture, VoiceError> {
        Err(VoiceError::PermissionDenied("user dismissed the prompt".into()))
    }
}

/// Microphone that yields a fixed set of 16 kHz mono blocks, then ends.
pub struct ScriptedMicrophone {
    pub blocks: Vec<Vec<i16>>,
}

#[async_trait]
impl MicrophoneAccess for ScriptedMicrophone {
    async fn request_access(&self, _audio: &AudioConfig) -> Result<MicrophoneCapture, VoiceError> {
        let (tx, frames) = mpsc::channel(self.blocks.len().max(1));
        for samples in &self.blocks {
            tx.try_send(PcmFrame {
                samples: samples.clone(),
                sample_rate: 16_000,
                num_channels: 1,
            })
            .unwrap();
        }
        Ok(MicrophoneCapture {
            sample_rate: 16_000,
            num_channels: 1,
            frames,
        })
    }
}

/// Requests received by the in-process token server.
pub type TokenRequests = Arc<Mutex<Vec<Value>>>;

async fn issue_token(State(requests): State<TokenRequests>, Json(body): Json<Value>) -> Json<Value> {
    let session_id = body["sessionId"].as_str().unwrap_or_default().to_string();
    requests.lock().unwrap().push(body);
    Json(json!({
        "token": format!("jwt-{}", session_id),
        "roomName": format!("voice-{}", session_id),
        "url": TEST_URL,
    }))
}

async fn fail_with(status: StatusCode) -> Result<Json<Value>, StatusCode> {
    Err(status)
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/token", addr)
}

/// Starts a token server that issues credentials and records request bodies.
pub async fn spawn_token_server() -> (String, TokenRequests) {
    let requests = TokenRequests::default();
    let router = Router::new()
        .route("/token", post(issue_token))
        .with_state(requests.clone());
    (serve(router).await, requests)
}

/// Starts a token server that always answers with `status`.
pub async fn spawn_failing_token_server(status: StatusCode) -> String {
    let router = Router::new().route("/token", post(move || fail_with(status)));
    serve(router).await
}

/// Starts a token server that answers 200 with a body missing the token.
pub async fn spawn_malformed_token_server() -> String {
    let router = Router::new().route(
        "/token",
        post(|| async { Json(json!({ "roomName": "voice-x" })) }),
    );
    serve(router).await
}
