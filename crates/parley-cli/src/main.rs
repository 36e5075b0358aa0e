//! Parley binary: a terminal host for a LiveKit voice assistant session.
//!
//! Loads configuration and starts a voice session that captures the default
//! input device and plays the assistant on the default output device. Each
//! stdin line goes to the assistant as text; `/ctx <text>` sends a
//! contextual update and `/quit` ends the session.

use parley_cli::config::{Config, ConfigSource};
use parley_cli::{logging, Command};
use parley_types::SessionConfig;
use parley_voice::desktop::{DeviceMicrophone, DevicePlayback};
use parley_voice::livekit::LiveKitConnector;
use parley_voice::{SessionRegistry, TokenClient, VoiceCoordinator, VoiceProvider};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn session_config_from_env() -> SessionConfig {
    let session_id = env_var("PARLEY_SESSION_ID")
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    SessionConfig {
        session_id,
        initial_context: env_var("PARLEY_INITIAL_CONTEXT"),
        language_preference: env_var("PARLEY_LANGUAGE"),
    }
}

#[tokio::main]
async fn main() {
    let source = ConfigSource::resolve(std::env::args().nth(1), env_var);
    let config = Config::load(source.path(), env_var)
        .expect("failed to load configuration, check the TOML syntax");
    logging::init_tracing(&config);

    tracing::info!(
        %source,
        path = %source.path().display(),
        "resolved startup configuration path"
    );

    config
        .voice
        .validate()
        .expect("invalid voice configuration");

    let tokens = TokenClient::new(
        config.voice.token_server_url.clone(),
        config.voice.connection.timeout(),
    )
    .expect("failed to build token client");
    tracing::info!(endpoint = tokens.endpoint(), "token client ready");

    let coordinator = VoiceCoordinator::new(
        config.voice.clone(),
        Arc::new(tokens),
        Arc::new(LiveKitConnector),
    )
    .with_microphone(Arc::new(DeviceMicrophone))
    .with_playback(Arc::new(DevicePlayback));
    let registry = Arc::new(SessionRegistry::new());
    let provider = VoiceProvider::mount(coordinator, registry.clone());

    let mut status_rx = provider.coordinator().subscribe_status();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let snapshot = *status_rx.borrow_and_update();
            eprintln!("[status] {}", snapshot.status);
        }
    });

    let mut messages_rx = provider.coordinator().subscribe_messages();
    tokio::spawn(async move {
        loop {
            match messages_rx.recv().await {
                Ok(message) => println!(
                    "[{}] {}",
                    message.participant.as_deref().unwrap_or("server"),
                    message.payload
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "inbound message printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let session = registry
        .active()
        .expect("voice provider registers its session on mount");

    let session_config = session_config_from_env();
    tracing::info!(session_id = %session_config.session_id, "starting voice session");
    if let Err(e) = session.start(session_config).await {
        tracing::error!(error = %e, "could not start voice session");
        provider.unmount().await;
        std::process::exit(1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read stdin");
                        break;
                    }
                };
                let result = match Command::parse(&line) {
                    Command::Text(text) => session.send_text(&text).await,
                    Command::Context(context) => session.send_contextual_update(&context).await,
                    Command::Quit => break,
                    Command::Empty => Ok(()),
                };
                if let Err(e) = result {
                    eprintln!("[error] {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }

    if let Err(e) = session.end().await {
        tracing::warn!(error = %e, "voice session did not end cleanly");
    }
    provider.unmount().await;
    tracing::info!("parley shut down");
}
