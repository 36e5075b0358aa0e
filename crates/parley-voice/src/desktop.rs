//! Desktop audio devices through `cpal`.
//!
//! Requires the **`desktop-audio`** feature. [`DeviceMicrophone`] opens the
//! default input device when a session asks for microphone access and
//! streams it as mono PCM16 frames. [`DevicePlayback`] renders each attached
//! remote track on the default output device.
//!
//! `cpal` streams are not `Send`, so every stream lives on its own thread
//! and stops when the channel feeding or draining it closes.

use crate::config::AudioConfig;
use crate::error::VoiceError;
use crate::pcm::{downmix, resample};
use crate::room::{AudioPlayback, MicrophoneAccess, MicrophoneCapture, PcmFrame, RemoteAudioTrack};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Captured blocks queued towards the room before new ones are dropped.
const CAPTURE_FRAME_BUFFER: usize = 32;
/// Upper bound on queued playback audio, in milliseconds.
const PLAYBACK_MAX_QUEUE_MS: usize = 500;

/// Default system input device.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceMicrophone;

#[async_trait]
impl MicrophoneAccess for DeviceMicrophone {
    async fn request_access(&self, _audio: &AudioConfig) -> Result<MicrophoneCapture, VoiceError> {
        let runtime = Handle::current();
        let (frames_tx, frames) = mpsc::channel(CAPTURE_FRAME_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("parley-capture".to_string())
            .spawn(move || run_capture(runtime, frames_tx, ready_tx))
            .map_err(|e| denied(format!("failed to start capture thread: {}", e)))?;

        let sample_rate = ready_rx
            .await
            .map_err(|_| denied("capture thread exited before opening the device"))??;
        info!(sample_rate, "microphone capture started");

        Ok(MicrophoneCapture {
            sample_rate,
            num_channels: 1,
            frames,
        })
    }
}

fn denied(message: impl Into<String>) -> VoiceError {
    VoiceError::PermissionDenied(message.into())
}

fn run_capture(
    runtime: Handle,
    frames_tx: mpsc::Sender<PcmFrame>,
    ready: oneshot::Sender<Result<u32, VoiceError>>,
) {
    let (stream, sample_rate) = match open_input(frames_tx.clone()) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(sample_rate)).is_err() {
        return;
    }

    // Capture runs until the room stops reading frames.
    runtime.block_on(frames_tx.closed());
    drop(stream);
    debug!("microphone capture stopped");
}

fn open_input(frames_tx: mpsc::Sender<PcmFrame>) -> Result<(cpal::Stream, u32), VoiceError> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| denied("no audio input device available"))?;
    let supported = device
        .default_input_config()
        .map_err(|e| denied(format!("input device unusable: {}", e)))?;

    let sample_rate = supported.sample_rate().0;
    let channels = usize::from(supported.channels());
    let config = supported.config();
    let on_error = |e: cpal::StreamError| warn!(error = %e, "microphone stream error");

    let stream = match supported.sample_format() {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                forward_capture(&frames_tx, data, channels, sample_rate)
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                forward_capture(&frames_tx, data, channels, sample_rate)
            },
            on_error,
            None,
        ),
        other => {
            return Err(denied(format!("unsupported input sample format {:?}", other)));
        }
    }
    .map_err(|e| denied(format!("failed to open microphone: {}", e)))?;

    stream
        .play()
        .map_err(|e| denied(format!("failed to start microphone: {}", e)))?;
    Ok((stream, sample_rate))
}

fn forward_capture<T>(frames_tx: &mpsc::Sender<PcmFrame>, data: &[T], channels: usize, sample_rate: u32)
where
    T: Sample,
    i16: FromSample<T>,
{
    let interleaved: Vec<i16> = data.iter().map(|s| i16::from_sample(*s)).collect();
    let frame = PcmFrame {
        samples: downmix(&interleaved, channels),
        sample_rate,
        num_channels: 1,
    };
    // A full queue drops the block; the audio callback must not wait.
    let _ = frames_tx.try_send(frame);
}

/// Default system output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevicePlayback;

type PlaybackQueue = Arc<Mutex<VecDeque<i16>>>;

impl AudioPlayback for DevicePlayback {
    fn attach(&self, track: RemoteAudioTrack) {
        let RemoteAudioTrack {
            sid,
            participant,
            mut frames,
        } = track;
        let Ok(runtime) = Handle::try_current() else {
            warn!(%sid, "no async runtime, remote audio track not played");
            return;
        };

        let queue = PlaybackQueue::default();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let spawned = std::thread::Builder::new()
            .name(format!("parley-playback-{}", sid))
            .spawn({
                let queue = queue.clone();
                let runtime = runtime.clone();
                move || run_output(runtime, queue, ready_tx, stop_rx)
            });
        if let Err(e) = spawned {
            warn!(%sid, error = %e, "failed to start playback thread");
        }

        info!(%sid, %participant, "playing remote audio track");
        runtime.spawn(async move {
            let device_rate = match ready_rx.await {
                Ok(Ok(rate)) => Some(rate),
                Ok(Err(e)) => {
                    warn!(%sid, error = %e, "output device unavailable, discarding remote audio");
                    None
                }
                Err(_) => None,
            };

            while let Some(frame) = frames.recv().await {
                let Some(device_rate) = device_rate else {
                    continue;
                };
                let mono = downmix(&frame.samples, frame.num_channels as usize);
                let samples = resample(&mono, frame.sample_rate, device_rate);
                let limit = device_rate as usize * PLAYBACK_MAX_QUEUE_MS / 1000;
                let mut queued = queue.lock().unwrap_or_else(|e| e.into_inner());
                queued.extend(samples);
                let overflow = queued.len().saturating_sub(limit);
                queued.drain(..overflow);
            }

            let _ = stop_tx.send(());
            debug!(%sid, "remote audio track ended");
        });
    }
}

fn run_output(
    runtime: Handle,
    queue: PlaybackQueue,
    ready: oneshot::Sender<Result<u32, VoiceError>>,
    stop: oneshot::Receiver<()>,
) {
    let (stream, sample_rate) = match open_output(queue) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(sample_rate)).is_err() {
        return;
    }

    let _ = runtime.block_on(stop);
    drop(stream);
}

fn open_output(queue: PlaybackQueue) -> Result<(cpal::Stream, u32), VoiceError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| VoiceError::Connection("no audio output device available".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| VoiceError::Connection(format!("output device unusable: {}", e)))?;

    let sample_rate = supported.sample_rate().0;
    let channels = usize::from(supported.channels());
    let config = supported.config();
    let on_error = |e: cpal::StreamError| warn!(error = %e, "playback stream error");

    let stream = match supported.sample_format() {
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |out: &mut [i16], _: &cpal::OutputCallbackInfo| fill_output(out, channels, &queue),
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |out: &mut [f32], _: &cpal::OutputCallbackInfo| fill_output(out, channels, &queue),
            on_error,
            None,
        ),
        other => {
            return Err(VoiceError::Connection(format!(
                "unsupported output sample format {:?}",
                other
            )));
        }
    }
    .map_err(|e| VoiceError::Connection(format!("failed to open speaker: {}", e)))?;

    stream
        .play()
        .map_err(|e| VoiceError::Connection(format!("failed to start speaker: {}", e)))?;
    Ok((stream, sample_rate))
}

/// Writes queued mono samples to every output channel, silence when empty.
fn fill_output<T>(out: &mut [T], channels: usize, queue: &Mutex<VecDeque<i16>>)
where
    T: SizedSample + FromSample<i16>,
{
    let mut queued = queue.lock().unwrap_or_else(|e| e.into_inner());
    for frame in out.chunks_mut(channels.max(1)) {
        let value = T::from_sample(queued.pop_front().unwrap_or(0));
        frame.fill(value);
    }
}
