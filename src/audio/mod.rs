use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::{AudioCommand, SampleId, ScheduledTrigger, SoundDevice};
use crate::loader::sample_loader::Kit;
use crate::scheduler::AudioClock;
use crate::shared::{NUM_TRACKS, TrackId};

mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub use engine::Engine;
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;

/// Keeps the output stream alive. Not shared across threads; hand out
/// `device()` instead.
pub struct AudioHandle {
    device: Arc<SamplerDevice>,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn device(&self) -> Arc<SamplerDevice> {
        Arc::clone(&self.device)
    }
}

/// The thread-safe face of the output stream: a sound device whose clock is
/// the number of frames rendered so far.
pub struct SamplerDevice {
    tx: Sender<AudioCommand>,
    sample_rate: u32,
    frames_rendered: Arc<AtomicU64>,
    kit: RwLock<[Option<SampleId>; NUM_TRACKS]>,
    next_id: AtomicU64,
}

impl SamplerDevice {
    pub fn new(tx: Sender<AudioCommand>, sample_rate: u32, frames_rendered: Arc<AtomicU64>) -> Self {
        Self {
            tx,
            sample_rate,
            frames_rendered,
            kit: RwLock::new([None; NUM_TRACKS]),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            log::warn!(target: "audio", "command queue full, dropping command");
        }
    }

    /// Replace the loaded kit. Tracks the kit has no sample for go silent.
    pub fn install_kit(&self, kit: Kit) {
        let mut slots = [None; NUM_TRACKS];
        for (track, buffer) in kit.samples {
            let id = SampleId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.send(AudioCommand::RegisterSample { id, buffer });
            slots[track.index()] = Some(id);
        }
        let old = std::mem::replace(&mut *self.kit.write().unwrap_or_else(PoisonError::into_inner), slots);
        for id in old.into_iter().flatten() {
            self.send(AudioCommand::ForgetSample(id));
        }
        log::info!(target: "audio", "kit {:?} installed", kit.name);
    }

    pub fn loaded_tracks(&self) -> Vec<TrackId> {
        let slots = self.kit.read().unwrap_or_else(PoisonError::into_inner);
        TrackId::ALL
            .into_iter()
            .filter(|t| slots[t.index()].is_some())
            .collect()
    }
}

impl SoundDevice for SamplerDevice {
    fn play_sound(&self, track: TrackId, time: f64, gain: f32) {
        let Some(sample_id) = self.kit.read().unwrap_or_else(PoisonError::into_inner)[track.index()] else {
            return;
        };
        let start_frame = (time.max(0.0) * self.sample_rate as f64).round() as u64;
        self.send(AudioCommand::Trigger(ScheduledTrigger {
            sample_id,
            start_frame,
            gain,
        }));
    }
}

impl AudioClock for SamplerDevice {
    fn now(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    let frames_rendered = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let engine = Engine::new(Arc::clone(&frames_rendered));
            let stream = build_output_stream_f32(&device, &config.into(), rx, engine, channels)?;
            stream.play().context("failed to play output stream")?;
            log::info!(target: "audio", "output stream running at {sample_rate} Hz, {channels} channels");

            Ok(AudioHandle {
                device: Arc::new(SamplerDevice::new(tx, sample_rate, frames_rendered)),
                _output_stream: stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);
    let err_fn = |err: cpal::StreamError| log::error!(target: "audio", "output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            scratch.resize(n_frames, StereoFrame::SILENCE);
            engine.render_block(&mut scratch);

            for (out, frame) in data.chunks_exact_mut(channels.max(1)).zip(&scratch) {
                match out {
                    [mono] => *mono = 0.5 * (frame.left + frame.right),
                    [left, right, rest @ ..] => {
                        *left = frame.left;
                        *right = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
