use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::{AudioCommand, SampleId, ScheduledTrigger};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;

const MAX_VOICES: usize = 32; // oldest voice is stolen past this
const MAX_PENDING: usize = 256; // triggers waiting for their start frame

/// Runs on the audio thread. Owns the registered buffers, the triggers not yet
/// due and the playing voices. `frames_rendered` is the audio clock.
pub struct Engine {
    samples: HashMap<SampleId, Arc<SampleBuffer>>,
    pending: Vec<ScheduledTrigger>,
    voices: Vec<Voice>,
    frames_rendered: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(frames_rendered: Arc<AtomicU64>) -> Self {
        Self {
            samples: HashMap::new(),
            pending: Vec::with_capacity(MAX_PENDING),
            voices: Vec::with_capacity(MAX_VOICES),
            frames_rendered,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, Arc::new(buffer));
            }
            AudioCommand::ForgetSample(id) => {
                self.samples.remove(&id);
                self.pending.retain(|t| t.sample_id != id);
            }
            AudioCommand::Trigger(t) => {
                if self.pending.len() < MAX_PENDING {
                    self.pending.push(t);
                }
            }
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Render one block, starting every trigger whose start frame falls inside
    /// it at its exact offset. Triggers that arrive late start at offset 0.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::SILENCE);
        let block_start = self.frames_rendered.load(Ordering::Acquire);
        let block_end = block_start + out.len() as u64;

        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].start_frame < block_end {
                let t = self.pending.swap_remove(i);
                let offset = t.start_frame.saturating_sub(block_start) as usize;
                self.start_voice(&t, offset);
            } else {
                i += 1;
            }
        }

        for voice in &mut self.voices {
            voice.render_into(out);
        }
        self.voices.retain(Voice::is_active);

        self.frames_rendered.fetch_add(out.len() as u64, Ordering::Release);
    }

    fn start_voice(&mut self, t: &ScheduledTrigger, offset: usize) {
        let Some(buffer) = self.samples.get(&t.sample_id) else {
            return; // unregistered sample: silently nothing
        };
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(Voice::new(Arc::clone(buffer), t.gain, offset));
    }
}
