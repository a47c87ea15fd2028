use crate::shared::TrackId;

use crate::audio::SampleBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

/// Whatever turns triggers into sound. `time` is an instant on the same clock
/// the scheduler reads; a track with nothing loaded plays nothing.
pub trait SoundDevice: Send + Sync {
    fn play_sound(&self, track: TrackId, time: f64, gain: f32);
}

#[derive(Clone, Debug)]
pub struct ScheduledTrigger {
    pub sample_id: SampleId,
    pub start_frame: u64, // absolute, counted from the first rendered frame
    pub gain: f32,
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // Decoding happens off the audio thread; the engine only receives
    // ready buffers and refers to them by id afterwards.
    RegisterSample { id: SampleId, buffer: SampleBuffer },
    ForgetSample(SampleId),
    Trigger(ScheduledTrigger),
}
