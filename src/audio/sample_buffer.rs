use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
}

impl SampleBuffer {
    pub fn from_frames(data: Vec<StereoFrame>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode a WAV file to stereo frames at `target_rate`.
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let frames = interleaved_to_stereo(&samples, spec.channels as usize);
        let frames = resample_linear(&frames, spec.sample_rate, target_rate);
        Ok(Self { data: frames })
    }
}

// mono is duplicated, anything past two channels is ignored
fn interleaved_to_stereo(samples: &[f32], channels: usize) -> Vec<StereoFrame> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().copied().map(StereoFrame::mono).collect(),
        n => samples
            .chunks_exact(n)
            .map(|c| StereoFrame { left: c[0], right: c[1] })
            .collect(),
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.len() - 1;

    (0..out_len)
        .map(|i| {
            let src = i as f64 / ratio;
            let idx = src.floor() as usize;
            if idx >= last {
                frames[last]
            } else {
                frames[idx].lerp(frames[idx + 1], (src - idx as f64) as f32)
            }
        })
        .collect()
}
