use std::sync::Arc;

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;

/// One playing sample. One-shot: plays from the top at a fixed gain until the
/// buffer runs out.
#[derive(Clone, Debug)]
pub struct Voice {
    buffer: Arc<SampleBuffer>,
    pos: usize,
    gain: f32,
    delay: usize, // frames of silence left before the first sample, may span blocks
    active: bool,
}

impl Voice {
    pub fn new(buffer: Arc<SampleBuffer>, gain: f32, delay: usize) -> Self {
        let active = !buffer.is_empty();
        Self {
            buffer,
            pos: 0,
            gain,
            delay,
            active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mix this voice into `out`.
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        let skip = self.delay.min(out.len());
        self.delay -= skip;

        let remaining = &self.buffer.data[self.pos..];
        let n = remaining.len().min(out.len() - skip);
        for (dst, src) in out[skip..skip + n].iter_mut().zip(remaining) {
            dst.left += src.left * self.gain;
            dst.right += src.right * self.gain;
        }
        self.pos += n;
        if self.pos >= self.buffer.len() {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(len: usize) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::from_frames(vec![StereoFrame::mono(1.0); len]))
    }

    #[test]
    fn delay_offsets_the_start() {
        let mut v = Voice::new(ones(4), 0.5, 2);
        let mut out = [StereoFrame::SILENCE; 4];
        v.render_into(&mut out);
        assert_eq!(out[0], StereoFrame::SILENCE);
        assert_eq!(out[1], StereoFrame::SILENCE);
        assert_eq!(out[2], StereoFrame::mono(0.5));
        assert_eq!(out[3], StereoFrame::mono(0.5));
        assert!(v.is_active());

        let mut out = [StereoFrame::SILENCE; 4];
        v.render_into(&mut out);
        assert_eq!(out[1], StereoFrame::mono(0.5));
        assert_eq!(out[2], StereoFrame::SILENCE);
        assert!(!v.is_active());
    }

    #[test]
    fn delay_longer_than_block_carries_over() {
        let mut v = Voice::new(ones(2), 1.0, 6);
        let mut out = [StereoFrame::SILENCE; 4];
        v.render_into(&mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::SILENCE));
        let mut out = [StereoFrame::SILENCE; 4];
        v.render_into(&mut out);
        assert_eq!(out[2], StereoFrame::mono(1.0));
        assert_eq!(out[3], StereoFrame::mono(1.0));
        assert!(!v.is_active());
    }

    #[test]
    fn empty_buffer_is_inert() {
        let v = Voice::new(ones(0), 1.0, 0);
        assert!(!v.is_active());
    }
}
