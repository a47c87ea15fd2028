// One stereo frame, the unit the engine mixes in
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub const SILENCE: StereoFrame = StereoFrame { left: 0.0, right: 0.0 };

    pub fn mono(x: f32) -> Self {
        Self { left: x, right: x }
    }

    pub fn lerp(self, other: StereoFrame, t: f32) -> Self {
        Self {
            left: self.left * (1.0 - t) + other.left * t,
            right: self.right * (1.0 - t) + other.right * t,
        }
    }
}
