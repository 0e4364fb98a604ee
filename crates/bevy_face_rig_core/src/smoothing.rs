use std::time::Duration;

use bevy::reflect::Reflect;

use crate::config::{FactorPair, SmoothingConfig};

/// Interpolation amount for a frame of length `dt`.
///
/// `factor` is the per-frame amount at `reference_fps`; the result is
/// `1 - (1 - factor)^(dt * reference_fps)`.
pub fn frame_alpha(factor: f32, dt: Duration, reference_fps: f32) -> f32 {
    let frames = dt.as_secs_f32() * reference_fps;
    if frames <= 0. {
        return 0.;
    }
    (1. - (1. - factor.clamp(0., 1.)).powf(frames)).clamp(0., 1.)
}

pub fn lerp_toward(current: f32, target: f32, alpha: f32) -> f32 {
    current + (target - current) * alpha
}

/// Interpolation amounts of every smoothed group for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct StepAlphas {
    pub head: f32,
    pub mouth: f32,
    pub smile: f32,
    pub brow: f32,
}

impl StepAlphas {
    pub fn new(config: &SmoothingConfig, dt: Duration, talking: bool) -> Self {
        let alpha = |pair: FactorPair| frame_alpha(pair.get(talking), dt, config.reference_fps);
        Self {
            head: alpha(config.head),
            mouth: alpha(config.mouth),
            smile: alpha(config.smile),
            brow: alpha(config.brow),
        }
    }
}
