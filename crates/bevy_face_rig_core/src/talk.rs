use std::time::Duration;

use bevy::reflect::Reflect;

use crate::{config::TalkConfig, idle::HeadTarget, signals::TalkSignal};

/// Where in the speech turn we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum TalkPhase {
    /// Just started; the mouth barely opens.
    RampIn,
    Speaking,
    /// About to end, or past the estimated duration; the mouth settles.
    RampOut,
}

impl TalkPhase {
    pub fn at(progress: f32, config: &TalkConfig) -> Self {
        if progress < config.ramp_in_end {
            Self::RampIn
        } else if progress > config.ramp_out_start {
            Self::RampOut
        } else {
            Self::Speaking
        }
    }
}

/// Talk-mode targets for one frame. Expression targets are constant and live in
/// [`ExpressionConfig`](crate::config::ExpressionConfig).
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct TalkTargets {
    pub phase: TalkPhase,
    pub mouth: f32,
    pub head: HeadTarget,
}

/// Bounded speech-like texture in `[0, sum of weights]`, a function of wall-clock time `t`.
pub fn mouth_texture(t: f32, config: &TalkConfig) -> f32 {
    config
        .texture
        .iter()
        .map(|component| component.weight * (0.5 * component.wave.sample(t) + 0.5))
        .sum()
}

/// Samples the talk envelope at `now`; `t` is `now` in seconds.
pub fn sample(signal: &TalkSignal, now: Duration, config: &TalkConfig) -> TalkTargets {
    let t = now.as_secs_f32();
    let phase = TalkPhase::at(signal.progress(now), config);
    let base = match phase {
        TalkPhase::RampIn | TalkPhase::RampOut => config.quiet_base,
        TalkPhase::Speaking => config.speaking_base,
    };
    TalkTargets {
        phase,
        mouth: (base + config.texture_gain * mouth_texture(t, config)).clamp(0., 1.),
        head: HeadTarget {
            yaw: config.head_yaw.sample(t),
            pitch: config.head_pitch.sample(t),
        },
    }
}
