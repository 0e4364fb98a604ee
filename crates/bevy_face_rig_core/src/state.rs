use std::time::Duration;

use bevy::reflect::Reflect;
use rand::Rng;

use crate::{
    config::FaceRigConfig,
    idle::{BlinkSchedule, HeadTarget, IdleHeadSchedule},
    signals::TalkSignal,
};

/// Everything the frame update carries from one tick to the next.
///
/// Owned by [`FaceRigEngine`](crate::engine::FaceRigEngine). A tick works on a copy and
/// replaces the whole value once every write of the frame has been issued.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct AnimationState {
    pub mouth: f32,
    pub smile: f32,
    pub brow: f32,
    /// Smoothed head orientation.
    pub head: HeadTarget,
    /// Orientation the head is easing toward.
    pub head_target: HeadTarget,
    pub talk: TalkSignal,
    pub blink: BlinkSchedule,
    pub idle_head: IdleHeadSchedule,
    pub last_tick: Option<Duration>,
}

impl AnimationState {
    pub fn new(now: Duration, config: &FaceRigConfig, rng: &mut impl Rng) -> Self {
        Self {
            mouth: 0.,
            smile: config.expression.initial.smile,
            brow: config.expression.initial.brow,
            head: HeadTarget::default(),
            head_target: HeadTarget::default(),
            talk: TalkSignal::default(),
            blink: BlinkSchedule::first(now, &config.blink, rng),
            idle_head: IdleHeadSchedule::first(now, &config.idle_head),
            last_tick: None,
        }
    }

    pub fn is_talking(&self) -> bool {
        self.talk.active
    }

    /// Time since the previous tick, capped at `max`. The first tick has no elapsed time.
    pub fn frame_delta(&self, now: Duration, max: Duration) -> Duration {
        self.last_tick
            .map_or(Duration::ZERO, |last| now.saturating_sub(last))
            .min(max)
    }
}
