use std::time::Duration;

use bevy::{math::Vec2, reflect::Reflect};

use crate::config::{SpeechConfig, seconds};

/// Last known pointer position over the avatar view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct PointerState {
    /// The pointer is inside the avatar view.
    pub active: bool,
    /// Position normalized to `[-1, 1]` on both axes, `+y` pointing down.
    pub position: Vec2,
    /// When the pointer last moved.
    pub last_moved: Option<Duration>,
}

impl PointerState {
    /// Records a pointer report. Coordinates outside `[-1, 1]` are kept as is; consumers clamp.
    /// Reports with non-finite coordinates are dropped.
    pub fn report(&mut self, position: Vec2, active: bool, timestamp: Duration) {
        if !position.is_finite() {
            return;
        }
        self.active = active;
        self.position = position;
        if active {
            self.last_moved = Some(timestamp);
        }
    }

    /// The avatar should look at the pointer: it is inside the view and moved recently.
    pub fn is_attending(&self, now: Duration, window: Duration) -> bool {
        self.active
            && self
                .last_moved
                .is_some_and(|moved| now.saturating_sub(moved) < window)
    }
}

/// State of the current speech turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct TalkSignal {
    pub active: bool,
    pub started_at: Duration,
    /// Estimated length of the turn, never zero while active.
    pub duration: Duration,
}

impl TalkSignal {
    pub fn begin(started_at: Duration, duration: Duration) -> Self {
        Self {
            active: true,
            started_at,
            duration: duration.max(Duration::from_millis(1)),
        }
    }

    /// Fraction of the turn elapsed at `now`, in `[0, 1]`.
    pub fn progress(&self, now: Duration) -> f32 {
        let elapsed = now.saturating_sub(self.started_at).as_secs_f32();
        (elapsed / self.duration.as_secs_f32()).clamp(0., 1.)
    }
}

/// Estimates how long a line of text takes to say.
///
/// Speech synthesis backends rarely report the real duration up front, so the talk envelope
/// is driven by a length-based estimate.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct SpeechRate {
    pub chars_per_second: f32,
    pub min_duration: Duration,
}

impl Default for SpeechRate {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for SpeechRate {
    fn from(value: &SpeechConfig) -> Self {
        Self {
            chars_per_second: value.chars_per_second,
            min_duration: seconds(value.min_duration_secs),
        }
    }
}

impl SpeechRate {
    pub fn estimate(&self, text: &str) -> Duration {
        let chars = text.chars().count() as f32;
        Duration::from_secs_f32(chars / self.chars_per_second).max(self.min_duration)
    }
}
