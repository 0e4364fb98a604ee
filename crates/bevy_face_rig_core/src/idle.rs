use std::time::Duration;

use bevy::{math::Vec2, reflect::Reflect};
use rand::Rng;

use crate::{
    config::{
        AttentionConfig, BlinkConfig, BreathingConfig, IdleHeadConfig, LimitsConfig, seconds,
    },
    signals::PointerState,
};

/// Head orientation target, in radians. Yaw turns left/right, pitch nods up/down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct HeadTarget {
    pub yaw: f32,
    pub pitch: f32,
}

impl HeadTarget {
    pub fn clamped(self, limits: &LimitsConfig) -> Self {
        Self {
            yaw: self.yaw.clamp(-limits.max_head_yaw, limits.max_head_yaw),
            pitch: self.pitch.clamp(-limits.max_head_pitch, limits.max_head_pitch),
        }
    }
}

/// Blink timing. The eyes are shut during `[next_blink, next_blink + closed)`.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct BlinkSchedule {
    pub next_blink: Duration,
}

impl BlinkSchedule {
    pub fn first(now: Duration, config: &BlinkConfig, rng: &mut impl Rng) -> Self {
        Self {
            next_blink: now + config.first_delay.sample(rng),
        }
    }

    /// Blink weight at `now`, either `0.` or `1.`.
    ///
    /// Once the closed window has passed, the next blink is scheduled relative to the start
    /// of the one that just ended. If the host stalled past that start the schedule restarts
    /// from `now`, so a blink is never entered part way through its window.
    pub fn sample(&mut self, now: Duration, config: &BlinkConfig, rng: &mut impl Rng) -> f32 {
        if now < self.next_blink {
            return 0.;
        }
        if now < self.next_blink + config.closed() {
            return 1.;
        }

        self.next_blink += config.interval.sample(rng);
        if self.next_blink <= now {
            self.next_blink = now + config.interval.sample(rng);
        }
        0.
    }
}

/// Wandering glances used when nobody is interacting with the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct IdleHeadSchedule {
    pub next_turn: Duration,
}

impl IdleHeadSchedule {
    pub fn first(now: Duration, config: &IdleHeadConfig) -> Self {
        Self {
            next_turn: now + seconds(config.first_delay_secs),
        }
    }

    /// Returns a fresh glance target if the current one has been held long enough.
    pub fn poll(
        &mut self,
        now: Duration,
        config: &IdleHeadConfig,
        rng: &mut impl Rng,
    ) -> Option<HeadTarget> {
        if now <= self.next_turn {
            return None;
        }
        let target = HeadTarget {
            yaw: (rng.random::<f32>() - 0.5) * config.yaw_spread,
            pitch: (rng.random::<f32>() - 0.5) * config.pitch_spread,
        };
        self.next_turn = now + config.interval.sample(rng);
        Some(target)
    }
}

/// Head target that looks toward the pointer.
///
/// Pointer `+x` (right) turns the head right, pointer `+y` (down) tilts it down.
pub fn attention_target(
    pointer: Vec2,
    attention: &AttentionConfig,
    limits: &LimitsConfig,
) -> HeadTarget {
    HeadTarget {
        yaw: pointer.x * attention.yaw_scale,
        pitch: -pointer.y * attention.pitch_scale,
    }
    .clamped(limits)
}

/// Picks the idle-mode head target for this frame.
///
/// Tracks the pointer while it is attending, otherwise keeps `current` until the idle
/// schedule asks for a new glance.
#[allow(clippy::too_many_arguments)]
pub fn idle_head_target(
    current: HeadTarget,
    now: Duration,
    pointer: &PointerState,
    schedule: &mut IdleHeadSchedule,
    attention: &AttentionConfig,
    idle: &IdleHeadConfig,
    limits: &LimitsConfig,
    rng: &mut impl Rng,
) -> HeadTarget {
    if pointer.is_attending(now, attention.window()) {
        attention_target(pointer.position, attention, limits)
    } else {
        schedule
            .poll(now, idle, rng)
            .map(|target| target.clamped(limits))
            .unwrap_or(current)
    }
}

/// Body motion from breathing, sampled at time `t` in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct BodySway {
    /// Vertical offset of the model root.
    pub bob: f32,
    pub chest_pitch: f32,
    pub shoulder_left_roll: f32,
    pub shoulder_right_roll: f32,
}

impl BodySway {
    pub fn sample(t: f32, config: &BreathingConfig) -> Self {
        let shoulders = config.shoulders.sample(t);
        Self {
            bob: config.bob.sample(t),
            chest_pitch: config.chest.sample(t),
            shoulder_left_roll: shoulders,
            shoulder_right_roll: -shoulders,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn blink_window_is_exactly_130ms_and_binary() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut schedule = BlinkSchedule {
            next_blink: Duration::from_secs(1),
        };

        let mut closed = Vec::new();
        for ms in 0..1500u64 {
            let weight = schedule.sample(MS * ms as u32, &config, &mut rng);
            assert!(weight == 0. || weight == 1.);
            if weight == 1. {
                closed.push(ms);
            }
        }
        assert_eq!(closed.len(), 130);
        assert_eq!(closed.first(), Some(&1000));
        assert_eq!(closed.last(), Some(&1129));
    }

    #[test]
    fn blink_starts_are_2_to_4_seconds_apart() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut schedule = BlinkSchedule::first(Duration::ZERO, &config, &mut rng);

        let mut starts = Vec::new();
        let mut was_closed = false;
        // Variable frame pacing: alternate 7ms and 16ms frames.
        let mut now = Duration::ZERO;
        let mut frame = 0u32;
        while now < Duration::from_secs(120) {
            let closed = schedule.sample(now, &config, &mut rng) == 1.;
            if closed && !was_closed {
                starts.push(schedule.next_blink);
            }
            was_closed = closed;
            frame += 1;
            now += if frame % 2 == 0 { MS * 7 } else { MS * 16 };
        }

        assert!(starts.len() > 25);
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(2), "gap {gap:?}");
            assert!(gap < Duration::from_secs(4), "gap {gap:?}");
        }
    }

    #[test]
    fn blink_reschedules_from_now_after_a_stall() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut schedule = BlinkSchedule {
            next_blink: Duration::from_secs(1),
        };
        let now = Duration::from_secs(60);
        assert_eq!(schedule.sample(now, &config, &mut rng), 0.);
        assert!(schedule.next_blink >= now + Duration::from_secs(2));
        assert!(schedule.next_blink < now + Duration::from_secs(4));
    }

    #[test]
    fn late_frame_just_past_the_next_start_waits_for_a_full_blink() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut schedule = BlinkSchedule {
            next_blink: Duration::from_secs(1),
        };
        assert_eq!(schedule.sample(Duration::from_secs(1), &config, &mut rng), 1.);

        // The frame after the blink lands 20ms into where the next blink would have started.
        let interval = config.interval.sample(&mut rng.clone());
        let late = Duration::from_secs(1) + interval + MS * 20;
        assert_eq!(schedule.sample(late, &config, &mut rng), 0.);
        assert!(schedule.next_blink >= late + Duration::from_secs(2));

        let mut closed = Vec::new();
        for ms in 0..5000u32 {
            if schedule.sample(late + MS * ms, &config, &mut rng) == 1. {
                closed.push(ms);
            } else if !closed.is_empty() {
                break;
            }
        }
        assert_eq!(closed.len(), 130);
        assert_eq!(closed[129] - closed[0], 129);
    }

    #[test]
    fn attention_target_is_clamped_for_any_pointer() {
        let attention = AttentionConfig::default();
        let limits = LimitsConfig::default();
        for (x, y) in [
            (0., 0.),
            (1., 1.),
            (-1., -1.),
            (3., -7.),
            (-250., 40.),
            (f32::MAX, f32::MIN),
        ] {
            let target = attention_target(Vec2::new(x, y), &attention, &limits);
            assert!((-0.35..=0.35).contains(&target.yaw), "{target:?}");
            assert!((-0.2..=0.2).contains(&target.pitch), "{target:?}");
        }
        let target = attention_target(Vec2::new(0.5, 0.5), &attention, &limits);
        assert!((target.yaw - 0.175).abs() < 1e-6);
        assert!((target.pitch + 0.1).abs() < 1e-6);
    }

    #[test]
    fn idle_glances_follow_their_schedule() {
        let idle = IdleHeadConfig::default();
        let attention = AttentionConfig::default();
        let limits = LimitsConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut schedule = IdleHeadSchedule::first(Duration::ZERO, &idle);
        let pointer = PointerState::default();
        let start = HeadTarget::default();

        let held = idle_head_target(
            start,
            Duration::from_secs(3),
            &pointer,
            &mut schedule,
            &attention,
            &idle,
            &limits,
            &mut rng,
        );
        assert_eq!(held, start);

        let now = Duration::from_secs(4);
        let glance = idle_head_target(
            start,
            now,
            &pointer,
            &mut schedule,
            &attention,
            &idle,
            &limits,
            &mut rng,
        );
        assert!(glance.yaw.abs() <= 0.175);
        assert!(glance.pitch.abs() <= 0.06);
        assert!(schedule.next_turn >= now + Duration::from_secs(2));
        assert!(schedule.next_turn < now + Duration::from_secs(6));
    }

    #[test]
    fn attending_pointer_overrides_idle_glances() {
        let idle = IdleHeadConfig::default();
        let attention = AttentionConfig::default();
        let limits = LimitsConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut schedule = IdleHeadSchedule::first(Duration::ZERO, &idle);
        let mut pointer = PointerState::default();
        pointer.report(Vec2::new(-1., 0.), true, Duration::from_secs(10));

        let target = idle_head_target(
            HeadTarget::default(),
            Duration::from_secs(11),
            &pointer,
            &mut schedule,
            &attention,
            &idle,
            &limits,
            &mut rng,
        );
        assert_eq!(target.yaw, -0.35);
        // The idle clock was not consumed.
        assert_eq!(schedule.next_turn, Duration::from_millis(3500));
    }

    #[test]
    fn shoulders_sway_in_opposite_phase() {
        let config = BreathingConfig::default();
        for step in 0..50 {
            let sway = BodySway::sample(step as f32 * 0.13, &config);
            assert_eq!(sway.shoulder_left_roll, -sway.shoulder_right_roll);
            assert!(sway.bob.abs() <= 0.015);
            assert!(sway.chest_pitch.abs() <= 0.04);
        }
    }
}
