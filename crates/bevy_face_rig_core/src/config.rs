use std::{path::Path, time::Duration};

use bevy::{prelude::Resource, reflect::Reflect};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConfigError, ConfigResult},
    roles::{JointPatterns, JointPatternsSerial},
};

/// Inclusive-exclusive range of seconds used for pseudo-random scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct SecondsRange {
    pub min: f32,
    pub max: f32,
}

impl SecondsRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draws a duration in `[min, max)`. A degenerate range always yields `min`.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        if self.max > self.min {
            let secs = rng.random_range(self.min..self.max);
            Duration::from_micros((secs.max(0.) as f64 * 1e6).floor() as u64)
        } else {
            seconds(self.min)
        }
    }

    fn validate(&self, field: &'static str) -> ConfigResult<()> {
        if self.min < 0. {
            return Err(ConfigError::OutOfRange {
                field,
                expected: "[0, inf)",
                value: self.min,
            });
        }
        if self.min > self.max {
            return Err(ConfigError::InvertedInterval {
                field,
                min: seconds(self.min),
                max: seconds(self.max),
            });
        }
        Ok(())
    }
}

/// A sinusoid `amplitude * sin(frequency * t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct Wave {
    pub amplitude: f32,
    /// Angular frequency, in radians per second.
    pub frequency: f32,
    #[serde(default)]
    pub phase: f32,
}

impl Wave {
    pub const fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
            phase: 0.,
        }
    }

    pub const fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn sample(&self, t: f32) -> f32 {
        self.amplitude * (self.frequency * t + self.phase).sin()
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// How long the eyes stay shut.
    pub closed_secs: f32,
    /// Delay between the start of one blink and the start of the next.
    pub interval: SecondsRange,
    /// Delay before the first blink after the rig is created.
    pub first_delay: SecondsRange,
}

impl BlinkConfig {
    pub fn closed(&self) -> Duration {
        seconds(self.closed_secs)
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            closed_secs: 0.13,
            interval: SecondsRange::new(2.0, 4.0),
            first_delay: SecondsRange::new(2.0, 3.2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// The pointer counts as active this long after its last movement.
    pub active_window_secs: f32,
    /// Normalized pointer x is multiplied by this to get the head yaw.
    pub yaw_scale: f32,
    /// Normalized pointer y is multiplied by this (and negated) to get the head pitch.
    pub pitch_scale: f32,
}

impl AttentionConfig {
    pub fn window(&self) -> Duration {
        seconds(self.active_window_secs)
    }
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            active_window_secs: 2.5,
            yaw_scale: 0.35,
            pitch_scale: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleHeadConfig {
    /// Idle yaw targets are drawn from `[-yaw_spread / 2, yaw_spread / 2)`.
    pub yaw_spread: f32,
    /// Idle pitch targets are drawn from `[-pitch_spread / 2, pitch_spread / 2)`.
    pub pitch_spread: f32,
    pub interval: SecondsRange,
    pub first_delay_secs: f32,
}

impl Default for IdleHeadConfig {
    fn default() -> Self {
        Self {
            yaw_spread: 0.35,
            pitch_spread: 0.12,
            interval: SecondsRange::new(2.0, 6.0),
            first_delay_secs: 3.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Vertical offset of the model root.
    pub bob: Wave,
    /// Pitch of the chest joint.
    pub chest: Wave,
    /// Roll of the left shoulder; the right shoulder uses the negated value.
    pub shoulders: Wave,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            bob: Wave::new(0.015, 1.4),
            chest: Wave::new(0.04, 1.5),
            shoulders: Wave::new(0.03, 0.8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkConfig {
    /// Progress before which the mouth uses `quiet_base`.
    pub ramp_in_end: f32,
    /// Progress after which the mouth uses `quiet_base`.
    pub ramp_out_start: f32,
    pub quiet_base: f32,
    pub speaking_base: f32,
    /// Maximum weight the texture adds on top of the base.
    pub texture_gain: f32,
    /// Texture components. Each contributes `weight * (0.5 * sin(..) + 0.5)`.
    pub texture: [TextureWave; 2],
    pub head_yaw: Wave,
    pub head_pitch: Wave,
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct TextureWave {
    pub weight: f32,
    pub wave: Wave,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            ramp_in_end: 0.07,
            ramp_out_start: 0.97,
            quiet_base: 0.1,
            speaking_base: 0.4,
            texture_gain: 0.55,
            texture: [
                TextureWave {
                    weight: 0.6,
                    wave: Wave::new(1.0, 8.2),
                },
                TextureWave {
                    weight: 0.4,
                    wave: Wave::new(1.0, 11.7).with_phase(1.5),
                },
            ],
            head_yaw: Wave::new(0.08, 1.2),
            head_pitch: Wave::new(0.03, 1.6),
        }
    }
}

/// Target weights of one expression mode.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct ExpressionTargets {
    pub smile: f32,
    pub brow: f32,
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    pub idle: ExpressionTargets,
    pub speaking: ExpressionTargets,
    /// Weights the rig starts with.
    pub initial: ExpressionTargets,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            idle: ExpressionTargets {
                smile: 0.25,
                brow: 0.02,
            },
            speaking: ExpressionTargets {
                smile: 0.5,
                brow: 0.25,
            },
            initial: ExpressionTargets {
                smile: 0.3,
                brow: 0.,
            },
        }
    }
}

/// Per-frame interpolation factors of one channel group, talking and idle.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct FactorPair {
    pub idle: f32,
    pub talking: f32,
}

impl FactorPair {
    pub const fn uniform(factor: f32) -> Self {
        Self {
            idle: factor,
            talking: factor,
        }
    }

    pub fn get(&self, talking: bool) -> f32 {
        if talking { self.talking } else { self.idle }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Frame rate the factors are expressed against.
    pub reference_fps: f32,
    pub head: FactorPair,
    pub mouth: FactorPair,
    pub smile: FactorPair,
    pub brow: FactorPair,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            reference_fps: 60.,
            head: FactorPair::uniform(0.08),
            mouth: FactorPair {
                idle: 0.18,
                talking: 0.35,
            },
            smile: FactorPair {
                idle: 0.05,
                talking: 0.15,
            },
            brow: FactorPair {
                idle: 0.05,
                talking: 0.18,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest rotation, in radians, written to any joint.
    pub max_joint_rotation: f32,
    pub max_head_yaw: f32,
    pub max_head_pitch: f32,
    /// Longer frame gaps are treated as this long when smoothing.
    pub max_frame_delta_secs: f32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_joint_rotation: 0.2,
            max_head_yaw: 0.35,
            max_head_pitch: 0.2,
            max_frame_delta_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub chars_per_second: f32,
    pub min_duration_secs: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            chars_per_second: 14.,
            min_duration_secs: 1.5,
        }
    }
}

/// Full configuration of the face rig.
#[derive(Debug, Clone, Default, PartialEq, Resource, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceRigConfig {
    pub blink: BlinkConfig,
    pub attention: AttentionConfig,
    pub idle_head: IdleHeadConfig,
    pub breathing: BreathingConfig,
    pub talk: TalkConfig,
    pub expression: ExpressionConfig,
    pub smoothing: SmoothingConfig,
    pub limits: LimitsConfig,
    pub speech: SpeechConfig,
    pub joints: JointPatternsSerial,
    /// Seed for the blink and idle-glance schedules. Unseeded rigs draw from OS entropy.
    pub seed: Option<u64>,
}

impl FaceRigConfig {
    pub fn from_ron_str(source: &str) -> ConfigResult<Self> {
        let config: Self = ron::de::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    /// Compiles the joint name patterns.
    pub fn joint_patterns(&self) -> ConfigResult<JointPatterns> {
        JointPatterns::try_from(&self.joints)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        unit_interval("smoothing.head.idle", self.smoothing.head.idle)?;
        unit_interval("smoothing.head.talking", self.smoothing.head.talking)?;
        unit_interval("smoothing.mouth.idle", self.smoothing.mouth.idle)?;
        unit_interval("smoothing.mouth.talking", self.smoothing.mouth.talking)?;
        unit_interval("smoothing.smile.idle", self.smoothing.smile.idle)?;
        unit_interval("smoothing.smile.talking", self.smoothing.smile.talking)?;
        unit_interval("smoothing.brow.idle", self.smoothing.brow.idle)?;
        unit_interval("smoothing.brow.talking", self.smoothing.brow.talking)?;
        positive("smoothing.reference_fps", self.smoothing.reference_fps)?;

        positive("blink.closed_secs", self.blink.closed_secs)?;
        self.blink.interval.validate("blink.interval")?;
        self.blink.first_delay.validate("blink.first_delay")?;
        if self.blink.interval.min <= self.blink.closed_secs {
            return Err(ConfigError::OutOfRange {
                field: "blink.interval.min",
                expected: "(blink.closed_secs, inf)",
                value: self.blink.interval.min,
            });
        }

        positive("attention.active_window_secs", self.attention.active_window_secs)?;
        self.idle_head.interval.validate("idle_head.interval")?;

        for (field, value) in [
            ("talk.ramp_in_end", self.talk.ramp_in_end),
            ("talk.ramp_out_start", self.talk.ramp_out_start),
            ("talk.quiet_base", self.talk.quiet_base),
            ("talk.speaking_base", self.talk.speaking_base),
            ("expression.idle.smile", self.expression.idle.smile),
            ("expression.idle.brow", self.expression.idle.brow),
            ("expression.speaking.smile", self.expression.speaking.smile),
            ("expression.speaking.brow", self.expression.speaking.brow),
            ("expression.initial.smile", self.expression.initial.smile),
            ("expression.initial.brow", self.expression.initial.brow),
        ] {
            closed_unit_interval(field, value)?;
        }

        positive("limits.max_joint_rotation", self.limits.max_joint_rotation)?;
        positive("limits.max_head_yaw", self.limits.max_head_yaw)?;
        positive("limits.max_head_pitch", self.limits.max_head_pitch)?;
        positive("limits.max_frame_delta_secs", self.limits.max_frame_delta_secs)?;

        positive("speech.chars_per_second", self.speech.chars_per_second)?;
        if self.speech.min_duration_secs < 0. {
            return Err(ConfigError::OutOfRange {
                field: "speech.min_duration_secs",
                expected: "[0, inf)",
                value: self.speech.min_duration_secs,
            });
        }

        self.joint_patterns()?;
        Ok(())
    }

    pub fn max_frame_delta(&self) -> Duration {
        seconds(self.limits.max_frame_delta_secs)
    }
}

/// Converts a configured span to a [`Duration`], rounded to the microsecond so that values
/// like `0.13` map to exactly 130ms. Negative spans become zero.
pub fn seconds(secs: f32) -> Duration {
    Duration::from_micros((secs.max(0.) as f64 * 1e6).round() as u64)
}

fn unit_interval(field: &'static str, value: f32) -> ConfigResult<()> {
    if value > 0. && value <= 1. {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "(0, 1]",
            value,
        })
    }
}

fn closed_unit_interval(field: &'static str, value: f32) -> ConfigResult<()> {
    if (0. ..=1.).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "[0, 1]",
            value,
        })
    }
}

fn positive(field: &'static str, value: f32) -> ConfigResult<()> {
    if value > 0. {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "(0, inf)",
            value,
        })
    }
}
