use thiserror::Error;

/// Possible errors produced while loading or validating a [`FaceRigConfig`].
///
/// [`FaceRigConfig`]: crate::config::FaceRigConfig
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid joint pattern for {role}: {source}")]
    JointPattern {
        role: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("{field} must be in {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
    #[error("{field} has min {min:?} greater than max {max:?}")]
    InvertedInterval {
        field: &'static str,
        min: std::time::Duration,
        max: std::time::Duration,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
