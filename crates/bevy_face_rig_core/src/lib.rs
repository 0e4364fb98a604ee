pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod framing;
pub mod idle;
pub mod rig;
pub mod roles;
pub mod selection;
pub mod signals;
pub mod smoothing;
pub mod state;
pub mod talk;

pub mod prelude {
    pub use crate::catalog::{AvatarCatalog, AvatarEntry, Gender};
    pub use crate::config::FaceRigConfig;
    pub use crate::engine::{FaceRigEngine, FramePose, RigSink, RootPose};
    pub use crate::errors::{CatalogError, ConfigError};
    pub use crate::framing::{CameraShot, FaceFraming};
    pub use crate::rig::{RigNode, RigTree};
    pub use crate::roles::{ChannelHandle, ChannelRole, JointHandle, JointRole, RoleMap};
    pub use crate::selection::{AvatarSelection, LoadOutcome, LoadTicket};
    pub use crate::signals::SpeechRate;
}
