//! # Bevy Face Rig
//!
//! **Bevy Face Rig** brings a loaded humanoid avatar to life without any authored animation:
//! it blinks, glances around, follows the pointer, breathes, and moves its mouth, brows and
//! head while it "talks".
//!
//! ## How it works
//!
//! When an avatar scene finishes spawning, its hierarchy is walked once to build a
//! [`RoleMap`]: the morph targets that open the mouth, close the eyes, smile and raise the
//! brows, and the chest and shoulder joints. Names are matched against ordered candidate
//! tables covering ARKit, Oculus viseme and common hand-rigged conventions, so most avatars
//! work out of the box. Roles an avatar lacks are simply not driven.
//!
//! Every frame the [`FaceRig`] resource advances its animation state and writes the
//! resulting weights to [`MorphWeights`] and joint rotations to [`Transform`]s, on top of the
//! rest pose captured at load time.
//!
//! ## Driving the rig
//!
//! The rig only listens to messages:
//! - [`TalkRequest`] starts a speech turn (its length estimated from the text, or given
//!   explicitly) or stops it. Hook it to whatever speech synthesis you use.
//! - [`PointerMoved`] reports a normalized pointer position. While the pointer moves, the
//!   avatar looks at it.
//! - [`AvatarRequested`] switches to another avatar of the [`AvatarLibrary`]. Loads that
//!   finish after a newer request are thrown away.
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_face_rig::prelude::*;
//!
//! fn main() {
//!     let catalog = AvatarCatalog::load("assets/catalog.ron").unwrap();
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(FaceRigPlugin::default())
//!         .insert_resource(AvatarLibrary(catalog))
//!         .add_systems(Startup, |mut avatars: MessageWriter<AvatarRequested>| {
//!             avatars.write(AvatarRequested::new("anna"));
//!         })
//!         .run();
//! }
//! ```
//!
//! Tuning lives in [`FaceRigConfig`], loadable from a `*.facerig.ron` file. Every field has
//! a default, so `()` is a valid configuration.
//!
//! [`RoleMap`]: bevy_face_rig_core::roles::RoleMap
//! [`MorphWeights`]: bevy::mesh::morph::MorphWeights
//! [`Transform`]: bevy::transform::components::Transform
//! [`FaceRig`]: face_rig::FaceRig
//! [`TalkRequest`]: messages::TalkRequest
//! [`PointerMoved`]: messages::PointerMoved
//! [`AvatarRequested`]: messages::AvatarRequested
//! [`AvatarLibrary`]: loading::AvatarLibrary
//! [`FaceRigConfig`]: bevy_face_rig_core::config::FaceRigConfig

pub mod face_rig;
pub mod hierarchy;
pub mod loading;
pub mod messages;
pub mod plugin;

pub use bevy_face_rig_core as core;

pub mod prelude {
    pub use super::face_rig::{FaceRig, FaceRigTargets, RestPose};
    pub use super::hierarchy::RigHierarchy;
    pub use super::loading::{
        AvatarLibrary, AvatarLoadFinished, AvatarLoader, AvatarStatus, FaceRigModel,
    };
    pub use super::messages::{AvatarRequested, PointerMoved, TalkRequest};
    pub use super::plugin::{FaceRigPlugin, FaceRigSet};
    pub use bevy_face_rig_core::prelude::*;
}
