use std::time::Duration;

use bevy::{
    app::{App, Plugin, Update},
    ecs::{
        intern::Interned,
        schedule::{IntoScheduleConfigs, ScheduleLabel, SystemSet},
    },
    log::prelude::*,
    transform::TransformSystems,
};
use bevy_face_rig_core::{
    config::FaceRigConfig,
    engine::{FramePose, RootPose},
    framing::{CameraShot, FaceFraming},
    signals::{PointerState, TalkSignal},
    state::AnimationState,
};

use crate::{
    face_rig::{FaceRig, RestPose, animate_face_rig, apply_face_rig_signals},
    loading::{
        AvatarLoader, AvatarStatus, FaceRigModel, finish_avatar_loads, poll_avatar_loads,
        request_avatars,
    },
    messages::{AvatarRequested, PointerMoved, TalkRequest},
};

/// Adds a procedural face rig to an app.
pub struct FaceRigPlugin {
    pub schedule: Interned<dyn ScheduleLabel>,
    pub config: FaceRigConfig,
}

impl Default for FaceRigPlugin {
    fn default() -> Self {
        Self {
            schedule: Update.intern(),
            config: FaceRigConfig::default(),
        }
    }
}

impl FaceRigPlugin {
    pub fn with_config(config: FaceRigConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum FaceRigSet {
    /// Talk and pointer messages are applied to the rig.
    Signals,
    /// Avatar requests are started and finished loads are bound.
    Loading,
    /// The rig writes the frame's weights and transforms.
    Animate,
}

impl Plugin for FaceRigPlugin {
    fn build(&self, app: &mut App) {
        self.register_types(app);

        let rig = FaceRig::new(self.config.clone(), Duration::ZERO).unwrap_or_else(|err| {
            error!("Invalid face rig config, falling back to defaults: {err}");
            FaceRig::new(FaceRigConfig::default(), Duration::ZERO)
                .expect("default face rig config is valid")
        });

        app.add_message::<TalkRequest>()
            .add_message::<PointerMoved>()
            .add_message::<AvatarRequested>()
            .insert_resource(rig)
            .init_resource::<AvatarLoader>()
            .init_resource::<AvatarStatus>();

        app.configure_sets(
            self.schedule,
            (
                FaceRigSet::Signals,
                FaceRigSet::Loading,
                FaceRigSet::Animate,
            )
                .chain()
                .before(TransformSystems::Propagate),
        );

        app.add_systems(
            self.schedule,
            (
                apply_face_rig_signals.in_set(FaceRigSet::Signals),
                (request_avatars, poll_avatar_loads, finish_avatar_loads)
                    .chain()
                    .in_set(FaceRigSet::Loading),
                animate_face_rig.in_set(FaceRigSet::Animate),
            ),
        );
    }
}

impl FaceRigPlugin {
    fn register_types(&self, app: &mut App) {
        app //
            .register_type::<FaceRigConfig>()
            .register_type::<AnimationState>()
            .register_type::<TalkSignal>()
            .register_type::<PointerState>()
            .register_type::<FramePose>()
            .register_type::<RootPose>()
            .register_type::<FaceFraming>()
            .register_type::<CameraShot>()
            .register_type::<RestPose>()
            .register_type::<FaceRigModel>()
            .register_type::<AvatarStatus>();
    }
}

#[cfg(test)]
mod tests {
    use bevy_face_rig_core::config::SmoothingConfig;

    use super::*;

    #[test]
    fn the_rig_owns_the_only_copy_of_the_config() {
        let config = FaceRigConfig {
            seed: Some(7),
            ..Default::default()
        };
        let mut app = App::new();
        app.add_plugins(FaceRigPlugin::with_config(config.clone()));

        assert_eq!(app.world().resource::<FaceRig>().config(), &config);
        assert!(app.world().get_resource::<FaceRigConfig>().is_none());
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let config = FaceRigConfig {
            smoothing: SmoothingConfig {
                reference_fps: 0.,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut app = App::new();
        app.add_plugins(FaceRigPlugin::with_config(config));

        assert_eq!(
            app.world().resource::<FaceRig>().config(),
            &FaceRigConfig::default()
        );
    }
}
