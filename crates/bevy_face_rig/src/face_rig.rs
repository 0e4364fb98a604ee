use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use bevy::{
    ecs::{entity::Entity, message::MessageReader, system::SystemParam},
    math::{Quat, Vec3},
    mesh::morph::MorphWeights,
    prelude::{Component, Query, ReflectComponent, Res, ResMut, Resource},
    reflect::Reflect,
    time::Time,
    transform::components::Transform,
};
use bevy_face_rig_core::{
    config::FaceRigConfig,
    engine::{FaceRigEngine, FramePose, RigSink, RootPose},
    errors::ConfigResult,
    roles::{ChannelHandle, JointHandle},
};

use crate::messages::{PointerMoved, TalkRequest};

/// The face rig driving the current avatar.
///
/// Derefs to the [`FaceRigEngine`]; handles are [`Entity`]s of the spawned scene.
#[derive(Resource)]
pub struct FaceRig {
    engine: FaceRigEngine<Entity>,
    last_pose: Option<FramePose>,
}

impl FaceRig {
    pub fn new(config: FaceRigConfig, now: Duration) -> ConfigResult<Self> {
        Ok(Self {
            engine: FaceRigEngine::new(config, now)?,
            last_pose: None,
        })
    }

    /// What the latest frame computed.
    pub fn last_pose(&self) -> Option<&FramePose> {
        self.last_pose.as_ref()
    }
}

impl Deref for FaceRig {
    type Target = FaceRigEngine<Entity>;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl DerefMut for FaceRig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.engine
    }
}

/// Local transform of a driven node at the time its avatar finished loading.
///
/// Root and joint poses are written on top of it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct RestPose(pub Transform);

/// Everything the face rig writes to.
#[derive(SystemParam)]
pub struct FaceRigTargets<'w, 's> {
    weights: Query<'w, 's, &'static mut MorphWeights>,
    poses: Query<'w, 's, (&'static mut Transform, &'static RestPose)>,
}

impl RigSink<Entity> for FaceRigTargets<'_, '_> {
    fn set_channel_weight(&mut self, handle: ChannelHandle<Entity>, weight: f32) -> bool {
        let Ok(mut weights) = self.weights.get_mut(handle.target) else {
            return false;
        };
        let Some(slot) = weights.weights_mut().get_mut(handle.index) else {
            return false;
        };
        *slot = weight;
        true
    }

    fn set_joint_rotation(&mut self, handle: JointHandle<Entity>, rotation: Quat) -> bool {
        let Ok((mut transform, rest)) = self.poses.get_mut(handle.target) else {
            return false;
        };
        transform.rotation = rest.0.rotation * rotation;
        true
    }

    fn set_root_pose(&mut self, root: Entity, pose: RootPose) -> bool {
        let Ok((mut transform, rest)) = self.poses.get_mut(root) else {
            return false;
        };
        transform.rotation = rest.0.rotation * pose.rotation;
        transform.translation = rest.0.translation + Vec3::Y * pose.lift;
        true
    }
}

/// Forwards talk and pointer messages to the rig, stamped with the current time.
pub fn apply_face_rig_signals(
    time: Res<Time>,
    mut rig: ResMut<FaceRig>,
    mut talk: MessageReader<TalkRequest>,
    mut pointer: MessageReader<PointerMoved>,
) {
    let now = time.elapsed();
    for request in talk.read() {
        match request {
            TalkRequest::Say(text) => {
                rig.begin_talking_text(now, text);
            }
            TalkRequest::For(duration) => rig.set_talking(true, now, *duration),
            TalkRequest::Stop => rig.end_talking(),
        }
    }
    for moved in pointer.read() {
        rig.set_pointer(moved.position, moved.active, now);
    }
}

/// Runs one frame of the face rig.
pub fn animate_face_rig(
    time: Res<Time>,
    mut rig: ResMut<FaceRig>,
    mut targets: FaceRigTargets,
) {
    let pose = rig.engine.tick(time.elapsed(), &mut targets);
    rig.last_pose = Some(pose);
}
