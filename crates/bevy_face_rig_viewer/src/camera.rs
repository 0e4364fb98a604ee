use bevy::{camera::primitives::Aabb, prelude::*};
use bevy_face_rig::prelude::*;

#[derive(Component)]
pub struct AvatarCamera;

/// Points the camera at the face of a newly bound avatar.
///
/// Mesh bounds are computed after the scene spawns, so framing waits until they exist.
pub fn frame_new_avatar(
    mut pending: Local<Option<Entity>>,
    added: Query<Entity, Added<FaceRigModel>>,
    children: Query<&Children>,
    bounds: Query<(&Aabb, &GlobalTransform)>,
    mut cameras: Query<&mut Transform, With<AvatarCamera>>,
) {
    if let Some(model) = added.iter().last() {
        *pending = Some(model);
    }
    let Some(model) = *pending else {
        return;
    };
    let Some((min, max)) = world_bounds(model, &children, &bounds) else {
        return;
    };

    let shot = FaceFraming::default().frame(min, max);
    for mut transform in &mut cameras {
        *transform = Transform::from_translation(shot.eye).looking_at(shot.look_at, Vec3::Y);
    }
    debug!("Framed avatar {model:?} at {:?}", shot.eye);
    *pending = None;
}

fn world_bounds(
    root: Entity,
    children: &Query<&Children>,
    bounds: &Query<(&Aabb, &GlobalTransform)>,
) -> Option<(Vec3, Vec3)> {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut found = false;

    for entity in children.iter_descendants(root) {
        let Ok((aabb, transform)) = bounds.get(entity) else {
            continue;
        };
        let center = Vec3::from(aabb.center);
        let half = Vec3::from(aabb.half_extents);
        for corner in 0..8 {
            let sign = Vec3::new(
                if corner & 1 == 0 { -1. } else { 1. },
                if corner & 2 == 0 { -1. } else { 1. },
                if corner & 4 == 0 { -1. } else { 1. },
            );
            let point = transform.transform_point(center + half * sign);
            min = min.min(point);
            max = max.max(point);
        }
        found = true;
    }

    found.then_some((min, max))
}
