use bevy::{math::Vec3, reflect::Reflect};
use serde::{Deserialize, Serialize};

/// Framing rule for head-and-shoulders shots.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceFraming {
    /// Face height below the top of the bounds, as a fraction of the model height.
    pub face_drop: f32,
    /// Distance of the camera in front of the model center, along `+z`.
    pub distance: f32,
}

impl Default for FaceFraming {
    fn default() -> Self {
        Self {
            face_drop: 0.12,
            distance: 0.55,
        }
    }
}

/// Camera placement computed by [`FaceFraming::frame`].
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct CameraShot {
    pub eye: Vec3,
    pub look_at: Vec3,
}

impl FaceFraming {
    /// Frames the model whose world-space bounds are `min..max`.
    pub fn frame(&self, min: Vec3, max: Vec3) -> CameraShot {
        let center = (min + max) * 0.5;
        let face_height = max.y - (max.y - min.y) * self.face_drop;
        CameraShot {
            eye: Vec3::new(center.x, face_height, center.z + self.distance),
            look_at: Vec3::new(center.x, face_height, center.z),
        }
    }
}
