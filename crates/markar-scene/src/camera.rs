//! Camera pose supplied by the tracker each frame

use bevy_math::Vec3;
use bevy_transform::components::Transform;

/// Pose and projection of the device camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub transform: Transform,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            // Y-up, looking down -Z at the marker plane
            transform: Transform::from_xyz(0.0, 0.0, 1.0).looking_at(Vec3::ZERO, Vec3::Y),
            fov_y: 45f32.to_radians(),
            near: 0.01,
            far: 1000.0,
        }
    }
}
