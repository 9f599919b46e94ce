//! Geometry relating the reference camera, the viewport and the physical
//! display.
//!
//! A monoscopic camera placed by [`DisplayGeometry::camera_matrix`] sees the
//! viewport center at zero parallax, looking at the display from the same
//! angle a seated viewer would.

use crate::pose::Pose;
use crate::space::CoordinateSpace;
use glam::{Mat4, Quat, Vec3};

/// The externally owned camera the world-space mappings are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceCamera {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for ReferenceCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl ReferenceCamera {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
        }
    }

    /// Places a camera from a rigid transform such as [`DisplayGeometry::camera_matrix`].
    pub fn from_matrix(matrix: Mat4) -> Self {
        let pose = Pose::from_matrix(matrix, 0.0, CoordinateSpace::World);
        Self::new(pose.position(), pose.rotation())
    }

    #[inline]
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    #[inline]
    pub fn world_to_local(&self) -> Mat4 {
        self.local_to_world().inverse()
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Physical layout reported by the display provider, in the left-handed
/// convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    /// Offset from the viewport center to the default (mono) eye position, meters.
    pub camera_offset: Vec3,
    /// Display tilt as Euler angles in degrees; only `x` is used.
    pub display_angle: Vec3,
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self {
            camera_offset: Vec3::new(0.0, 0.345_1, -0.618_9),
            display_angle: Vec3::new(30.0, 0.0, 0.0),
        }
    }
}

impl DisplayGeometry {
    /// Builds the geometry from a right-handed camera offset.
    pub fn from_native(camera_offset: Vec3, display_angle: Vec3) -> Self {
        Self {
            camera_offset: camera_offset * Vec3::new(1.0, 1.0, -1.0),
            display_angle,
        }
    }

    /// Angle in degrees between the camera offset and the display's forward
    /// direction. Zero when either vector is degenerate.
    pub fn angle_between_camera_and_display(&self) -> f32 {
        let offset = self.camera_offset.normalize_or_zero();
        let display_direction = (euler_x(-self.display_angle.x) * Vec3::Z).normalize_or_zero();
        if offset == Vec3::ZERO || display_direction == Vec3::ZERO {
            return 0.0;
        }
        offset.dot(display_direction).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Camera rotation for a given viewport rotation.
    fn camera_rotation(&self, viewport_rotation: Quat) -> Quat {
        viewport_rotation * euler_x(90.0 - self.angle_between_camera_and_display())
    }

    /// Rigid transform of a camera looking at `viewport_center`.
    pub fn camera_matrix(
        &self,
        viewport_center: Vec3,
        viewport_rotation: Quat,
        viewer_scale: f32,
    ) -> Mat4 {
        let rotation = self.camera_rotation(viewport_rotation);
        let position = viewport_center
            + rotation * (Vec3::NEG_Z * self.camera_offset.length() * viewer_scale);
        Mat4::from_rotation_translation(rotation, position)
    }

    /// Camera position that puts `focal_point` at the viewport center.
    pub fn camera_position(
        &self,
        focal_point: Vec3,
        camera_rotation: Quat,
        viewer_scale: f32,
    ) -> Vec3 {
        focal_point + camera_rotation * (Vec3::NEG_Z * self.camera_offset.length() * viewer_scale)
    }

    /// World-space viewport center seen by `camera`.
    pub fn viewport_center(&self, camera: &ReferenceCamera, viewer_scale: f32) -> Vec3 {
        camera.rotation * (Vec3::Z * self.camera_offset.length() * viewer_scale) + camera.position
    }

    /// World-space viewport rotation seen by `camera`.
    pub fn viewport_rotation(&self, camera: &ReferenceCamera) -> Quat {
        let tilt = euler_x(90.0 - self.angle_between_camera_and_display());
        (camera.rotation * tilt.inverse()).normalize()
    }

    /// Head pose of a viewer sitting at the default eye position; used as
    /// the resting pose while in mono.
    pub fn default_head_pose(&self) -> Pose {
        let matrix = self.camera_matrix(Vec3::ZERO, euler_x(90.0 - self.display_angle.x), 1.0);
        Pose::from_matrix(matrix, 0.0, CoordinateSpace::Tracker)
    }
}

#[inline]
fn euler_x(degrees: f32) -> Quat {
    Quat::from_rotation_x(degrees.to_radians())
}
