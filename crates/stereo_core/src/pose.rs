use crate::space::CoordinateSpace;
use glam::{Mat3, Mat4, Quat, Vec3};

/// A 6DOF pose sampled at `timestamp`, expressed in `space`.
///
/// The rotation is kept unit length by every constructor; the forward
/// direction is always derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    position: Vec3,
    rotation: Quat,
    timestamp: f64,
    space: CoordinateSpace,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat, timestamp: f64, space: CoordinateSpace) -> Self {
        Self {
            position,
            rotation: normalize_rotation(rotation),
            timestamp,
            space,
        }
    }

    pub fn identity(space: CoordinateSpace) -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, 0.0, space)
    }

    /// Builds a pose from a rigid transform. Scale in the matrix is ignored.
    pub fn from_matrix(matrix: Mat4, timestamp: f64, space: CoordinateSpace) -> Self {
        let position = matrix.w_axis.truncate();
        let rotation = look_rotation(matrix.z_axis.truncate(), matrix.y_axis.truncate());
        Self::new(position, rotation, timestamp, space)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    #[inline]
    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    /// Unit forward vector (+Z) of the pose.
    pub fn direction(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize()
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Re-expresses the pose through `transform`, keeping the timestamp.
    pub fn transformed(&self, transform: Mat4, space: CoordinateSpace) -> Self {
        Self::from_matrix(transform * self.matrix(), self.timestamp, space)
    }

    /// Linear position blend and normalized quaternion lerp.
    ///
    /// The result carries no timestamp and is tagged with `to`'s space.
    pub fn lerp(&self, to: &Pose, t: f32) -> Self {
        Self::new(
            self.position.lerp(to.position, t),
            self.rotation.lerp(to.rotation, t),
            0.0,
            to.space,
        )
    }
}

/// Rotation whose +Z axis points along `forward` and whose +Y axis is as
/// close to `up` as possible.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut x = up.cross(z);
    if x.length_squared() <= f32::EPSILON {
        x = z.any_orthonormal_vector();
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

fn normalize_rotation(rotation: Quat) -> Quat {
    let length = rotation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        rotation / length
    }
}
