//! Per-frame cache of transforms between the display's coordinate spaces.

use crate::error::{CoreError, ProviderError, Result};
use crate::provider::TransformProvider;
use crate::rig::ReferenceCamera;
use glam::{Mat4, Vec3};
use std::fmt;

/// The named frames a tracked display deals with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateSpace {
    /// Raw frame of the tracking hardware.
    Tracker = 0,
    /// Physical display surface.
    Display = 1,
    /// Application window on the display.
    Viewport = 2,
    /// Local frame of the reference camera.
    Camera = 3,
    /// Scene world frame, derived from the reference camera.
    World = 4,
}

impl CoordinateSpace {
    pub const COUNT: usize = 5;

    pub const ALL: [CoordinateSpace; Self::COUNT] = [
        CoordinateSpace::Tracker,
        CoordinateSpace::Display,
        CoordinateSpace::Viewport,
        CoordinateSpace::Camera,
        CoordinateSpace::World,
    ];

    /// Spaces whose mutual transforms come from the transform provider.
    pub const NATIVE: [CoordinateSpace; 4] = [
        CoordinateSpace::Tracker,
        CoordinateSpace::Display,
        CoordinateSpace::Viewport,
        CoordinateSpace::Camera,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "tracker",
            Self::Display => "display",
            Self::Viewport => "viewport",
            Self::Camera => "camera",
            Self::World => "world",
        }
    }
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mirrors the Z axis; converts between right- and left-handed frames.
#[rustfmt::skip]
pub const FLIP_HANDEDNESS: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0,  0.0, 0.0,
    0.0, 1.0,  0.0, 0.0,
    0.0, 0.0, -1.0, 0.0,
    0.0, 0.0,  0.0, 1.0,
]);

/// Converts a transform from the provider's right-handed convention to the
/// left-handed convention used by the rest of the crate (and back: the map
/// is its own inverse).
#[inline]
pub fn flip_handedness(m: Mat4) -> Mat4 {
    FLIP_HANDEDNESS * m * FLIP_HANDEDNESS
}

const N: usize = CoordinateSpace::COUNT;

/// Dense 5x5 grid of space-to-space transforms, refreshed once per tick.
///
/// Entries whose provider query failed keep their previous value and are
/// flagged stale until a later refresh succeeds.
#[derive(Debug, Clone)]
pub struct SpaceRegistry {
    matrices: [[Mat4; N]; N],
    stale: [[bool; N]; N],
}

impl Default for SpaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpaceRegistry {
    pub fn new() -> Self {
        Self {
            matrices: [[Mat4::IDENTITY; N]; N],
            stale: [[false; N]; N],
        }
    }

    /// Re-queries every native pair and re-derives the world-space entries.
    ///
    /// Returns the number of stale entries after the refresh. An invalid
    /// reference aborts the refresh and leaves the whole grid as it was, so
    /// the world entries always agree with the native ones.
    pub fn refresh<P: TransformProvider + ?Sized>(
        &mut self,
        provider: &P,
        camera: Option<&ReferenceCamera>,
    ) -> Result<usize> {
        let mut matrices = self.matrices;
        let mut stale = self.stale;

        for from in CoordinateSpace::NATIVE {
            for to in CoordinateSpace::NATIVE {
                if from == to {
                    continue;
                }
                let (i, j) = (from.index(), to.index());
                match provider.query_transform(from, to) {
                    Ok(m) => {
                        matrices[i][j] = flip_handedness(m);
                        stale[i][j] = false;
                    }
                    Err(ProviderError::InvalidReference(reason)) => {
                        tracing::warn!(%from, %to, reason = %reason, "Transform query rejected");
                        return Err(CoreError::InvalidReference {
                            context: format!("querying the {from} to {to} transform"),
                            reason,
                        });
                    }
                    Err(err) => {
                        if !stale[i][j] {
                            tracing::debug!(%from, %to, error = %err, "Keeping previous transform");
                        }
                        stale[i][j] = true;
                    }
                }
            }
        }
        self.matrices = matrices;
        self.stale = stale;

        let (local_to_world, world_to_local) = match camera {
            Some(camera) => (camera.local_to_world(), camera.world_to_local()),
            None => (Mat4::IDENTITY, Mat4::IDENTITY),
        };

        let cam = CoordinateSpace::Camera.index();
        let world = CoordinateSpace::World.index();
        for space in [
            CoordinateSpace::Tracker,
            CoordinateSpace::Display,
            CoordinateSpace::Viewport,
        ] {
            let i = space.index();
            self.matrices[i][world] = local_to_world * self.matrices[i][cam];
            self.stale[i][world] = self.stale[i][cam];
            self.matrices[world][i] = self.matrices[cam][i] * world_to_local;
            self.stale[world][i] = self.stale[cam][i];
        }
        self.matrices[cam][world] = local_to_world;
        self.matrices[world][cam] = world_to_local;
        self.matrices[world][world] = Mat4::IDENTITY;

        Ok(self.stale_count())
    }

    /// Transform mapping `from` coordinates into `to` coordinates.
    #[inline]
    pub fn get(&self, from: CoordinateSpace, to: CoordinateSpace) -> Mat4 {
        if from == to {
            return Mat4::IDENTITY;
        }
        self.matrices[from.index()][to.index()]
    }

    #[inline]
    pub fn transform_matrix(&self, from: CoordinateSpace, to: CoordinateSpace, m: Mat4) -> Mat4 {
        self.get(from, to) * m
    }

    #[inline]
    pub fn transform_point(&self, from: CoordinateSpace, to: CoordinateSpace, p: Vec3) -> Vec3 {
        self.get(from, to).transform_point3(p)
    }

    #[inline]
    pub fn transform_direction(&self, from: CoordinateSpace, to: CoordinateSpace, v: Vec3) -> Vec3 {
        self.get(from, to).transform_vector3(v)
    }

    /// Whether the cached entry is left over from an earlier frame.
    pub fn is_stale(&self, from: CoordinateSpace, to: CoordinateSpace) -> bool {
        from != to && self.stale[from.index()][to.index()]
    }

    pub fn stale_pairs(&self) -> impl Iterator<Item = (CoordinateSpace, CoordinateSpace)> + '_ {
        CoordinateSpace::ALL.into_iter().flat_map(move |from| {
            CoordinateSpace::ALL
                .into_iter()
                .filter(move |&to| self.is_stale(from, to))
                .map(move |to| (from, to))
        })
    }

    pub fn stale_count(&self) -> usize {
        self.stale_pairs().count()
    }
}
