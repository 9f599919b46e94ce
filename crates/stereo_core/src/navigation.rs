//! Animated movement of the reference camera around the viewport.
//!
//! Navigation is expressed in viewport terms (center, rotation, viewer
//! scale); the camera placement follows from [`DisplayGeometry::camera_matrix`].

use crate::error::{CoreError, Result};
use crate::rig::{DisplayGeometry, ReferenceCamera};
use crate::tween::{Ease, TweenHandle, TweenScheduler};
use glam::{Quat, Vec3};

const NAVIGATION_SECONDS: f32 = 1.5;

/// The camera being navigated and the viewer scale it is placed with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub camera: ReferenceCamera,
    pub viewer_scale: f32,
}

impl CameraRig {
    /// Places the camera so it looks at `center` through a viewport rotated
    /// by `rotation`.
    pub fn looking_at(
        geometry: &DisplayGeometry,
        center: Vec3,
        rotation: Quat,
        viewer_scale: f32,
    ) -> Self {
        let matrix = geometry.camera_matrix(center, rotation, viewer_scale);
        Self {
            camera: ReferenceCamera::from_matrix(matrix),
            viewer_scale,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Viewpoint {
    center: Vec3,
    rotation: Quat,
    viewer_scale: f32,
}

impl Viewpoint {
    fn of(geometry: &DisplayGeometry, rig: &CameraRig) -> Self {
        Self {
            center: geometry.viewport_center(&rig.camera, rig.viewer_scale),
            rotation: geometry.viewport_rotation(&rig.camera),
            viewer_scale: rig.viewer_scale,
        }
    }

    /// Component-wise blend; rotation uses normalized lerp.
    fn lerp(&self, to: &Viewpoint, t: f32) -> Self {
        Self {
            center: self.center.lerp(to.center, t),
            rotation: self.rotation.lerp(to.rotation, t),
            viewer_scale: self.viewer_scale + (to.viewer_scale - self.viewer_scale) * t,
        }
    }

    fn apply(&self, geometry: &DisplayGeometry, rig: &mut CameraRig) {
        *rig = CameraRig::looking_at(geometry, self.center, self.rotation, self.viewer_scale);
    }
}

/// Runs at most one navigation at a time; starting a new one cancels the
/// one in flight.
#[derive(Debug)]
pub struct CameraNavigator {
    geometry: DisplayGeometry,
    tweens: TweenScheduler<CameraRig>,
    active: Option<TweenHandle>,
}

impl CameraNavigator {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self {
            geometry,
            tweens: TweenScheduler::new(),
            active: None,
        }
    }

    pub fn geometry(&self) -> &DisplayGeometry {
        &self.geometry
    }

    /// Applies to navigations started after the call.
    pub fn set_geometry(&mut self, geometry: DisplayGeometry) {
        self.geometry = geometry;
    }

    pub fn is_navigating(&self) -> bool {
        self.active.is_some_and(|handle| self.tweens.is_active(handle))
    }

    pub fn navigate_to(
        &mut self,
        rig: &CameraRig,
        center: Vec3,
        rotation: Quat,
        viewer_scale: f32,
    ) -> Result<()> {
        if !viewer_scale.is_finite() || viewer_scale <= 0.0 {
            return Err(CoreError::InvalidParameter(format!(
                "viewer scale must be positive, got {viewer_scale}"
            )));
        }
        let from = Viewpoint::of(&self.geometry, rig);
        let to = Viewpoint {
            center,
            rotation: rotation.normalize(),
            viewer_scale,
        };
        self.start(from, to);
        Ok(())
    }

    /// Rotates the view about the current viewport center.
    pub fn look_from(&mut self, rig: &CameraRig, rotation: Quat) -> Result<()> {
        let current = Viewpoint::of(&self.geometry, rig);
        self.navigate_to(rig, current.center, rotation, current.viewer_scale)
    }

    /// Moves the viewport center to `center`, keeping rotation and scale.
    pub fn focus_on(&mut self, rig: &CameraRig, center: Vec3) -> Result<()> {
        let current = Viewpoint::of(&self.geometry, rig);
        self.navigate_to(rig, center, current.rotation, current.viewer_scale)
    }

    /// Zooms toward the viewport center. A factor above one moves the
    /// camera closer and shrinks the viewer.
    pub fn zoom(&mut self, rig: &CameraRig, factor: f32) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(CoreError::InvalidParameter(format!(
                "zoom factor must be positive, got {factor}"
            )));
        }
        let current = Viewpoint::of(&self.geometry, rig);
        self.navigate_to(rig, current.center, current.rotation, current.viewer_scale / factor)
    }

    /// Drops the navigation in flight, leaving the camera where it is.
    pub fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            self.tweens.cancel(handle);
        }
    }

    pub fn tick(&mut self, dt: f32, rig: &mut CameraRig) {
        self.tweens.tick(dt, rig);
        if !self.is_navigating() {
            self.active = None;
        }
    }

    fn start(&mut self, from: Viewpoint, to: Viewpoint) {
        self.stop();
        let geometry = self.geometry;
        tracing::debug!(
            center = ?to.center,
            viewer_scale = to.viewer_scale,
            "Starting camera navigation"
        );
        let handle = self
            .tweens
            .start(NAVIGATION_SECONDS, move |rig: &mut CameraRig, t| {
                from.lerp(&to, t).apply(&geometry, rig);
            })
            .with_ease(Ease::EaseOutExpo)
            // The exponential curve stops just short of 1.
            .on_complete(move |rig| to.apply(&geometry, rig))
            .handle();
        self.active = Some(handle);
    }
}
