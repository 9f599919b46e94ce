//! Contracts for the hardware-facing collaborators.
//!
//! Every method is called at most once per target/pair per tick, except
//! [`DisplayProvider::is_hardware_present`], which is expensive and is only
//! called when a [`crate::StereoCore`] is constructed.

use crate::error::ProviderError;
use crate::rig::DisplayGeometry;
use crate::space::CoordinateSpace;
use crate::tracker::TargetType;
use glam::Mat4;

/// A pose as reported by the tracking hardware: a right-handed,
/// tracker-space rigid transform plus its capture time in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPose {
    pub matrix: Mat4,
    pub timestamp: f64,
}

impl RawPose {
    pub const IDENTITY: RawPose = RawPose {
        matrix: Mat4::IDENTITY,
        timestamp: 0.0,
    };
}

pub trait TransformProvider {
    /// Right-handed transform mapping `from` coordinates to `to` coordinates.
    /// Only called for pairs of distinct [`CoordinateSpace::NATIVE`] spaces.
    fn query_transform(
        &self,
        from: CoordinateSpace,
        to: CoordinateSpace,
    ) -> Result<Mat4, ProviderError>;
}

pub trait TrackingProvider {
    fn is_visible(&self, target: TargetType) -> Result<bool, ProviderError>;

    fn pose(&self, target: TargetType) -> Result<RawPose, ProviderError>;

    fn button_count(&self, target: TargetType) -> Result<usize, ProviderError>;

    fn is_button_pressed(&self, target: TargetType, button: usize) -> Result<bool, ProviderError>;

    /// Targets without tap hardware keep the default.
    fn is_tap_pressed(&self, _target: TargetType) -> Result<bool, ProviderError> {
        Err(ProviderError::Unsupported)
    }
}

pub trait DisplayProvider {
    /// Camera offset and display tilt of the current display.
    fn display_geometry(&self) -> Result<DisplayGeometry, ProviderError>;

    /// Whether tracked display hardware is attached. Expensive: never call
    /// this every tick.
    fn is_hardware_present(&self) -> bool;
}

/// Everything a [`crate::StereoCore`] needs from the outside world.
pub trait Device: TransformProvider + TrackingProvider + DisplayProvider {}

impl<T: TransformProvider + TrackingProvider + DisplayProvider + ?Sized> Device for T {}
