//! Scripted device used by the unit tests.

use crate::error::ProviderError;
use crate::provider::{DisplayProvider, RawPose, TrackingProvider, TransformProvider};
use crate::rig::DisplayGeometry;
use crate::space::CoordinateSpace;
use crate::tracker::TargetType;
use glam::Mat4;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Every field is read at query time, so tests script a sequence of frames
/// by mutating the device between ticks. Unset transforms are identity.
pub(crate) struct MockDevice {
    pub transforms: HashMap<(CoordinateSpace, CoordinateSpace), Result<Mat4, ProviderError>>,
    pub transform_queries: RefCell<Vec<(CoordinateSpace, CoordinateSpace)>>,
    pub visible: [bool; TargetType::COUNT],
    pub visibility_error: Option<ProviderError>,
    pub poses: [RawPose; TargetType::COUNT],
    pub buttons: [Vec<bool>; TargetType::COUNT],
    pub button_count_error: Option<ProviderError>,
    /// Per-button query failures, checked before the scripted state.
    pub button_errors: HashMap<(TargetType, usize), ProviderError>,
    pub tap: [Result<bool, ProviderError>; TargetType::COUNT],
    pub geometry: Result<DisplayGeometry, ProviderError>,
    pub hardware_present: bool,
    pub hardware_checks: Cell<usize>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
            transform_queries: RefCell::new(Vec::new()),
            visible: [false; TargetType::COUNT],
            visibility_error: None,
            poses: [RawPose::IDENTITY; TargetType::COUNT],
            buttons: [Vec::new(), Vec::new()],
            button_count_error: None,
            button_errors: HashMap::new(),
            tap: [Err(ProviderError::Unsupported), Err(ProviderError::Unsupported)],
            geometry: Ok(DisplayGeometry::default()),
            hardware_present: true,
            hardware_checks: Cell::new(0),
        }
    }

    pub fn set_transform(&mut self, from: CoordinateSpace, to: CoordinateSpace, m: Mat4) {
        self.transforms.insert((from, to), Ok(m));
    }

    pub fn fail_transform(
        &mut self,
        from: CoordinateSpace,
        to: CoordinateSpace,
        err: ProviderError,
    ) {
        self.transforms.insert((from, to), Err(err));
    }
}

impl TransformProvider for MockDevice {
    fn query_transform(
        &self,
        from: CoordinateSpace,
        to: CoordinateSpace,
    ) -> Result<Mat4, ProviderError> {
        self.transform_queries.borrow_mut().push((from, to));
        self.transforms
            .get(&(from, to))
            .cloned()
            .unwrap_or(Ok(Mat4::IDENTITY))
    }
}

impl TrackingProvider for MockDevice {
    fn is_visible(&self, target: TargetType) -> Result<bool, ProviderError> {
        match &self.visibility_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.visible[target.index()]),
        }
    }

    fn pose(&self, target: TargetType) -> Result<RawPose, ProviderError> {
        Ok(self.poses[target.index()])
    }

    fn button_count(&self, target: TargetType) -> Result<usize, ProviderError> {
        match &self.button_count_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.buttons[target.index()].len()),
        }
    }

    fn is_button_pressed(&self, target: TargetType, button: usize) -> Result<bool, ProviderError> {
        if let Some(err) = self.button_errors.get(&(target, button)) {
            return Err(err.clone());
        }
        self.buttons[target.index()]
            .get(button)
            .copied()
            .ok_or_else(|| ProviderError::InvalidReference(format!("no button {button}")))
    }

    fn is_tap_pressed(&self, target: TargetType) -> Result<bool, ProviderError> {
        self.tap[target.index()].clone()
    }
}

impl DisplayProvider for MockDevice {
    fn display_geometry(&self) -> Result<DisplayGeometry, ProviderError> {
        self.geometry.clone()
    }

    fn is_hardware_present(&self) -> bool {
        self.hardware_checks.set(self.hardware_checks.get() + 1);
        self.hardware_present
    }
}
