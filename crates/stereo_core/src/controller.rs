use crate::autostereo::{AutoStereo, AutoStereoState, FrustumState, StateChange};
use crate::config::CoreConfig;
use crate::error::{degrade, Result};
use crate::pose::Pose;
use crate::provider::Device;
use crate::rig::{DisplayGeometry, ReferenceCamera};
use crate::space::{CoordinateSpace, SpaceRegistry};
use crate::tracker::{PoseTracker, TargetState, TargetType, TrackerEvent};
use glam::{Mat4, Quat, Vec3};

/// Whether the host is running the scene or editing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickMode {
    #[default]
    Play,
    /// Auto-stereo and its tweens are paused and the frustum rests at the
    /// default head pose.
    Edit,
}

/// Summary of one [`StereoCore::tick`].
///
/// `events` holds this tick's tracker events in emission order; the core
/// keeps no copy of them.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub stale_transforms: usize,
    pub events: Vec<TrackerEvent>,
    pub transition: Option<StateChange>,
}

/// Per-frame controller tying the registry, tracker and auto-stereo machine
/// to a [`Device`].
#[derive(Debug)]
pub struct StereoCore {
    config: CoreConfig,
    geometry: DisplayGeometry,
    camera: Option<ReferenceCamera>,
    registry: SpaceRegistry,
    tracker: PoseTracker,
    auto_stereo: AutoStereo,
    hardware_present: bool,
    frame: u64,
}

impl StereoCore {
    pub fn new<D: Device + ?Sized>(config: CoreConfig, device: &D) -> Result<Self> {
        config.validate()?;

        let hardware_present = device.is_hardware_present();
        if hardware_present {
            tracing::info!("Tracked display hardware detected");
        } else {
            tracing::warn!("No tracked display hardware detected");
        }

        let geometry = degrade(device.display_geometry(), || "querying display geometry".into())?
            .unwrap_or_default();
        let tracker = PoseTracker::new(device)?;
        let auto_stereo = AutoStereo::new(&config, geometry.default_head_pose());

        Ok(Self {
            config,
            geometry,
            camera: None,
            registry: SpaceRegistry::new(),
            tracker,
            auto_stereo,
            hardware_present,
            frame: 0,
        })
    }

    /// Advances every component by one frame.
    ///
    /// `dt` is unscaled wall time; negative or non-finite values count as
    /// zero. On error the frame is abandoned part-way and should be skipped
    /// by the caller.
    pub fn tick<D: Device + ?Sized>(
        &mut self,
        dt: f32,
        mode: TickMode,
        device: &D,
    ) -> Result<TickReport> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let geometry = degrade(device.display_geometry(), || "querying display geometry".into())?;
        if let Some(geometry) = geometry {
            self.geometry = geometry;
        }

        let stale_transforms = self.registry.refresh(device, self.camera.as_ref())?;

        let mut events = Vec::new();
        self.tracker.update(device, &self.registry, &mut events)?;

        let default_head = self.geometry.default_head_pose();
        let transition = match mode {
            TickMode::Play => {
                let head = self.tracker.target(TargetType::Head);
                self.auto_stereo.step(
                    head.is_visible(),
                    head.pose(CoordinateSpace::Tracker),
                    default_head,
                    dt,
                )
            }
            TickMode::Edit => {
                self.auto_stereo.hold(default_head);
                None
            }
        };

        self.frame += 1;
        if stale_transforms > 0 {
            tracing::debug!(frame = self.frame, stale_transforms, "Using cached transforms");
        }

        Ok(TickReport {
            frame: self.frame,
            stale_transforms,
            events,
            transition,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Replaces the configuration. Invalid configurations are rejected and
    /// leave the current one in place.
    pub fn set_config(&mut self, config: CoreConfig) -> Result<()> {
        config.validate()?;
        self.auto_stereo.apply_config(&config);
        self.config = config;
        Ok(())
    }

    pub fn reference_camera(&self) -> Option<&ReferenceCamera> {
        self.camera.as_ref()
    }

    /// World-space entries are identity-derived until a camera is set.
    /// Takes effect on the next tick.
    pub fn set_reference_camera(&mut self, camera: Option<ReferenceCamera>) {
        self.camera = camera;
    }

    pub fn registry(&self) -> &SpaceRegistry {
        &self.registry
    }

    #[inline]
    pub fn coordinate_space_transform(&self, from: CoordinateSpace, to: CoordinateSpace) -> Mat4 {
        self.registry.get(from, to)
    }

    #[inline]
    pub fn transform_matrix(&self, from: CoordinateSpace, to: CoordinateSpace, m: Mat4) -> Mat4 {
        self.registry.transform_matrix(from, to, m)
    }

    pub fn tracker(&self) -> &PoseTracker {
        &self.tracker
    }

    pub fn target(&self, target: TargetType) -> &TargetState {
        self.tracker.target(target)
    }

    pub fn target_pose(&self, target: TargetType, space: CoordinateSpace) -> Pose {
        self.tracker.pose(target, space)
    }

    pub fn is_target_visible(&self, target: TargetType) -> bool {
        self.tracker.target(target).is_visible()
    }

    pub fn frustum(&self) -> &FrustumState {
        self.auto_stereo.frustum()
    }

    pub fn auto_stereo_state(&self) -> AutoStereoState {
        self.auto_stereo.state()
    }

    pub fn geometry(&self) -> &DisplayGeometry {
        &self.geometry
    }

    pub fn is_hardware_present(&self) -> bool {
        self.hardware_present
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Camera placement for a viewport at the configured viewer scale.
    pub fn camera_matrix(&self, viewport_center: Vec3, viewport_rotation: Quat) -> Mat4 {
        self.geometry
            .camera_matrix(viewport_center, viewport_rotation, self.config.viewer_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ProviderError};
    use crate::provider::RawPose;
    use crate::testing::MockDevice;

    const DT: f32 = 0.25;

    fn head_in_view(device: &mut MockDevice) {
        device.visible[TargetType::Head.index()] = true;
        device.poses[TargetType::Head.index()] = RawPose {
            matrix: Mat4::from_translation(Vec3::new(0.0, 0.3, 0.5)),
            timestamp: 1.0,
        };
    }

    #[test]
    fn head_arrival_fades_into_stereo() {
        let mut device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        head_in_view(&mut device);

        let first = core.tick(DT, TickMode::Play, &device).unwrap();
        assert_eq!(first.frame, 1);
        assert_eq!(first.stale_transforms, 0);
        assert_eq!(
            first.transition,
            Some(StateChange { from: AutoStereoState::IdleMono, to: AutoStereoState::Animating })
        );
        assert!(matches!(
            first.events.as_slice(),
            [TrackerEvent::Move { target: TargetType::Head, .. }]
        ));

        for _ in 0..4 {
            core.tick(DT, TickMode::Play, &device).unwrap();
        }
        assert_eq!(core.auto_stereo_state(), AutoStereoState::IdleStereo);
        assert_eq!(core.frustum().ipd, core.config().ipd);
        assert!(core.is_target_visible(TargetType::Head));
        assert_eq!(
            core.target_pose(TargetType::Head, CoordinateSpace::Tracker).position(),
            Vec3::new(0.0, 0.3, -0.5)
        );
    }

    #[test]
    fn edit_mode_holds_the_default_pose() {
        let mut device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        head_in_view(&mut device);

        for _ in 0..8 {
            let report = core.tick(DT, TickMode::Edit, &device).unwrap();
            assert_eq!(report.transition, None);
        }
        assert_eq!(core.auto_stereo_state(), AutoStereoState::IdleMono);
        assert_eq!(core.frustum().ipd, 0.0);
        assert_eq!(core.frustum().head_pose, core.geometry().default_head_pose());
        // Tracking still runs while editing.
        assert!(core.is_target_visible(TargetType::Head));
    }

    #[test]
    fn each_event_is_reported_once() {
        let mut device = MockDevice::new();
        device.buttons[TargetType::Primary.index()] = vec![false];
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();

        let mut kinds = Vec::new();
        for tick in 0..1000 {
            device.buttons[TargetType::Primary.index()][0] = tick % 2 == 0;
            let report = core.tick(DT, TickMode::Play, &device).unwrap();
            assert_eq!(report.events.len(), 1, "tick {tick}");
            kinds.push(report.events[0].kind());
        }
        assert_eq!(kinds[0], "button_press");
        assert_eq!(kinds[1], "button_release");
        assert_eq!(kinds.iter().filter(|kind| **kind == "button_press").count(), 500);

        // A quiet tick reports nothing left over from earlier ones.
        let report = core.tick(DT, TickMode::Play, &device).unwrap();
        assert!(report.events.is_empty());
    }

    #[test]
    fn hardware_presence_is_checked_once() {
        let device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        for _ in 0..10 {
            core.tick(DT, TickMode::Play, &device).unwrap();
        }
        assert_eq!(device.hardware_checks.get(), 1);
        assert!(core.is_hardware_present());
    }

    #[test]
    fn invalid_reference_fails_the_tick() {
        let mut device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        device.fail_transform(
            CoordinateSpace::Display,
            CoordinateSpace::Tracker,
            ProviderError::InvalidReference("display detached".into()),
        );

        let err = core.tick(DT, TickMode::Play, &device).unwrap_err();
        assert!(matches!(err, CoreError::InvalidReference { .. }));
        assert_eq!(core.frame(), 0);
    }

    #[test]
    fn transient_failures_are_reported_as_stale() {
        let mut device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        device.fail_transform(
            CoordinateSpace::Tracker,
            CoordinateSpace::Camera,
            ProviderError::Failed("usb hiccup".into()),
        );

        let report = core.tick(DT, TickMode::Play, &device).unwrap();
        // tracker -> camera plus the derived tracker -> world entry.
        assert_eq!(report.stale_transforms, 2);
        assert!(core.registry().is_stale(CoordinateSpace::Tracker, CoordinateSpace::World));
    }

    #[test]
    fn geometry_failure_keeps_the_previous_geometry() {
        let mut device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        let before = *core.geometry();

        device.geometry = Err(ProviderError::Failed("edid unreadable".into()));
        core.tick(DT, TickMode::Play, &device).unwrap();
        assert_eq!(*core.geometry(), before);
    }

    #[test]
    fn bad_time_steps_count_as_zero() {
        let mut device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        head_in_view(&mut device);

        core.tick(f32::NAN, TickMode::Play, &device).unwrap();
        core.tick(-3.0, TickMode::Play, &device).unwrap();
        assert_eq!(core.auto_stereo_state(), AutoStereoState::Animating);
        assert_eq!(core.frustum().ipd, 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let device = MockDevice::new();
        let bad = CoreConfig { viewer_scale: -1.0, ..CoreConfig::default() };
        assert!(matches!(StereoCore::new(bad.clone(), &device), Err(CoreError::InvalidConfig(_))));

        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        assert!(core.set_config(bad).is_err());
        assert_eq!(core.config(), &CoreConfig::default());
    }

    #[test]
    fn reference_camera_drives_world_entries() {
        let device = MockDevice::new();
        let mut core = StereoCore::new(CoreConfig::default(), &device).unwrap();
        let camera = ReferenceCamera::new(Vec3::new(0.0, 1.0, -2.0), Quat::from_rotation_y(0.4));
        core.set_reference_camera(Some(camera));
        core.tick(DT, TickMode::Play, &device).unwrap();

        let camera_to_world =
            core.coordinate_space_transform(CoordinateSpace::Camera, CoordinateSpace::World);
        assert!(camera_to_world.abs_diff_eq(camera.local_to_world(), 1e-6));
    }
}
