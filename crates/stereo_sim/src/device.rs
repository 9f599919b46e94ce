//! A scripted tracked display.
//!
//! The viewer's head walks in and out of the tracking volume on a fixed
//! cycle, and the stylus sways in front of the display pressing its buttons
//! on a timetable. Any query may be made to fail for a frame to exercise
//! the core's degraded paths.

use glam::{Mat4, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stereo_core::{
    CoordinateSpace, DisplayGeometry, DisplayProvider, ProviderError, RawPose, TargetType,
    TrackingProvider, TransformProvider,
};

pub const STYLUS_BUTTONS: usize = 3;

const NATIVE: usize = CoordinateSpace::NATIVE.len();
/// Half-width of the per-axis position noise, meters.
const JITTER_M: f32 = 0.0005;
const DISPLAY_TILT_DEG: f32 = 30.0;

/// Button `i` is held while `time % period` is inside `[start, start + held)`.
const BUTTON_SCHEDULE: [(f64, f64, f64); STYLUS_BUTTONS] =
    [(3.0, 0.5, 0.4), (5.0, 2.0, 0.3), (11.0, 6.0, 1.0)];
const TAP_SCHEDULE: (f64, f64, f64) = (7.0, 1.0, 0.2);

pub struct SimulatedDevice {
    rng: StdRng,
    time: f64,
    head_present_secs: f64,
    head_absent_secs: f64,
    failure_rate: f64,
    geometry: DisplayGeometry,
    /// Maps each native space into tracker space.
    to_tracker: [Mat4; NATIVE],
    head_visible: bool,
    poses: [RawPose; TargetType::COUNT],
    buttons: [bool; STYLUS_BUTTONS],
    tap: bool,
    failed_transforms: [[bool; NATIVE]; NATIVE],
    failed_poses: [bool; TargetType::COUNT],
    geometry_failed: bool,
}

impl SimulatedDevice {
    pub fn new(
        seed: u64,
        head_present_secs: f64,
        head_absent_secs: f64,
        failure_rate: f64,
    ) -> Self {
        let geometry = DisplayGeometry::from_native(
            Vec3::new(0.0, 0.345_1, 0.618_9),
            Vec3::new(DISPLAY_TILT_DEG, 0.0, 0.0),
        );
        let display_to_tracker = Mat4::from_rotation_translation(
            Quat::from_rotation_x(-DISPLAY_TILT_DEG.to_radians()),
            Vec3::new(0.0, 0.12, 0.0),
        );
        let viewport_to_display = Mat4::from_translation(Vec3::new(-0.26, -0.15, 0.0));
        let camera_to_viewport =
            Mat4::from_translation(Vec3::new(0.0, 0.0, geometry.camera_offset.length()));

        let mut device = Self {
            rng: StdRng::seed_from_u64(seed),
            time: 0.0,
            head_present_secs,
            head_absent_secs,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            geometry,
            to_tracker: [
                Mat4::IDENTITY,
                display_to_tracker,
                display_to_tracker * viewport_to_display,
                display_to_tracker * viewport_to_display * camera_to_viewport,
            ],
            head_visible: false,
            poses: [RawPose::IDENTITY; TargetType::COUNT],
            buttons: [false; STYLUS_BUTTONS],
            tap: false,
            failed_transforms: [[false; NATIVE]; NATIVE],
            failed_poses: [false; TargetType::COUNT],
            geometry_failed: false,
        };
        device.advance(0.0);
        device
    }

    pub fn head_visible(&self) -> bool {
        self.head_visible
    }

    /// Moves the script forward and rolls this frame's failures.
    pub fn advance(&mut self, dt: f64) {
        self.time += dt.max(0.0);
        let t = self.time;

        let cycle = self.head_present_secs + self.head_absent_secs;
        self.head_visible = cycle <= 0.0 || t % cycle < self.head_present_secs;

        if self.head_visible {
            let sway = Vec3::new(0.06 * (t * 0.7).sin() as f32, 0.02 * (t * 1.3).sin() as f32, 0.0);
            let position = Vec3::new(0.0, 0.35, 0.6) + sway + self.jitter();
            let rotation = Quat::from_rotation_y(0.1 * (t * 0.5).sin() as f32)
                * Quat::from_rotation_x(-0.5);
            self.poses[TargetType::Head.index()] = RawPose {
                matrix: Mat4::from_rotation_translation(rotation, position),
                timestamp: t,
            };
        }

        let stylus_position =
            Vec3::new(0.1 * (t * 0.9).cos() as f32, 0.1, 0.25 + 0.05 * (t * 0.4).sin() as f32)
                + self.jitter();
        self.poses[TargetType::Primary.index()] = RawPose {
            matrix: Mat4::from_rotation_translation(Quat::from_rotation_x(-1.0), stylus_position),
            timestamp: t,
        };

        for (pressed, schedule) in self.buttons.iter_mut().zip(BUTTON_SCHEDULE) {
            *pressed = scheduled(t, schedule);
        }
        self.tap = scheduled(t, TAP_SCHEDULE);

        for from in 0..NATIVE {
            for to in 0..NATIVE {
                self.failed_transforms[from][to] = from != to && self.roll_failure();
            }
        }
        for target in TargetType::ALL {
            self.failed_poses[target.index()] = self.roll_failure();
        }
        self.geometry_failed = self.roll_failure();
    }

    fn roll_failure(&mut self) -> bool {
        self.failure_rate > 0.0 && self.rng.gen_bool(self.failure_rate)
    }

    fn jitter(&mut self) -> Vec3 {
        Vec3::new(
            self.rng.gen_range(-JITTER_M..=JITTER_M),
            self.rng.gen_range(-JITTER_M..=JITTER_M),
            self.rng.gen_range(-JITTER_M..=JITTER_M),
        )
    }

    fn dropout(&self, what: &str) -> ProviderError {
        ProviderError::Failed(format!("simulated {what} dropout at t={:.3}", self.time))
    }
}

fn scheduled(t: f64, (period, start, held): (f64, f64, f64)) -> bool {
    let phase = t % period;
    phase >= start && phase < start + held
}

impl TransformProvider for SimulatedDevice {
    fn query_transform(
        &self,
        from: CoordinateSpace,
        to: CoordinateSpace,
    ) -> Result<Mat4, ProviderError> {
        let (i, j) = (from.index(), to.index());
        if i >= NATIVE || j >= NATIVE {
            return Err(ProviderError::InvalidReference(format!(
                "{from} to {to} is not a native pair"
            )));
        }
        if self.failed_transforms[i][j] {
            return Err(self.dropout("transform"));
        }
        Ok(self.to_tracker[j].inverse() * self.to_tracker[i])
    }
}

impl TrackingProvider for SimulatedDevice {
    fn is_visible(&self, target: TargetType) -> Result<bool, ProviderError> {
        Ok(match target {
            TargetType::Head => self.head_visible,
            TargetType::Primary => true,
        })
    }

    fn pose(&self, target: TargetType) -> Result<RawPose, ProviderError> {
        if self.failed_poses[target.index()] {
            return Err(self.dropout("pose"));
        }
        Ok(self.poses[target.index()])
    }

    fn button_count(&self, target: TargetType) -> Result<usize, ProviderError> {
        Ok(match target {
            TargetType::Head => 0,
            TargetType::Primary => STYLUS_BUTTONS,
        })
    }

    fn is_button_pressed(&self, target: TargetType, button: usize) -> Result<bool, ProviderError> {
        match target {
            TargetType::Primary if button < STYLUS_BUTTONS => Ok(self.buttons[button]),
            _ => Err(ProviderError::InvalidReference(format!("{target} has no button {button}"))),
        }
    }

    fn is_tap_pressed(&self, target: TargetType) -> Result<bool, ProviderError> {
        match target {
            TargetType::Primary => Ok(self.tap),
            TargetType::Head => Err(ProviderError::Unsupported),
        }
    }
}

impl DisplayProvider for SimulatedDevice {
    fn display_geometry(&self) -> Result<DisplayGeometry, ProviderError> {
        if self.geometry_failed {
            return Err(self.dropout("display geometry"));
        }
        Ok(self.geometry)
    }

    fn is_hardware_present(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_core::{AutoStereoState, CoreConfig, StereoCore, TickMode, TrackerEvent};

    #[test]
    fn native_transforms_compose() {
        let device = SimulatedDevice::new(7, 8.0, 7.0, 0.0);
        let spaces = CoordinateSpace::NATIVE;
        for a in spaces {
            for b in spaces {
                for c in spaces {
                    if a == b || b == c || a == c {
                        continue;
                    }
                    let ab = device.query_transform(a, b).unwrap();
                    let bc = device.query_transform(b, c).unwrap();
                    let ac = device.query_transform(a, c).unwrap();
                    assert!((bc * ab).abs_diff_eq(ac, 1e-5), "{a} -> {b} -> {c}");
                }
            }
        }
    }

    #[test]
    fn head_follows_the_presence_cycle() {
        let mut device = SimulatedDevice::new(7, 2.0, 1.0, 0.0);
        assert!(device.head_visible());
        device.advance(2.5);
        assert!(!device.head_visible());
        device.advance(1.0);
        assert!(device.head_visible());
    }

    #[test]
    fn full_failure_rate_fails_every_query() {
        let device = SimulatedDevice::new(7, 2.0, 1.0, 1.0);
        assert!(matches!(
            device.query_transform(CoordinateSpace::Tracker, CoordinateSpace::Display),
            Err(ProviderError::Failed(_))
        ));
        assert!(device.pose(TargetType::Primary).is_err());
        assert!(device.display_geometry().is_err());
    }

    #[test]
    fn world_is_not_a_native_space() {
        let device = SimulatedDevice::new(7, 2.0, 1.0, 0.0);
        assert!(matches!(
            device.query_transform(CoordinateSpace::World, CoordinateSpace::Tracker),
            Err(ProviderError::InvalidReference(_))
        ));
    }

    #[test]
    fn drives_the_core_through_a_full_cycle() {
        let mut device = SimulatedDevice::new(42, 3.0, 4.0, 0.0);
        let config = CoreConfig { auto_stereo_delay: 1.0, ..CoreConfig::default() };
        let mut core = StereoCore::new(config, &device).unwrap();
        let dt = 0.25;

        let mut states = Vec::new();
        let mut presses = 0;
        for _ in 0..27 {
            device.advance(dt as f64);
            let report = core.tick(dt, TickMode::Play, &device).unwrap();
            if let Some(change) = report.transition {
                states.push(change.to);
            }
            presses += report
                .events
                .iter()
                .filter(|event| matches!(event, TrackerEvent::ButtonPress { .. }))
                .count();
        }

        assert_eq!(
            states,
            vec![
                AutoStereoState::Animating,
                AutoStereoState::IdleStereo,
                AutoStereoState::Animating,
                AutoStereoState::IdleMono,
            ]
        );
        assert!(presses > 0);
    }
}
