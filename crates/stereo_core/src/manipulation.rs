//! Grabbing scene objects with the stylus beam.
//!
//! While idle the beam is cast into the scene every tick and stops at the
//! first object it hits. Pressing a grab button while something is hit
//! attaches that object rigidly to the beam end until the buttons are
//! released. The scene itself stays behind the [`GrabScene`] trait.

use crate::pose::Pose;
use crate::space::CoordinateSpace;
use crate::tracker::TargetState;
use glam::{Quat, Vec3};
use std::fmt;

/// Beam length while nothing is hit, in unscaled meters.
pub const DEFAULT_BEAM_LENGTH: f32 = 0.3;
/// Grabs the part under the beam.
pub const GRAB_BUTTON: usize = 0;
/// Grabs the whole object the part under the beam belongs to.
pub const WHOLE_OBJECT_BUTTON: usize = 1;

/// First object along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<Id> {
    pub object: Id,
    /// World-space distance from the ray origin.
    pub distance: f32,
}

/// Scene objects the stylus can pick and move. Transforms are world-space.
pub trait GrabScene {
    type ObjectId: Copy + Eq + fmt::Debug;

    /// Closest hit along the ray, if any. `direction` is unit length.
    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit<Self::ObjectId>>;

    fn object_transform(&self, object: Self::ObjectId) -> Option<(Vec3, Quat)>;

    fn set_object_transform(&mut self, object: Self::ObjectId, position: Vec3, rotation: Quat);

    /// Top-level object that `object` is a part of.
    fn root_of(&self, object: Self::ObjectId) -> Self::ObjectId {
        object
    }
}

/// What the manipulator reads from the stylus each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylusInput {
    /// World-space stylus pose.
    pub pose: Pose,
    pub grab_pressed: bool,
    pub whole_object: bool,
}

impl StylusInput {
    pub fn of(stylus: &TargetState) -> Self {
        let whole_object = stylus.is_button_pressed(WHOLE_OBJECT_BUTTON);
        Self {
            pose: stylus.pose(CoordinateSpace::World),
            grab_pressed: stylus.is_button_pressed(GRAB_BUTTON) || whole_object,
            whole_object,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulationState {
    #[default]
    Idle,
    Grab,
}

impl ManipulationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Grab => "grab",
        }
    }
}

impl fmt::Display for ManipulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrabChange<Id> {
    Began { object: Id, whole_object: bool },
    Ended { object: Id },
}

/// World-space segment to draw for the stylus beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub start: Vec3,
    pub end: Vec3,
}

/// Object pose relative to the beam end, captured when the grab began.
#[derive(Debug, Clone, Copy)]
struct Grab<Id> {
    object: Id,
    offset: Vec3,
    rotation: Quat,
    distance: f32,
}

impl<Id: Copy> Grab<Id> {
    fn begin(object: Id, transform: (Vec3, Quat), distance: f32, stylus: &Pose) -> Self {
        let (position, rotation) = transform;
        let beam_end = beam_end(stylus, distance);
        Self {
            object,
            offset: rotation.inverse() * (position - beam_end),
            rotation: stylus.rotation().inverse() * rotation,
            distance,
        }
    }

    fn follow<S: GrabScene<ObjectId = Id>>(&self, stylus: &Pose, scene: &mut S) {
        let rotation = (stylus.rotation() * self.rotation).normalize();
        let position = beam_end(stylus, self.distance) + rotation * self.offset;
        scene.set_object_transform(self.object, position, rotation);
    }
}

#[inline]
fn beam_end(stylus: &Pose, distance: f32) -> Vec3 {
    stylus.position() + stylus.rotation() * (Vec3::Z * distance)
}

#[derive(Debug, Clone)]
pub struct StylusManipulator<Id> {
    grab: Option<Grab<Id>>,
    hovered: Option<Id>,
    was_pressed: bool,
    /// Unscaled; multiplied by the viewer scale when the beam is placed.
    beam_length: f32,
    beam: Beam,
}

impl<Id: Copy + Eq + fmt::Debug> Default for StylusManipulator<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + fmt::Debug> StylusManipulator<Id> {
    pub fn new() -> Self {
        Self {
            grab: None,
            hovered: None,
            was_pressed: false,
            beam_length: DEFAULT_BEAM_LENGTH,
            beam: Beam { start: Vec3::ZERO, end: Vec3::ZERO },
        }
    }

    pub fn state(&self) -> ManipulationState {
        match self.grab {
            Some(_) => ManipulationState::Grab,
            None => ManipulationState::Idle,
        }
    }

    pub fn grabbed(&self) -> Option<Id> {
        self.grab.map(|grab| grab.object)
    }

    /// Object under the beam while idle and not grabbing it.
    pub fn hovered(&self) -> Option<Id> {
        self.hovered
    }

    pub fn beam(&self) -> Beam {
        self.beam
    }

    /// Advances the grab state machine by one tick.
    ///
    /// A grab starts only on the press edge, so holding a button while
    /// sweeping the beam across objects picks nothing up.
    pub fn update<S: GrabScene<ObjectId = Id>>(
        &mut self,
        input: &StylusInput,
        viewer_scale: f32,
        scene: &mut S,
    ) -> Option<GrabChange<Id>> {
        let pose = &input.pose;
        let pressed = input.grab_pressed;
        let mut change = None;

        match self.grab {
            None => {
                self.beam_length = DEFAULT_BEAM_LENGTH;
                self.hovered = None;
                if let Some(hit) = scene.raycast(pose.position(), pose.direction()) {
                    self.beam_length = hit.distance / viewer_scale;
                    if pressed && !self.was_pressed {
                        change = self.begin(hit, input, scene);
                    } else {
                        self.hovered = Some(hit.object);
                    }
                }
            }
            Some(grab) => {
                grab.follow(pose, scene);
                if !pressed && self.was_pressed {
                    self.grab = None;
                    tracing::debug!(object = ?grab.object, "Released grabbed object");
                    change = Some(GrabChange::Ended { object: grab.object });
                }
            }
        }

        self.beam = Beam {
            start: pose.position(),
            end: pose.position() + pose.direction() * self.beam_length * viewer_scale,
        };
        self.was_pressed = pressed;
        change
    }

    fn begin<S: GrabScene<ObjectId = Id>>(
        &mut self,
        hit: RayHit<Id>,
        input: &StylusInput,
        scene: &S,
    ) -> Option<GrabChange<Id>> {
        let object = if input.whole_object { scene.root_of(hit.object) } else { hit.object };
        let Some(transform) = scene.object_transform(object) else {
            tracing::debug!(?object, "Hit object has no transform; not grabbing");
            return None;
        };
        self.grab = Some(Grab::begin(object, transform, hit.distance, &input.pose));
        tracing::debug!(
            ?object,
            distance = hit.distance,
            whole_object = input.whole_object,
            "Grabbed object"
        );
        Some(GrabChange::Began { object, whole_object: input.whole_object })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDevice;
    use crate::space::SpaceRegistry;
    use crate::tracker::{PoseTracker, TargetType};
    use glam::Mat4;
    use std::f32::consts::FRAC_PI_2;

    struct Ball {
        center: Vec3,
        rotation: Quat,
        radius: f32,
        root: usize,
    }

    /// Balls with no hierarchy beyond a root index per ball.
    #[derive(Default)]
    struct Balls(Vec<Ball>);

    impl Balls {
        fn add(&mut self, center: Vec3, radius: f32, root: Option<usize>) -> usize {
            let id = self.0.len();
            let root = root.unwrap_or(id);
            self.0.push(Ball { center, rotation: Quat::IDENTITY, radius, root });
            id
        }
    }

    impl GrabScene for Balls {
        type ObjectId = usize;

        fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit<usize>> {
            self.0
                .iter()
                .enumerate()
                .filter_map(|(object, ball)| {
                    let to_center = ball.center - origin;
                    let along = to_center.dot(direction);
                    let miss = to_center.length_squared() - along * along;
                    let half_chord = (ball.radius * ball.radius - miss).sqrt();
                    let distance = along - half_chord;
                    (half_chord.is_finite() && distance >= 0.0)
                        .then_some(RayHit { object, distance })
                })
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
        }

        fn object_transform(&self, object: usize) -> Option<(Vec3, Quat)> {
            self.0.get(object).map(|ball| (ball.center, ball.rotation))
        }

        fn set_object_transform(&mut self, object: usize, position: Vec3, rotation: Quat) {
            if let Some(ball) = self.0.get_mut(object) {
                ball.center = position;
                ball.rotation = rotation;
            }
        }

        fn root_of(&self, object: usize) -> usize {
            self.0.get(object).map_or(object, |ball| ball.root)
        }
    }

    fn stylus(position: Vec3, rotation: Quat, grab_pressed: bool) -> StylusInput {
        StylusInput {
            pose: Pose::new(position, rotation, 0.0, CoordinateSpace::World),
            grab_pressed,
            whole_object: false,
        }
    }

    #[test]
    fn miss_leaves_the_default_beam() {
        let mut scene = Balls::default();
        scene.add(Vec3::new(0.0, 5.0, 1.0), 0.1, None);
        let mut manipulator = StylusManipulator::new();

        let input = stylus(Vec3::ZERO, Quat::IDENTITY, true);
        assert_eq!(manipulator.update(&input, 2.0, &mut scene), None);
        assert_eq!(manipulator.state(), ManipulationState::Idle);
        assert_eq!(manipulator.hovered(), None);
        assert!(manipulator.beam().end.abs_diff_eq(Vec3::new(0.0, 0.0, 0.6), 1e-6));
    }

    #[test]
    fn beam_stops_at_the_hovered_object() {
        let mut scene = Balls::default();
        let ball = scene.add(Vec3::new(0.0, 0.0, 1.0), 0.1, None);
        let mut manipulator = StylusManipulator::new();

        manipulator.update(&stylus(Vec3::ZERO, Quat::IDENTITY, false), 2.0, &mut scene);
        assert_eq!(manipulator.hovered(), Some(ball));
        assert_eq!(manipulator.state(), ManipulationState::Idle);
        assert!(manipulator.beam().end.abs_diff_eq(Vec3::new(0.0, 0.0, 0.9), 1e-5));
    }

    #[test]
    fn grabbed_object_follows_the_beam_end() {
        let mut scene = Balls::default();
        let ball = scene.add(Vec3::new(0.0, 0.0, 1.0), 0.1, None);
        let mut manipulator = StylusManipulator::new();

        manipulator.update(&stylus(Vec3::ZERO, Quat::IDENTITY, false), 1.0, &mut scene);
        let change = manipulator.update(&stylus(Vec3::ZERO, Quat::IDENTITY, true), 1.0, &mut scene);
        assert_eq!(change, Some(GrabChange::Began { object: ball, whole_object: false }));
        assert_eq!(manipulator.grabbed(), Some(ball));
        assert_eq!(manipulator.hovered(), None);

        // Forward swings from +Z to +X.
        let turned = Quat::from_rotation_y(FRAC_PI_2);
        manipulator.update(&stylus(Vec3::X, turned, true), 1.0, &mut scene);
        let (center, rotation) = scene.object_transform(ball).unwrap();
        assert!(center.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5), "{center}");
        assert!(rotation.abs_diff_eq(turned, 1e-6));
        assert!(manipulator.beam().end.abs_diff_eq(Vec3::new(1.9, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn grab_keeps_the_object_rigid_relative_to_the_stylus() {
        let mut scene = Balls::default();
        let placed = Mat4::from_rotation_translation(
            Quat::from_rotation_z(0.7),
            Vec3::new(0.05, 0.02, 0.5),
        );
        let ball = scene.add(Vec3::new(0.05, 0.02, 0.5), 0.1, None);
        scene.0[ball].rotation = Quat::from_rotation_z(0.7);
        let mut manipulator = StylusManipulator::new();

        let start = stylus(Vec3::ZERO, Quat::IDENTITY, true);
        manipulator.update(&start, 1.0, &mut scene);
        assert_eq!(manipulator.grabbed(), Some(ball));
        let relative = start.pose.matrix().inverse() * placed;

        for step in 1..6 {
            let s = step as f32;
            let rotation = Quat::from_euler(glam::EulerRot::YXZ, 0.3 * s, -0.2 * s, 0.1 * s);
            let input = stylus(Vec3::new(0.1 * s, -0.05 * s, 0.02 * s), rotation, true);
            manipulator.update(&input, 1.0, &mut scene);

            let (center, rotation) = scene.object_transform(ball).unwrap();
            let held = Mat4::from_rotation_translation(rotation, center);
            let now = input.pose.matrix().inverse() * held;
            assert!(now.abs_diff_eq(relative, 1e-4), "step {step}");
        }
    }

    #[test]
    fn release_ends_the_grab() {
        let mut scene = Balls::default();
        let ball = scene.add(Vec3::new(0.0, 0.0, 1.0), 0.1, None);
        let mut manipulator = StylusManipulator::new();

        manipulator.update(&stylus(Vec3::ZERO, Quat::IDENTITY, true), 1.0, &mut scene);
        let change = manipulator.update(&stylus(Vec3::Y, Quat::IDENTITY, false), 1.0, &mut scene);
        assert_eq!(change, Some(GrabChange::Ended { object: ball }));
        assert_eq!(manipulator.state(), ManipulationState::Idle);

        // The release tick still moved the object.
        let (center, _) = scene.object_transform(ball).unwrap();
        assert!(center.abs_diff_eq(Vec3::new(0.0, 1.0, 1.0), 1e-5));

        // Moving on leaves it where it was dropped.
        manipulator.update(&stylus(Vec3::ZERO, Quat::IDENTITY, false), 1.0, &mut scene);
        assert_eq!(scene.object_transform(ball).unwrap().0, center);
    }

    #[test]
    fn holding_the_button_onto_an_object_does_not_grab() {
        let mut scene = Balls::default();
        scene.add(Vec3::new(0.0, 0.0, 1.0), 0.1, None);
        let mut manipulator = StylusManipulator::new();

        let away = Quat::from_rotation_x(FRAC_PI_2);
        manipulator.update(&stylus(Vec3::ZERO, away, true), 1.0, &mut scene);
        let change = manipulator.update(&stylus(Vec3::ZERO, Quat::IDENTITY, true), 1.0, &mut scene);
        assert_eq!(change, None);
        assert_eq!(manipulator.state(), ManipulationState::Idle);
    }

    #[test]
    fn whole_object_grab_takes_the_root() {
        let mut scene = Balls::default();
        let body = scene.add(Vec3::new(0.0, 0.3, 1.0), 0.1, None);
        let wheel = scene.add(Vec3::new(0.0, 0.0, 1.0), 0.1, Some(body));
        let mut manipulator = StylusManipulator::new();

        let input = StylusInput { whole_object: true, ..stylus(Vec3::ZERO, Quat::IDENTITY, true) };
        let change = manipulator.update(&input, 1.0, &mut scene);
        assert_eq!(change, Some(GrabChange::Began { object: body, whole_object: true }));

        manipulator.update(&stylus(Vec3::X, Quat::IDENTITY, true), 1.0, &mut scene);
        assert!(scene.0[body].center.abs_diff_eq(Vec3::new(1.0, 0.3, 1.0), 1e-5));
        assert_eq!(scene.0[wheel].center, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn input_reads_both_grab_buttons() {
        let mut device = MockDevice::new();
        device.buttons[TargetType::Primary.index()] = vec![false, true];
        let mut registry = SpaceRegistry::new();
        registry.refresh(&device, None).unwrap();
        let mut tracker = PoseTracker::new(&device).unwrap();
        tracker.update(&device, &registry, &mut Vec::new()).unwrap();

        let input = StylusInput::of(tracker.target(TargetType::Primary));
        assert!(input.grab_pressed);
        assert!(input.whole_object);
        assert_eq!(input.pose, tracker.pose(TargetType::Primary, CoordinateSpace::World));

        device.buttons[TargetType::Primary.index()] = vec![true, false];
        tracker.update(&device, &registry, &mut Vec::new()).unwrap();
        let input = StylusInput::of(tracker.target(TargetType::Primary));
        assert!(input.grab_pressed);
        assert!(!input.whole_object);
    }
}
