//! Last-known pose, button and tap state of every tracked target, and the
//! edge-triggered events derived from it.

use crate::error::{degrade, Result};
use crate::pose::Pose;
use crate::provider::TrackingProvider;
use crate::space::{flip_handedness, CoordinateSpace, SpaceRegistry};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// The viewer's head (tracked glasses).
    Head = 0,
    /// The primary hand-held stylus.
    Primary = 1,
}

impl TargetType {
    pub const COUNT: usize = 2;
    pub const ALL: [TargetType; Self::COUNT] = [TargetType::Head, TargetType::Primary];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Primary => "primary",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification produced by a tracker update. Poses are in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerEvent {
    Move { target: TargetType, world_pose: Pose },
    ButtonPress { target: TargetType, button: usize, world_pose: Pose },
    ButtonRelease { target: TargetType, button: usize, world_pose: Pose },
    TapPress { target: TargetType, world_pose: Pose },
    TapRelease { target: TargetType, world_pose: Pose },
}

impl TrackerEvent {
    pub fn target(&self) -> TargetType {
        match *self {
            Self::Move { target, .. }
            | Self::ButtonPress { target, .. }
            | Self::ButtonRelease { target, .. }
            | Self::TapPress { target, .. }
            | Self::TapRelease { target, .. } => target,
        }
    }

    pub fn world_pose(&self) -> &Pose {
        match self {
            Self::Move { world_pose, .. }
            | Self::ButtonPress { world_pose, .. }
            | Self::ButtonRelease { world_pose, .. }
            | Self::TapPress { world_pose, .. }
            | Self::TapRelease { world_pose, .. } => world_pose,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::ButtonPress { .. } => "button_press",
            Self::ButtonRelease { .. } => "button_release",
            Self::TapPress { .. } => "tap_press",
            Self::TapRelease { .. } => "tap_release",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetState {
    target: TargetType,
    poses: [Pose; CoordinateSpace::COUNT],
    buttons: Vec<bool>,
    tap_pressed: bool,
    visible: bool,
}

impl TargetState {
    fn new(target: TargetType, button_count: usize) -> Self {
        Self {
            target,
            poses: CoordinateSpace::ALL.map(Pose::identity),
            buttons: vec![false; button_count],
            tap_pressed: false,
            visible: false,
        }
    }

    pub fn target(&self) -> TargetType {
        self.target
    }

    /// Last known pose in `space`. Held while the target is invisible.
    #[inline]
    pub fn pose(&self, space: CoordinateSpace) -> Pose {
        self.poses[space.index()]
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_button_pressed(&self, button: usize) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }

    pub fn is_tap_pressed(&self) -> bool {
        self.tap_pressed
    }

    fn update<P: TrackingProvider + ?Sized>(
        &mut self,
        provider: &P,
        registry: &SpaceRegistry,
        events: &mut Vec<TrackerEvent>,
    ) -> Result<()> {
        let target = self.target;

        self.visible = degrade(provider.is_visible(target), || {
            format!("querying {target} visibility")
        })?
        .unwrap_or(false);

        if self.visible {
            let raw = degrade(provider.pose(target), || format!("querying {target} pose"))?;
            if let Some(raw) = raw {
                let current = Pose::from_matrix(
                    flip_handedness(raw.matrix),
                    raw.timestamp,
                    CoordinateSpace::Tracker,
                );
                let previous = self.poses[CoordinateSpace::Tracker.index()];
                self.poses[CoordinateSpace::Tracker.index()] = current;

                for space in &CoordinateSpace::ALL[1..] {
                    let transform = registry.get(CoordinateSpace::Tracker, *space);
                    self.poses[space.index()] = current.transformed(transform, *space);
                }

                if current.position() != previous.position()
                    || current.rotation() != previous.rotation()
                {
                    events.push(TrackerEvent::Move {
                        target,
                        world_pose: self.pose(CoordinateSpace::World),
                    });
                }
            }
        }

        let world_pose = self.pose(CoordinateSpace::World);

        for button in 0..self.buttons.len() {
            let pressed = degrade(provider.is_button_pressed(target, button), || {
                format!("querying {target} button {button}")
            })?;
            let Some(pressed) = pressed else {
                continue;
            };
            let was_pressed = self.buttons[button];
            if pressed && !was_pressed {
                events.push(TrackerEvent::ButtonPress { target, button, world_pose });
            } else if !pressed && was_pressed {
                events.push(TrackerEvent::ButtonRelease { target, button, world_pose });
            }
            self.buttons[button] = pressed;
        }

        let tap = degrade(provider.is_tap_pressed(target), || format!("querying {target} tap"))?;
        if let Some(pressed) = tap {
            if pressed && !self.tap_pressed {
                events.push(TrackerEvent::TapPress { target, world_pose });
            } else if !pressed && self.tap_pressed {
                events.push(TrackerEvent::TapRelease { target, world_pose });
            }
            self.tap_pressed = pressed;
        }

        Ok(())
    }
}

/// Owns the [`TargetState`] of every target.
#[derive(Debug, Clone)]
pub struct PoseTracker {
    targets: [TargetState; TargetType::COUNT],
}

impl PoseTracker {
    /// Sizes each target's button array from the provider. Targets whose
    /// button count cannot be queried get no buttons.
    pub fn new<P: TrackingProvider + ?Sized>(provider: &P) -> Result<Self> {
        let mut counts = [0usize; TargetType::COUNT];
        for target in TargetType::ALL {
            counts[target.index()] = degrade(provider.button_count(target), || {
                format!("querying {target} button count")
            })?
            .unwrap_or(0);
            tracing::debug!(%target, buttons = counts[target.index()], "Initialized target");
        }
        Ok(Self {
            targets: TargetType::ALL.map(|target| TargetState::new(target, counts[target.index()])),
        })
    }

    /// Runs one tick for every target, appending events in target order.
    pub fn update<P: TrackingProvider + ?Sized>(
        &mut self,
        provider: &P,
        registry: &SpaceRegistry,
        events: &mut Vec<TrackerEvent>,
    ) -> Result<()> {
        for state in &mut self.targets {
            state.update(provider, registry, events)?;
        }
        Ok(())
    }

    #[inline]
    pub fn target(&self, target: TargetType) -> &TargetState {
        &self.targets[target.index()]
    }

    #[inline]
    pub fn pose(&self, target: TargetType, space: CoordinateSpace) -> Pose {
        self.target(target).pose(space)
    }
}
