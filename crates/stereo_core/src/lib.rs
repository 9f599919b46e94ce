// src/lib.rs
//! Engine-independent core of a tracked stereoscopic display.
//!
//! The crate keeps a per-frame cache of transforms between the five
//! coordinate spaces of a tracked display (tracker, display, viewport,
//! camera and world), tracks the 6DOF pose and button state of the head and
//! stylus targets, and drives the automatic transition between monoscopic
//! and stereoscopic viewing as the viewer's head appears and disappears.
//! On top of that it offers animated camera navigation and stylus grabbing
//! of scene objects.
//!
//! All hardware access goes through the traits in [`provider`]. Everything is
//! advanced synchronously by [`StereoCore::tick`], once per rendered frame.

pub mod autostereo;
pub mod config;
pub mod controller;
pub mod error;
pub mod manipulation;
pub mod navigation;
pub mod pose;
pub mod provider;
pub mod rig;
pub mod space;
pub mod tracker;
pub mod tween;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::autostereo::{AutoStereo, AutoStereoState, FrustumState, StateChange};
pub use crate::config::CoreConfig;
pub use crate::controller::{StereoCore, TickMode, TickReport};
pub use crate::error::{CoreError, ProviderError, Result};
pub use crate::manipulation::{
    Beam, GrabChange, GrabScene, ManipulationState, RayHit, StylusInput, StylusManipulator,
};
pub use crate::navigation::{CameraNavigator, CameraRig};
pub use crate::pose::Pose;
pub use crate::provider::{Device, DisplayProvider, RawPose, TrackingProvider, TransformProvider};
pub use crate::rig::{DisplayGeometry, ReferenceCamera};
pub use crate::space::{CoordinateSpace, SpaceRegistry};
pub use crate::tracker::{PoseTracker, TargetState, TargetType, TrackerEvent};
pub use crate::tween::{Ease, Tween, TweenCanceller, TweenHandle, TweenScheduler};
