//! Automatic fade between monoscopic and stereoscopic viewing.
//!
//! While nobody is tracked the frustum rests at the default head pose with
//! zero eye separation. When the head appears, IPD and head pose are eased
//! toward the live values; after the head has been lost for long enough,
//! they are eased back.

use crate::config::CoreConfig;
use crate::pose::Pose;
use crate::tween::{Ease, TweenScheduler};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoStereoState {
    #[default]
    IdleMono,
    IdleStereo,
    /// A fade is running; visibility is ignored until it completes.
    Animating,
}

impl AutoStereoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdleMono => "idle_mono",
            Self::IdleStereo => "idle_stereo",
            Self::Animating => "animating",
        }
    }
}

impl fmt::Display for AutoStereoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stereo parameters handed to the frustum every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumState {
    pub ipd: f32,
    /// Tracker-space head pose the frustum is computed from.
    pub head_pose: Pose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: AutoStereoState,
    pub to: AutoStereoState,
}

/// State the transition tweens read and write.
#[derive(Debug, Clone)]
struct StereoFrame {
    state: AutoStereoState,
    idle_elapsed: f32,
    frustum: FrustumState,
    tracked_head: Pose,
    target_ipd: f32,
}

#[derive(Debug)]
pub struct AutoStereo {
    frame: StereoFrame,
    tweens: TweenScheduler<StereoFrame>,
    enabled: bool,
    delay: f32,
    duration: f32,
}

impl AutoStereo {
    pub fn new(config: &CoreConfig, default_head: Pose) -> Self {
        Self {
            frame: StereoFrame {
                state: AutoStereoState::IdleMono,
                idle_elapsed: 0.0,
                frustum: FrustumState {
                    ipd: 0.0,
                    head_pose: default_head,
                },
                tracked_head: default_head,
                target_ipd: config.ipd,
            },
            tweens: TweenScheduler::new(),
            enabled: config.enable_auto_stereo,
            delay: config.auto_stereo_delay,
            duration: config.auto_stereo_duration,
        }
    }

    pub fn state(&self) -> AutoStereoState {
        self.frame.state
    }

    pub fn frustum(&self) -> &FrustumState {
        &self.frame.frustum
    }

    /// Seconds the head has been continuously invisible while in stereo.
    pub fn idle_elapsed(&self) -> f32 {
        self.frame.idle_elapsed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Picks up IPD, timing and enable flag changes.
    pub fn apply_config(&mut self, config: &CoreConfig) {
        self.enabled = config.enable_auto_stereo;
        self.delay = config.auto_stereo_delay;
        self.duration = config.auto_stereo_duration;
        self.frame.target_ipd = config.ipd;
        if self.frame.state == AutoStereoState::IdleStereo {
            self.frame.frustum.ipd = config.ipd;
        }
    }

    /// Pins the frustum to the default head pose without running the state
    /// machine, as done while editing.
    pub fn hold(&mut self, default_head: Pose) {
        self.frame.frustum.head_pose = default_head;
    }

    /// Runs the state machine, then the fade tweens, for one tick of `dt`
    /// unscaled seconds.
    pub fn step(
        &mut self,
        head_visible: bool,
        tracked_head: Pose,
        default_head: Pose,
        dt: f32,
    ) -> Option<StateChange> {
        let before = self.frame.state;
        self.update(head_visible, tracked_head, default_head, dt);
        self.tweens.tick(dt, &mut self.frame);
        let after = self.frame.state;

        if before == after {
            return None;
        }
        tracing::info!(
            from = %before,
            to = %after,
            ipd = self.frame.frustum.ipd,
            "Auto-stereo transition"
        );
        Some(StateChange { from: before, to: after })
    }

    fn update(&mut self, head_visible: bool, tracked_head: Pose, default_head: Pose, dt: f32) {
        self.frame.tracked_head = tracked_head;

        if !self.enabled {
            self.frame.frustum.ipd = self.frame.target_ipd;
            self.frame.frustum.head_pose = tracked_head;
            return;
        }

        match self.frame.state {
            AutoStereoState::IdleMono => {
                self.frame.frustum.ipd = 0.0;
                self.frame.frustum.head_pose = default_head;
                if head_visible {
                    self.frame.state = AutoStereoState::Animating;
                    self.tweens
                        .start(self.duration, move |frame: &mut StereoFrame, t| {
                            frame.frustum.ipd = lerp(0.0, frame.target_ipd, t);
                            frame.frustum.head_pose = default_head.lerp(&frame.tracked_head, t);
                        })
                        .with_ease(Ease::EaseOutQuad)
                        .on_complete(|frame| {
                            frame.state = AutoStereoState::IdleStereo;
                            frame.idle_elapsed = 0.0;
                        });
                }
            }
            AutoStereoState::IdleStereo => {
                if head_visible {
                    self.frame.idle_elapsed = 0.0;
                    self.frame.frustum.head_pose = tracked_head;
                    return;
                }
                self.frame.idle_elapsed += dt;
                if self.frame.idle_elapsed >= self.delay {
                    self.frame.state = AutoStereoState::Animating;
                    let from_ipd = self.frame.frustum.ipd;
                    let from_pose = self.frame.frustum.head_pose;
                    self.tweens
                        .start(self.duration, move |frame: &mut StereoFrame, t| {
                            frame.frustum.ipd = lerp(from_ipd, 0.0, t);
                            frame.frustum.head_pose = from_pose.lerp(&default_head, t);
                        })
                        .with_ease(Ease::EaseOutQuad)
                        .on_complete(|frame| frame.state = AutoStereoState::IdleMono);
                }
            }
            AutoStereoState::Animating => {}
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
