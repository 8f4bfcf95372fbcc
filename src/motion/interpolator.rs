//! Smoothing of sparse, irregular pose updates into per-frame output
//!
//! Updates carry no timestamp. Pacing comes from local arrival times: the gap
//! between the last two arrivals is the estimate of how long the next transition
//! should take to play out.

use crate::util::time::BROADCAST_PERIOD_MS;

use super::{Pose, PoseFrame, Vec3};

/// Tuning for one followed entity
#[derive(Debug, Clone, Copy)]
pub struct InterpolatorConfig {
    /// Interval assumed until two updates have been seen (ms)
    pub default_interval_ms: f64,
    /// Resting height of the vehicle; sampled positions never leave it
    pub ground_height: f32,
    /// Whether the followed role owns translation
    pub tracks_position: bool,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: BROADCAST_PERIOD_MS,
            ground_height: DEFAULT_GROUND_HEIGHT,
            tracks_position: true,
        }
    }
}

/// Resting height of the tank hull above the arena floor
pub const DEFAULT_GROUND_HEIGHT: f32 = 1.0;

#[derive(Debug, Clone)]
struct InterpolationWindow {
    previous: Pose,
    /// Pose on screen when the window was last re-anchored
    current: Pose,
    next: Pose,
    last_update_ms: f64,
    interval_estimate_ms: f64,
}

impl InterpolationWindow {
    fn alpha(&self, now_ms: f64) -> f32 {
        if self.interval_estimate_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.last_update_ms) / self.interval_estimate_ms).clamp(0.0, 1.0) as f32
    }

    fn evaluate(&self, now_ms: f64, ground_height: f32) -> Pose {
        let alpha = self.alpha(now_ms);
        let rotation = self.previous.rotation.lerp_angles(self.next.rotation, alpha);
        let position = match (self.previous.position, self.next.position) {
            (Some(from), Some(to)) => Some(from.lerp(to, alpha)),
            (None, to) => to,
            (from, None) => from,
        };
        Pose {
            rotation,
            position: position.map(|p| p.with_y(ground_height)),
        }
    }
}

/// Follower side of one pose channel
#[derive(Debug, Clone)]
pub struct MotionInterpolator {
    config: InterpolatorConfig,
    idle: Pose,
    window: Option<InterpolationWindow>,
}

impl MotionInterpolator {
    /// `idle` is rendered until the first update arrives
    pub fn new(config: InterpolatorConfig, idle: Pose) -> Self {
        Self {
            config,
            idle,
            window: None,
        }
    }

    /// Accept an update that arrived at `arrival_ms`.
    ///
    /// The transition restarts from what is on screen right now, not from the old
    /// target, so a late update never snaps the entity backwards.
    pub fn ingest(&mut self, frame: PoseFrame, arrival_ms: f64) {
        let ground = self.config.ground_height;
        let tracks_position = self.config.tracks_position;
        let clamp = |p: Vec3| p.with_y(ground);

        match self.window.as_mut() {
            None => {
                let target = Pose {
                    rotation: frame.rotation.unwrap_or(self.idle.rotation),
                    position: if tracks_position {
                        frame.position.or(self.idle.position).map(clamp)
                    } else {
                        None
                    },
                };
                self.window = Some(InterpolationWindow {
                    previous: target,
                    current: target,
                    next: target,
                    last_update_ms: arrival_ms,
                    interval_estimate_ms: self.config.default_interval_ms,
                });
            }
            Some(window) => {
                let displayed = window.evaluate(arrival_ms, ground);

                let gap = arrival_ms - window.last_update_ms;
                if gap > 0.0 {
                    window.interval_estimate_ms = gap;
                }
                window.last_update_ms = arrival_ms;

                window.current = displayed;
                window.previous = displayed;
                window.next = Pose {
                    rotation: frame.rotation.unwrap_or(window.next.rotation),
                    position: if tracks_position {
                        frame.position.map(clamp).or(window.next.position)
                    } else {
                        None
                    },
                };
            }
        }
    }

    /// Pose to render at `now_ms`. Pure: repeated calls return the same pose.
    pub fn sample(&self, now_ms: f64) -> Pose {
        match &self.window {
            Some(window) => window.evaluate(now_ms, self.config.ground_height),
            None => self.idle,
        }
    }

    /// Drop all received state, e.g. when the followed vehicle is destroyed
    pub fn reset(&mut self) {
        self.window = None;
    }

    pub fn has_data(&self) -> bool {
        self.window.is_some()
    }

    /// Pose that was on screen when the latest update arrived
    pub fn anchor(&self) -> Option<Pose> {
        self.window.as_ref().map(|w| w.current)
    }

    pub fn last_update_ms(&self) -> Option<f64> {
        self.window.as_ref().map(|w| w.last_update_ms)
    }

    pub fn interval_estimate_ms(&self) -> f64 {
        self.window
            .as_ref()
            .map(|w| w.interval_estimate_ms)
            .unwrap_or(self.config.default_interval_ms)
    }

    pub fn config(&self) -> &InterpolatorConfig {
        &self.config
    }
}
