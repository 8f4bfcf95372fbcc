//! Motion state: poses on the wire and their smoothing on the follower side

mod interpolator;
mod pose;
mod vector;

pub use interpolator::{InterpolatorConfig, MotionInterpolator, DEFAULT_GROUND_HEIGHT};
pub use pose::{Pose, PoseFrame};
pub use vector::{lerp_angle, Vec3};
