//! Minimal 3-component vector used for positions and Euler rotations

use serde::{Deserialize, Serialize};

/// Position in world units or rotation in degrees, depending on context
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation. Exact at both ends.
    pub fn lerp(self, to: Vec3, alpha: f32) -> Vec3 {
        Vec3 {
            x: lerp(self.x, to.x, alpha),
            y: lerp(self.y, to.y, alpha),
            z: lerp(self.z, to.z, alpha),
        }
    }

    /// Componentwise interpolation of Euler angles along the shortest arc
    pub fn lerp_angles(self, to: Vec3, alpha: f32) -> Vec3 {
        Vec3 {
            x: lerp_angle(self.x, to.x, alpha),
            y: lerp_angle(self.y, to.y, alpha),
            z: lerp_angle(self.z, to.z, alpha),
        }
    }

    pub fn with_y(self, y: f32) -> Vec3 {
        Vec3 { y, ..self }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

fn lerp(from: f32, to: f32, alpha: f32) -> f32 {
    from * (1.0 - alpha) + to * alpha
}

/// Interpolate between two angles in degrees, never turning more than 180°.
///
/// The result is not normalized, so a turn from 170° to -170° passes through
/// 180° and ends exactly on the target value.
pub fn lerp_angle(from: f32, to: f32, alpha: f32) -> f32 {
    if alpha <= 0.0 {
        return from;
    }
    if alpha >= 1.0 {
        return to;
    }
    let delta = (to - from + 180.0).rem_euclid(360.0) - 180.0;
    from + delta * alpha
}
