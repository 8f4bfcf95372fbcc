//! Pose wire types
//! Payload is bare JSON: `{"rotation":{..},"position":{..}}`, no envelope

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pairing::Role;

use super::Vec3;

/// Pose produced by an authoritative seat
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Euler rotation in degrees
    pub rotation: Vec3,
    /// Absent for roles that only rotate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self {
            rotation,
            position: Some(position),
        }
    }

    pub fn rotation_only(rotation: Vec3) -> Self {
        Self {
            rotation,
            position: None,
        }
    }

    /// Strip the parts of the pose the role is not authoritative for
    pub fn for_role(self, role: Role) -> Self {
        if role.owns_position() {
            self
        } else {
            Self::rotation_only(self.rotation)
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound pose as decoded from a peer.
///
/// Rotation is optional here so a frame from a misbehaving sender can still be
/// applied against the last known rotation instead of being lost.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct PoseFrame {
    #[serde(default)]
    pub rotation: Option<Vec3>,
    #[serde(default)]
    pub position: Option<Vec3>,
}

impl PoseFrame {
    /// Decode a wire payload; non-finite components are treated as missing
    pub fn decode(payload: &str) -> Result<Self> {
        let frame: PoseFrame = serde_json::from_str(payload)?;
        Ok(Self {
            rotation: frame.rotation.filter(Vec3::is_finite),
            position: frame.position.filter(Vec3::is_finite),
        })
    }
}

impl From<Pose> for PoseFrame {
    fn from(pose: Pose) -> Self {
        Self {
            rotation: Some(pose.rotation),
            position: pose.position,
        }
    }
}
