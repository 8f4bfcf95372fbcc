//! Per-entity switch between authority and follower

use std::fmt;

use crate::motion::{InterpolatorConfig, MotionInterpolator, Pose, PoseFrame};
use crate::pairing::{CharacterId, Role, Seat};

/// Part of a vehicle a role drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    Hull,
    Turret,
}

impl From<Role> for Part {
    fn from(role: Role) -> Self {
        match role {
            Role::Driver => Part::Hull,
            Role::Gunner => Part::Turret,
        }
    }
}

/// Handle to a rendered entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub character_id: CharacterId,
    pub part: Part,
}

impl EntityRef {
    pub fn for_seat(seat: &Seat) -> Self {
        Self {
            character_id: seat.character_id.clone(),
            part: seat.role.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = match self.part {
            Part::Hull => "hull",
            Part::Turret => "turret",
        };
        write!(f, "{}/{}", self.character_id, part)
    }
}

/// Scene collaborator. Called once per tick per bound entity.
pub trait Renderer {
    fn read_local_pose(&mut self, entity: &EntityRef) -> Pose;
    fn apply_pose(&mut self, entity: &EntityRef, pose: &Pose);
}

enum Mode {
    Authority,
    Follower(MotionInterpolator),
}

/// Binds one pose channel (one seat's slice of a vehicle) to its entity
pub struct RoleBinding {
    seat: Seat,
    entity: EntityRef,
    mode: Mode,
    suspended: bool,
}

impl RoleBinding {
    /// Local input is the source of truth for this channel
    pub fn authority(seat: Seat) -> Self {
        Self {
            entity: EntityRef::for_seat(&seat),
            seat,
            mode: Mode::Authority,
            suspended: false,
        }
    }

    /// The channel is driven by a remote seat and smoothed locally
    pub fn follower(seat: Seat, config: InterpolatorConfig, idle: Pose) -> Self {
        Self {
            entity: EntityRef::for_seat(&seat),
            seat,
            mode: Mode::Follower(MotionInterpolator::new(config, idle)),
            suspended: false,
        }
    }

    pub fn seat(&self) -> &Seat {
        &self.seat
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn is_authority(&self) -> bool {
        matches!(self.mode, Mode::Authority)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn interpolator(&self) -> Option<&MotionInterpolator> {
        match &self.mode {
            Mode::Follower(interp) => Some(interp),
            Mode::Authority => None,
        }
    }

    /// Feed a received pose. Returns false if this binding does not follow.
    pub fn ingest(&mut self, frame: PoseFrame, arrival_ms: f64) -> bool {
        match &mut self.mode {
            Mode::Follower(interp) if !self.suspended => {
                interp.ingest(frame, arrival_ms);
                true
            }
            _ => false,
        }
    }

    /// Run one tick. An authority returns the pose to broadcast; a follower
    /// applies its sampled pose and returns `None`.
    pub fn tick(&mut self, now_ms: f64, renderer: &mut dyn Renderer) -> Option<Pose> {
        if self.suspended {
            return None;
        }
        match &self.mode {
            Mode::Authority => {
                let pose = renderer.read_local_pose(&self.entity);
                Some(pose.for_role(self.seat.role))
            }
            Mode::Follower(interp) => {
                let pose = interp.sample(now_ms);
                renderer.apply_pose(&self.entity, &pose);
                None
            }
        }
    }

    /// Vehicle destroyed: stop driving it and forget any received motion
    pub fn despawn(&mut self) {
        self.suspended = true;
        if let Mode::Follower(interp) = &mut self.mode {
            interp.reset();
        }
    }

    pub fn respawn(&mut self) {
        self.suspended = false;
    }
}
