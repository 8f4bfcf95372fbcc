//! One participant's runtime: links, bindings and the per-tick pipeline
//!
//! Each tick runs in a fixed order so that everything received before the tick
//! is visible in the frame it renders:
//!
//! 1. drain every link and ingest the poses, tagged by sending seat
//! 2. authority binding reads local input and broadcasts on its cadence
//! 3. follower bindings sample and apply

mod binding;
mod runner;

pub use binding::{EntityRef, Part, Renderer, RoleBinding};
pub use runner::run;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::link::{PeerGroup, PeerLinkState, Transport};
use crate::pairing::{CharacterId, Seat};

/// Local participant state
pub struct Session {
    config: LinkConfig,
    local: Seat,
    group: PeerGroup,
    bindings: BTreeMap<Seat, RoleBinding>,
}

impl Session {
    /// Open all links for the configured seat and bind every roster seat
    pub fn new(config: LinkConfig, transport: &dyn Transport) -> Result<Self> {
        let local = config.seat();
        let group = PeerGroup::open(local.clone(), &config.roster, transport, &config)?;

        let bindings = config
            .roster
            .seats()
            .map(|seat| {
                let binding = if *seat == local {
                    RoleBinding::authority(seat.clone())
                } else {
                    RoleBinding::follower(
                        seat.clone(),
                        config.interpolator_for(seat.role),
                        config.idle_pose(seat.role),
                    )
                };
                (seat.clone(), binding)
            })
            .collect();

        info!(seat = %local, peers = group.len(), "session started");

        Ok(Self {
            config,
            local,
            group,
            bindings,
        })
    }

    pub fn local(&self) -> &Seat {
        &self.local
    }

    pub fn group(&self) -> &PeerGroup {
        &self.group
    }

    pub fn binding(&self, seat: &Seat) -> Option<&RoleBinding> {
        self.bindings.get(seat)
    }

    pub fn link_states(&self) -> Vec<(Seat, PeerLinkState)> {
        self.group.states()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Pause or resume broadcasting and sampling; links stay up either way
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Advance one render tick
    pub fn tick(&mut self, now_ms: f64, renderer: &mut dyn Renderer) {
        for inbound in self.group.poll(now_ms) {
            match self.bindings.get_mut(&inbound.from) {
                Some(binding) => {
                    binding.ingest(inbound.frame, now_ms);
                }
                None => warn!(from = %inbound.from, "pose from seat without binding"),
            }
        }

        if !self.config.enabled {
            return;
        }

        for binding in self.bindings.values_mut() {
            if let Some(pose) = binding.tick(now_ms, renderer) {
                self.group.broadcast_due(now_ms, &pose);
            }
        }
    }

    /// A vehicle was destroyed: stop driving it locally and drop its motion state
    pub fn character_destroyed(&mut self, character: &CharacterId) {
        for binding in self.bindings.values_mut() {
            if &binding.seat().character_id == character {
                binding.despawn();
            }
        }
        debug!(character = %character, "character destroyed");
    }

    pub fn character_respawned(&mut self, character: &CharacterId) {
        for binding in self.bindings.values_mut() {
            if &binding.seat().character_id == character {
                binding.respawn();
            }
        }
        debug!(character = %character, "character respawned");
    }

    /// Close every link. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.group.close();
    }
}
