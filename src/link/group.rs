//! All links of one local seat

use tracing::{error, info, warn};

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::motion::{Pose, PoseFrame};
use crate::pairing::{PairCode, Roster, Seat};

use super::peer::{LinkEvent, LinkOptions, PeerLink, PeerLinkState};
use super::transport::{broker_endpoint, Transport};

/// Pose received from a counterpart, tagged with the seat that sent it
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub from: Seat,
    pub frame: PoseFrame,
}

/// Fan-out of a local seat to every other seat in the roster.
///
/// Sends are push-only: a member that is not upgraded simply misses the update,
/// the next tick carries fresher state anyway.
pub struct PeerGroup {
    local: Seat,
    links: Vec<PeerLink>,
    closed: bool,
}

impl PeerGroup {
    /// Open one link per counterpart seat
    pub fn open(
        local: Seat,
        roster: &Roster,
        transport: &dyn Transport,
        config: &LinkConfig,
    ) -> Result<Self> {
        if config.proxy_url.trim().is_empty() {
            error!(seat = %local, "proxy URL not configured, no links created");
            return Err(Error::MissingProxyUrl);
        }
        if !roster.contains(&local) {
            return Err(Error::SeatNotInRoster(local.to_string()));
        }

        let broker_url = broker_endpoint(&config.proxy_url);
        let options = LinkOptions {
            broadcast_period_ms: config.broadcast_period_ms,
            debug: config.debug,
        };

        let mut links = Vec::with_capacity(roster.len().saturating_sub(1));
        for remote in roster.counterparts(&local) {
            let code = PairCode::between(&local, remote);
            info!(seat = %local, remote = %remote, pair_code = %code, "pair code derived");
            links.push(PeerLink::open(
                transport,
                &broker_url,
                code,
                remote.clone(),
                options,
            )?);
        }

        Ok(Self {
            local,
            links,
            closed: false,
        })
    }

    pub fn local(&self) -> &Seat {
        &self.local
    }

    pub fn links(&self) -> &[PeerLink] {
        &self.links
    }

    pub fn link(&self, remote: &Seat) -> Option<&PeerLink> {
        self.links.iter().find(|l| l.remote() == remote)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn upgraded_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_upgraded()).count()
    }

    pub fn states(&self) -> Vec<(Seat, PeerLinkState)> {
        self.links
            .iter()
            .map(|l| (l.remote().clone(), l.state()))
            .collect()
    }

    /// Send to every upgraded member. Returns how many members got the pose.
    pub fn broadcast(&mut self, pose: &Pose) -> usize {
        self.links
            .iter_mut()
            .map(|l| l.send(pose))
            .filter(|sent| *sent)
            .count()
    }

    /// Send to every upgraded member whose broadcast period has elapsed
    pub fn broadcast_due(&mut self, now_ms: f64, pose: &Pose) -> usize {
        self.links
            .iter_mut()
            .map(|l| l.send_if_due(now_ms, pose))
            .filter(|sent| *sent)
            .count()
    }

    /// Drain every link and collect the poses received, tagged by sender.
    ///
    /// Poses from one link keep their arrival order; there is no ordering across
    /// links.
    pub fn poll(&mut self, now_ms: f64) -> Vec<Inbound> {
        let mut inbound = Vec::new();
        for link in &mut self.links {
            for event in link.poll(now_ms) {
                match event {
                    LinkEvent::Pose(frame) => inbound.push(Inbound {
                        from: link.remote().clone(),
                        frame,
                    }),
                    LinkEvent::Errored(message) => {
                        warn!(
                            seat = %self.local,
                            remote = %link.remote(),
                            error = %message,
                            "link failed, rebuild the group to retry"
                        );
                    }
                    LinkEvent::Connected | LinkEvent::Upgraded | LinkEvent::Disconnected => {}
                }
            }
        }
        inbound
    }

    /// Close every member. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for link in &mut self.links {
            link.close();
        }
        info!(seat = %self.local, links = self.links.len(), "peer group closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for PeerGroup {
    fn drop(&mut self) {
        self.close();
    }
}
