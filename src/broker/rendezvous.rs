//! Rendezvous registry - pairs sockets that present the same pair code

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::protocol::BrokerMsg;

/// Outgoing queue of one connected peer
pub type PeerTx = mpsc::UnboundedSender<BrokerMsg>;

struct Member {
    id: Uuid,
    tx: PeerTx,
}

/// Result of joining a pair code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First peer in; waiting for the counterpart
    Waiting,
    /// Second peer in; both sides were sent `connect`
    Paired,
}

#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    #[error("pair code must not be empty")]
    EmptyCode,

    #[error("pair code {0} already has two peers")]
    Full(String),
}

/// Registry of open pair codes
#[derive(Default)]
pub struct Rendezvous {
    rooms: DashMap<String, Vec<Member>>,
}

impl Rendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer under `code`
    pub fn join(&self, code: &str, id: Uuid, tx: PeerTx) -> Result<JoinOutcome, RendezvousError> {
        if code.trim().is_empty() {
            return Err(RendezvousError::EmptyCode);
        }

        let mut room = self.rooms.entry(code.to_string()).or_default();
        if room.len() >= 2 {
            return Err(RendezvousError::Full(code.to_string()));
        }
        room.push(Member { id, tx });

        if room.len() == 2 {
            for member in room.iter() {
                let _ = member.tx.send(BrokerMsg::Connect);
            }
            info!(pair_code = %code, "peers paired");
            Ok(JoinOutcome::Paired)
        } else {
            debug!(pair_code = %code, peer_id = %id, "peer waiting for counterpart");
            Ok(JoinOutcome::Waiting)
        }
    }

    /// Forward `msg` to the other peer of `code`. Returns false if nobody is there.
    pub fn relay(&self, code: &str, from: Uuid, msg: BrokerMsg) -> bool {
        self.rooms
            .get(code)
            .and_then(|room| {
                room.iter()
                    .find(|m| m.id != from)
                    .map(|m| m.tx.send(msg).is_ok())
            })
            .unwrap_or(false)
    }

    /// Remove a peer and tell its counterpart
    pub fn leave(&self, code: &str, id: Uuid) {
        let now_empty = match self.rooms.get_mut(code) {
            Some(mut room) => {
                room.retain(|m| m.id != id);
                for member in room.iter() {
                    let _ = member.tx.send(BrokerMsg::Disconnect);
                }
                room.is_empty()
            }
            None => return,
        };

        if now_empty {
            self.rooms.remove_if(code, |_, room| room.is_empty());
        }
        debug!(pair_code = %code, peer_id = %id, "peer left");
    }

    /// Pair codes with a single peer waiting
    pub fn waiting(&self) -> usize {
        self.rooms.iter().filter(|r| r.value().len() == 1).count()
    }

    pub fn paired(&self) -> usize {
        self.rooms.iter().filter(|r| r.value().len() == 2).count()
    }
}
