//! In-process rendezvous transport
//!
//! Pairs two channels opened with the same pair code, the same way the broker
//! service pairs two sockets. Used for hot-seat play on one machine and for tests,
//! where the lifecycle can be driven by hand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::pairing::PairCode;

use super::transport::{Channel, ChannelEvent, Transport};

struct Endpoint {
    id: u64,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

#[derive(Default)]
struct Rooms {
    rooms: HashMap<PairCode, Vec<Endpoint>>,
}

impl Rooms {
    fn notify_all(&self, code: &PairCode, event: ChannelEvent) -> bool {
        match self.rooms.get(code) {
            Some(ends) => {
                for end in ends {
                    let _ = end.tx.send(event.clone());
                }
                !ends.is_empty()
            }
            None => false,
        }
    }
}

/// Shared rendezvous point; cheap to clone
#[derive(Clone)]
pub struct MemoryBroker {
    rooms: Arc<Mutex<Rooms>>,
    next_id: Arc<AtomicU64>,
    auto_upgrade: bool,
}

impl MemoryBroker {
    /// Broker that upgrades every pair as soon as it connects
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(Mutex::new(Rooms::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            auto_upgrade: true,
        }
    }

    /// Broker that stops at `connected`; call [`MemoryBroker::upgrade`] to go on
    pub fn relay_only() -> Self {
        Self {
            auto_upgrade: false,
            ..Self::new()
        }
    }

    /// Signal that the direct path for `code` is up
    pub fn upgrade(&self, code: &PairCode) -> bool {
        self.rooms.lock().notify_all(code, ChannelEvent::Upgrade)
    }

    /// Inject a transport error on both ends of `code`
    pub fn fail(&self, code: &PairCode, message: &str) -> bool {
        self.rooms
            .lock()
            .notify_all(code, ChannelEvent::Error(message.to_string()))
    }

    /// Drop the pair as if the broker went away
    pub fn disconnect(&self, code: &PairCode) -> bool {
        let mut rooms = self.rooms.lock();
        let notified = rooms.notify_all(code, ChannelEvent::Disconnect);
        rooms.rooms.remove(code);
        notified
    }

    /// Number of open ends waiting for their counterpart
    pub fn waiting(&self) -> usize {
        self.rooms.lock().rooms.values().filter(|ends| ends.len() == 1).count()
    }

    pub fn paired(&self) -> usize {
        self.rooms.lock().rooms.values().filter(|ends| ends.len() == 2).count()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryBroker {
    fn open(&self, pair_code: &PairCode, broker_url: &str) -> Result<Box<dyn Channel>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut rooms = self.rooms.lock();
        let ends = rooms.rooms.entry(pair_code.clone()).or_default();
        if ends.len() >= 2 {
            return Err(Error::Transport(format!("pair code {pair_code} already in use")));
        }
        ends.push(Endpoint { id, tx });
        trace!(pair_code = %pair_code, broker_url, "memory channel opened");

        if ends.len() == 2 {
            for end in ends.iter() {
                let _ = end.tx.send(ChannelEvent::Connect);
                if self.auto_upgrade {
                    let _ = end.tx.send(ChannelEvent::Upgrade);
                }
            }
        }

        Ok(Box::new(MemoryChannel {
            id,
            pair_code: pair_code.clone(),
            rooms: self.rooms.clone(),
            rx,
            closed: false,
        }))
    }
}

/// One end of an in-process pair
pub struct MemoryChannel {
    id: u64,
    pair_code: PairCode,
    rooms: Arc<Mutex<Rooms>>,
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
    closed: bool,
}

impl Channel for MemoryChannel {
    fn send(&mut self, payload: &str) -> Result<()> {
        if self.closed {
            return Err(Error::Transport("channel closed".to_string()));
        }
        let rooms = self.rooms.lock();
        let peer = rooms
            .rooms
            .get(&self.pair_code)
            .and_then(|ends| ends.iter().find(|end| end.id != self.id))
            .ok_or_else(|| Error::Transport("no counterpart connected".to_string()))?;
        peer.tx
            .send(ChannelEvent::Data(payload.to_string()))
            .map_err(|_| Error::Transport("counterpart dropped".to_string()))
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }
        self.rx.try_recv().ok()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.rx.close();

        let mut rooms = self.rooms.lock();
        if let Some(ends) = rooms.rooms.get_mut(&self.pair_code) {
            ends.retain(|end| end.id != self.id);
            for end in ends.iter() {
                let _ = end.tx.send(ChannelEvent::Disconnect);
            }
            if ends.is_empty() {
                rooms.rooms.remove(&self.pair_code);
            }
        }
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.close();
    }
}
