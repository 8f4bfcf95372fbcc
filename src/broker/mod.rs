//! Rendezvous broker: pairs two sockets per pair code and relays between them

pub mod handler;
pub mod protocol;
pub mod rendezvous;
pub mod routes;

pub use protocol::{BrokerMsg, PeerMsg};
pub use rendezvous::{JoinOutcome, Rendezvous, RendezvousError};
pub use routes::build_router;

use std::sync::Arc;

use crate::config::BrokerConfig;

/// Shared broker state
#[derive(Clone)]
pub struct BrokerState {
    pub config: Arc<BrokerConfig>,
    pub rendezvous: Arc<Rendezvous>,
}

impl BrokerState {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config: Arc::new(config),
            rendezvous: Arc::new(Rendezvous::new()),
        }
    }
}
