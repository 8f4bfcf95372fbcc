//! Peer links: transport seam, per-counterpart lifecycle and fan-out
//!
//! ```text
//!  local seat                                    counterpart seats
//! ┌────────────┐   PeerLink (pair code A_B)    ┌────────────┐
//! │            │◄─────────────────────────────►│  seat B    │
//! │ PeerGroup  │   PeerLink (pair code A_C)    ├────────────┤
//! │  (seat A)  │◄─────────────────────────────►│  seat C    │
//! └────────────┘                               └────────────┘
//! ```

pub mod group;
pub mod memory;
pub mod peer;
pub mod transport;

pub use group::{Inbound, PeerGroup};
pub use memory::MemoryBroker;
pub use peer::{LinkEvent, LinkOptions, PeerLink, PeerLinkState};
pub use transport::{broker_endpoint, Channel, ChannelEvent, Transport};
