//! Tank Link - peer pairing and motion sync for split-seat tanks
//!
//! Each tank is crewed by a driver, who owns the hull (position and heading),
//! and a gunner, who owns the turret (aim). Every participant opens one
//! [`PeerLink`](link::PeerLink) per counterpart seat through a rendezvous
//! broker, broadcasts the slice it owns and smooths the slices it receives.
//!
//! - [`pairing`]: seats, rosters and canonical pair codes
//! - [`link`]: transport seam, per-link lifecycle and fan-out
//! - [`motion`]: pose wire format and interpolation
//! - [`session`]: per-tick pipeline binding poses to rendered entities
//! - [`broker`]: the rendezvous server run by `tank-link-broker`

pub mod broker;
pub mod config;
pub mod link;
pub mod motion;
pub mod pairing;
pub mod session;
pub mod util;

mod error;

pub use config::LinkConfig;
pub use error::{Error, Result};
pub use link::{MemoryBroker, PeerGroup, PeerLink, PeerLinkState, Transport};
pub use motion::{MotionInterpolator, Pose, Vec3};
pub use pairing::{derive, CharacterId, PairCode, Role, Roster, Seat};
pub use session::{Renderer, Session};
