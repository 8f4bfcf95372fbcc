//! Broker WebSocket protocol message definitions
//! These are the wire types between a peer and the rendezvous broker

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from a peer to the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMsg {
    /// Opaque negotiation data for the direct path
    Signal { data: Value },

    /// Payload relayed over the fallback path
    Data { payload: Value },
}

/// Messages sent from the broker to a peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrokerMsg {
    /// Counterpart joined; relay path is up
    Connect,

    /// Counterpart left
    Disconnect,

    /// Error message; the socket is closed afterwards when fatal
    Error { message: String },

    /// Negotiation data from the counterpart
    Signal { data: Value },

    /// Relayed payload from the counterpart
    Data { payload: Value },
}

impl From<PeerMsg> for BrokerMsg {
    fn from(msg: PeerMsg) -> Self {
        match msg {
            PeerMsg::Signal { data } => BrokerMsg::Signal { data },
            PeerMsg::Data { payload } => BrokerMsg::Data { payload },
        }
    }
}
