//! Transport traits for peer channels
//!
//! A transport hands out one bidirectional channel per pair code. Lifecycle
//! notifications and payloads arrive as queued [`ChannelEvent`]s which the owning
//! link drains once per tick; nothing here blocks.

use crate::error::Result;
use crate::pairing::PairCode;

/// Notification queued by a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Relay path to the counterpart established
    Connect,
    /// Direct low-latency path available
    Upgrade,
    Disconnect,
    Error(String),
    /// Payload from the counterpart
    Data(String),
}

/// One end of a paired channel
pub trait Channel: Send {
    /// Send a payload to the counterpart
    fn send(&mut self, payload: &str) -> Result<()>;

    /// Next queued event, or `None` if nothing is pending
    fn poll_event(&mut self) -> Option<ChannelEvent>;

    /// Release the channel. Must be safe to call more than once.
    fn close(&mut self);
}

/// Factory for channels, e.g. a broker client
pub trait Transport {
    /// Open a channel for `pair_code` through the broker at `broker_url`.
    ///
    /// Opening starts the handshake immediately.
    fn open(&self, pair_code: &PairCode, broker_url: &str) -> Result<Box<dyn Channel>>;
}

/// Broker endpoint derived from the configured proxy URL
pub fn broker_endpoint(proxy_url: &str) -> String {
    format!("{}/socketpeer/", proxy_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_endpoint() {
        assert_eq!(
            broker_endpoint("https://proxy.example.com/"),
            "https://proxy.example.com/socketpeer/"
        );
        assert_eq!(broker_endpoint("http://localhost:8080"), "http://localhost:8080/socketpeer/");
    }
}
