//! Connection to exactly one counterpart seat

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::motion::{Pose, PoseFrame};
use crate::pairing::{PairCode, Seat};

use super::transport::{Channel, ChannelEvent, Transport};

/// Lifecycle of a peer link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerLinkState {
    /// Constructed, channel not yet opened
    Idle,
    /// Channel opened, waiting for the handshake
    Connecting,
    /// Relay path up; poses are not exchanged yet
    Connected,
    /// Direct path up; poses flow both ways
    Upgraded,
    Disconnected,
    Errored,
}

impl PeerLinkState {
    /// Terminal states never leave again without a new link
    pub fn is_terminal(&self) -> bool {
        matches!(self, PeerLinkState::Disconnected | PeerLinkState::Errored)
    }
}

/// What happened on a link during one poll
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Upgraded,
    Disconnected,
    Errored(String),
    Pose(PoseFrame),
}

/// Periodic send schedule, armed while the link is live
#[derive(Debug, Clone, Copy)]
struct SendTimer {
    period_ms: f64,
    next_due_ms: f64,
}

impl SendTimer {
    fn fire(&mut self, now_ms: f64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        // Missed periods are skipped rather than burst.
        self.next_due_ms = now_ms + self.period_ms;
        true
    }
}

/// Per-link options taken from the session config
#[derive(Debug, Clone, Copy)]
pub struct LinkOptions {
    pub broadcast_period_ms: f64,
    /// Log lifecycle transitions at info instead of debug
    pub debug: bool,
}

macro_rules! lifecycle {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// One bidirectional pose channel.
///
/// The channel is opened during construction; every link must eventually be
/// [closed](PeerLink::close) to release it.
pub struct PeerLink {
    pair_code: PairCode,
    remote: Seat,
    state: PeerLinkState,
    channel: Option<Box<dyn Channel>>,
    timer: Option<SendTimer>,
    options: LinkOptions,
    last_error: Option<String>,
}

impl PeerLink {
    /// Open a link through `transport`.
    ///
    /// A missing broker URL is a configuration error and no link is built. A
    /// transport that fails to open yields a link in the `Errored` state.
    pub fn open(
        transport: &dyn Transport,
        broker_url: &str,
        pair_code: PairCode,
        remote: Seat,
        options: LinkOptions,
    ) -> Result<Self> {
        if broker_url.trim().is_empty() {
            error!(pair_code = %pair_code, "proxy URL not configured, link not created");
            return Err(Error::MissingProxyUrl);
        }

        let mut link = Self {
            pair_code,
            remote,
            state: PeerLinkState::Idle,
            channel: None,
            timer: None,
            options,
            last_error: None,
        };

        match transport.open(&link.pair_code, broker_url) {
            Ok(channel) => {
                link.channel = Some(channel);
                link.state = PeerLinkState::Connecting;
                lifecycle!(options.debug, pair_code = %link.pair_code, remote = %link.remote, "peer connecting");
            }
            Err(e) => {
                link.fail(e.to_string());
            }
        }

        Ok(link)
    }

    pub fn state(&self) -> PeerLinkState {
        self.state
    }

    pub fn pair_code(&self) -> &PairCode {
        &self.pair_code
    }

    pub fn remote(&self) -> &Seat {
        &self.remote
    }

    pub fn is_upgraded(&self) -> bool {
        self.state == PeerLinkState::Upgraded
    }

    pub fn has_send_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drain pending channel events and advance the state machine
    pub fn poll(&mut self, now_ms: f64) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.channel.as_mut().and_then(|c| c.poll_event()) {
            if let Some(event) = self.handle(event, now_ms) {
                events.push(event);
            }
        }
        events
    }

    fn handle(&mut self, event: ChannelEvent, now_ms: f64) -> Option<LinkEvent> {
        match event {
            ChannelEvent::Connect => {
                if self.state != PeerLinkState::Connecting {
                    return None;
                }
                self.state = PeerLinkState::Connected;
                self.timer = Some(SendTimer {
                    period_ms: self.options.broadcast_period_ms,
                    next_due_ms: now_ms,
                });
                lifecycle!(self.options.debug, pair_code = %self.pair_code, "peer connected");
                Some(LinkEvent::Connected)
            }
            ChannelEvent::Upgrade => {
                if self.state != PeerLinkState::Connected {
                    return None;
                }
                self.state = PeerLinkState::Upgraded;
                lifecycle!(self.options.debug, pair_code = %self.pair_code, "peer upgraded");
                Some(LinkEvent::Upgraded)
            }
            ChannelEvent::Disconnect => {
                if self.state.is_terminal() {
                    return None;
                }
                self.state = PeerLinkState::Disconnected;
                self.timer = None;
                lifecycle!(self.options.debug, pair_code = %self.pair_code, "peer disconnected");
                Some(LinkEvent::Disconnected)
            }
            ChannelEvent::Error(message) => {
                if self.state.is_terminal() {
                    return None;
                }
                self.fail(message.clone());
                Some(LinkEvent::Errored(message))
            }
            ChannelEvent::Data(payload) => {
                // The pose handler is only attached once the direct path is up.
                if !self.is_upgraded() {
                    trace!(pair_code = %self.pair_code, state = ?self.state, "dropping early payload");
                    return None;
                }
                match PoseFrame::decode(&payload) {
                    Ok(frame) => Some(LinkEvent::Pose(frame)),
                    Err(e) => {
                        warn!(pair_code = %self.pair_code, error = %e, "malformed pose payload");
                        None
                    }
                }
            }
        }
    }

    /// Send a pose to the counterpart. No-op unless upgraded.
    pub fn send(&mut self, pose: &Pose) -> bool {
        if !self.is_upgraded() {
            return false;
        }
        let payload = match pose.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(pair_code = %self.pair_code, error = %e, "failed to encode pose");
                return false;
            }
        };
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        match channel.send(&payload) {
            Ok(()) => true,
            Err(e) => {
                self.fail(e.to_string());
                false
            }
        }
    }

    /// Send if this link's broadcast period has elapsed
    pub fn send_if_due(&mut self, now_ms: f64, pose: &Pose) -> bool {
        if !self.is_upgraded() {
            return false;
        }
        let due = self.timer.as_mut().map_or(false, |timer| timer.fire(now_ms));
        due && self.send(pose)
    }

    /// Tear down from any state. Always ends `Disconnected`.
    pub fn close(&mut self) {
        self.timer = None;
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if self.state != PeerLinkState::Disconnected {
            lifecycle!(self.options.debug, pair_code = %self.pair_code, "peer closed");
        }
        self.state = PeerLinkState::Disconnected;
    }

    fn fail(&mut self, message: String) {
        error!(pair_code = %self.pair_code, error = %message, "peer error");
        self.state = PeerLinkState::Errored;
        self.timer = None;
        self.last_error = Some(message);
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::memory::MemoryBroker;
    use crate::motion::Vec3;

    const OPTIONS: LinkOptions = LinkOptions {
        broadcast_period_ms: 100.0,
        debug: false,
    };

    fn seats() -> (Seat, Seat) {
        ("driver:0".parse().unwrap(), "gunner:0".parse().unwrap())
    }

    fn pair(broker: &MemoryBroker) -> (PeerLink, PeerLink) {
        let (driver, gunner) = seats();
        let code = PairCode::between(&driver, &gunner);
        let a = PeerLink::open(broker, "mem://", code.clone(), gunner, OPTIONS).unwrap();
        let b = PeerLink::open(broker, "mem://", code, driver, OPTIONS).unwrap();
        (a, b)
    }

    fn pose() -> Pose {
        Pose::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0))
    }

    #[test]
    fn test_missing_proxy_url() {
        let broker = MemoryBroker::new();
        let (driver, gunner) = seats();
        let code = PairCode::between(&driver, &gunner);
        let result = PeerLink::open(&broker, "  ", code, gunner, OPTIONS);
        assert!(matches!(result, Err(Error::MissingProxyUrl)));
        assert_eq!(broker.waiting(), 0);
    }

    #[test]
    fn test_full_lifecycle() {
        let broker = MemoryBroker::relay_only();
        let (mut a, mut b) = pair(&broker);
        assert_eq!(a.state(), PeerLinkState::Connecting);

        assert_eq!(a.poll(0.0), vec![LinkEvent::Connected]);
        assert_eq!(a.state(), PeerLinkState::Connected);
        assert!(a.has_send_timer());
        assert!(!a.send(&pose()));

        broker.upgrade(a.pair_code());
        assert_eq!(a.poll(0.0), vec![LinkEvent::Upgraded]);
        b.poll(0.0);
        assert!(b.is_upgraded());

        assert!(a.send(&pose()));
        assert_eq!(b.poll(10.0), vec![LinkEvent::Pose(pose().into())]);

        b.close();
        assert_eq!(a.poll(20.0), vec![LinkEvent::Disconnected]);
        assert!(!a.has_send_timer());
        assert!(!a.send(&pose()));
    }

    #[test]
    fn test_payload_before_upgrade_is_ignored() {
        let broker = MemoryBroker::relay_only();
        let (driver, gunner) = seats();
        let code = PairCode::between(&driver, &gunner);
        let mut link = PeerLink::open(&broker, "mem://", code.clone(), gunner, OPTIONS).unwrap();
        let mut raw = broker.open(&code, "mem://").unwrap();
        assert_eq!(link.poll(0.0), vec![LinkEvent::Connected]);

        raw.send(&pose().encode().unwrap()).unwrap();
        assert!(link.poll(1.0).is_empty());

        broker.upgrade(&code);
        raw.send(&pose().encode().unwrap()).unwrap();
        assert_eq!(
            link.poll(2.0),
            vec![LinkEvent::Upgraded, LinkEvent::Pose(pose().into())]
        );
    }

    #[test]
    fn test_events_are_handled_in_arrival_order() {
        let broker = MemoryBroker::relay_only();
        let (mut a, mut b) = pair(&broker);
        a.poll(0.0);
        broker.upgrade(a.pair_code());
        a.poll(0.0);
        assert!(a.send(&pose()));

        // b drains connect, upgrade and the payload in one go.
        assert_eq!(
            b.poll(0.0),
            vec![LinkEvent::Connected, LinkEvent::Upgraded, LinkEvent::Pose(pose().into())]
        );
    }

    #[test]
    fn test_close_before_upgrade() {
        let broker = MemoryBroker::relay_only();
        let (mut a, _b) = pair(&broker);
        a.poll(0.0);
        assert_eq!(a.state(), PeerLinkState::Connected);

        a.close();
        assert_eq!(a.state(), PeerLinkState::Disconnected);
        assert!(!a.has_send_timer());
        assert!(!a.send(&pose()));
        assert!(!a.send_if_due(1_000.0, &pose()));

        // Late events from the transport are ignored.
        broker.upgrade(a.pair_code());
        assert!(a.poll(5.0).is_empty());
        assert_eq!(a.state(), PeerLinkState::Disconnected);

        a.close();
        assert_eq!(a.state(), PeerLinkState::Disconnected);
    }

    #[test]
    fn test_transport_error_is_terminal() {
        let broker = MemoryBroker::relay_only();
        let (mut a, _b) = pair(&broker);
        a.poll(0.0);
        broker.fail(a.pair_code(), "ice failed");
        assert_eq!(a.poll(1.0), vec![LinkEvent::Errored("ice failed".to_string())]);
        assert_eq!(a.state(), PeerLinkState::Errored);
        assert_eq!(a.last_error(), Some("ice failed"));
        assert!(!a.has_send_timer());

        broker.upgrade(a.pair_code());
        assert!(a.poll(2.0).is_empty());
        assert_eq!(a.state(), PeerLinkState::Errored);

        a.close();
        assert_eq!(a.state(), PeerLinkState::Disconnected);
    }

    #[test]
    fn test_open_failure_yields_errored_link() {
        let broker = MemoryBroker::new();
        let (_a, _b) = pair(&broker);
        let (driver, gunner) = seats();
        let code = PairCode::between(&driver, &gunner);
        let third = PeerLink::open(&broker, "mem://", code, gunner, OPTIONS).unwrap();
        assert_eq!(third.state(), PeerLinkState::Errored);
    }

    #[test]
    fn test_send_if_due_follows_period() {
        let broker = MemoryBroker::new();
        let (mut a, mut b) = pair(&broker);
        a.poll(0.0);
        b.poll(0.0);

        assert!(a.send_if_due(0.0, &pose()));
        assert!(!a.send_if_due(50.0, &pose()));
        assert!(a.send_if_due(100.0, &pose()));
        assert!(!a.send_if_due(150.0, &pose()));
        assert_eq!(b.poll(200.0).len(), 2);
    }

    #[test]
    fn test_malformed_payload_dropped() {
        let broker = MemoryBroker::new();
        let (driver, gunner) = seats();
        let code = PairCode::between(&driver, &gunner);
        let mut link = PeerLink::open(&broker, "mem://", code.clone(), gunner, OPTIONS).unwrap();
        let mut raw = broker.open(&code, "mem://").unwrap();
        link.poll(0.0);
        raw.send("{oh hi").unwrap();
        raw.send(r#"{"rotation":{"x":0,"y":1,"z":0}}"#).unwrap();

        let events = link.poll(1.0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LinkEvent::Pose(_)));
    }
}
