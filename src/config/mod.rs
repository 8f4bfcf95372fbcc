//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::motion::{InterpolatorConfig, Pose, Vec3, DEFAULT_GROUND_HEIGHT};
use crate::pairing::{CharacterId, Role, Roster, Seat};
use crate::util::rate_limit::RELAY_RATE_LIMIT;
use crate::util::time::BROADCAST_PERIOD_MS;

/// Public broker used when nothing else is configured
pub const DEFAULT_PROXY_URL: &str = "https://proxy-controls.donmccurdy.com";

/// Broker service configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated); any origin if unset
    pub client_origin: Option<String>,
    /// Max relayed frames per second per connection
    pub relay_rate_limit: u32,
}

impl BrokerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").filter(|o| !o.trim().is_empty()),
            relay_rate_limit: parse_or(&lookup, "RELAY_RATE_LIMIT", RELAY_RATE_LIMIT)?,
        })
    }
}

/// Per-participant link configuration, passed explicitly at construction
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Broker endpoint base URL
    pub proxy_url: String,
    pub role: Role,
    pub character_id: CharacterId,
    /// Every seat in play
    pub roster: Roster,
    /// When false, links stay up but nothing is broadcast or sampled
    pub enabled: bool,
    /// Verbose lifecycle logging
    pub debug: bool,
    pub broadcast_period_ms: f64,
    pub ground_height: f32,
}

impl LinkConfig {
    pub fn new(seat: Seat) -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            role: seat.role,
            character_id: seat.character_id,
            roster: Roster::default(),
            enabled: true,
            debug: false,
            broadcast_period_ms: BROADCAST_PERIOD_MS,
            ground_height: DEFAULT_GROUND_HEIGHT,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let role: Role = lookup("ROLE")
            .ok_or(ConfigError::Missing("ROLE"))?
            .parse()
            .map_err(|_| ConfigError::Invalid("ROLE"))?;
        let character_id = CharacterId::new(
            lookup("CHARACTER_ID").ok_or(ConfigError::Missing("CHARACTER_ID"))?,
        )
        .map_err(|_| ConfigError::Invalid("CHARACTER_ID"))?;

        let mut config = Self::new(Seat::new(role, character_id));
        if let Some(url) = lookup("PROXY_URL") {
            config.proxy_url = url;
        }
        if let Some(roster) = lookup("ROSTER") {
            config.roster = roster.parse().map_err(|_| ConfigError::Invalid("ROSTER"))?;
        }
        config.enabled = parse_or(&lookup, "ENABLED", true)?;
        config.debug = parse_or(&lookup, "DEBUG", false)?;
        config.broadcast_period_ms =
            parse_or(&lookup, "BROADCAST_PERIOD_MS", BROADCAST_PERIOD_MS)?;
        if !config.broadcast_period_ms.is_finite() || config.broadcast_period_ms <= 0.0 {
            return Err(ConfigError::Invalid("BROADCAST_PERIOD_MS"));
        }
        config.ground_height = parse_or(&lookup, "GROUND_HEIGHT", DEFAULT_GROUND_HEIGHT)?;
        if !config.ground_height.is_finite() {
            return Err(ConfigError::Invalid("GROUND_HEIGHT"));
        }
        Ok(config)
    }

    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = url.into();
        self
    }

    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_broadcast_period_ms(mut self, period_ms: f64) -> Self {
        self.broadcast_period_ms = period_ms;
        self
    }

    pub fn with_ground_height(mut self, height: f32) -> Self {
        self.ground_height = height;
        self
    }

    /// The local participant's seat
    pub fn seat(&self) -> Seat {
        Seat::new(self.role, self.character_id.clone())
    }

    /// Interpolator tuning for following `role`
    pub fn interpolator_for(&self, role: Role) -> InterpolatorConfig {
        InterpolatorConfig {
            default_interval_ms: self.broadcast_period_ms,
            ground_height: self.ground_height,
            tracks_position: role.owns_position(),
        }
    }

    /// Pose shown for a followed seat until it sends its first update
    pub fn idle_pose(&self, role: Role) -> Pose {
        if role.owns_position() {
            Pose::new(Vec3::new(0.0, self.ground_height, 0.0), Vec3::ZERO)
        } else {
            Pose::rotation_only(Vec3::ZERO)
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
