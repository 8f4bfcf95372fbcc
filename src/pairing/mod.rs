//! Seat identities and rendezvous pair codes
//!
//! Two participants find each other on the broker by independently computing the
//! same [`PairCode`]. The code is derived from both seats in canonical order, so it
//! does not matter which side does the computing.

mod roster;

pub use roster::Roster;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Control slice a participant owns.
///
/// Declaration order is the canonical pairing precedence: a driver is always
/// written before a gunner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owns translation and hull rotation
    Driver,
    /// Owns turret rotation. Firing is handled on the gunner's own client and is
    /// never part of a pose.
    Gunner,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Driver, Role::Gunner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Gunner => "gunner",
        }
    }

    /// Whether poses sent by this role carry a position
    pub fn owns_position(&self) -> bool {
        matches!(self, Role::Driver)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(Role::Driver),
            "gunner" => Ok(Role::Gunner),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}

/// Stable identifier of one vehicle, shared by every seat that controls it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CharacterId(String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::EmptyCharacterId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CharacterId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CharacterId> for String {
    fn from(id: CharacterId) -> Self {
        id.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One participant position: a role on a given vehicle.
///
/// Ordering is (role precedence, character id), which is the canonical order used
/// when writing pair codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seat {
    pub role: Role,
    pub character_id: CharacterId,
}

impl Seat {
    pub fn new(role: Role, character_id: CharacterId) -> Self {
        Self { role, character_id }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role, self.character_id)
    }
}

/// Parses `role:character`, e.g. `driver:0`
impl FromStr for Seat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, character) = s
            .split_once(':')
            .ok_or_else(|| Error::MalformedSeat(s.to_string()))?;
        Ok(Self::new(role.parse()?, CharacterId::new(character.trim())?))
    }
}

/// Rendezvous identifier shared by the two ends of one link
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairCode(String);

impl PairCode {
    /// Pair code for the link between two seats, independent of argument order
    pub fn between(a: &Seat, b: &Seat) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{first}_{second}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the pair code for a local seat talking to a remote seat
pub fn derive(
    local_role: Role,
    local_character: &CharacterId,
    remote_role: Role,
    remote_character: &CharacterId,
) -> PairCode {
    PairCode::between(
        &Seat::new(local_role, local_character.clone()),
        &Seat::new(remote_role, remote_character.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CharacterId {
        CharacterId::new(s).unwrap()
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive(Role::Driver, &id("0"), Role::Gunner, &id("1"));
        let b = derive(Role::Driver, &id("0"), Role::Gunner, &id("1"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "driver0_gunner1");
    }

    #[test]
    fn test_controller_and_controlled_sides_agree() {
        // The driver computes with itself first, the gunner with itself first.
        let driver_side = derive(Role::Driver, &id("0"), Role::Gunner, &id("0"));
        let gunner_side = derive(Role::Gunner, &id("0"), Role::Driver, &id("0"));
        assert_eq!(driver_side, gunner_side);
        assert_eq!(driver_side.as_str(), "driver0_gunner0");
    }

    #[test]
    fn test_same_role_orders_by_character() {
        let a = derive(Role::Gunner, &id("1"), Role::Gunner, &id("0"));
        assert_eq!(a.as_str(), "gunner0_gunner1");
    }

    #[test]
    fn test_empty_character_rejected() {
        assert!(matches!(CharacterId::new(""), Err(Error::EmptyCharacterId)));
        assert!(matches!(CharacterId::new("  "), Err(Error::EmptyCharacterId)));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Driver".parse::<Role>().unwrap(), Role::Driver);
        assert_eq!(" gunner".parse::<Role>().unwrap(), Role::Gunner);
        assert!(matches!("".parse::<Role>(), Err(Error::UnknownRole(_))));
        assert!(matches!("pilot".parse::<Role>(), Err(Error::UnknownRole(_))));
    }

    #[test]
    fn test_seat_parse() {
        let seat: Seat = "gunner:7".parse().unwrap();
        assert_eq!(seat, Seat::new(Role::Gunner, id("7")));
        assert_eq!(seat.to_string(), "gunner7");
        assert!(matches!("gunner".parse::<Seat>(), Err(Error::MalformedSeat(_))));
    }

    #[test]
    fn test_character_id_deserialize_validates() {
        let ok: CharacterId = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(ok.as_str(), "3");
        assert!(serde_json::from_str::<CharacterId>("\"\"").is_err());
    }
}
