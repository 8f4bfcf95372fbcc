//! Set of seats taking part in a session

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::Error;

use super::{CharacterId, Role, Seat};

/// Every seat in play. Each seat links to every other seat exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    seats: BTreeSet<Seat>,
}

impl Roster {
    pub fn new(seats: impl IntoIterator<Item = Seat>) -> Self {
        Self {
            seats: seats.into_iter().collect(),
        }
    }

    /// Every role on every listed vehicle
    pub fn full(characters: impl IntoIterator<Item = CharacterId>) -> Self {
        let characters: Vec<CharacterId> = characters.into_iter().collect();
        Self::new(
            Role::ALL
                .iter()
                .flat_map(|role| characters.iter().map(|c| Seat::new(*role, c.clone()))),
        )
    }

    pub fn contains(&self, seat: &Seat) -> bool {
        self.seats.contains(seat)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter()
    }

    /// All seats except `local`
    pub fn counterparts<'a>(&'a self, local: &'a Seat) -> impl Iterator<Item = &'a Seat> + 'a {
        self.seats.iter().filter(move |s| *s != local)
    }

    /// Seats controlling the given vehicle
    pub fn seats_of<'a>(
        &'a self,
        character: &'a CharacterId,
    ) -> impl Iterator<Item = &'a Seat> + 'a {
        self.seats.iter().filter(move |s| &s.character_id == character)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

impl Default for Roster {
    /// Two tanks, each with a driver and a gunner
    fn default() -> Self {
        Self::full(["0", "1"].iter().filter_map(|c| CharacterId::new(*c).ok()))
    }
}

/// Parses a comma separated seat list, e.g. `driver:0,gunner:0`
impl FromStr for Roster {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seats = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Seat>, _>>()?;
        Ok(Self::new(seats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(s: &str) -> Seat {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_roster_has_three_counterparts() {
        let roster = Roster::default();
        assert_eq!(roster.len(), 4);

        let local = seat("driver:0");
        let others: Vec<&Seat> = roster.counterparts(&local).collect();
        assert_eq!(others.len(), 3);
        assert!(!others.contains(&&local));
    }

    #[test]
    fn test_full_expands_every_role() {
        let ids = ["0", "1"].map(|c| CharacterId::new(c).unwrap());
        let roster = Roster::full(ids);
        for s in ["driver:0", "gunner:0", "driver:1", "gunner:1"] {
            assert!(roster.contains(&seat(s)), "missing {s}");
        }
        assert_eq!(roster, Roster::default());
    }

    #[test]
    fn test_parse_dedups() {
        let roster: Roster = "driver:0, gunner:0,driver:0,".parse().unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.contains(&seat("gunner:0")));
    }

    #[test]
    fn test_parse_rejects_bad_seat() {
        assert!("driver:0,pilot:1".parse::<Roster>().is_err());
    }

    #[test]
    fn test_seats_of_character() {
        let roster = Roster::default();
        let one = CharacterId::new("1").unwrap();
        let seats: Vec<String> = roster.seats_of(&one).map(|s| s.to_string()).collect();
        assert_eq!(seats, vec!["driver1", "gunner1"]);
    }
}
