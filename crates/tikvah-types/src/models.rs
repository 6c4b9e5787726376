use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown gender '{0}'")]
    Gender(String),
    #[error("malformed seat number '{0}'")]
    Seat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub fn opposite(self) -> Self {
        match self {
            Self::Man => Self::Woman,
            Self::Woman => Self::Man,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Man => "man",
            Self::Woman => "woman",
        }
    }

    /// Letter shown in front of a seat number on badges and table cards.
    pub fn seat_prefix(self) -> char {
        match self {
            Self::Man => 'B',
            Self::Woman => 'G',
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "man" => Ok(Self::Man),
            "woman" => Ok(Self::Woman),
            other => Err(ParseError::Gender(other.to_string())),
        }
    }
}

/// A per-gender seat. Women keep theirs for the whole event; for men it is
/// the starting position the rotation shifts from.
///
/// Serialized in its display form (`G3`, `B1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatNumber {
    pub gender: Gender,
    pub number: u32,
}

impl SeatNumber {
    pub fn new(gender: Gender, number: u32) -> Self {
        Self { gender, number }
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.gender.seat_prefix(), self.number)
    }
}

impl FromStr for SeatNumber {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let gender = match chars.next() {
            Some('G') => Gender::Woman,
            Some('B') => Gender::Man,
            _ => return Err(ParseError::Seat(s.to_string())),
        };
        // Canonical form only: no sign, no leading zero
        let digits = chars.as_str();
        if !digits.starts_with(|c: char| ('1'..='9').contains(&c))
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ParseError::Seat(s.to_string()));
        }
        let number: u32 = digits.parse().map_err(|_| ParseError::Seat(s.to_string()))?;
        Ok(Self { gender, number })
    }
}

impl TryFrom<String> for SeatNumber {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatNumber> for String {
    fn from(seat: SeatNumber) -> Self {
        seat.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    SingleWithKids,
    Divorced,
    DivorcedWithKids,
    Widowed,
    WidowedWithKids,
}

impl MaritalStatus {
    pub fn is_divorced(self) -> bool {
        matches!(self, Self::Divorced | Self::DivorcedWithKids)
    }
}

/// Answers from the registration form used for pairing decisions.
/// Empty `open_to_*` lists mean "no preference".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub age: Option<u32>,
    pub looking_for: Option<Gender>,
    pub age_range: Option<AgeRange>,
    pub religious_level: Option<String>,
    pub subgroup: Option<String>,
    pub open_to_subgroups: Vec<String>,
    pub ethnicity: Option<String>,
    pub open_to_ethnicities: Vec<String>,
    pub marital_status: Option<MaritalStatus>,
    pub open_to_marital_statuses: Vec<MaritalStatus>,
    pub is_kohen: bool,
    pub dress: Option<String>,
    pub open_to_dress: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub round_duration_seconds: u32,
    /// Shared epoch every device derives the round state from.
    pub start_time: Option<DateTime<Utc>>,
    /// Frozen at launch to the number of checked-in women.
    pub total_tables: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Gender,
    pub checked_in: bool,
    pub seat: Option<SeatNumber>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}
