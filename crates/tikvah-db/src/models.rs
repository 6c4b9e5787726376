/// Database row types. These map directly to SQLite rows.
/// Converted into tikvah-types records at the edge of this crate.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tikvah_types::{Event, Gender, Participant, Profile, SeatNumber};

use crate::error::{Result, StoreError};

pub struct EventRow {
    pub id: String,
    pub name: String,
    pub round_duration_seconds: i64,
    pub start_time: Option<String>,
    pub total_tables: i64,
    pub active: bool,
    pub created_at: String,
}

pub struct ParticipantRow {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: String,
    pub checked_in: bool,
    pub seat: Option<i64>,
    pub profile: String,
    pub created_at: String,
}

impl EventRow {
    pub fn into_event(self) -> Result<Event> {
        Ok(Event {
            id: parse_id(&self.id)?,
            round_duration_seconds: to_u32(self.round_duration_seconds, &self.id)?,
            start_time: self.start_time.as_deref().map(parse_time).transpose()?,
            total_tables: to_u32(self.total_tables, &self.id)?,
            active: self.active,
            created_at: parse_time(&self.created_at)?,
            name: self.name,
        })
    }
}

impl ParticipantRow {
    pub fn into_participant(self) -> Result<Participant> {
        let gender: Gender = self
            .gender
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("participant {}: {}", self.id, e)))?;
        let seat = self
            .seat
            .map(|n| to_u32(n, &self.id).map(|n| SeatNumber::new(gender, n)))
            .transpose()?;
        let profile: Profile = serde_json::from_str(&self.profile)
            .map_err(|e| StoreError::Corrupt(format!("participant {} profile: {}", self.id, e)))?;

        Ok(Participant {
            id: parse_id(&self.id)?,
            event_id: parse_id(&self.event_id)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            gender,
            checked_in: self.checked_in,
            seat,
            profile,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("id '{}': {}", raw, e)))
}

pub(crate) fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

fn to_u32(value: i64, id: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{}: value {} out of range", id, value)))
}
