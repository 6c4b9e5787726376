use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Gender, Profile, SeatNumber};

// -- Events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub name: String,
    /// Falls back to the server's configured default when absent.
    pub round_minutes: Option<u32>,
}

// -- Participants --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterParticipantRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Gender,
    /// When present, overrides `profile.age` with the age on the day of registration.
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfCheckInRequest {
    /// Email address or phone number, as typed by the attendee.
    pub identifier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub participant_id: Uuid,
    pub seat: SeatNumber,
    /// True when the attendee was already checked in and kept their seat.
    pub already_checked_in: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub participant_id: Uuid,
    pub checked_in: bool,
    pub seat: Option<SeatNumber>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub women_checked_in: u32,
    pub men_checked_in: u32,
    pub registered: u32,
}
