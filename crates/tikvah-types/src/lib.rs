pub mod api;
pub mod events;
pub mod models;

pub use models::{AgeRange, Event, Gender, MaritalStatus, Participant, Profile, SeatNumber};
