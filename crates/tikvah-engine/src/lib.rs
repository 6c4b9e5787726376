//! Tikvah round engine: everything a device needs to work out where an
//! attendee sits and who they are talking to, from shared records alone.
//!
//! - `clock`: phase / round / countdown from one shared start time
//! - `rotation`: round-robin table shift and partner lookup
//! - `seating`: first-fit seat allocation and the launch renumbering plan
//! - `compatibility`: ordered chain of pairing rules
//! - `live`: the combined per-attendee view

pub mod clock;
pub mod compatibility;
pub mod error;
pub mod live;
pub mod rotation;
pub mod seating;

pub use clock::{ClockReading, EventClock, MOVE_BUFFER_SECONDS, Phase, round_seconds_from_minutes};
pub use compatibility::{CompatibilityFilter, CompatibilityRule, Verdict};
pub use error::EngineError;
pub use live::{LiveView, PartnerCard};
pub use rotation::{Capacity, Pairing, RotationResolver};
pub use seating::{LaunchEffect, LaunchPlan, SlotAllocator, first_free, plan_launch};
