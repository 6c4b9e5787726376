use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use tikvah_types::{Event, Participant, SeatNumber};

use crate::clock::{ClockReading, EventClock, Phase};
use crate::compatibility::{CompatibilityFilter, Verdict};
use crate::rotation::{Capacity, Pairing, RotationResolver};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerCard {
    pub id: Uuid,
    pub name: String,
    pub subgroup: Option<String>,
    pub seat: Option<SeatNumber>,
}

impl From<&Participant> for PartnerCard {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            subgroup: p.profile.subgroup.clone(),
            seat: p.seat,
        }
    }
}

/// What one attendee's screen shows at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveView {
    #[serde(flatten)]
    pub clock: ClockReading,
    pub current_table: Option<u32>,
    /// Filled while walking to a table: the opening buffer and between rounds.
    pub next_table: Option<u32>,
    pub partner: Option<PartnerCard>,
    pub is_match: bool,
    pub rejected_by: Option<&'static str>,
    /// Everyone sharing the table when the rotation doubled up.
    pub collision: Vec<PartnerCard>,
    pub capacity: Capacity,
}

impl LiveView {
    /// `roster` is the event's full participant list. An inactive event is
    /// always shown as the lobby, whatever its start time says.
    pub fn compute(
        event: &Event,
        participant: &Participant,
        roster: &[Participant],
        filter: &CompatibilityFilter,
        now: DateTime<Utc>,
    ) -> Self {
        let clock = if event.active {
            EventClock::for_event(event).read(event.start_time, now)
        } else {
            ClockReading::NOT_STARTED
        };
        let resolver = RotationResolver::new(event.total_tables, roster);

        let mut view = Self {
            clock,
            current_table: None,
            next_table: None,
            partner: None,
            is_match: false,
            rejected_by: None,
            collision: Vec::new(),
            capacity: resolver.capacity(),
        };

        match clock.phase {
            Phase::NotStarted | Phase::Over => {}
            Phase::Starting => {
                view.next_table = resolver.current_table(participant, clock.round);
            }
            Phase::Moving => {
                view.current_table = resolver.current_table(participant, clock.round);
                view.next_table = resolver.next_table(participant, clock.round);
            }
            Phase::Dating => {
                view.current_table = resolver.current_table(participant, clock.round);
                match resolver.partner_at(participant, clock.round) {
                    Pairing::Partner(partner) => {
                        let verdict = filter.check(participant, partner);
                        view.partner = Some(partner.into());
                        view.is_match = verdict.is_match();
                        if let Verdict::Rejected { rule } = verdict {
                            view.rejected_by = Some(rule);
                        }
                    }
                    Pairing::Break => {}
                    Pairing::Collision(others) => {
                        view.collision = others.into_iter().map(PartnerCard::from).collect();
                    }
                }
            }
        }

        view
    }
}
