use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::info;
use uuid::Uuid;

use tikvah_engine::{LaunchEffect, LaunchPlan, SlotAllocator, plan_launch};
use tikvah_types::{Event, Gender, Participant, SeatNumber};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::queries::{query_event, query_participant, query_participants};

/// Result of a check-in attempt.
#[derive(Debug, Clone)]
pub struct CheckIn {
    pub participant: Participant,
    pub seat: SeatNumber,
    /// False when the attendee was already checked in and kept their seat.
    pub newly_checked_in: bool,
}

impl Database {
    /// Check a participant in and give them the lowest free seat for their
    /// gender. Reading the occupied seats and writing the new one happen in
    /// one IMMEDIATE transaction, so concurrent check-ins never share a seat.
    pub fn check_in(&self, participant_id: Uuid) -> Result<CheckIn> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let participant = require_participant(&tx, participant_id)?;
            if let (true, Some(seat)) = (participant.checked_in, participant.seat) {
                return Ok(CheckIn {
                    participant,
                    seat,
                    newly_checked_in: false,
                });
            }

            let event = require_event(&tx, participant.event_id)?;
            ensure_seat_may_change(&event, participant.gender)?;

            let roster = query_participants(&tx, event.id, true)?;
            let seat = SlotAllocator::from_roster(&roster).allocate(participant.gender);

            tx.execute(
                "UPDATE participants SET checked_in = 1, seat = ?2 WHERE id = ?1",
                params![participant_id.to_string(), seat.number],
            )?;
            tx.commit()?;

            info!("{} ({}) checked in at {}", participant.name, participant_id, seat);
            Ok(CheckIn {
                participant: Participant {
                    checked_in: true,
                    seat: Some(seat),
                    ..participant
                },
                seat,
                newly_checked_in: true,
            })
        })
    }

    /// Check a participant out and release their seat. Nobody else moves;
    /// the gap goes to the next arrival.
    pub fn check_out(&self, participant_id: Uuid) -> Result<Participant> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let participant = require_participant(&tx, participant_id)?;
            if !participant.checked_in && participant.seat.is_none() {
                return Ok(participant);
            }

            let event = require_event(&tx, participant.event_id)?;
            ensure_seat_may_change(&event, participant.gender)?;

            tx.execute(
                "UPDATE participants SET checked_in = 0, seat = NULL WHERE id = ?1",
                [participant_id.to_string()],
            )?;
            tx.commit()?;

            info!("{} ({}) checked out", participant.name, participant_id);
            Ok(Participant {
                checked_in: false,
                seat: None,
                ..participant
            })
        })
    }

    /// Start the event: renumber seats, freeze the table count and stamp the
    /// shared start time, all in one transaction. Nothing is written unless
    /// every effect applies.
    pub fn launch_event(&self, event_id: Uuid, start_time: DateTime<Utc>) -> Result<(Event, LaunchPlan)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let event = require_event(&tx, event_id)?;
            if event.active {
                return Err(StoreError::AlreadyActive(event_id.to_string()));
            }

            let roster = query_participants(&tx, event_id, false)?;
            let plan = plan_launch(&roster, start_time);
            for effect in &plan.effects {
                apply_effect(&tx, event_id, effect)?;
            }
            tx.execute("UPDATE events SET active = 1 WHERE id = ?1", [event_id.to_string()])?;
            tx.commit()?;

            info!(
                "Event {} launched: {} tables, start {}",
                event_id, plan.total_tables, plan.start_time
            );
            let launched = Event {
                start_time: Some(plan.start_time),
                total_tables: plan.total_tables,
                active: true,
                ..event
            };
            Ok((launched, plan))
        })
    }
}

fn apply_effect(conn: &Connection, event_id: Uuid, effect: &LaunchEffect) -> Result<()> {
    match effect {
        LaunchEffect::ClearSeat { participant_id } => {
            conn.execute(
                "UPDATE participants SET seat = NULL WHERE id = ?1",
                [participant_id.to_string()],
            )?;
        }
        LaunchEffect::AssignSeat { participant_id, seat } => {
            conn.execute(
                "UPDATE participants SET seat = ?2 WHERE id = ?1",
                params![participant_id.to_string(), seat.number],
            )?;
        }
        LaunchEffect::FreezeTables { total_tables } => {
            conn.execute(
                "UPDATE events SET total_tables = ?2 WHERE id = ?1",
                params![event_id.to_string(), total_tables],
            )?;
        }
        LaunchEffect::StampStart { start_time } => {
            conn.execute(
                "UPDATE events SET start_time = ?2 WHERE id = ?1",
                params![event_id.to_string(), start_time.to_rfc3339()],
            )?;
        }
    }
    Ok(())
}

/// Women anchor the tables, so their seats cannot move once the event runs.
fn ensure_seat_may_change(event: &Event, gender: Gender) -> Result<()> {
    if event.active && gender == Gender::Woman {
        return Err(StoreError::SeatingFrozen(event.id.to_string()));
    }
    Ok(())
}

fn require_participant(conn: &Connection, id: Uuid) -> Result<Participant> {
    query_participant(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("participant {id}")))
}

fn require_event(conn: &Connection, id: Uuid) -> Result<Event> {
    query_event(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("event {id}")))
}
