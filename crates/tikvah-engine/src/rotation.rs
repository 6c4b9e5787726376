use serde::Serialize;

use tikvah_types::{Gender, Participant};

/// Table a man starting at `start` occupies in `round`.
///
/// Women hold `total_tables` fixed seats and men shift one table per round,
/// so over rounds `1..=total_tables` a man starting inside `[1, total_tables]`
/// visits every table exactly once. Starting positions above `total_tables`
/// wrap around and will collide with another man.
pub fn rotate(start: u32, round: u32, total_tables: u32) -> Option<u32> {
    if total_tables == 0 || start == 0 || round == 0 {
        return None;
    }
    let shifted = (u64::from(start) - 1 + u64::from(round) - 1) % u64::from(total_tables);
    u32::try_from(shifted + 1).ok()
}

/// Outcome of looking for someone at the caller's table.
#[derive(Debug, Clone, PartialEq)]
pub enum Pairing<'a> {
    Partner(&'a Participant),
    /// Nobody of the opposite gender at this table this round.
    Break,
    /// The table is double-booked. Holds everyone else sitting there, so
    /// each man who wrapped onto it sees the clash, not just the woman.
    /// Only happens when men and tables are unbalanced.
    Collision(Vec<&'a Participant>),
}

/// Men/women balance of the checked-in roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "excess", rename_all = "snake_case")]
pub enum Capacity {
    Balanced,
    ExcessMen(u32),
    ExcessWomen(u32),
}

pub struct RotationResolver<'a> {
    total_tables: u32,
    roster: &'a [Participant],
}

impl<'a> RotationResolver<'a> {
    /// `roster` is every participant of the event; anyone not checked in is ignored.
    pub fn new(total_tables: u32, roster: &'a [Participant]) -> Self {
        Self { total_tables, roster }
    }

    pub fn total_tables(&self) -> u32 {
        self.total_tables
    }

    pub fn current_table(&self, participant: &Participant, round: u32) -> Option<u32> {
        let seat = participant.seat?;
        match participant.gender {
            Gender::Woman => Some(seat.number),
            Gender::Man => rotate(seat.number, round, self.total_tables),
        }
    }

    /// Where the participant goes once the current round ends.
    pub fn next_table(&self, participant: &Participant, round: u32) -> Option<u32> {
        self.current_table(participant, round.saturating_add(1))
    }

    pub fn partner_at(&self, participant: &Participant, round: u32) -> Pairing<'a> {
        let Some(table) = self.current_table(participant, round) else {
            return Pairing::Break;
        };

        let mut at_table: Vec<&'a Participant> = self
            .roster
            .iter()
            .filter(|other| other.checked_in && other.id != participant.id)
            .filter(|other| self.current_table(other, round) == Some(table))
            .collect();

        let rivals = at_table
            .iter()
            .filter(|other| other.gender == participant.gender)
            .count();
        match (at_table.len() - rivals, rivals) {
            (0, 0) => Pairing::Break,
            (1, 0) => Pairing::Partner(at_table.remove(0)),
            _ => Pairing::Collision(at_table),
        }
    }

    /// Checked-in men against checked-in women. Women's seats are frozen
    /// while an event runs, so after launch this is men against `total_tables`.
    pub fn capacity(&self) -> Capacity {
        let count = |gender| {
            self.roster
                .iter()
                .filter(|p| p.checked_in && p.gender == gender)
                .count() as u32
        };
        let men = count(Gender::Man);
        let women = count(Gender::Woman);
        if men > women {
            Capacity::ExcessMen(men - women)
        } else if women > men {
            Capacity::ExcessWomen(women - men)
        } else {
            Capacity::Balanced
        }
    }
}
