use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use tikvah_types::{Gender, Participant, SeatNumber};

/// Smallest positive integer not in `occupied`.
pub fn first_free<I>(occupied: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    let taken: BTreeSet<u32> = occupied.into_iter().filter(|n| *n > 0).collect();
    let mut candidate = 1;
    for n in taken {
        if n != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

/// Per-gender seat occupancy with first-fit reuse of gaps.
///
/// Freeing a seat never moves anyone else; the hole is handed to the next
/// arrival of that gender. Callers that share the occupancy between
/// processes must load, allocate and write back inside one transaction.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    occupied: HashMap<Gender, BTreeSet<u32>>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupancy of every checked-in, seated participant in `roster`.
    pub fn from_roster(roster: &[Participant]) -> Self {
        let mut allocator = Self::new();
        for seat in roster.iter().filter(|p| p.checked_in).filter_map(|p| p.seat) {
            allocator.occupy(seat);
        }
        allocator
    }

    pub fn occupy(&mut self, seat: SeatNumber) {
        self.occupied.entry(seat.gender).or_default().insert(seat.number);
    }

    pub fn allocate(&mut self, gender: Gender) -> SeatNumber {
        let taken = self.occupied.entry(gender).or_default();
        let number = first_free(taken.iter().copied());
        taken.insert(number);
        SeatNumber::new(gender, number)
    }

    /// Returns false if the seat was not occupied.
    pub fn free(&mut self, seat: SeatNumber) -> bool {
        self.occupied
            .get_mut(&seat.gender)
            .is_some_and(|taken| taken.remove(&seat.number))
    }

    pub fn occupied(&self, gender: Gender) -> Vec<u32> {
        self.occupied
            .get(&gender)
            .map(|taken| taken.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// One write performed by the launch transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEffect {
    AssignSeat { participant_id: Uuid, seat: SeatNumber },
    ClearSeat { participant_id: Uuid },
    FreezeTables { total_tables: u32 },
    StampStart { start_time: DateTime<Utc> },
}

/// Everything a launch changes, computed up front so the store can apply it
/// in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub effects: Vec<LaunchEffect>,
    pub total_tables: u32,
    pub start_time: DateTime<Utc>,
}

impl LaunchPlan {
    pub fn seat_for(&self, participant_id: Uuid) -> Option<SeatNumber> {
        self.effects.iter().find_map(|effect| match effect {
            LaunchEffect::AssignSeat { participant_id: id, seat } if *id == participant_id => {
                Some(*seat)
            }
            _ => None,
        })
    }
}

/// Renumber checked-in participants to `1..=N` per gender.
///
/// Order is the current seat number (so launch only closes the gaps left by
/// check-outs), unseated attendees last, then name, then id. Anyone not
/// checked in loses their seat. Tables are frozen to the number of women.
pub fn plan_launch(roster: &[Participant], start_time: DateTime<Utc>) -> LaunchPlan {
    let mut effects = Vec::with_capacity(roster.len() + 2);
    let mut total_tables = 0;

    // Releases go first: seat numbers are unique per event and gender.
    for participant in roster.iter().filter(|p| !p.checked_in && p.seat.is_some()) {
        effects.push(LaunchEffect::ClearSeat {
            participant_id: participant.id,
        });
    }

    for gender in [Gender::Woman, Gender::Man] {
        let mut present: Vec<&Participant> = roster
            .iter()
            .filter(|p| p.checked_in && p.gender == gender)
            .collect();
        present.sort_by(|a, b| {
            launch_order_key(a)
                .cmp(&launch_order_key(b))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        for (index, participant) in present.iter().enumerate() {
            effects.push(LaunchEffect::AssignSeat {
                participant_id: participant.id,
                seat: SeatNumber::new(gender, index as u32 + 1),
            });
        }

        if gender == Gender::Woman {
            total_tables = present.len() as u32;
        }
    }

    effects.push(LaunchEffect::FreezeTables { total_tables });
    effects.push(LaunchEffect::StampStart { start_time });

    debug!(
        "Launch plan: {} effects, {} tables",
        effects.len(),
        total_tables
    );

    LaunchPlan {
        effects,
        total_tables,
        start_time,
    }
}

fn launch_order_key(participant: &Participant) -> (bool, u32) {
    match participant.seat {
        Some(seat) => (false, seat.number),
        None => (true, 0),
    }
}
