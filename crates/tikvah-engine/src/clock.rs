use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tikvah_types::Event;

use crate::error::EngineError;

/// Time given before the first round and between rounds to change tables.
pub const MOVE_BUFFER_SECONDS: u32 = 60;

pub const MAX_ROUND_MINUTES: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    /// Move buffer before round 1
    Starting,
    Dating,
    /// Move buffer between rounds
    Moving,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReading {
    pub phase: Phase,
    /// 1-based. 0 while not started.
    pub round: u32,
    pub seconds_remaining: u32,
}

impl ClockReading {
    pub const NOT_STARTED: Self = Self {
        phase: Phase::NotStarted,
        round: 0,
        seconds_remaining: 0,
    };
}

/// Derives the round state from a shared start time and the wall clock.
///
/// Nothing is stored between readings: every device that knows the start
/// time, round length and table count computes the same answer for the same
/// instant, so the start time is the only value that has to be shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClock {
    pub round_duration_seconds: u32,
    pub move_buffer_seconds: u32,
    pub total_rounds: u32,
}

impl EventClock {
    pub fn new(round_duration_seconds: u32, total_rounds: u32) -> Self {
        Self {
            round_duration_seconds,
            move_buffer_seconds: MOVE_BUFFER_SECONDS,
            total_rounds,
        }
    }

    /// One round per table: every man visits every woman once.
    pub fn for_event(event: &Event) -> Self {
        Self::new(event.round_duration_seconds, event.total_tables)
    }

    pub fn with_move_buffer(mut self, seconds: u32) -> Self {
        self.move_buffer_seconds = seconds;
        self
    }

    pub fn read(&self, start_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ClockReading {
        let Some(start) = start_time else {
            return ClockReading::NOT_STARTED;
        };
        if now < start {
            return ClockReading::NOT_STARTED;
        }

        let elapsed = (now - start).num_seconds();
        let buffer = i64::from(self.move_buffer_seconds);
        let round_len = i64::from(self.round_duration_seconds);
        let total_rounds = i64::from(self.total_rounds);

        if elapsed < buffer {
            return ClockReading {
                phase: Phase::Starting,
                round: 1,
                seconds_remaining: to_u32(buffer - elapsed),
            };
        }

        let block = round_len + buffer;
        if block == 0 {
            return self.over();
        }

        let after_prep = elapsed - buffer;
        let round = after_prep / block + 1;
        let within = after_prep % block;

        if round > total_rounds || (round == total_rounds && within >= round_len) {
            return self.over();
        }

        if within >= round_len {
            ClockReading {
                phase: Phase::Moving,
                round: to_u32(round),
                seconds_remaining: to_u32(block - within),
            }
        } else {
            ClockReading {
                phase: Phase::Dating,
                round: to_u32(round),
                seconds_remaining: to_u32(round_len - within),
            }
        }
    }

    fn over(&self) -> ClockReading {
        ClockReading {
            phase: Phase::Over,
            round: self.total_rounds,
            seconds_remaining: 0,
        }
    }
}

/// Validate an organizer-supplied round length and convert it to seconds.
pub fn round_seconds_from_minutes(minutes: u32) -> Result<u32, EngineError> {
    if minutes == 0 || minutes > MAX_ROUND_MINUTES {
        return Err(EngineError::InvalidRoundLength(minutes));
    }
    Ok(minutes * 60)
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
