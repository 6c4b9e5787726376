use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Change notifications pushed over the WebSocket gateway.
///
/// These only say *what* changed. Clients re-read the records and recompute
/// the round state locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server accepted the connection
    Ready { connection_id: Uuid },

    /// Event record changed (created, launched, stopped)
    EventChanged { event_id: Uuid },

    /// A participant registered, checked in or checked out
    ParticipantChanged { event_id: Uuid, participant_id: Uuid },

    /// Every seat in the event was rewritten by a launch
    RosterReset { event_id: Uuid },
}

impl GatewayEvent {
    /// Returns the event this notification belongs to.
    /// `None` means it is connection-level and goes to every client.
    pub fn event_id(&self) -> Option<Uuid> {
        match self {
            Self::EventChanged { event_id } => Some(*event_id),
            Self::ParticipantChanged { event_id, .. } => Some(*event_id),
            Self::RosterReset { event_id } => Some(*event_id),
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Replace the set of events this connection receives notifications for.
    Subscribe { event_ids: Vec<Uuid> },
}
