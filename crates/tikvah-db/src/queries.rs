use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use tikvah_types::{Event, Participant};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{EventRow, ParticipantRow};

const EVENT_COLUMNS: &str =
    "id, name, round_duration_seconds, start_time, total_tables, active, created_at";
const PARTICIPANT_COLUMNS: &str =
    "id, event_id, name, email, phone, gender, checked_in, seat, profile, created_at";

impl Database {
    // -- Events --

    pub fn insert_event(&self, event: &Event) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, name, round_duration_seconds, start_time, total_tables, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.id.to_string(),
                    event.name,
                    event.round_duration_seconds,
                    event.start_time.map(|t| t.to_rfc3339()),
                    event.total_tables,
                    event.active,
                    event.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.with_conn(|conn| query_event(conn, id))
    }

    pub fn list_events(&self, active_only: bool) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE (?1 = 0 OR active = 1) ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([active_only], event_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(EventRow::into_event).collect()
        })
    }

    /// Deactivate a running event. The start time is kept so the last
    /// round stays computable until the next launch.
    pub fn stop_event(&self, id: Uuid) -> Result<Event> {
        self.with_conn(|conn| {
            let event = query_event(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("event {id}")))?;
            if !event.active {
                return Err(StoreError::NotActive(id.to_string()));
            }
            conn.execute("UPDATE events SET active = 0 WHERE id = ?1", [id.to_string()])?;
            Ok(Event { active: false, ..event })
        })
    }

    // -- Participants --

    pub fn insert_participant(&self, participant: &Participant) -> Result<()> {
        let profile = serde_json::to_string(&participant.profile)
            .map_err(|e| StoreError::Corrupt(format!("profile: {e}")))?;
        self.with_conn(|conn| {
            if query_event(conn, participant.event_id)?.is_none() {
                return Err(StoreError::NotFound(format!("event {}", participant.event_id)));
            }
            conn.execute(
                "INSERT INTO participants (id, event_id, name, email, phone, gender, checked_in, seat, profile, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    participant.id.to_string(),
                    participant.event_id.to_string(),
                    participant.name,
                    participant.email,
                    participant.phone,
                    participant.gender.as_str(),
                    participant.checked_in,
                    participant.seat.map(|s| s.number),
                    profile,
                    participant.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_participant(&self, id: Uuid) -> Result<Option<Participant>> {
        self.with_conn(|conn| query_participant(conn, id))
    }

    pub fn list_participants(&self, event_id: Uuid, checked_in_only: bool) -> Result<Vec<Participant>> {
        self.with_conn(|conn| query_participants(conn, event_id, checked_in_only))
    }

    /// Find a registration by email (case-insensitive) or phone (digits only).
    pub fn find_participant_by_contact(
        &self,
        event_id: Uuid,
        identifier: &str,
    ) -> Result<Option<Participant>> {
        let wanted = identifier.trim().to_lowercase();
        let wanted_digits = digits(&wanted);
        let roster = self.list_participants(event_id, false)?;

        Ok(roster.into_iter().find(|p| {
            let email_hit = p
                .email
                .as_deref()
                .is_some_and(|e| e.trim().to_lowercase() == wanted);
            let phone_hit = !wanted_digits.is_empty()
                && p.phone.as_deref().is_some_and(|ph| digits(ph) == wanted_digits);
            email_hit || phone_hit
        }))
    }
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

pub(crate) fn query_event(conn: &Connection, id: Uuid) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], event_row)
        .optional()?
        .map(EventRow::into_event)
        .transpose()
}

pub(crate) fn query_participant(conn: &Connection, id: Uuid) -> Result<Option<Participant>> {
    let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], participant_row)
        .optional()?
        .map(ParticipantRow::into_participant)
        .transpose()
}

pub(crate) fn query_participants(
    conn: &Connection,
    event_id: Uuid,
    checked_in_only: bool,
) -> Result<Vec<Participant>> {
    let sql = format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants
         WHERE event_id = ?1 AND (?2 = 0 OR checked_in = 1)
         ORDER BY gender, seat IS NULL, seat, name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![event_id.to_string(), checked_in_only], participant_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(ParticipantRow::into_participant).collect()
}

fn event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        name: row.get(1)?,
        round_duration_seconds: row.get(2)?,
        start_time: row.get(3)?,
        total_tables: row.get(4)?,
        active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn participant_row(row: &Row<'_>) -> rusqlite::Result<ParticipantRow> {
    Ok(ParticipantRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        gender: row.get(5)?,
        checked_in: row.get(6)?,
        seat: row.get(7)?,
        profile: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tikvah_types::{Gender, Profile};

    fn draft_event(db: &Database) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            name: "Winter Mixer".into(),
            round_duration_seconds: 420,
            start_time: None,
            total_tables: 0,
            active: false,
            created_at: Utc::now(),
        };
        db.insert_event(&event).unwrap();
        event
    }

    fn registrant(event: &Event, name: &str, email: &str, phone: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            event_id: event.id,
            name: name.into(),
            email: Some(email.into()),
            phone: Some(phone.into()),
            gender: Gender::Woman,
            checked_in: false,
            seat: None,
            profile: Profile { age: Some(27), ..Profile::default() },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_round_trips_through_sqlite() {
        let db = Database::open_in_memory().unwrap();
        let event = draft_event(&db);
        let loaded = db.get_event(event.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Winter Mixer");
        assert_eq!(loaded.round_duration_seconds, 420);
        assert_eq!(loaded.start_time, None);
        assert!(db.get_event(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_events_active_filter() {
        let db = Database::open_in_memory().unwrap();
        let _draft = draft_event(&db);
        assert_eq!(db.list_events(false).unwrap().len(), 1);
        assert!(db.list_events(true).unwrap().is_empty());
    }

    #[test]
    fn test_participant_profile_is_preserved() {
        let db = Database::open_in_memory().unwrap();
        let event = draft_event(&db);
        let p = registrant(&event, "Sarah Cohen", "sarah@example.com", "(212) 555-0100");
        db.insert_participant(&p).unwrap();
        let loaded = db.get_participant(p.id).unwrap().unwrap();
        assert_eq!(loaded.profile.age, Some(27));
        assert_eq!(loaded.first_name(), "Sarah");
    }

    #[test]
    fn test_participant_requires_event() {
        let db = Database::open_in_memory().unwrap();
        let ghost = Event {
            id: Uuid::new_v4(),
            name: String::new(),
            round_duration_seconds: 1,
            start_time: None,
            total_tables: 0,
            active: false,
            created_at: Utc::now(),
        };
        let p = registrant(&ghost, "Nobody", "x@example.com", "1");
        assert!(matches!(db.insert_participant(&p), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_find_by_email_or_phone() {
        let db = Database::open_in_memory().unwrap();
        let event = draft_event(&db);
        let p = registrant(&event, "Sarah Cohen", "Sarah@Example.com", "(212) 555-0100");
        db.insert_participant(&p).unwrap();

        let by_email = db.find_participant_by_contact(event.id, "  sarah@example.COM ").unwrap();
        assert_eq!(by_email.map(|f| f.id), Some(p.id));
        let by_phone = db.find_participant_by_contact(event.id, "212-555-0100").unwrap();
        assert_eq!(by_phone.map(|f| f.id), Some(p.id));
        assert!(db.find_participant_by_contact(event.id, "nobody@example.com").unwrap().is_none());
        assert!(db.find_participant_by_contact(event.id, "abc").unwrap().is_none());
    }

    #[test]
    fn test_stop_requires_running_event() {
        let db = Database::open_in_memory().unwrap();
        let event = draft_event(&db);
        assert!(matches!(db.stop_event(event.id), Err(StoreError::NotActive(_))));
    }
}
