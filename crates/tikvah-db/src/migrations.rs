use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (events, participants)");
        conn.execute_batch(
            "
            CREATE TABLE events (
                id                      TEXT PRIMARY KEY,
                name                    TEXT NOT NULL,
                round_duration_seconds  INTEGER NOT NULL CHECK (round_duration_seconds > 0),
                start_time              TEXT,
                total_tables            INTEGER NOT NULL DEFAULT 0,
                active                  INTEGER NOT NULL DEFAULT 0,
                created_at              TEXT NOT NULL
            );

            CREATE TABLE participants (
                id          TEXT PRIMARY KEY,
                event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                email       TEXT,
                phone       TEXT,
                gender      TEXT NOT NULL CHECK (gender IN ('man', 'woman')),
                checked_in  INTEGER NOT NULL DEFAULT 0,
                seat        INTEGER CHECK (seat IS NULL OR seat > 0),
                profile     TEXT NOT NULL DEFAULT '{}',
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_participants_event
                ON participants(event_id, gender);

            -- Backstop for the allocator: two rows can never share a seat.
            CREATE UNIQUE INDEX idx_participants_seat
                ON participants(event_id, gender, seat)
                WHERE seat IS NOT NULL;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (mail outbox)");
        conn.execute_batch(
            "
            CREATE TABLE mail_outbox (
                id              TEXT PRIMARY KEY,
                participant_id  TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                to_address      TEXT NOT NULL,
                subject         TEXT NOT NULL,
                html            TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                sent_at         TEXT
            );

            CREATE INDEX idx_mail_outbox_pending
                ON mail_outbox(created_at) WHERE sent_at IS NULL;

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
