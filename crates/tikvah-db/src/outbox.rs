//! Outgoing mail is only queued here. A separate mailer picks rows up and
//! marks them sent; this crate never talks to an SMTP server.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::Database;
use crate::error::Result;
use crate::models::{parse_id, parse_time};

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMail {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub fn enqueue_mail(&self, mail: &OutboundMail) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO mail_outbox (id, participant_id, to_address, subject, html, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    mail.id.to_string(),
                    mail.participant_id.to_string(),
                    mail.to,
                    mail.subject,
                    mail.html,
                    mail.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Oldest first.
    pub fn pending_mail(&self, limit: u32) -> Result<Vec<OutboundMail>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, participant_id, to_address, subject, html, created_at
                 FROM mail_outbox
                 WHERE sent_at IS NULL
                 ORDER BY created_at
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, participant_id, to, subject, html, created_at)| {
                    Ok(OutboundMail {
                        id: parse_id(&id)?,
                        participant_id: parse_id(&participant_id)?,
                        to,
                        subject,
                        html,
                        created_at: parse_time(&created_at)?,
                    })
                })
                .collect()
        })
    }

    pub fn mark_mail_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE mail_outbox SET sent_at = ?2 WHERE id = ?1",
                params![id.to_string(), sent_at.to_rfc3339()],
            )?;
            Ok(())
        })
    }
}
