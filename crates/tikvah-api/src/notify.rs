use chrono::Utc;
use uuid::Uuid;

use tikvah_db::{Database, OutboundMail};
use tikvah_types::{Participant, SeatNumber};

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub participant_id: Uuid,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers confirmation mail. Delivery is best effort: callers log failures
/// and carry on.
pub trait Notifier: Send + Sync {
    fn send(&self, db: &Database, mail: &MailMessage) -> anyhow::Result<()>;
}

/// Queues mail in the `mail_outbox` table for an external mailer.
pub struct OutboxNotifier;

impl Notifier for OutboxNotifier {
    fn send(&self, db: &Database, mail: &MailMessage) -> anyhow::Result<()> {
        db.enqueue_mail(&OutboundMail {
            id: Uuid::new_v4(),
            participant_id: mail.participant_id,
            to: mail.to.clone(),
            subject: mail.subject.clone(),
            html: mail.html.clone(),
            created_at: Utc::now(),
        })?;
        Ok(())
    }
}

/// `None` when the attendee registered without an email address.
pub fn check_in_mail(participant: &Participant, seat: SeatNumber, portal_url: &str) -> Option<MailMessage> {
    let to = participant.email.as_deref()?.trim();
    if to.is_empty() {
        return None;
    }

    let link = format!("{}/checkin/{}", portal_url.trim_end_matches('/'), participant.id);
    let html = format!(
        "<h3>Hi {}!</h3>\
         <p>You are checked in for the event.</p>\
         <p><strong>Your Table: {}</strong></p>\
         <p><a href=\"{}\">Click here to view your personal event portal.</a></p>",
        escape_html(participant.first_name()),
        seat,
        link,
    );

    Some(MailMessage {
        participant_id: participant.id,
        to: to.to_string(),
        subject: "Check-in Confirmed!".into(),
        html,
    })
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
