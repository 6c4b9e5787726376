use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use tikvah_engine::LiveView;
use tikvah_types::Participant;
use tikvah_types::api::{CheckInResponse, RegisterParticipantRequest, SelfCheckInRequest, ToggleResponse};
use tikvah_types::events::GatewayEvent;

use crate::notify::check_in_mail;
use crate::state::{AppState, run_db};

#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    #[serde(default)]
    pub checked_in: bool,
}

pub async fn register_participant(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<RegisterParticipantRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.len() > 120 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let email = non_empty(req.email);
    let phone = non_empty(req.phone);
    // Self check-in looks people up by one of these
    if email.is_none() && phone.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let now = Utc::now();
    let mut profile = req.profile;
    if let Some(birth_date) = req.birth_date {
        profile.age = Some(age_on(birth_date, now.date_naive()).ok_or(StatusCode::BAD_REQUEST)?);
    }

    let participant = Participant {
        id: Uuid::new_v4(),
        event_id,
        name,
        email,
        phone,
        gender: req.gender,
        checked_in: false,
        seat: None,
        profile,
        created_at: now,
    };

    let record = participant.clone();
    run_db(&state, move |db| db.insert_participant(&record)).await?;

    state.dispatcher.broadcast(GatewayEvent::ParticipantChanged {
        event_id,
        participant_id: participant.id,
    });

    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn list_participants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<ParticipantQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let roster = run_db(&state, move |db| {
        if db.get_event(event_id)?.is_none() {
            return Ok(None);
        }
        db.list_participants(event_id, query.checked_in).map(Some)
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(roster))
}

/// Attendee-facing check-in: find the registration by email or phone.
pub async fn self_check_in(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<SelfCheckInRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.identifier.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let participant = run_db(&state, move |db| db.find_participant_by_contact(event_id, &req.identifier))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(admit(&state, participant.id).await?))
}

pub async fn check_in(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(admit(&state, participant_id).await?))
}

pub async fn check_out(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    Ok(Json(release(&state, participant_id).await?))
}

/// Gatekeeper switch: checks the attendee in or out, whichever they are not.
pub async fn toggle_check_in(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let participant = run_db(&state, move |db| db.get_participant(participant_id))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    let response = if participant.checked_in {
        release(&state, participant_id).await?
    } else {
        let admitted = admit(&state, participant_id).await?;
        ToggleResponse {
            participant_id,
            checked_in: true,
            seat: Some(admitted.seat),
        }
    };
    Ok(Json(response))
}

pub async fn live_view(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let records = run_db(&state, move |db| {
        let Some(participant) = db.get_participant(participant_id)? else {
            return Ok(None);
        };
        let Some(event) = db.get_event(participant.event_id)? else {
            return Ok(None);
        };
        let roster = db.list_participants(event.id, false)?;
        Ok(Some((event, participant, roster)))
    })
    .await?;
    let (event, participant, roster) = records.ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(LiveView::compute(&event, &participant, &roster, &state.filter, Utc::now())))
}

async fn admit(state: &AppState, participant_id: Uuid) -> Result<CheckInResponse, StatusCode> {
    let outcome = run_db(state, move |db| db.check_in(participant_id)).await?;

    if outcome.newly_checked_in {
        state.dispatcher.broadcast(GatewayEvent::ParticipantChanged {
            event_id: outcome.participant.event_id,
            participant_id,
        });

        match check_in_mail(&outcome.participant, outcome.seat, &state.portal_url) {
            Some(mail) => {
                // Fire and forget; failures are only logged
                let notify_state = state.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = notify_state.notifier.send(&notify_state.db, &mail) {
                        warn!("Confirmation mail for {} failed: {}", participant_id, e);
                    }
                });
            }
            None => debug!("No email on file for {}, skipping confirmation", participant_id),
        }
    }

    Ok(CheckInResponse {
        participant_id,
        seat: outcome.seat,
        already_checked_in: !outcome.newly_checked_in,
    })
}

async fn release(state: &AppState, participant_id: Uuid) -> Result<ToggleResponse, StatusCode> {
    let participant = run_db(state, move |db| db.check_out(participant_id)).await?;

    state.dispatcher.broadcast(GatewayEvent::ParticipantChanged {
        event_id: participant.event_id,
        participant_id,
    });

    Ok(ToggleResponse {
        participant_id,
        checked_in: participant.checked_in,
        seat: participant.seat,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whole years between `birth_date` and `today`. `None` for a future birth date.
fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
