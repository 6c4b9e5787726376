use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tikvah_engine::{Capacity, ClockReading, EventClock, LaunchEffect, RotationResolver, round_seconds_from_minutes};
use tikvah_types::api::{CreateEventRequest, EventSummary};
use tikvah_types::events::GatewayEvent;
use tikvah_types::{Event, Gender};

use crate::state::{AppState, run_db};

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub active: bool,
}

/// An event together with where its clock stands right now.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub clock: ClockReading,
}

impl EventResponse {
    fn now(event: Event) -> Self {
        let clock = if event.active {
            EventClock::for_event(&event).read(event.start_time, Utc::now())
        } else {
            ClockReading::NOT_STARTED
        };
        Self { event, clock }
    }
}

#[derive(Debug, Serialize)]
pub struct LaunchResponse {
    #[serde(flatten)]
    pub event: Event,
    pub seats_assigned: usize,
    pub seats_cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub counts: EventSummary,
    pub capacity: Capacity,
    /// Devices currently following this event on the gateway.
    pub watchers: usize,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let name = req.name.trim().to_string();
    if name.is_empty() || name.len() > 120 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let minutes = req.round_minutes.unwrap_or(state.default_round_minutes);
    let round_duration_seconds = round_seconds_from_minutes(minutes).map_err(|_| StatusCode::BAD_REQUEST)?;

    let event = Event {
        id: Uuid::new_v4(),
        name,
        round_duration_seconds,
        start_time: None,
        total_tables: 0,
        active: false,
        created_at: Utc::now(),
    };

    let record = event.clone();
    run_db(&state, move |db| db.insert_event(&record)).await?;

    info!("Event {} created ({} minute rounds)", event.id, minutes);
    state.dispatcher.broadcast(GatewayEvent::EventChanged { event_id: event.id });

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let events = run_db(&state, move |db| db.list_events(query.active)).await?;
    Ok(Json(events.into_iter().map(EventResponse::now).collect::<Vec<_>>()))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let event = run_db(&state, move |db| db.get_event(event_id))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(EventResponse::now(event)))
}

/// Renumber seats, freeze tables and start the clock in one step.
pub async fn launch_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let start_time = Utc::now();
    let (event, plan) = run_db(&state, move |db| db.launch_event(event_id, start_time)).await?;

    let seats_assigned = plan
        .effects
        .iter()
        .filter(|e| matches!(e, LaunchEffect::AssignSeat { .. }))
        .count();
    let seats_cleared = plan
        .effects
        .iter()
        .filter(|e| matches!(e, LaunchEffect::ClearSeat { .. }))
        .count();

    state.dispatcher.broadcast(GatewayEvent::RosterReset { event_id });
    state.dispatcher.broadcast(GatewayEvent::EventChanged { event_id });

    Ok(Json(LaunchResponse {
        event,
        seats_assigned,
        seats_cleared,
    }))
}

pub async fn stop_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let event = run_db(&state, move |db| db.stop_event(event_id)).await?;

    info!("Event {} stopped", event_id);
    state.dispatcher.broadcast(GatewayEvent::EventChanged { event_id });

    Ok(Json(event))
}

pub async fn event_summary(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let (event, roster) = run_db(&state, move |db| {
        let event = db.get_event(event_id)?;
        let roster = db.list_participants(event_id, false)?;
        Ok((event, roster))
    })
    .await?;
    let event = event.ok_or(StatusCode::NOT_FOUND)?;

    let checked_in = |gender: Gender| {
        roster
            .iter()
            .filter(|p| p.checked_in && p.gender == gender)
            .count() as u32
    };
    let counts = EventSummary {
        event_id,
        women_checked_in: checked_in(Gender::Woman),
        men_checked_in: checked_in(Gender::Man),
        registered: roster.len() as u32,
    };
    let capacity = RotationResolver::new(event.total_tables, &roster).capacity();
    let watchers = state.dispatcher.watchers(event_id).await;

    Ok(Json(SummaryResponse {
        counts,
        capacity,
        watchers,
    }))
}
