pub mod events;
pub mod notify;
pub mod participants;
pub mod state;

pub use notify::{MailMessage, Notifier, OutboxNotifier};
pub use state::{AppState, AppStateInner};

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};

use tikvah_gateway::connection;

/// Every HTTP route plus the `/gateway` WebSocket. Layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/{event_id}", get(events::get_event))
        .route("/events/{event_id}/launch", post(events::launch_event))
        .route("/events/{event_id}/stop", post(events::stop_event))
        .route("/events/{event_id}/summary", get(events::event_summary))
        .route(
            "/events/{event_id}/participants",
            get(participants::list_participants).post(participants::register_participant),
        )
        .route("/events/{event_id}/self-check-in", post(participants::self_check_in))
        .route("/participants/{participant_id}/check-in", post(participants::check_in))
        .route("/participants/{participant_id}/check-out", post(participants::check_out))
        .route("/participants/{participant_id}/toggle", post(participants::toggle_check_in))
        .route("/participants/{participant_id}/live", get(participants::live_view))
        .route("/gateway", get(ws_upgrade))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}
