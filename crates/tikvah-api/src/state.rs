use std::sync::Arc;

use axum::http::StatusCode;
use tracing::error;

use tikvah_db::{Database, StoreError};
use tikvah_engine::CompatibilityFilter;
use tikvah_gateway::Dispatcher;

use crate::notify::{Notifier, OutboxNotifier};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub filter: CompatibilityFilter,
    pub notifier: Box<dyn Notifier>,
    /// Base URL of the attendee portal, used in confirmation mail.
    pub portal_url: String,
    pub default_round_minutes: u32,
}

impl AppStateInner {
    pub fn new(db: Database, dispatcher: Dispatcher, portal_url: impl Into<String>, default_round_minutes: u32) -> Self {
        Self {
            db,
            dispatcher,
            filter: CompatibilityFilter::default(),
            notifier: Box::new(OutboxNotifier),
            portal_url: portal_url.into(),
            default_round_minutes,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }
}

/// Map a store failure to a response status. Only unexpected faults are logged.
pub fn store_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::AlreadyActive(_) | StoreError::NotActive(_) | StoreError::SeatingFrozen(_) => {
            StatusCode::CONFLICT
        }
        other => {
            error!("Store failure: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Run blocking DB work off the async runtime.
pub async fn run_db<T, F>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Database) -> tikvah_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_status)
}
