use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use tikvah_types::events::GatewayEvent;

/// Fans change notifications out to every connected device.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// All connections receive every event and filter by subscription
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// connection_id -> event ids it watches
    subscriptions: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                subscriptions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Fire-and-forget: having no listeners is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        debug!("Broadcasting {:?}", event);
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub async fn set_subscriptions(&self, connection_id: Uuid, event_ids: Vec<Uuid>) {
        self.inner
            .subscriptions
            .write()
            .await
            .insert(connection_id, event_ids.into_iter().collect());
    }

    pub async fn is_subscribed(&self, connection_id: Uuid, event_id: Uuid) -> bool {
        self.inner
            .subscriptions
            .read()
            .await
            .get(&connection_id)
            .is_some_and(|ids| ids.contains(&event_id))
    }

    /// Connection-level events go to everyone; event-scoped ones only to
    /// connections watching that event.
    pub async fn delivers_to(&self, connection_id: Uuid, event: &GatewayEvent) -> bool {
        match event.event_id() {
            Some(event_id) => self.is_subscribed(connection_id, event_id).await,
            None => true,
        }
    }

    pub async fn disconnect(&self, connection_id: Uuid) {
        self.inner.subscriptions.write().await.remove(&connection_id);
    }

    /// Number of connected devices following `event_id`.
    pub async fn watchers(&self, event_id: Uuid) -> usize {
        self.inner
            .subscriptions
            .read()
            .await
            .values()
            .filter(|ids| ids.contains(&event_id))
            .count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
