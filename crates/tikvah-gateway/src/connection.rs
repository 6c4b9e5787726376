use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use tikvah_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

const PING_EVERY: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

/// Pong bookkeeping shared between the reader and the pinger.
struct Liveness {
    pong_seen: Arc<AtomicBool>,
    missed: u8,
}

impl Liveness {
    fn new() -> Self {
        Self {
            pong_seen: Arc::new(AtomicBool::new(true)),
            missed: 0,
        }
    }

    fn pong_flag(&self) -> Arc<AtomicBool> {
        self.pong_seen.clone()
    }

    /// Called once per ping interval. False once the device has stayed
    /// silent for `MAX_MISSED_PONGS` intervals in a row.
    fn still_alive(&mut self) -> bool {
        if self.pong_seen.swap(false, Ordering::Acquire) {
            self.missed = 0;
        } else {
            self.missed += 1;
        }
        self.missed < MAX_MISSED_PONGS
    }
}

/// Serve one device's change feed until it disconnects.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher) {
    let (mut sender, receiver) = socket.split();
    let connection_id = Uuid::new_v4();

    info!("Device {} connected to gateway", connection_id);

    if send_event(&mut sender, &GatewayEvent::Ready { connection_id })
        .await
        .is_err()
    {
        return;
    }

    run_connection_loop(sender, receiver, dispatcher.clone(), connection_id).await;

    dispatcher.disconnect(connection_id).await;
    info!("Device {} disconnected from gateway", connection_id);
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    connection_id: Uuid,
) {
    let mut feed = dispatcher.subscribe();
    let filter = dispatcher.clone();
    let mut liveness = Liveness::new();
    let pong_seen = liveness.pong_flag();

    // Notifications for watched events -> device, plus pings
    let mut send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_EVERY);
        ping.tick().await;

        loop {
            tokio::select! {
                result = feed.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Device {} fell behind, {} notifications skipped", connection_id, skipped);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    if !filter.delivers_to(connection_id, &event).await {
                        continue;
                    }
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if !liveness.still_alive() {
                        warn!("Device {} stopped answering pings, dropping connection", connection_id);
                        break;
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the device
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&dispatcher, connection_id, cmd).await,
                    Err(e) => {
                        warn!(
                            "Device {} bad command: {} -- raw: {}",
                            connection_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => pong_seen.store(true, Ordering::Release),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

async fn handle_command(dispatcher: &Dispatcher, connection_id: Uuid, cmd: GatewayCommand) {
    match cmd {
        GatewayCommand::Subscribe { event_ids } => {
            info!(
                "Device {} watching {} event(s)",
                connection_id,
                event_ids.len()
            );
            dispatcher.set_subscriptions(connection_id, event_ids).await;
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
