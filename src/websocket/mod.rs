//! WebSocket endpoint streaming store events to collaborator UIs
//!
//! Every connected client receives every sync event; there is nothing to
//! subscribe to since the store is a single user's data.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::sync::StoreEvent;

/// WebSocket server state
#[derive(Clone)]
pub struct WsState {
    /// Broadcast channel carrying sync events
    pub tx: broadcast::Sender<StoreEvent>,
    /// Connected clients registry
    clients: Arc<RwLock<HashSet<String>>>,
}

/// Client message types
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    Ping,
}

/// Server message types
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    Event { event: StoreEvent },
    Pong,
}

impl WsState {
    /// Create new WebSocket state over an existing event channel
    pub fn new(tx: broadcast::Sender<StoreEvent>) -> Self {
        Self {
            tx,
            clients: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    async fn register_client(&self, client_id: String) -> usize {
        let mut clients = self.clients.write().await;
        clients.insert(client_id);
        clients.len()
    }

    async fn unregister_client(&self, client_id: &str) -> usize {
        let mut clients = self.clients.write().await;
        clients.remove(client_id);
        clients.len()
    }
}

/// WebSocket handler - upgrades HTTP connection to WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: WsState) {
    let client_id = Uuid::new_v4().to_string();
    let connected = state.register_client(client_id.clone()).await;
    tracing::info!(client_id = %client_id, connected, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    // Internal channel for sending pongs from recv_task to sender
    let (internal_tx, mut internal_rx) = mpsc::channel::<ServerMessage>(32);

    // Subscribe to the event channel
    let mut rx = state.tx.subscribe();

    // Forward sync events and internal messages to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Ok(event) = rx.recv() => {
                    let msg = ServerMessage::Event { event };
                    if let Ok(text) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(msg) = internal_rx.recv() => {
                    if let Ok(text) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
                else => break,
            }
        }
    });

    // Handle incoming messages from client
    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                    tracing::debug!(client_id = %client_id_recv, "Ping from client");
                    let _ = internal_tx.send(ServerMessage::Pong).await;
                }
            } else if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    // Clean up
    let remaining = state.unregister_client(&client_id).await;
    tracing::info!(client_id = %client_id, remaining, "WebSocket client disconnected");
}

// Re-export futures traits for split() and send()
use futures_util::{SinkExt, StreamExt};
