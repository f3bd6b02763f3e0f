//! WebSocket connection handler
//!
//! Browsers cannot set custom headers on a WebSocket upgrade, so a session
//! names its agent with `?agent=` or later with an `identify` request.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::AgentId;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::WebServerResult;
use crate::state::AppState;
use crate::traits::WebSocketManager;
use crate::types::{ClientMessage, ClientRequest};

const SESSION_BUFFER: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SessionParams {
    pub agent: Option<String>,
}

pub async fn websocket_handler<W>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<W>>,
    Query(params): Query<SessionParams>,
) -> Response
where
    W: WebSocketManager + 'static,
{
    let agent = params
        .agent
        .map(|login| login.trim().to_string())
        .filter(|login| !login.is_empty())
        .map(AgentId::new);
    ws.on_upgrade(move |socket| handle_websocket(socket, state.websockets, agent))
}

async fn handle_websocket<W>(socket: WebSocket, websocket_manager: Arc<W>, agent: Option<AgentId>)
where
    W: WebSocketManager,
{
    let client_id = Uuid::new_v4();
    info!("🔗 New WebSocket connection: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ClientMessage>(SESSION_BUFFER);

    if let Err(e) = websocket_manager.add_client(client_id, agent, tx).await {
        error!("Failed to register WebSocket session {}: {}", client_id, e);
        return;
    }

    let outgoing_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json_msg = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize session message: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json_msg)).await {
                warn!("Failed to send message to session {}: {}", client_id, e);
                break;
            }
        }

        debug!("Outgoing message task ended for session {}", client_id);
    });

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket error for session {}: {}", client_id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                debug!("📨 Received from session {}: {}", client_id, text);

                let outcome = match serde_json::from_str::<ClientRequest>(&text) {
                    Ok(request) => handle_client_request(client_id, request, websocket_manager.as_ref()).await,
                    Err(e) => {
                        warn!("Failed to parse request from session {}: {}", client_id, e);
                        let error_msg = ClientMessage::Error {
                            message: format!("Failed to parse request: {e}"),
                        };
                        websocket_manager.send_to_client(client_id, error_msg).await
                    }
                };
                if let Err(e) = outcome {
                    error!("Failed to answer session {}: {}", client_id, e);
                }
            }
            Message::Binary(_) => {
                warn!("Received binary message from session {} - not supported", client_id);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                info!("Session {} requested close", client_id);
                break;
            }
        }
    }

    outgoing_task.abort();

    if let Err(e) = websocket_manager.remove_client(client_id).await {
        error!("Failed to remove session {}: {}", client_id, e);
    }

    info!("👋 WebSocket connection closed: {}", client_id);
}

pub async fn handle_client_request<W>(client_id: Uuid, request: ClientRequest, websocket_manager: &W) -> WebServerResult<()>
where
    W: WebSocketManager + ?Sized,
{
    match request {
        ClientRequest::Identify { agent } => websocket_manager.identify(client_id, agent).await,
        ClientRequest::Ping => {
            let pong = ClientMessage::Pong {
                server_time: Utc::now().timestamp().max(0) as u64,
            };
            websocket_manager.send_to_client(client_id, pong).await
        }
    }
}
