//! WebSocket session management service
//!
//! Tracks connected browser sessions and the agent each one is bound to.
//! Fan-out uses `try_send` so one slow session never stalls the others;
//! sessions whose channel has closed are dropped on the next send.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{process_debug, process_info, process_warn, AgentId, ProcessId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use uuid::Uuid;

use crate::error::{WebServerError, WebServerResult};
use crate::traits::WebSocketManager;
use crate::types::ClientMessage;

#[derive(Debug)]
struct ClientConnection {
    agent: Option<AgentId>,
    sender: mpsc::Sender<ClientMessage>,
    connected_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RealWebSocketManager {
    clients: Arc<RwLock<HashMap<Uuid, ClientConnection>>>,
}

impl RealWebSocketManager {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Try to deliver `message` to each target, then drop the closed ones
    async fn deliver(&self, targets: Vec<(Uuid, mpsc::Sender<ClientMessage>)>, message: &ClientMessage) -> usize {
        let mut closed = Vec::new();
        let mut delivered = 0;

        for (client_id, sender) in targets {
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    process_warn!(ProcessId::current(), "Session {} channel full, dropping message", client_id);
                }
                Err(TrySendError::Closed(_)) => closed.push(client_id),
            }
        }

        if !closed.is_empty() {
            let mut clients = self.clients.write().await;
            for client_id in closed {
                if clients.remove(&client_id).is_some() {
                    process_info!(ProcessId::current(), "🗑️ Removed disconnected session {}", client_id);
                }
            }
        }

        delivered
    }

    /// Periodically drop sessions whose socket task has gone away
    pub fn start_cleanup_task(&self) -> JoinHandle<()> {
        let clients = self.clients.clone();

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(30));

            loop {
                ticker.tick().await;

                let mut client_map = clients.write().await;
                let before = client_map.len();
                client_map.retain(|_, connection| !connection.sender.is_closed());
                let removed = before - client_map.len();
                if removed > 0 {
                    process_info!(ProcessId::current(), "🧹 Cleaned up {} disconnected sessions", removed);
                }
            }
        })
    }
}

#[async_trait]
impl WebSocketManager for RealWebSocketManager {
    async fn add_client(
        &self,
        client_id: Uuid,
        agent: Option<AgentId>,
        sender: mpsc::Sender<ClientMessage>,
    ) -> WebServerResult<()> {
        let ack = ClientMessage::ConnectionAck {
            session_id: client_id,
            agent: agent.clone(),
            server_time: Utc::now().timestamp().max(0) as u64,
        };
        if let Err(e) = sender.try_send(ack) {
            process_warn!(ProcessId::current(), "Failed to send connection ack to {}: {}", client_id, e);
        }

        let connection = ClientConnection {
            agent,
            sender,
            connected_at: Utc::now(),
        };
        if let Some(agent) = &connection.agent {
            process_info!(ProcessId::current(), "👋 Added session {} for {}", client_id, agent);
        } else {
            process_info!(ProcessId::current(), "👋 Added anonymous session {}", client_id);
        }
        self.clients.write().await.insert(client_id, connection);
        Ok(())
    }

    async fn identify(&self, client_id: Uuid, agent: AgentId) -> WebServerResult<()> {
        let mut clients = self.clients.write().await;
        let connection = clients
            .get_mut(&client_id)
            .ok_or_else(|| WebServerError::websocket(format!("Session {client_id} not found")))?;
        process_info!(ProcessId::current(), "🪪 Session {} identified as {}", client_id, agent);
        connection.agent = Some(agent);
        Ok(())
    }

    async fn remove_client(&self, client_id: Uuid) -> WebServerResult<()> {
        let removed = self.clients.write().await.remove(&client_id);
        if let Some(connection) = removed {
            let open_for = Utc::now() - connection.connected_at;
            process_info!(
                ProcessId::current(),
                "👋 Removed session {} after {}s",
                client_id,
                open_for.num_seconds()
            );
        }
        Ok(())
    }

    async fn broadcast(&self, message: ClientMessage) -> WebServerResult<()> {
        let targets = {
            let clients = self.clients.read().await;
            if clients.is_empty() {
                process_debug!(ProcessId::current(), "📭 No sessions connected, nothing to broadcast");
                return Ok(());
            }
            clients
                .iter()
                .map(|(client_id, connection)| (*client_id, connection.sender.clone()))
                .collect::<Vec<_>>()
        };

        let total = targets.len();
        let delivered = self.deliver(targets, &message).await;
        process_debug!(ProcessId::current(), "📡 Broadcast delivered to {}/{} sessions", delivered, total);
        Ok(())
    }

    async fn send_to_agent(&self, agent: &AgentId, message: ClientMessage) -> WebServerResult<usize> {
        let targets = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .filter(|(_, connection)| connection.agent.as_ref() == Some(agent))
                .map(|(client_id, connection)| (*client_id, connection.sender.clone()))
                .collect::<Vec<_>>()
        };

        if targets.is_empty() {
            return Ok(0);
        }
        Ok(self.deliver(targets, &message).await)
    }

    async fn send_to_client(&self, client_id: Uuid, message: ClientMessage) -> WebServerResult<()> {
        let sender = {
            let clients = self.clients.read().await;
            clients.get(&client_id).map(|connection| connection.sender.clone())
        };

        let Some(sender) = sender else {
            return Err(WebServerError::websocket(format!("Session {client_id} not found")));
        };

        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(WebServerError::websocket("Session channel full")),
            Err(TrySendError::Closed(_)) => {
                if self.clients.write().await.remove(&client_id).is_some() {
                    process_info!(ProcessId::current(), "🗑️ Removed disconnected session {}", client_id);
                }
                Err(WebServerError::websocket("Session disconnected"))
            }
        }
    }

    async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn active_clients(&self) -> Vec<Uuid> {
        self.clients.read().await.keys().copied().collect()
    }
}

impl Default for RealWebSocketManager {
    fn default() -> Self {
        Self::new()
    }
}
