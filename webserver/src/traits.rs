//! Service traits for the webserver
//!
//! The session registry sits behind a trait so handlers and the change
//! forwarder can be tested against a mock.

use async_trait::async_trait;
use shared::AgentId;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::WebServerResult;
use crate::types::ClientMessage;

/// Registry of connected browser sessions
#[mockall::automock]
#[async_trait]
pub trait WebSocketManager: Send + Sync {
    /// Register a session, optionally already bound to an agent
    async fn add_client(
        &self,
        client_id: Uuid,
        agent: Option<AgentId>,
        sender: mpsc::Sender<ClientMessage>,
    ) -> WebServerResult<()>;

    /// Bind an open session to an agent
    async fn identify(&self, client_id: Uuid, agent: AgentId) -> WebServerResult<()>;

    async fn remove_client(&self, client_id: Uuid) -> WebServerResult<()>;

    /// Send to every session
    async fn broadcast(&self, message: ClientMessage) -> WebServerResult<()>;

    /// Send to every session bound to `agent`, returning how many received it
    async fn send_to_agent(&self, agent: &AgentId, message: ClientMessage) -> WebServerResult<usize>;

    async fn send_to_client(&self, client_id: Uuid, message: ClientMessage) -> WebServerResult<()>;

    async fn client_count(&self) -> usize;

    async fn active_clients(&self) -> Vec<Uuid>;
}
