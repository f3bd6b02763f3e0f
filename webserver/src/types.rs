//! Type definitions for webserver
//!
//! Messages exchanged with browser sessions over the WebSocket, and the JSON
//! bodies accepted by the REST API.

use serde::{Deserialize, Serialize};
use shared::{AgentId, ChangeEvent, NewClient, PipelineStatus};
use uuid::Uuid;

/// Messages pushed from the webserver to a browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionAck {
        session_id: Uuid,
        agent: Option<AgentId>,
        server_time: u64,
    },
    /// A committed store change the session is allowed to see
    Change { event: ChangeEvent },
    /// Changes were dropped; the session should reload its views
    Resync { missed: u64 },
    Pong { server_time: u64 },
    Error { message: String },
}

/// Requests a browser session sends over the WebSocket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Attach the session to an agent so it receives that agent's client changes
    Identify { agent: AgentId },
    Ping,
}

/// Body for `POST /api/clients`
pub type CreateClientRequest = NewClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: PipelineStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReferenceRequest {
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectInstallationRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

/// Query for `GET /api/clients`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientListQuery {
    /// List every agent's clients instead of the caller's own
    #[serde(default)]
    pub all: bool,
    pub status: Option<PipelineStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResponse {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub connected_sessions: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_request_wire_format() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"type":"identify","agent":"ana@example.com"}"#).unwrap();
        assert_eq!(
            request,
            ClientRequest::Identify {
                agent: AgentId::new("ana@example.com")
            }
        );
    }

    #[test]
    fn test_list_query_defaults_to_own_clients() {
        let query: ClientListQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.all);
        assert!(query.status.is_none());
    }
}
