//! Test helpers for webserver service tests

use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::services::RealWebSocketManager;
use crate::traits::WebSocketManager;
use crate::types::ClientMessage;
use shared::AgentId;

pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

/// Register a session and swallow its connection ack
pub async fn connect(
    manager: &RealWebSocketManager,
    agent: Option<AgentId>,
) -> (Uuid, mpsc::Receiver<ClientMessage>) {
    let client_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(16);
    manager.add_client(client_id, agent, tx).await.unwrap();
    match rx.recv().await {
        Some(ClientMessage::ConnectionAck { session_id, .. }) => assert_eq!(session_id, client_id),
        other => panic!("expected connection ack, got {other:?}"),
    }
    (client_id, rx)
}

pub async fn next_message(rx: &mut mpsc::Receiver<ClientMessage>) -> ClientMessage {
    tokio::time::timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("session channel closed")
}
