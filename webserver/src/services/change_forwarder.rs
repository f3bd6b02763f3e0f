//! Pushes committed store changes to browser sessions
//!
//! Client rows go only to sessions bound to the owning agent. Payroll batches
//! and credential slots are shared views and go to every session.

use std::sync::Arc;

use engine::services::Subscription;
use shared::{process_info, process_warn, ChangeEvent, ChangeNotice, ProcessId, RowChange};
use tokio::task::JoinHandle;

use crate::error::WebServerResult;
use crate::traits::WebSocketManager;
use crate::types::ClientMessage;

/// Route one committed change to the sessions allowed to see it
pub async fn route_change<W>(websockets: &W, event: ChangeEvent) -> WebServerResult<()>
where
    W: WebSocketManager + ?Sized,
{
    let owner = match &event.change {
        RowChange::ClientUpserted { client } => Some(client.owner.clone()),
        RowChange::ClientDeleted { owner, .. } => Some(owner.clone()),
        RowChange::BatchCreated { .. } | RowChange::BatchUpdated { .. } | RowChange::SlotChanged { .. } => None,
    };

    let message = ClientMessage::Change { event };
    match owner {
        Some(owner) => websockets.send_to_agent(&owner, message).await.map(|_| ()),
        None => websockets.broadcast(message).await,
    }
}

/// Drain `subscription` into the session registry until the feed closes
pub fn spawn_change_forwarder<W>(mut subscription: Subscription, websockets: Arc<W>) -> JoinHandle<()>
where
    W: WebSocketManager + 'static,
{
    tokio::spawn(async move {
        process_info!(ProcessId::current(), "📡 Forwarding store changes to sessions");

        while let Some(notice) = subscription.recv().await {
            let result = match notice {
                ChangeNotice::Change { event } => route_change(websockets.as_ref(), event).await,
                ChangeNotice::Lagged { missed } => {
                    process_warn!(ProcessId::current(), "⚠️ Change forwarder lagged, {} events dropped", missed);
                    websockets.broadcast(ClientMessage::Resync { missed }).await
                }
            };
            if let Err(e) = result {
                process_warn!(ProcessId::current(), "Failed to forward change: {}", e);
            }
        }

        process_info!(ProcessId::current(), "Change feed closed, forwarder stopping");
    })
}
