//! Pipeline service
//!
//! Loads a client, applies one pure transition from [`crate::core::pipeline`],
//! persists the result and only then returns it. A rejected transition or a
//! failed write leaves the stored record untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    process_error, process_info, process_warn, ActivityKind, AgentId, Client, ClientId, NewClient, PipelineStatus,
    ProcessId,
};
use uuid::Uuid;

use crate::core::{pipeline as transitions, CommissionSchedule};
use crate::error::{CoreError, CoreResult};
use crate::traits::{ClientFilter, ClientRepository, Clock};

pub struct PipelineService<R>
where
    R: ClientRepository + 'static,
{
    clients: Arc<R>,
    clock: Arc<dyn Clock>,
    schedule: CommissionSchedule,
}

impl<R> PipelineService<R>
where
    R: ClientRepository + 'static,
{
    pub fn new(clients: Arc<R>, clock: Arc<dyn Clock>, schedule: CommissionSchedule) -> Self {
        Self {
            clients,
            clock,
            schedule,
        }
    }

    /// Capture a new lead as a prospect owned by `agent`
    pub async fn create_client(&self, agent: &AgentId, draft: NewClient) -> CoreResult<Client> {
        if draft.full_name.trim().is_empty() {
            return Err(CoreError::validation("client name must not be empty"));
        }

        let now = self.clock.now();
        let mut client = Client::new(agent.clone(), draft, now);
        client.record(ActivityKind::Created, agent, "Client created", now);

        let stored = self.clients.insert_client(client).await.map_err(|e| {
            process_error!(ProcessId::current(), "❌ Failed to store new client: {}", e);
            e
        })?;
        process_info!(
            ProcessId::current(),
            "🆕 Client {} created by {} ({})",
            stored.id,
            agent,
            stored.service_type
        );
        Ok(stored)
    }

    pub async fn get_client(&self, id: ClientId) -> CoreResult<Client> {
        self.clients
            .get_client(id)
            .await?
            .ok_or_else(|| CoreError::not_found("client", id))
    }

    /// Every client, or only those owned by `owner`; newest first
    pub async fn list_clients(&self, owner: Option<&AgentId>) -> CoreResult<Vec<Client>> {
        let filter = match owner {
            Some(agent) => ClientFilter::OwnedBy(agent.clone()),
            None => ClientFilter::All,
        };
        self.clients.query_clients(filter).await
    }

    pub async fn list_by_status(&self, status: PipelineStatus) -> CoreResult<Vec<Client>> {
        self.clients.query_clients(ClientFilter::Status(status)).await
    }

    pub async fn set_status(&self, id: ClientId, status: PipelineStatus, agent: &AgentId) -> CoreResult<Client> {
        self.transition(id, "set status", agent, |client, now| {
            transitions::set_status(client, status, agent, now)
        })
        .await
    }

    pub async fn capture_reference(&self, id: ClientId, reference: &str, agent: &AgentId) -> CoreResult<Client> {
        self.transition(id, "capture reference", agent, |client, now| {
            transitions::capture_reference(client, reference, agent, now)
        })
        .await
    }

    pub async fn confirm_installation(&self, id: ClientId, agent: &AgentId) -> CoreResult<Client> {
        let schedule = self.schedule;
        self.transition(id, "confirm installation", agent, |client, now| {
            transitions::confirm_installation(client, &schedule, agent, now)
        })
        .await
    }

    pub async fn reject_installation(&self, id: ClientId, reason: &str, agent: &AgentId) -> CoreResult<Client> {
        self.transition(id, "reject installation", agent, |client, now| {
            transitions::reject_installation(client, reason, agent, now)
        })
        .await
    }

    pub async fn add_note(&self, id: ClientId, text: &str, agent: &AgentId) -> CoreResult<Client> {
        self.transition(id, "add note", agent, |client, now| {
            transitions::add_note(client, text, agent, now)
        })
        .await
    }

    pub async fn remove_activity(&self, id: ClientId, entry_id: Uuid, agent: &AgentId) -> CoreResult<Client> {
        self.transition(id, "remove activity", agent, |client, now| {
            transitions::remove_activity(client, entry_id, agent, now)
        })
        .await
    }

    /// Hard delete; refused once paperwork is on file
    pub async fn delete_client(&self, id: ClientId, agent: &AgentId) -> CoreResult<()> {
        let client = self.get_client(id).await?;
        if let Err(e) = transitions::ensure_deletable(&client, agent) {
            process_warn!(ProcessId::current(), "🚫 Delete of client {} by {} rejected: {}", id, agent, e);
            return Err(e);
        }

        self.clients.delete_client(id).await.map_err(|e| {
            process_error!(ProcessId::current(), "❌ Failed to delete client {}: {}", id, e);
            e
        })?;
        process_info!(ProcessId::current(), "🗑️ Client {} deleted by {}", id, agent);
        Ok(())
    }

    async fn transition<F>(&self, id: ClientId, action: &str, agent: &AgentId, apply: F) -> CoreResult<Client>
    where
        F: FnOnce(&Client, DateTime<Utc>) -> CoreResult<Client>,
    {
        let current = self.get_client(id).await?;
        let next = apply(&current, self.clock.now()).map_err(|e| {
            process_warn!(ProcessId::current(), "🚫 {} on client {} by {} rejected: {}", action, id, agent, e);
            e
        })?;

        let saved = self.clients.update_client(next).await.map_err(|e| {
            process_error!(ProcessId::current(), "❌ Failed to persist {} on client {}: {}", action, id, e);
            e
        })?;
        process_info!(
            ProcessId::current(),
            "📝 {} on client {} by {}: now {}",
            action,
            id,
            agent,
            saved.status
        );
        Ok(saved)
    }
}
