//! Pipeline transitions
//!
//! Every function here takes the current record and returns the next one
//! without touching storage. Callers persist the returned record and only then
//! hand it back to the agent, so a failed write leaves nothing half-applied.
//! Each accepted transition prepends exactly one activity entry.

use chrono::{DateTime, Utc};
use shared::{format_cents, ActivityKind, AgentId, Client, PipelineStatus};
use uuid::Uuid;

use super::commission::CommissionSchedule;
use crate::error::{CoreError, CoreResult};

/// Generic manual status setter.
/// Any status may follow any other, subject to the `ensure_*` guards.
/// Any status may follow any other, subject to the guards below.
pub fn set_status(client: &Client, status: PipelineStatus, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<Client> {
    ensure_status_changes(client, status)?;
    ensure_paperwork_on_file(client, status)?;
    ensure_manual_target(status)?;

    let mut next = client.clone();
    let previous = next.status;
    next.status = status;
    next.record(
        ActivityKind::StatusChanged,
        agent,
        format!("Status changed from {previous} to {status}"),
        now,
    );
    Ok(next)
}

/// Record the external reference number.
///
/// Filing paperwork moves the client to `captured` unless it is already
/// `posted`.
pub fn capture_reference(client: &Client, reference: &str, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<Client> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(CoreError::validation("reference number must not be empty"));
    }

    let mut next = client.clone();
    next.external_reference = Some(reference.to_string());
    let description = if next.status == PipelineStatus::Posted {
        format!("Reference {reference} captured")
    } else {
        let previous = next.status;
        next.status = PipelineStatus::Captured;
        format!("Reference {reference} captured; status changed from {previous} to captured")
    };
    next.record(ActivityKind::ReferenceCaptured, agent, description, now);
    Ok(next)
}

/// Mark the client installed and freeze its commission
pub fn confirm_installation(
    client: &Client,
    schedule: &CommissionSchedule,
    agent: &AgentId,
    now: DateTime<Utc>,
) -> CoreResult<Client> {
    if client.status == PipelineStatus::Installed {
        return Err(CoreError::validation(format!("client {} is already installed", client.id)));
    }
    if let Some(batch) = client.payroll_batch {
        return Err(CoreError::validation(format!(
            "client {} was already settled in batch {batch}",
            client.id
        )));
    }

    let mut next = client.clone();
    let amount = schedule.commission(next.service_type);
    next.status = PipelineStatus::Installed;
    next.installed_at = Some(now);
    next.commission_cents = amount;
    next.record(
        ActivityKind::InstallationConfirmed,
        agent,
        format!("Installation confirmed ({}), commission {}", next.service_type, format_cents(amount)),
        now,
    );
    Ok(next)
}

/// Installation could not be done; the commission is left as is
pub fn reject_installation(client: &Client, reason: &str, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<Client> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CoreError::validation("a rejection reason is required"));
    }

    let mut next = client.clone();
    next.status = PipelineStatus::NoCoverage;
    next.record(
        ActivityKind::InstallationRejected,
        agent,
        format!("Installation rejected: {reason}"),
        now,
    );
    Ok(next)
}

pub fn add_note(client: &Client, text: &str, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<Client> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CoreError::validation("note must not be empty"));
    }
    let mut next = client.clone();
    next.record(ActivityKind::Note, agent, text, now);
    Ok(next)
}

/// Drop one activity entry; only the owning agent may do this
pub fn remove_activity(client: &Client, entry_id: Uuid, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<Client> {
    ensure_owner(client, agent, "remove activity entries")?;

    let mut next = client.clone();
    let position = next
        .activity
        .iter()
        .position(|entry| entry.id == entry_id)
        .ok_or_else(|| CoreError::not_found("activity entry", entry_id))?;
    next.activity.remove(position);
    next.updated_at = now;
    Ok(next)
}

/// Check whether `agent` may hard-delete `client`
pub fn ensure_deletable(client: &Client, agent: &AgentId) -> CoreResult<()> {
    ensure_owner(client, agent, "delete this client")?;
    if client.status.protects_paperwork() {
        return Err(CoreError::validation(format!(
            "client {} is {} and cannot be deleted",
            client.id, client.status
        )));
    }
    if client.has_reference() {
        return Err(CoreError::validation(format!(
            "client {} has a reference number on file and cannot be deleted",
            client.id
        )));
    }
    Ok(())
}

fn ensure_status_changes(client: &Client, status: PipelineStatus) -> CoreResult<()> {
    if client.status == status {
        return Err(CoreError::validation(format!("client {} is already {status}", client.id)));
    }
    Ok(())
}

/// `captured` and `posted` need a reference number on file
fn ensure_paperwork_on_file(client: &Client, status: PipelineStatus) -> CoreResult<()> {
    if status.protects_paperwork() && !client.has_reference() {
        return Err(CoreError::validation(format!(
            "status {status} requires an external reference number"
        )));
    }
    Ok(())
}

/// `installed` freezes a commission, so it is only reachable through
/// [`confirm_installation`]
fn ensure_manual_target(status: PipelineStatus) -> CoreResult<()> {
    if status == PipelineStatus::Installed {
        return Err(CoreError::validation("installation must be confirmed explicitly"));
    }
    Ok(())
}

fn ensure_owner(client: &Client, agent: &AgentId, action: &str) -> CoreResult<()> {
    if client.owner != *agent {
        return Err(CoreError::unauthorized(agent, action));
    }
    Ok(())
}
