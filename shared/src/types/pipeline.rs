//! Client (lead) records and pipeline status types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{AgentId, BatchId, Cents, ClientId};
use crate::errors::SharedError;

/// Service sold to the client; closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    NewLine,
    Portability,
    Winback,
    Migration,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::NewLine,
        ServiceType::Portability,
        ServiceType::Winback,
        ServiceType::Migration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::NewLine => "new_line",
            ServiceType::Portability => "portability",
            ServiceType::Winback => "winback",
            ServiceType::Migration => "migration",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new_line" => Ok(ServiceType::NewLine),
            "portability" => Ok(ServiceType::Portability),
            "winback" => Ok(ServiceType::Winback),
            "migration" => Ok(ServiceType::Migration),
            _ => Err(SharedError::UnknownServiceType { input: s.to_string() }),
        }
    }
}

/// Lifecycle status of a client record.
///
/// Records written before the status set was consolidated may carry `lost` or
/// `quoted`; those are read as `no_coverage` and `interested` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Prospect,
    Contacted,
    #[serde(alias = "quoted")]
    Interested,
    PendingCapture,
    Captured,
    CloseScheduled,
    Posted,
    Installed,
    #[serde(alias = "lost")]
    NoCoverage,
    Cancelled,
}

impl PipelineStatus {
    pub const ALL: [PipelineStatus; 10] = [
        PipelineStatus::Prospect,
        PipelineStatus::Contacted,
        PipelineStatus::Interested,
        PipelineStatus::PendingCapture,
        PipelineStatus::Captured,
        PipelineStatus::CloseScheduled,
        PipelineStatus::Posted,
        PipelineStatus::Installed,
        PipelineStatus::NoCoverage,
        PipelineStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Prospect => "prospect",
            PipelineStatus::Contacted => "contacted",
            PipelineStatus::Interested => "interested",
            PipelineStatus::PendingCapture => "pending_capture",
            PipelineStatus::Captured => "captured",
            PipelineStatus::CloseScheduled => "close_scheduled",
            PipelineStatus::Posted => "posted",
            PipelineStatus::Installed => "installed",
            PipelineStatus::NoCoverage => "no_coverage",
            PipelineStatus::Cancelled => "cancelled",
        }
    }

    /// Paperwork has been filed; the record must not be deleted
    pub fn protects_paperwork(&self) -> bool {
        matches!(self, PipelineStatus::Captured | PipelineStatus::Posted)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStatus {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "lost" => return Ok(PipelineStatus::NoCoverage),
            "quoted" => return Ok(PipelineStatus::Interested),
            _ => {}
        }
        PipelineStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| SharedError::UnknownStatus { input: s.to_string() })
    }
}

/// Kind of activity-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    StatusChanged,
    ReferenceCaptured,
    InstallationConfirmed,
    InstallationRejected,
    Note,
}

/// Immutable activity-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub agent: AgentId,
}

/// Client (lead) record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub owner: AgentId,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub service_type: ServiceType,
    pub status: PipelineStatus,
    #[serde(default)]
    pub external_reference: Option<String>,
    /// Frozen at installation confirmation; zero before that
    #[serde(default)]
    pub commission_cents: Cents,
    #[serde(default)]
    pub installed_at: Option<DateTime<Utc>>,
    /// Write-once settlement marker
    #[serde(default)]
    pub payroll_batch: Option<BatchId>,
    /// Newest first
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Build a fresh prospect owned by `owner`
    pub fn new(owner: AgentId, draft: NewClient, now: DateTime<Utc>) -> Self {
        Self {
            id: ClientId::new(),
            owner,
            full_name: draft.full_name,
            phone: draft.phone,
            service_type: draft.service_type,
            status: PipelineStatus::Prospect,
            external_reference: None,
            commission_cents: 0,
            installed_at: None,
            payroll_batch: None,
            activity: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Prepend an activity entry and return its id
    pub fn record(
        &mut self,
        kind: ActivityKind,
        agent: &AgentId,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Uuid {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            timestamp: now,
            agent: agent.clone(),
        };
        let id = entry.id;
        self.activity.insert(0, entry);
        self.updated_at = now;
        id
    }

    pub fn has_reference(&self) -> bool {
        self.external_reference
            .as_deref()
            .is_some_and(|reference| !reference.trim().is_empty())
    }

    /// Installed and not yet grouped into a payroll batch
    pub fn is_pending_settlement(&self) -> bool {
        self.status == PipelineStatus::Installed && self.payroll_batch.is_none()
    }
}

/// Fields supplied by an agent when capturing a new lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub service_type: ServiceType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_statuses_are_remapped_on_load() {
        let lost: PipelineStatus = serde_json::from_str("\"lost\"").unwrap();
        let quoted: PipelineStatus = serde_json::from_str("\"quoted\"").unwrap();
        assert_eq!(lost, PipelineStatus::NoCoverage);
        assert_eq!(quoted, PipelineStatus::Interested);

        // Remapped values are written back under their current names
        assert_eq!(serde_json::to_string(&lost).unwrap(), "\"no_coverage\"");
    }

    #[test]
    fn test_status_parsing() {
        for status in PipelineStatus::ALL {
            assert_eq!(status.as_str().parse::<PipelineStatus>().unwrap(), status);
        }
        assert_eq!("LOST".parse::<PipelineStatus>().unwrap(), PipelineStatus::NoCoverage);
        assert!("archived".parse::<PipelineStatus>().is_err());
    }

    #[test]
    fn test_paperwork_protection() {
        let protected: Vec<_> = PipelineStatus::ALL
            .into_iter()
            .filter(PipelineStatus::protects_paperwork)
            .collect();
        assert_eq!(protected, vec![PipelineStatus::Captured, PipelineStatus::Posted]);
    }

    #[test]
    fn test_activity_is_prepended() {
        let agent = AgentId::from("ana@example.com");
        let now = Utc::now();
        let mut client = Client::new(
            agent.clone(),
            NewClient {
                full_name: "Rosa Medina".to_string(),
                phone: None,
                service_type: ServiceType::NewLine,
            },
            now,
        );

        client.record(ActivityKind::Note, &agent, "first", now);
        let second = client.record(ActivityKind::Note, &agent, "second", now);

        assert_eq!(client.activity[0].id, second);
        assert_eq!(client.activity[1].description, "first");
    }
}
