//! Payroll settlement records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, BatchId, Cents, Client};

/// Immutable settlement grouping of commissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollBatch {
    pub id: BatchId,
    pub name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Snapshot sum taken at creation, not a live view
    pub total_cents: Cents,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub created_by: AgentId,
    /// Terminal paid marker
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PayrollBatch {
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }
}

/// Inclusive 7-day payroll window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    pub week_number: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Pending clients sharing the same cutoff date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoffGroup {
    pub cutoff: NaiveDate,
    pub clients: Vec<Client>,
    pub total_cents: Cents,
}

/// Per-agent slice of a batch, joined against the directory at display time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBreakdown {
    pub agent: AgentId,
    pub display_name: String,
    pub client_count: usize,
    pub total_cents: Cents,
}
