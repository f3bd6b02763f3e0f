//! Trait definitions with mockall annotations for testing
//!
//! Storage, identity lookup, change notification and time are all injected
//! through these traits. Services depend only on the traits, so tests can swap
//! in mocks to inject failures or assert that nothing was written.

use chrono::{DateTime, Utc};
use shared::{
    AgentId, BatchId, ChangeEvent, ChangeFilter, Claim, Client, ClientId, CredentialSlot, PayrollBatch,
    PipelineStatus, SlotKey,
};

use crate::error::CoreResult;
use crate::services::change_feed::Subscription;

/// Row filter for client queries
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFilter {
    All,
    OwnedBy(AgentId),
    Status(PipelineStatus),
    /// Installed with no payroll batch reference
    PendingSettlement,
    InBatch(BatchId),
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            ClientFilter::All => true,
            ClientFilter::OwnedBy(agent) => client.owner == *agent,
            ClientFilter::Status(status) => client.status == *status,
            ClientFilter::PendingSettlement => client.is_pending_settlement(),
            ClientFilter::InBatch(batch) => client.payroll_batch == Some(*batch),
        }
    }
}

/// Result of a compare-and-set on a slot's claim field
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The expected claim matched and the replacement was written
    Applied(CredentialSlot),
    /// Someone else wrote first; carries the slot as currently stored
    Stale(CredentialSlot),
}

/// Client (lead) table
#[mockall::automock]
#[async_trait::async_trait]
pub trait ClientRepository: Send + Sync {
    async fn insert_client(&self, client: Client) -> CoreResult<Client>;

    async fn get_client(&self, id: ClientId) -> CoreResult<Option<Client>>;

    /// Replace a stored client row.
    ///
    /// The stored payroll batch reference is kept whatever the incoming row
    /// says; only [`PayrollRepository::commit_batch`] writes it.
    async fn update_client(&self, client: Client) -> CoreResult<Client>;

    async fn delete_client(&self, id: ClientId) -> CoreResult<()>;

    async fn query_clients(&self, filter: ClientFilter) -> CoreResult<Vec<Client>>;
}

/// Payroll batch table
#[mockall::automock]
#[async_trait::async_trait]
pub trait PayrollRepository: Send + Sync {
    /// Insert `batch` and stamp every member with its id in one atomic write.
    ///
    /// Fails with a conflict, writing nothing, if any member is missing or
    /// already carries a batch reference.
    async fn commit_batch(&self, batch: PayrollBatch, members: Vec<ClientId>) -> CoreResult<PayrollBatch>;

    /// Newest first
    async fn list_batches(&self) -> CoreResult<Vec<PayrollBatch>>;

    async fn get_batch(&self, id: BatchId) -> CoreResult<Option<PayrollBatch>>;

    /// Set the terminal paid marker; a second call is a validation error
    async fn mark_batch_paid(&self, id: BatchId, paid_at: DateTime<Utc>) -> CoreResult<PayrollBatch>;
}

/// Credential slot table
#[mockall::automock]
#[async_trait::async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Upsert an empty slot by key; an existing row is returned untouched
    async fn seed_slot(&self, key: SlotKey) -> CoreResult<CredentialSlot>;

    async fn get_slot(&self, key: SlotKey) -> CoreResult<Option<CredentialSlot>>;

    async fn list_slots(&self) -> CoreResult<Vec<CredentialSlot>>;

    /// Write `replacement` only if the stored claim still equals `expected`
    async fn compare_and_set_claim(
        &self,
        key: SlotKey,
        expected: Option<Claim>,
        replacement: Option<Claim>,
    ) -> CoreResult<CasOutcome>;
}

/// Read-only identity directory
#[mockall::automock]
pub trait Directory: Send + Sync {
    fn display_name(&self, agent: &AgentId) -> Option<String>;

    /// May generate payroll batches and mark them paid
    fn is_payroll_admin(&self, agent: &AgentId) -> bool;
}

/// Committed-change notification feed
#[mockall::automock]
pub trait ChangeFeed: Send + Sync {
    /// Deliver a committed change to current subscribers
    fn publish(&self, event: ChangeEvent);

    fn subscribe(&self, filter: ChangeFilter) -> Subscription;
}

/// Time source
#[mockall::automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
