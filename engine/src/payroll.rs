//! Payroll settlement service
//!
//! Groups installed, unsettled clients by cutoff date for display and turns
//! the whole pending set into one immutable batch on request. Privileged
//! operations are authorized here, at the service boundary.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use shared::{
    format_cents, process_error, process_info, process_warn, AgentBreakdown, AgentId, BatchId, Cents, Client,
    CutoffGroup, PayrollBatch, ProcessId,
};

use crate::core::{CommissionSchedule, CutoffCalendar};
use crate::error::{CoreError, CoreResult};
use crate::traits::{ClientFilter, ClientRepository, Clock, Directory, PayrollRepository};

pub struct PayrollService<C, P>
where
    C: ClientRepository + 'static,
    P: PayrollRepository + 'static,
{
    clients: Arc<C>,
    batches: Arc<P>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
    schedule: CommissionSchedule,
    calendar: CutoffCalendar,
}

impl<C, P> PayrollService<C, P>
where
    C: ClientRepository + 'static,
    P: PayrollRepository + 'static,
{
    pub fn new(
        clients: Arc<C>,
        batches: Arc<P>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
        schedule: CommissionSchedule,
        calendar: CutoffCalendar,
    ) -> Self {
        Self {
            clients,
            batches,
            directory,
            clock,
            schedule,
            calendar,
        }
    }

    pub fn calendar(&self) -> &CutoffCalendar {
        &self.calendar
    }

    /// Pending clients grouped by cutoff date, newest cutoff first
    pub async fn query_pending(&self) -> CoreResult<Vec<CutoffGroup>> {
        let pending = self.clients.query_clients(ClientFilter::PendingSettlement).await?;

        let mut groups: BTreeMap<NaiveDate, Vec<Client>> = BTreeMap::new();
        for client in pending {
            let installed = client.installed_at.unwrap_or(client.created_at);
            groups.entry(self.calendar.cutoff_for(installed)).or_default().push(client);
        }

        Ok(groups
            .into_iter()
            .rev()
            .map(|(cutoff, mut clients)| {
                clients.sort_by(|a, b| b.installed_at.cmp(&a.installed_at).then(a.id.cmp(&b.id)));
                let total_cents = clients.iter().map(|client| client.commission_cents).sum();
                CutoffGroup {
                    cutoff,
                    clients,
                    total_cents,
                }
            })
            .collect())
    }

    /// Settle every pending client into one new batch
    pub async fn generate_payroll_batch(&self, caller: &AgentId) -> CoreResult<PayrollBatch> {
        self.authorize(caller, "generate payroll batches")?;

        let pending = self.clients.query_clients(ClientFilter::PendingSettlement).await?;
        if pending.is_empty() {
            return Err(CoreError::validation("no installed clients are pending settlement"));
        }

        let total_cents = self.recompute_total(&pending);
        let now = self.clock.now();
        let period = self.calendar.period_for(self.calendar.local_date(now));
        let batch = PayrollBatch {
            id: BatchId::new(),
            name: CutoffCalendar::batch_name(&period),
            period_start: period.start,
            period_end: period.end,
            total_cents,
            member_count: pending.len(),
            created_at: now,
            created_by: caller.clone(),
            paid_at: None,
        };
        let members = pending.iter().map(|client| client.id).collect();

        let committed = self.batches.commit_batch(batch, members).await.map_err(|e| {
            if matches!(e, CoreError::Conflict { .. }) {
                process_warn!(ProcessId::current(), "⚠️ Payroll batch aborted: {}", e);
            } else {
                process_error!(ProcessId::current(), "❌ Payroll batch commit failed: {}", e);
            }
            e
        })?;

        process_info!(
            ProcessId::current(),
            "💰 {} settled by {}: {} clients, total {}",
            committed.name,
            caller,
            committed.member_count,
            format_cents(committed.total_cents)
        );
        Ok(committed)
    }

    /// All batches, newest first
    pub async fn list_batches(&self) -> CoreResult<Vec<PayrollBatch>> {
        self.batches.list_batches().await
    }

    pub async fn get_batch(&self, id: BatchId) -> CoreResult<PayrollBatch> {
        self.batches
            .get_batch(id)
            .await?
            .ok_or_else(|| CoreError::not_found("payroll batch", id))
    }

    pub async fn batch_members(&self, id: BatchId) -> CoreResult<Vec<Client>> {
        self.get_batch(id).await?;
        self.clients.query_clients(ClientFilter::InBatch(id)).await
    }

    /// Per-agent totals of a batch, joined against the directory now
    pub async fn batch_breakdown(&self, id: BatchId) -> CoreResult<Vec<AgentBreakdown>> {
        let members = self.batch_members(id).await?;

        let mut per_agent: BTreeMap<AgentId, (usize, Cents)> = BTreeMap::new();
        for client in &members {
            let entry = per_agent.entry(client.owner.clone()).or_default();
            entry.0 += 1;
            entry.1 += client.commission_cents;
        }

        let mut breakdown: Vec<_> = per_agent
            .into_iter()
            .map(|(agent, (client_count, total_cents))| AgentBreakdown {
                display_name: self
                    .directory
                    .display_name(&agent)
                    .unwrap_or_else(|| agent.to_string()),
                agent,
                client_count,
                total_cents,
            })
            .collect();
        breakdown.sort_by(|a, b| b.total_cents.cmp(&a.total_cents).then(a.agent.cmp(&b.agent)));
        Ok(breakdown)
    }

    pub async fn mark_batch_paid(&self, id: BatchId, caller: &AgentId) -> CoreResult<PayrollBatch> {
        self.authorize(caller, "mark payroll batches paid")?;
        let paid = self.batches.mark_batch_paid(id, self.clock.now()).await?;
        process_info!(ProcessId::current(), "✅ {} marked paid by {}", paid.name, caller);
        Ok(paid)
    }

    fn authorize(&self, caller: &AgentId, action: &str) -> CoreResult<()> {
        if self.directory.is_payroll_admin(caller) {
            return Ok(());
        }
        process_warn!(ProcessId::current(), "🚫 {} may not {}", caller, action);
        Err(CoreError::unauthorized(caller, action))
    }

    /// Re-derive the batch total from service types; stored amounts are not trusted
    fn recompute_total(&self, pending: &[Client]) -> Cents {
        for client in pending {
            let expected = self.schedule.commission(client.service_type);
            if expected != client.commission_cents {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Client {} stored commission {} differs from {} for {}",
                    client.id,
                    format_cents(client.commission_cents),
                    format_cents(expected),
                    client.service_type
                );
            }
        }
        self.schedule.total(pending.iter().map(|client| client.service_type))
    }
}
