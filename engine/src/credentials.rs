//! Shared-credential reservation service
//!
//! Agents take exclusive per-channel claims on a small pool of shared logins.
//! Every state change goes through the store's compare-and-set on the claim
//! field: the service reads the slot, decides, and writes only if nobody got
//! there first. Losing that race is reported as a conflict, never retried.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use shared::{
    process_debug, process_error, process_info, process_warn, AgentId, Channel, ChangeFilter, Claim,
    CredentialPairId, CredentialSlot, PairView, ProcessId, RowPredicate, SlotKey, Table,
};
use tokio::task::JoinHandle;

use crate::config::CredentialEntry;
use crate::core::{ClaimDecision, LeasePolicy};
use crate::error::{CoreError, CoreResult};
use crate::services::Subscription;
use crate::traits::{CasOutcome, ChangeFeed, Clock, CredentialRepository};

pub struct CredentialService<R>
where
    R: CredentialRepository + 'static,
{
    slots: Arc<R>,
    feed: Arc<dyn ChangeFeed>,
    clock: Arc<dyn Clock>,
    policy: LeasePolicy,
    secrets: HashMap<CredentialPairId, String>,
}

impl<R> CredentialService<R>
where
    R: CredentialRepository + 'static,
{
    pub fn new(
        slots: Arc<R>,
        feed: Arc<dyn ChangeFeed>,
        clock: Arc<dyn Clock>,
        policy: LeasePolicy,
        pool: &[CredentialEntry],
    ) -> Self {
        let secrets = pool
            .iter()
            .map(|entry| (entry.pair(), entry.secret.clone()))
            .collect();
        Self {
            slots,
            feed,
            clock,
            policy,
            secrets,
        }
    }

    /// Ensure an empty slot exists for every configured pair and channel
    pub async fn seed(&self) -> CoreResult<usize> {
        let mut pairs: Vec<_> = self.secrets.keys().cloned().collect();
        pairs.sort();
        let mut seeded = 0;
        for pair in pairs {
            for channel in Channel::ALL {
                self.slots.seed_slot(pair.slot(channel)).await?;
                seeded += 1;
            }
        }
        process_info!(ProcessId::current(), "🔐 Credential pool ready: {} slots", seeded);
        Ok(seeded)
    }

    /// Toggle the agent's claim on one channel of a pair
    pub async fn claim(&self, pair: &CredentialPairId, channel: Channel, agent: &AgentId) -> CoreResult<CredentialSlot> {
        let slot = self.load_slot(pair, channel).await?;
        let now = self.clock.now();

        let replacement = match self.policy.decide_claim(&slot, agent, now) {
            ClaimDecision::Claim(claim) => Some(claim),
            ClaimDecision::Release => None,
            ClaimDecision::Conflict { holder } => {
                process_warn!(ProcessId::current(), "🚫 {} tried to claim {} held by {}", agent, slot.key, holder);
                return Err(CoreError::conflict(format!("{} is in use by {holder}", slot.key)));
            }
        };
        let claimed = replacement.is_some();

        let updated = self.swap(slot, replacement).await?;
        if claimed {
            process_info!(ProcessId::current(), "🔒 {} claimed by {}", updated.key, agent);
        } else {
            process_info!(ProcessId::current(), "🔓 {} released by {}", updated.key, agent);
        }
        Ok(updated)
    }

    /// Explicit release by the current holder
    pub async fn release(&self, pair: &CredentialPairId, channel: Channel, agent: &AgentId) -> CoreResult<CredentialSlot> {
        let slot = self.load_slot(pair, channel).await?;
        if let Err(e) = self.policy.check_release(&slot, agent, self.clock.now()) {
            process_warn!(ProcessId::current(), "🚫 Release of {} by {} rejected: {}", slot.key, agent, e);
            return Err(e);
        }

        let updated = self.swap(slot, None).await?;
        process_info!(ProcessId::current(), "🔓 {} released by {}", updated.key, agent);
        Ok(updated)
    }

    /// Holder heartbeat extending the lease
    pub async fn renew(&self, pair: &CredentialPairId, channel: Channel, agent: &AgentId) -> CoreResult<CredentialSlot> {
        let slot = self.load_slot(pair, channel).await?;
        let renewed = self.policy.renewed(&slot, agent, self.clock.now())?;
        let updated = self.swap(slot, Some(renewed)).await?;
        process_debug!(ProcessId::current(), "💓 {} renewed by {}", updated.key, agent);
        Ok(updated)
    }

    /// Plaintext secret, only while no channel of the pair is held
    pub async fn reveal(&self, pair: &CredentialPairId, agent: &AgentId) -> CoreResult<String> {
        let secret = self
            .secrets
            .get(pair)
            .ok_or_else(|| CoreError::not_found("credential pair", pair))?;

        let slots = self.pair_slots(pair).await?;
        if !self.policy.reveal_allowed(&slots, self.clock.now()) {
            process_warn!(ProcessId::current(), "🚫 {} tried to reveal {} while it is in use", agent, pair);
            return Err(CoreError::conflict(format!("{pair} is in use and cannot be revealed")));
        }

        process_info!(ProcessId::current(), "👁️ {} revealed by {}", pair, agent);
        Ok(secret.clone())
    }

    /// Every pair with its slots; expired claims are shown as free
    pub async fn pair_views(&self) -> CoreResult<Vec<PairView>> {
        let now = self.clock.now();
        let mut grouped: BTreeMap<CredentialPairId, Vec<CredentialSlot>> = BTreeMap::new();
        for slot in self.slots.list_slots().await? {
            grouped.entry(slot.key.pair.clone()).or_default().push(slot);
        }

        Ok(grouped
            .into_iter()
            .map(|(pair, slots)| {
                let slots: Vec<_> = slots
                    .into_iter()
                    .map(|slot| CredentialSlot {
                        claim: self.policy.live_claim(&slot, now).cloned(),
                        key: slot.key,
                    })
                    .collect();
                PairView {
                    reveal_allowed: self.policy.reveal_allowed(&slots, now),
                    pair,
                    slots,
                }
            })
            .collect())
    }

    /// Live slot changes, optionally for a single pair
    pub fn subscribe(&self, pair: Option<CredentialPairId>) -> Subscription {
        let filter = ChangeFilter::table(Table::CredentialSlots);
        let filter = match pair {
            Some(pair) => filter.with_predicate(RowPredicate::Pair { pair }),
            None => filter,
        };
        self.feed.subscribe(filter)
    }

    /// Clear every expired claim; returns how many were cleared
    pub async fn sweep_expired(&self) -> CoreResult<usize> {
        let now = self.clock.now();
        let mut cleared = 0;
        for slot in self.slots.list_slots().await? {
            if !self.policy.is_expired(&slot, now) {
                continue;
            }
            let expected = slot.claim.clone();
            match self.slots.compare_and_set_claim(slot.key.clone(), expected, None).await? {
                CasOutcome::Applied(_) => {
                    process_info!(ProcessId::current(), "⌛ Expired claim on {} cleared", slot.key);
                    cleared += 1;
                }
                // Renewed or re-claimed since the scan
                CasOutcome::Stale(_) => {}
            }
        }
        Ok(cleared)
    }

    /// Periodically sweep expired claims; `None` when leases never expire
    pub fn spawn_lease_sweeper(self: Arc<Self>, every: Duration) -> Option<JoinHandle<()>> {
        self.policy.ttl()?;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_expired().await {
                    process_error!(ProcessId::current(), "❌ Lease sweep failed: {}", e);
                }
            }
        }))
    }

    async fn load_slot(&self, pair: &CredentialPairId, channel: Channel) -> CoreResult<CredentialSlot> {
        if !self.secrets.contains_key(pair) {
            return Err(CoreError::not_found("credential pair", pair));
        }
        let key = pair.slot(channel);
        self.slots
            .get_slot(key.clone())
            .await?
            .ok_or_else(|| CoreError::not_found("credential slot", key))
    }

    async fn pair_slots(&self, pair: &CredentialPairId) -> CoreResult<Vec<CredentialSlot>> {
        let mut slots = Vec::with_capacity(Channel::ALL.len());
        for channel in Channel::ALL {
            if let Some(slot) = self.slots.get_slot(pair.slot(channel)).await? {
                slots.push(slot);
            }
        }
        Ok(slots)
    }

    /// Compare-and-set from the slot as read to `replacement`
    async fn swap(&self, slot: CredentialSlot, replacement: Option<Claim>) -> CoreResult<CredentialSlot> {
        let key: SlotKey = slot.key;
        match self.slots.compare_and_set_claim(key.clone(), slot.claim, replacement).await? {
            CasOutcome::Applied(updated) => Ok(updated),
            CasOutcome::Stale(current) => {
                let holder = current
                    .holder()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "nobody".to_string());
                process_warn!(ProcessId::current(), "⚠️ {} changed concurrently; now held by {}", key, holder);
                Err(CoreError::conflict(format!("{key} was changed concurrently")))
            }
        }
    }
}
