//! Claim decisions for shared-credential slots
//!
//! A claim is live until `ttl` has passed since its last renewal. Expired
//! claims are treated exactly like an empty slot; the sweeper clears them from
//! storage later. With no TTL, claims only end by explicit release.

use chrono::{DateTime, Duration, Utc};
use shared::{AgentId, Claim, CredentialSlot};

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_LEASE_TTL_SECS: u64 = 8 * 60 * 60;
const MAX_LEASE_TTL_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    ttl: Option<Duration>,
}

/// Outcome of a claim request against the current slot state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDecision {
    /// Slot is free; the agent takes it
    Claim(Claim),
    /// Agent already holds it; the toggle frees it
    Release,
    /// Someone else holds a live claim
    Conflict { holder: AgentId },
}

impl LeasePolicy {
    /// `None` or zero seconds disables expiry
    pub fn from_secs(ttl_secs: Option<u64>) -> Self {
        let ttl = ttl_secs
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::seconds(secs.min(MAX_LEASE_TTL_SECS) as i64));
        Self { ttl }
    }

    pub fn never_expires() -> Self {
        Self { ttl: None }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn is_live(&self, claim: &Claim, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now < claim.renewed_at + ttl,
            None => true,
        }
    }

    pub fn live_claim<'a>(&self, slot: &'a CredentialSlot, now: DateTime<Utc>) -> Option<&'a Claim> {
        slot.claim.as_ref().filter(|claim| self.is_live(claim, now))
    }

    /// Slot holds a claim that has outlived its lease
    pub fn is_expired(&self, slot: &CredentialSlot, now: DateTime<Utc>) -> bool {
        slot.claim.as_ref().is_some_and(|claim| !self.is_live(claim, now))
    }

    pub fn decide_claim(&self, slot: &CredentialSlot, agent: &AgentId, now: DateTime<Utc>) -> ClaimDecision {
        match self.live_claim(slot, now) {
            None => ClaimDecision::Claim(Claim::new(agent.clone(), now)),
            Some(claim) if claim.agent == *agent => ClaimDecision::Release,
            Some(claim) => ClaimDecision::Conflict {
                holder: claim.agent.clone(),
            },
        }
    }

    /// Explicit release is only for the current live holder
    pub fn check_release(&self, slot: &CredentialSlot, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<()> {
        self.held_by(slot, agent, now).map(|_| ())
    }

    /// Heartbeat: the holder's claim with a fresh renewal time
    pub fn renewed(&self, slot: &CredentialSlot, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<Claim> {
        let claim = self.held_by(slot, agent, now)?;
        Ok(Claim {
            renewed_at: now,
            ..claim.clone()
        })
    }

    /// Plaintext may be shown only when no slot of the pair is held
    pub fn reveal_allowed<'a, I>(&self, slots: I, now: DateTime<Utc>) -> bool
    where
        I: IntoIterator<Item = &'a CredentialSlot>,
    {
        slots.into_iter().all(|slot| self.live_claim(slot, now).is_none())
    }

    fn held_by<'a>(&self, slot: &'a CredentialSlot, agent: &AgentId, now: DateTime<Utc>) -> CoreResult<&'a Claim> {
        match self.live_claim(slot, now) {
            None => Err(CoreError::validation(format!("slot {} is not claimed", slot.key))),
            Some(claim) if claim.agent == *agent => Ok(claim),
            Some(claim) => Err(CoreError::conflict(format!(
                "slot {} is held by {}",
                slot.key, claim.agent
            ))),
        }
    }
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self::from_secs(Some(DEFAULT_LEASE_TTL_SECS))
    }
}
