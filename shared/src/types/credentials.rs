//! Shared-credential reservation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AgentId;
use crate::errors::SharedError;

/// Usage channel of a shared credential; fixed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Siac,
    Web,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Siac, Channel::Web];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Siac => "siac",
            Channel::Web => "web",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "siac" => Ok(Channel::Siac),
            "web" => Ok(Channel::Web),
            _ => Err(SharedError::UnknownChannel { input: s.to_string() }),
        }
    }
}

/// (secret-group, username) pair identifying one shared login
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialPairId {
    pub group: String,
    pub username: String,
}

impl CredentialPairId {
    pub fn new(group: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            username: username.into(),
        }
    }

    pub fn slot(&self, channel: Channel) -> SlotKey {
        SlotKey {
            pair: self.clone(),
            channel,
        }
    }
}

impl fmt::Display for CredentialPairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.username)
    }
}

/// Key of a single claimable slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub pair: CredentialPairId,
    pub channel: Channel,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pair, self.channel)
    }
}

/// Exclusive hold on a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub agent: AgentId,
    pub claimed_at: DateTime<Utc>,
    /// Last heartbeat; equals `claimed_at` until renewed
    pub renewed_at: DateTime<Utc>,
}

impl Claim {
    pub fn new(agent: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            agent,
            claimed_at: now,
            renewed_at: now,
        }
    }
}

/// Slot row: at most one claimant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSlot {
    pub key: SlotKey,
    #[serde(default)]
    pub claim: Option<Claim>,
}

impl CredentialSlot {
    pub fn empty(key: SlotKey) -> Self {
        Self { key, claim: None }
    }

    pub fn holder(&self) -> Option<&AgentId> {
        self.claim.as_ref().map(|claim| &claim.agent)
    }
}

/// All channels of one pair, as shown to agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairView {
    pub pair: CredentialPairId,
    pub slots: Vec<CredentialSlot>,
    pub reveal_allowed: bool,
}
