//! Committed-change notifications
//!
//! Every successful store write produces one `ChangeEvent`. Subscribers watch a
//! table and a row predicate and receive matching events in commit order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AgentId, Client, ClientId, CredentialPairId, CredentialSlot, PayrollBatch};

/// Store tables that emit change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Clients,
    PayrollBatches,
    CredentialSlots,
}

/// Row-level change payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowChange {
    ClientUpserted { client: Client },
    ClientDeleted { id: ClientId, owner: AgentId },
    BatchCreated { batch: PayrollBatch },
    BatchUpdated { batch: PayrollBatch },
    SlotChanged { slot: CredentialSlot },
}

impl RowChange {
    pub fn table(&self) -> Table {
        match self {
            RowChange::ClientUpserted { .. } | RowChange::ClientDeleted { .. } => Table::Clients,
            RowChange::BatchCreated { .. } | RowChange::BatchUpdated { .. } => Table::PayrollBatches,
            RowChange::SlotChanged { .. } => Table::CredentialSlots,
        }
    }
}

/// A committed write, numbered in commit order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub change: RowChange,
}

impl ChangeEvent {
    pub fn table(&self) -> Table {
        self.change.table()
    }
}

/// Row predicate applied on top of the table filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowPredicate {
    All,
    Pair { pair: CredentialPairId },
}

impl RowPredicate {
    fn matches(&self, change: &RowChange) -> bool {
        match (self, change) {
            (RowPredicate::All, _) => true,
            (RowPredicate::Pair { pair }, RowChange::SlotChanged { slot }) => slot.key.pair == *pair,
            _ => false,
        }
    }
}

/// What a subscription watches: an optional table plus a row predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub table: Option<Table>,
    pub predicate: RowPredicate,
}

impl ChangeFilter {
    /// Every change on every table
    pub fn everything() -> Self {
        Self {
            table: None,
            predicate: RowPredicate::All,
        }
    }

    /// Every change on one table
    pub fn table(table: Table) -> Self {
        Self {
            table: Some(table),
            predicate: RowPredicate::All,
        }
    }

    pub fn with_predicate(mut self, predicate: RowPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.table.map_or(true, |table| table == event.table()) && self.predicate.matches(&event.change)
    }
}

/// Item delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeNotice {
    Change { event: ChangeEvent },
    /// The subscriber fell behind and `missed` events were dropped; re-read state
    Lagged { missed: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, SlotKey};

    fn slot_event(group: &str) -> ChangeEvent {
        ChangeEvent {
            sequence: 1,
            committed_at: Utc::now(),
            change: RowChange::SlotChanged {
                slot: CredentialSlot::empty(SlotKey {
                    pair: CredentialPairId::new(group, "ventas01"),
                    channel: Channel::Siac,
                }),
            },
        }
    }

    #[test]
    fn test_table_filter() {
        let event = slot_event("movistar");
        assert!(ChangeFilter::everything().matches(&event));
        assert!(ChangeFilter::table(Table::CredentialSlots).matches(&event));
        assert!(!ChangeFilter::table(Table::Clients).matches(&event));
    }

    #[test]
    fn test_pair_predicate() {
        let filter = ChangeFilter::table(Table::CredentialSlots).with_predicate(RowPredicate::Pair {
            pair: CredentialPairId::new("movistar", "ventas01"),
        });
        assert!(filter.matches(&slot_event("movistar")));
        assert!(!filter.matches(&slot_event("claro")));
    }
}
