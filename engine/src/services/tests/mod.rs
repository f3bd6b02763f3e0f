//! Service-specific tests
//!
//! Each service implementation has its own test file; shared builders live in
//! `common`.

mod change_feed;
mod memory_store;

pub mod common {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use shared::{AgentId, Channel, Client, CredentialPairId, NewClient, PipelineStatus, ServiceType, SlotKey};
    use tokio::time::timeout;

    use crate::services::{BroadcastChangeFeed, FixedClock, MemoryStore};

    /// Standard timeout for async operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }

    pub fn test_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap()))
    }

    pub fn test_store() -> (Arc<MemoryStore>, Arc<BroadcastChangeFeed>) {
        let feed = Arc::new(BroadcastChangeFeed::new());
        let store = Arc::new(MemoryStore::new(feed.clone(), test_clock()));
        (store, feed)
    }

    pub fn installed_client(owner: &str, service_type: ServiceType) -> Client {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap();
        let mut client = Client::new(
            AgentId::from(owner),
            NewClient {
                full_name: format!("Client of {owner}"),
                phone: None,
                service_type,
            },
            now,
        );
        client.status = PipelineStatus::Installed;
        client.installed_at = Some(now);
        client.commission_cents = crate::core::commission(service_type);
        client
    }

    pub fn slot_key(channel: Channel) -> SlotKey {
        CredentialPairId::new("movistar", "ventas01").slot(channel)
    }
}
