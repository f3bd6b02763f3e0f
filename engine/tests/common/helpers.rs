//! Test helpers and builder patterns for engine tests

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine::config::EngineConfig;
use engine::services::FixedClock;
use engine::SalesEngine;
use shared::{AgentId, Client, ServiceType};

use super::fixtures::TestFixtures;

/// Builder for a fully wired engine on a manual clock
pub struct EngineBuilder {
    config: EngineConfig,
    now: DateTime<Utc>,
    snapshot: Option<PathBuf>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            now: TestFixtures::tuesday(),
            snapshot: None,
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_lease_ttl_secs(mut self, ttl: Option<u64>) -> Self {
        self.config.lease_ttl_secs = ttl;
        self
    }

    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    pub async fn build(self) -> (SalesEngine, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(self.now));
        let engine = SalesEngine::open_with_clock(self.config, self.snapshot.as_deref(), clock.clone())
            .await
            .expect("engine should open");
        (engine, clock)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestHelpers;

impl TestHelpers {
    pub const TIMEOUT: Duration = Duration::from_millis(500);

    /// Create a client and confirm its installation at the clock's current time
    pub async fn installed_client(engine: &SalesEngine, owner: &AgentId, service_type: ServiceType) -> Client {
        let client = engine
            .pipeline()
            .create_client(owner, TestFixtures::draft("Rosa Medina", service_type))
            .await
            .expect("client should be created");
        engine
            .pipeline()
            .confirm_installation(client.id, owner)
            .await
            .expect("installation should be confirmed")
    }

    pub async fn with_timeout<T, F>(future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(Self::TIMEOUT, future)
            .await
            .expect("operation timed out")
    }
}
