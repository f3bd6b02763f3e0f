//! Engine assembly
//!
//! Wires the store, feed, directory and clock into the three services from a
//! loaded configuration. Binaries and the webserver hold one `SalesEngine`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use shared::{logging, process_info, ChangeFilter, ProcessId};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::credentials::CredentialService;
use crate::error::CoreResult;
use crate::payroll::PayrollService;
use crate::pipeline::PipelineService;
use crate::services::{BroadcastChangeFeed, MemoryStore, StaticDirectory, Subscription, SystemClock};
use crate::traits::{ChangeFeed, Clock};

pub type StorePipeline = PipelineService<MemoryStore>;
pub type StorePayroll = PayrollService<MemoryStore, MemoryStore>;
pub type StoreCredentials = CredentialService<MemoryStore>;

pub struct SalesEngine {
    config: EngineConfig,
    store: Arc<MemoryStore>,
    feed: Arc<BroadcastChangeFeed>,
    pipeline: StorePipeline,
    payroll: StorePayroll,
    credentials: Arc<StoreCredentials>,
}

impl std::fmt::Debug for SalesEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesEngine").finish_non_exhaustive()
    }
}

impl SalesEngine {
    /// Open with the wall clock, loading `snapshot` if it exists
    ///
    /// The snapshot file is locked while the engine lives and every commit
    /// is written to it before the call returns.
    pub async fn open(config: EngineConfig, snapshot: Option<&Path>) -> CoreResult<Self> {
        Self::open_with_clock(config, snapshot, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        config: EngineConfig,
        snapshot: Option<&Path>,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let calendar = config.calendar()?;

        let feed = Arc::new(BroadcastChangeFeed::new());
        let store = match snapshot {
            Some(path) => MemoryStore::load(path, feed.clone(), clock.clone()).await?,
            None => MemoryStore::new(feed.clone(), clock.clone()),
        };
        let store = Arc::new(store);
        let directory = Arc::new(StaticDirectory::from_config(&config));

        let pipeline = PipelineService::new(store.clone(), clock.clone(), config.commission);
        let payroll = PayrollService::new(
            store.clone(),
            store.clone(),
            directory,
            clock.clone(),
            config.commission,
            calendar,
        );
        let credentials = Arc::new(CredentialService::new(
            store.clone(),
            feed.clone(),
            clock,
            config.lease_policy(),
            &config.credentials,
        ));
        credentials.seed().await?;

        logging::log_success(ProcessId::current(), "Sales engine ready");
        Ok(Self {
            config,
            store,
            feed,
            pipeline,
            payroll,
            credentials,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &StorePipeline {
        &self.pipeline
    }

    pub fn payroll(&self) -> &StorePayroll {
        &self.payroll
    }

    pub fn credentials(&self) -> &Arc<StoreCredentials> {
        &self.credentials
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Committed changes matching `filter`
    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        self.feed.subscribe(filter)
    }

    /// Start the lease sweeper when leases expire
    pub fn start_background_tasks(&self) -> Option<JoinHandle<()>> {
        let every = Duration::from_secs(self.config.sweep_interval_secs);
        let handle = self.credentials.clone().spawn_lease_sweeper(every);
        if handle.is_some() {
            process_info!(ProcessId::current(), "⌛ Lease sweeper running every {}s", every.as_secs());
        }
        handle
    }
}
