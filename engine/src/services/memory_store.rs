//! In-memory store with JSON snapshots
//!
//! All three tables sit behind one `RwLock`, so every trait call is a single
//! atomic write. A store opened from a snapshot file owns that file through an
//! advisory lock and rewrites it inside every committing call; a failed write
//! restores the tables and the call returns `Persistence`. Each committed
//! write is then numbered and published on the change feed while the lock is
//! still held, so subscribers see changes in commit order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use shared::{
    process_debug, process_info, process_warn, BatchId, ChangeEvent, Claim, Client, ClientId, CredentialSlot,
    PayrollBatch, ProcessId, RowChange, SlotKey,
};
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    CasOutcome, ChangeFeed, ClientFilter, ClientRepository, Clock, CredentialRepository, PayrollRepository,
};

/// Serialized form of the whole store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub batches: Vec<PayrollBatch>,
    #[serde(default)]
    pub slots: Vec<CredentialSlot>,
}

#[derive(Default, Clone)]
struct Tables {
    clients: HashMap<ClientId, Client>,
    batches: HashMap<BatchId, PayrollBatch>,
    slots: BTreeMap<SlotKey, CredentialSlot>,
    sequence: u64,
}

impl Tables {
    fn to_snapshot(&self) -> StoreSnapshot {
        let mut clients: Vec<_> = self.clients.values().cloned().collect();
        clients.sort_by_key(|client| (client.created_at, client.id));
        let mut batches: Vec<_> = self.batches.values().cloned().collect();
        batches.sort_by_key(|batch| (batch.created_at, batch.id));
        StoreSnapshot {
            clients,
            batches,
            slots: self.slots.values().cloned().collect(),
        }
    }
}

/// Snapshot file owned by this process for as long as the store lives
struct SnapshotFile {
    path: PathBuf,
    _lock: std::fs::File,
}

impl SnapshotFile {
    /// Take the exclusive lock on `<path>.lock`; a second owner is refused
    async fn acquire(path: &Path) -> CoreResult<Self> {
        ensure_parent(path, "open store").await?;
        let lock_path = sidecar(path, ".lock");
        let lock = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .await
            .map_err(|e| CoreError::persistence("open store", format!("{}: {e}", lock_path.display())))?
            .into_std()
            .await;
        lock.try_lock_exclusive().map_err(|_| {
            CoreError::persistence(
                "open store",
                format!("{} is already in use by another process", path.display()),
            )
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: Arc<dyn ChangeFeed>,
    clock: Arc<dyn Clock>,
    file: Option<SnapshotFile>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Store with no backing file
    pub fn new(feed: Arc<dyn ChangeFeed>, clock: Arc<dyn Clock>) -> Self {
        Self::from_snapshot(StoreSnapshot::default(), feed, clock)
    }

    pub fn from_snapshot(snapshot: StoreSnapshot, feed: Arc<dyn ChangeFeed>, clock: Arc<dyn Clock>) -> Self {
        let tables = Tables {
            clients: snapshot.clients.into_iter().map(|client| (client.id, client)).collect(),
            batches: snapshot.batches.into_iter().map(|batch| (batch.id, batch)).collect(),
            slots: snapshot.slots.into_iter().map(|slot| (slot.key.clone(), slot)).collect(),
            sequence: 0,
        };
        Self {
            tables: RwLock::new(tables),
            feed,
            clock,
            file: None,
        }
    }

    /// Open a snapshot file and keep it in sync with every commit
    ///
    /// A missing file yields an empty store. The file stays locked until the
    /// store is dropped, so a second store on the same path fails with
    /// `Persistence`.
    pub async fn load(path: &Path, feed: Arc<dyn ChangeFeed>, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        let file = SnapshotFile::acquire(path).await?;
        let snapshot = match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<StoreSnapshot>(&content)
                .map_err(|e| CoreError::persistence("load snapshot", format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                process_info!(ProcessId::current(), "📂 No snapshot at {}, starting empty", path.display());
                StoreSnapshot::default()
            }
            Err(e) => return Err(CoreError::persistence("load snapshot", format!("{}: {e}", path.display()))),
        };

        process_info!(
            ProcessId::current(),
            "📂 Loaded snapshot: {} clients, {} batches, {} slots",
            snapshot.clients.len(),
            snapshot.batches.len(),
            snapshot.slots.len()
        );
        let mut store = Self::from_snapshot(snapshot, feed, clock);
        store.file = Some(file);
        Ok(store)
    }

    /// Consistent copy of every table
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.tables.read().await.to_snapshot()
    }

    /// Copy of the tables to restore if the commit cannot be written
    fn checkpoint(&self, tables: &Tables) -> Option<Tables> {
        self.file.as_ref().map(|_| tables.clone())
    }

    /// Persist the mutated tables, then publish `changes` in order
    async fn commit(&self, tables: &mut Tables, checkpoint: Option<Tables>, changes: Vec<RowChange>) -> CoreResult<()> {
        if let (Some(file), Some(checkpoint)) = (&self.file, checkpoint) {
            if let Err(e) = write_snapshot(&file.path, &tables.to_snapshot()).await {
                process_warn!(ProcessId::current(), "💾 Commit rolled back: {}", e);
                *tables = checkpoint;
                return Err(e);
            }
        }
        for change in changes {
            self.publish(tables, change);
        }
        Ok(())
    }

    fn publish(&self, tables: &mut Tables, change: RowChange) {
        tables.sequence += 1;
        self.feed.publish(ChangeEvent {
            sequence: tables.sequence,
            committed_at: self.clock.now(),
            change,
        });
    }
}

/// `path` with `suffix` appended to its file name
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn ensure_parent(path: &Path, operation: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::persistence(operation, e.to_string()))?;
    }
    Ok(())
}

/// Write next to `path` and move the file into place
async fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> CoreResult<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    ensure_parent(path, "save snapshot").await?;
    let staging = sidecar(path, ".tmp");
    fs::write(&staging, content)
        .await
        .map_err(|e| CoreError::persistence("save snapshot", format!("{}: {e}", staging.display())))?;
    fs::rename(&staging, path)
        .await
        .map_err(|e| CoreError::persistence("save snapshot", e.to_string()))?;

    process_debug!(ProcessId::current(), "💾 Snapshot written to {}", path.display());
    Ok(())
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn insert_client(&self, client: Client) -> CoreResult<Client> {
        let mut tables = self.tables.write().await;
        if tables.clients.contains_key(&client.id) {
            return Err(CoreError::conflict(format!("client {} already exists", client.id)));
        }
        let checkpoint = self.checkpoint(&tables);
        tables.clients.insert(client.id, client.clone());
        self.commit(&mut tables, checkpoint, vec![RowChange::ClientUpserted { client: client.clone() }])
            .await?;
        Ok(client)
    }

    async fn get_client(&self, id: ClientId) -> CoreResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn update_client(&self, mut client: Client) -> CoreResult<Client> {
        let mut tables = self.tables.write().await;
        let checkpoint = self.checkpoint(&tables);
        let stored = tables
            .clients
            .get_mut(&client.id)
            .ok_or_else(|| CoreError::not_found("client", client.id))?;
        client.payroll_batch = stored.payroll_batch;
        *stored = client.clone();
        self.commit(&mut tables, checkpoint, vec![RowChange::ClientUpserted { client: client.clone() }])
            .await?;
        Ok(client)
    }

    async fn delete_client(&self, id: ClientId) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let checkpoint = self.checkpoint(&tables);
        let removed = tables
            .clients
            .remove(&id)
            .ok_or_else(|| CoreError::not_found("client", id))?;
        let change = RowChange::ClientDeleted {
            id,
            owner: removed.owner,
        };
        self.commit(&mut tables, checkpoint, vec![change]).await
    }

    async fn query_clients(&self, filter: ClientFilter) -> CoreResult<Vec<Client>> {
        let tables = self.tables.read().await;
        let mut clients: Vec<_> = tables
            .clients
            .values()
            .filter(|client| filter.matches(client))
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(clients)
    }
}

#[async_trait]
impl PayrollRepository for MemoryStore {
    async fn commit_batch(&self, batch: PayrollBatch, members: Vec<ClientId>) -> CoreResult<PayrollBatch> {
        let mut tables = self.tables.write().await;

        if tables.batches.contains_key(&batch.id) {
            return Err(CoreError::conflict(format!("batch {} already exists", batch.id)));
        }
        let unique: BTreeSet<ClientId> = members.iter().copied().collect();
        if unique.len() != members.len() {
            return Err(CoreError::validation("batch members must be distinct"));
        }
        // Check every member before touching anything
        for id in &members {
            let client = tables
                .clients
                .get(id)
                .ok_or_else(|| CoreError::conflict(format!("client {id} disappeared before settlement")))?;
            if let Some(existing) = client.payroll_batch {
                return Err(CoreError::conflict(format!(
                    "client {id} was already settled in batch {existing}"
                )));
            }
            if !client.is_pending_settlement() {
                return Err(CoreError::conflict(format!(
                    "client {id} is {} and no longer awaits settlement",
                    client.status
                )));
            }
        }

        let checkpoint = self.checkpoint(&tables);
        let stamped_at = batch.created_at;
        tables.batches.insert(batch.id, batch.clone());
        let mut changes = vec![RowChange::BatchCreated { batch: batch.clone() }];

        for id in &members {
            if let Some(client) = tables.clients.get_mut(id) {
                client.payroll_batch = Some(batch.id);
                client.updated_at = stamped_at;
                changes.push(RowChange::ClientUpserted { client: client.clone() });
            }
        }
        self.commit(&mut tables, checkpoint, changes).await?;
        Ok(batch)
    }

    async fn list_batches(&self) -> CoreResult<Vec<PayrollBatch>> {
        let tables = self.tables.read().await;
        let mut batches: Vec<_> = tables.batches.values().cloned().collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(batches)
    }

    async fn get_batch(&self, id: BatchId) -> CoreResult<Option<PayrollBatch>> {
        Ok(self.tables.read().await.batches.get(&id).cloned())
    }

    async fn mark_batch_paid(&self, id: BatchId, paid_at: chrono::DateTime<chrono::Utc>) -> CoreResult<PayrollBatch> {
        let mut tables = self.tables.write().await;
        let checkpoint = self.checkpoint(&tables);
        let batch = tables
            .batches
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("payroll batch", id))?;
        if batch.is_paid() {
            return Err(CoreError::validation(format!("batch {id} is already paid")));
        }
        batch.paid_at = Some(paid_at);
        let updated = batch.clone();
        self.commit(&mut tables, checkpoint, vec![RowChange::BatchUpdated { batch: updated.clone() }])
            .await?;
        Ok(updated)
    }
}

#[async_trait]
impl CredentialRepository for MemoryStore {
    async fn seed_slot(&self, key: SlotKey) -> CoreResult<CredentialSlot> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.slots.get(&key) {
            return Ok(existing.clone());
        }
        let checkpoint = self.checkpoint(&tables);
        let slot = CredentialSlot::empty(key.clone());
        tables.slots.insert(key, slot.clone());
        self.commit(&mut tables, checkpoint, vec![RowChange::SlotChanged { slot: slot.clone() }])
            .await?;
        Ok(slot)
    }

    async fn get_slot(&self, key: SlotKey) -> CoreResult<Option<CredentialSlot>> {
        Ok(self.tables.read().await.slots.get(&key).cloned())
    }

    async fn list_slots(&self) -> CoreResult<Vec<CredentialSlot>> {
        Ok(self.tables.read().await.slots.values().cloned().collect())
    }

    async fn compare_and_set_claim(
        &self,
        key: SlotKey,
        expected: Option<Claim>,
        replacement: Option<Claim>,
    ) -> CoreResult<CasOutcome> {
        let mut tables = self.tables.write().await;
        let checkpoint = self.checkpoint(&tables);
        let slot = tables
            .slots
            .get_mut(&key)
            .ok_or_else(|| CoreError::not_found("credential slot", &key))?;
        if slot.claim != expected {
            return Ok(CasOutcome::Stale(slot.clone()));
        }
        slot.claim = replacement;
        let updated = slot.clone();
        self.commit(&mut tables, checkpoint, vec![RowChange::SlotChanged { slot: updated.clone() }])
            .await?;
        Ok(CasOutcome::Applied(updated))
    }
}
