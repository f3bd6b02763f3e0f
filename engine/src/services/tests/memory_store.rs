//! Tests for MemoryStore
//!
//! Covers write-once settlement stamping, atomic batch commits, slot
//! compare-and-set, change publication, write-through snapshot persistence
//! and exclusive ownership of the snapshot file.

use assert_matches::assert_matches;
use chrono::Utc;
use shared::{
    AgentId, BatchId, ChangeFilter, ChangeNotice, Channel, Claim, PayrollBatch, PipelineStatus, RowChange,
    ServiceType, Table,
};

use super::common::{installed_client, slot_key, test_clock, test_store, with_timeout};
use crate::error::CoreError;
use crate::services::{BroadcastChangeFeed, MemoryStore, StoreSnapshot};
use crate::traits::{CasOutcome, ChangeFeed, ClientFilter, ClientRepository, CredentialRepository, PayrollRepository};

fn batch(member_count: usize) -> PayrollBatch {
    PayrollBatch {
        id: BatchId::new(),
        name: "Payroll week 75".to_string(),
        period_start: chrono::NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
        period_end: chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        total_cents: 0,
        member_count,
        created_at: Utc::now(),
        created_by: AgentId::from("marta"),
        paid_at: None,
    }
}

#[tokio::test]
async fn test_update_never_changes_batch_reference() {
    let (store, _feed) = test_store();
    let client = store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();

    let settled = store.commit_batch(batch(1), vec![client.id]).await.unwrap();

    let mut tampered = store.get_client(client.id).await.unwrap().unwrap();
    tampered.payroll_batch = None;
    tampered.full_name = "Renamed".to_string();
    let stored = store.update_client(tampered).await.unwrap();

    assert_eq!(stored.full_name, "Renamed");
    assert_eq!(stored.payroll_batch, Some(settled.id));
}

#[tokio::test]
async fn test_commit_batch_aborts_when_any_member_is_settled() {
    let (store, _feed) = test_store();
    let first = store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();
    let second = store.insert_client(installed_client("luis", ServiceType::Winback)).await.unwrap();

    let earlier = store.commit_batch(batch(1), vec![second.id]).await.unwrap();

    let result = store.commit_batch(batch(2), vec![first.id, second.id]).await;
    assert_matches!(result, Err(CoreError::Conflict { .. }));

    // Nothing from the rejected batch was written
    assert_eq!(store.list_batches().await.unwrap().len(), 1);
    let first = store.get_client(first.id).await.unwrap().unwrap();
    assert_eq!(first.payroll_batch, None);
    let second = store.get_client(second.id).await.unwrap().unwrap();
    assert_eq!(second.payroll_batch, Some(earlier.id));
}

#[tokio::test]
async fn test_commit_batch_aborts_when_member_left_installed() {
    let (store, feed) = test_store();
    let kept = store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();
    let rejected = store.insert_client(installed_client("ana", ServiceType::Winback)).await.unwrap();

    // Installation rejected between the pending query and the commit
    let mut downgraded = rejected.clone();
    downgraded.status = PipelineStatus::NoCoverage;
    store.update_client(downgraded).await.unwrap();

    let mut subscription = feed.subscribe(ChangeFilter::table(Table::PayrollBatches));
    let result = store.commit_batch(batch(2), vec![kept.id, rejected.id]).await;
    assert_matches!(result, Err(CoreError::Conflict { .. }));

    assert!(store.list_batches().await.unwrap().is_empty());
    let kept = store.get_client(kept.id).await.unwrap().unwrap();
    assert_eq!(kept.payroll_batch, None);
    assert!(with_timeout(subscription.recv()).await.is_err());
}

#[tokio::test]
async fn test_pending_filter_excludes_settled() {
    let (store, _feed) = test_store();
    let settled = store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();
    let open = store.insert_client(installed_client("ana", ServiceType::Portability)).await.unwrap();
    let mut prospect = installed_client("ana", ServiceType::NewLine);
    prospect.status = PipelineStatus::Prospect;
    store.insert_client(prospect).await.unwrap();

    let committed = store.commit_batch(batch(1), vec![settled.id]).await.unwrap();

    let pending = store.query_clients(ClientFilter::PendingSettlement).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, open.id);

    let members = store.query_clients(ClientFilter::InBatch(committed.id)).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, settled.id);
}

#[tokio::test]
async fn test_mark_paid_is_terminal() {
    let (store, _feed) = test_store();
    let client = store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();
    let committed = store.commit_batch(batch(1), vec![client.id]).await.unwrap();

    let paid = store.mark_batch_paid(committed.id, Utc::now()).await.unwrap();
    assert!(paid.is_paid());
    assert_matches!(
        store.mark_batch_paid(committed.id, Utc::now()).await,
        Err(CoreError::Validation { .. })
    );
    assert_matches!(
        store.mark_batch_paid(BatchId::new(), Utc::now()).await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn test_seed_does_not_clobber_claims() {
    let (store, _feed) = test_store();
    let key = slot_key(Channel::Siac);
    store.seed_slot(key.clone()).await.unwrap();

    let claim = Claim::new(AgentId::from("ana"), Utc::now());
    store
        .compare_and_set_claim(key.clone(), None, Some(claim.clone()))
        .await
        .unwrap();

    let reseeded = store.seed_slot(key).await.unwrap();
    assert_eq!(reseeded.claim, Some(claim));
}

#[tokio::test]
async fn test_compare_and_set_reports_stale_state() {
    let (store, _feed) = test_store();
    let key = slot_key(Channel::Web);
    store.seed_slot(key.clone()).await.unwrap();

    let ana = Claim::new(AgentId::from("ana"), Utc::now());
    let luis = Claim::new(AgentId::from("luis"), Utc::now());

    assert_matches!(
        store.compare_and_set_claim(key.clone(), None, Some(ana.clone())).await,
        Ok(CasOutcome::Applied(_))
    );
    let outcome = store.compare_and_set_claim(key.clone(), None, Some(luis)).await.unwrap();
    assert_matches!(outcome, CasOutcome::Stale(slot) if slot.claim == Some(ana));
}

#[tokio::test]
async fn test_commits_are_published_in_order() {
    let (store, feed) = test_store();
    let mut subscription = feed.subscribe(ChangeFilter::table(Table::CredentialSlots));

    store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();
    store.seed_slot(slot_key(Channel::Siac)).await.unwrap();
    store.seed_slot(slot_key(Channel::Web)).await.unwrap();

    let first = with_timeout(subscription.recv()).await.unwrap().unwrap();
    let second = with_timeout(subscription.recv()).await.unwrap().unwrap();

    match (first, second) {
        (ChangeNotice::Change { event: a }, ChangeNotice::Change { event: b }) => {
            // The client insert took sequence 1 but is filtered out
            assert_eq!(a.sequence, 2);
            assert_eq!(b.sequence, 3);
            assert_matches!(a.change, RowChange::SlotChanged { slot } if slot.key.channel == Channel::Siac);
        }
        other => panic!("unexpected notices: {other:?}"),
    }
}

#[tokio::test]
async fn test_snapshot_round_trip_and_legacy_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    let store = MemoryStore::load(&path, feed, test_clock()).await.unwrap();
    let client = store.insert_client(installed_client("ana", ServiceType::Winback)).await.unwrap();
    store.seed_slot(slot_key(Channel::Siac)).await.unwrap();
    drop(store);

    // Rewrite the saved status under its legacy name
    let content = std::fs::read_to_string(&path).unwrap();
    let legacy = content.replace("\"installed\"", "\"lost\"");
    std::fs::write(&path, legacy).unwrap();

    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    let reloaded = MemoryStore::load(&path, feed, test_clock()).await.unwrap();
    let restored = reloaded.get_client(client.id).await.unwrap().unwrap();
    assert_eq!(restored.status, PipelineStatus::NoCoverage);
    assert_eq!(restored.commission_cents, client.commission_cents);
    assert_eq!(reloaded.list_slots().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    let store = MemoryStore::load(&dir.path().join("absent.json"), feed, test_clock())
        .await
        .unwrap();
    assert!(store.snapshot().await.clients.is_empty());
}

#[tokio::test]
async fn test_corrupt_snapshot_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{ not json").unwrap();

    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    assert_matches!(
        MemoryStore::load(&path, feed, test_clock()).await,
        Err(CoreError::Persistence { .. })
    );
}

#[tokio::test]
async fn test_commits_are_written_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("store.json");

    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    let store = MemoryStore::load(&path, feed, test_clock()).await.unwrap();
    let client = store.insert_client(installed_client("ana", ServiceType::NewLine)).await.unwrap();
    let committed = store.commit_batch(batch(1), vec![client.id]).await.unwrap();

    // No explicit save: the file already holds both commits
    let on_disk: StoreSnapshot = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.batches.len(), 1);
    assert_eq!(on_disk.clients[0].payroll_batch, Some(committed.id));
}

#[tokio::test]
async fn test_failed_write_rolls_back_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    let store = MemoryStore::load(&path, feed.clone(), test_clock()).await.unwrap();
    let mut subscription = feed.subscribe(ChangeFilter::everything());

    // A directory where the staging file goes makes every write fail
    std::fs::create_dir(dir.path().join("store.json.tmp")).unwrap();

    let client = installed_client("ana", ServiceType::NewLine);
    assert_matches!(
        store.insert_client(client.clone()).await,
        Err(CoreError::Persistence { .. })
    );
    assert_eq!(store.get_client(client.id).await.unwrap(), None);
    assert!(with_timeout(subscription.recv()).await.is_err());

    // Writes succeed again once the path is clear
    std::fs::remove_dir(dir.path().join("store.json.tmp")).unwrap();
    store.insert_client(client.clone()).await.unwrap();
    assert!(store.get_client(client.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_snapshot_file_has_a_single_owner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let feed = std::sync::Arc::new(BroadcastChangeFeed::new());
    let owner = MemoryStore::load(&path, feed.clone(), test_clock()).await.unwrap();

    assert_matches!(
        MemoryStore::load(&path, feed.clone(), test_clock()).await,
        Err(CoreError::Persistence { .. })
    );

    drop(owner);
    assert!(MemoryStore::load(&path, feed, test_clock()).await.is_ok());
}
