//! Tests for BroadcastChangeFeed and Subscription

use chrono::Utc;
use futures_util::StreamExt;
use shared::{
    ChangeEvent, ChangeFilter, ChangeNotice, Channel, CredentialPairId, CredentialSlot, RowChange, RowPredicate,
    Table,
};

use super::common::{slot_key, with_timeout};
use crate::services::BroadcastChangeFeed;
use crate::traits::ChangeFeed;

fn slot_event(sequence: u64, group: &str) -> ChangeEvent {
    ChangeEvent {
        sequence,
        committed_at: Utc::now(),
        change: RowChange::SlotChanged {
            slot: CredentialSlot::empty(CredentialPairId::new(group, "ventas01").slot(Channel::Siac)),
        },
    }
}

#[tokio::test]
async fn test_subscriber_only_sees_matching_rows() {
    let feed = BroadcastChangeFeed::new();
    let mut subscription = feed.subscribe(ChangeFilter::table(Table::CredentialSlots).with_predicate(
        RowPredicate::Pair {
            pair: CredentialPairId::new("claro", "ventas01"),
        },
    ));

    feed.publish(slot_event(1, "movistar"));
    feed.publish(slot_event(2, "claro"));

    let notice = with_timeout(subscription.next()).await.unwrap().unwrap();
    match notice {
        ChangeNotice::Change { event } => assert_eq!(event.sequence, 2),
        other => panic!("unexpected notice: {other:?}"),
    }
}

#[tokio::test]
async fn test_lagging_subscriber_is_told_how_much_it_missed() {
    let feed = BroadcastChangeFeed::with_capacity(2);
    let mut subscription = feed.subscribe(ChangeFilter::everything());

    // Publish faster than the forwarding task can possibly drain
    for sequence in 1..=10 {
        feed.publish(slot_event(sequence, "movistar"));
    }

    let mut saw_lag = false;
    while let Ok(Some(notice)) = with_timeout(subscription.recv()).await {
        if let ChangeNotice::Lagged { missed } = notice {
            assert!(missed > 0);
            saw_lag = true;
        }
    }
    assert!(saw_lag);
}

#[tokio::test]
async fn test_dropping_subscription_releases_receiver() {
    let feed = BroadcastChangeFeed::new();
    let subscription = feed.subscribe(ChangeFilter::everything());
    assert_eq!(feed.subscriber_count(), 1);

    subscription.unsubscribe();
    // The aborted forwarding task drops its broadcast receiver asynchronously
    for _ in 0..50 {
        if feed.subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(feed.subscriber_count(), 0);
}

#[tokio::test]
async fn test_publish_without_subscribers_is_harmless() {
    let feed = BroadcastChangeFeed::new();
    feed.publish(slot_event(1, "movistar"));

    let mut late = feed.subscribe(ChangeFilter::everything());
    feed.publish(ChangeEvent {
        sequence: 2,
        committed_at: Utc::now(),
        change: RowChange::SlotChanged {
            slot: CredentialSlot::empty(slot_key(Channel::Web)),
        },
    });

    match with_timeout(late.recv()).await.unwrap().unwrap() {
        ChangeNotice::Change { event } => assert_eq!(event.sequence, 2),
        other => panic!("unexpected notice: {other:?}"),
    }
}
