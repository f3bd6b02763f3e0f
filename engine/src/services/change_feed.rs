//! Broadcast change feed
//!
//! Committed changes go out on a tokio broadcast channel. Each subscription
//! owns a forwarding task that filters the broadcast stream and pushes matching
//! notices into a per-subscriber mpsc channel. Dropping the subscription aborts
//! its task.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use shared::{process_debug, ChangeEvent, ChangeFilter, ChangeNotice, ProcessId};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::traits::ChangeFeed;

pub const DEFAULT_FEED_CAPACITY: usize = 1024;
const SUBSCRIBER_BUFFER: usize = 256;

pub struct BroadcastChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for BroadcastChangeFeed {
    fn publish(&self, event: ChangeEvent) {
        // No receivers is not an error; the change is already committed
        if self.sender.send(event).is_err() {
            process_debug!(ProcessId::current(), "change published with no subscribers");
        }
    }

    /// Must be called from within a tokio runtime
    fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        let mut source = self.sender.subscribe();
        let (sink, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);

        let task = tokio::spawn(async move {
            loop {
                let notice = match source.recv().await {
                    Ok(event) if filter.matches(&event) => ChangeNotice::Change { event },
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(missed)) => ChangeNotice::Lagged { missed },
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if sink.send(notice).await.is_err() {
                    break;
                }
            }
        });

        Subscription { receiver, task }
    }
}

/// Live stream of change notices for one filter
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<ChangeNotice>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Next notice; `None` once the feed is gone
    pub async fn recv(&mut self) -> Option<ChangeNotice> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChangeNotice> {
        self.receiver.try_recv().ok()
    }

    /// Stop delivery; equivalent to dropping the subscription
    pub fn unsubscribe(self) {}
}

impl Stream for Subscription {
    type Item = ChangeNotice;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
