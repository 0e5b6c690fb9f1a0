//! Live ticket projections.
//!
//! A feed turns the store's change stream into ordered, audience-filtered
//! snapshots: owner-filtered for rider devices, unfiltered for administrator
//! dashboards. Each emission is the full current set of matching records,
//! never a diff. Subscriptions are owned handles; dropping one releases the
//! underlying store watch on every exit path.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::metrics;
use crate::store::TicketStore;
use crate::ticket::TicketRecord;

/// Delay before retrying a failed snapshot read.
const SNAPSHOT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Audience filter for a feed subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    owner_id: Option<String>,
}

impl FeedFilter {
    /// Unfiltered view (administrator dashboards).
    pub fn all() -> Self {
        Self { owner_id: None }
    }

    /// Only records owned by `owner_id` (rider devices).
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
        }
    }

    fn matches(&self, record: &TicketRecord) -> bool {
        match &self.owner_id {
            None => true,
            Some(uid) => record.owner_id.as_deref() == Some(uid.as_str()),
        }
    }
}

/// Projects store changes into ordered record-set snapshots.
pub struct TicketFeed {
    store: Arc<dyn TicketStore>,
}

impl TicketFeed {
    /// Create a new feed on top of a ticket store.
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Start a live subscription.
    ///
    /// The first emission is the current snapshot; afterwards every committed
    /// change eventually produces one, though rapid successive writes may be
    /// coalesced into a single emission carrying the latest state.
    pub fn subscribe(&self, filter: FeedFilter) -> FeedSubscription {
        let (tx, rx) = mpsc::channel(8);
        let store = Arc::clone(&self.store);

        let task = tokio::spawn(async move {
            let mut changes = store.changes();
            // Deliver the initial snapshot without waiting for a write.
            changes.mark_changed();

            loop {
                if changes.changed().await.is_err() {
                    break;
                }
                match store.snapshot().await {
                    Ok(records) => {
                        let view = project(records, &filter);
                        metrics::FEED_EMISSIONS.inc();
                        if tx.send(view).await.is_err() {
                            debug!("feed subscriber gone, stopping");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("feed snapshot failed, will retry: {e}");
                        tokio::time::sleep(SNAPSHOT_RETRY_DELAY).await;
                        changes.mark_changed();
                    }
                }
            }
        });

        FeedSubscription {
            rx,
            task: Some(task),
        }
    }
}

fn project(mut records: Vec<TicketRecord>, filter: &FeedFilter) -> Vec<TicketRecord> {
    records.retain(|r| filter.matches(r));
    records.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

/// Owned handle for a live subscription.
///
/// Also a [`Stream`] of snapshots. Dropping the handle unsubscribes.
pub struct FeedSubscription {
    rx: mpsc::Receiver<Vec<TicketRecord>>,
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    /// Receive the next snapshot, or `None` once unsubscribed.
    pub async fn next_snapshot(&mut self) -> Option<Vec<TicketRecord>> {
        self.rx.recv().await
    }

    /// Stop delivery and release the underlying store watch. Safe to call
    /// more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
        // Drop anything still buffered so `next_snapshot` reports the end of
        // the subscription immediately.
        while self.rx.try_recv().is_ok() {}
    }
}

impl Stream for FeedSubscription {
    type Item = Vec<TicketRecord>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
