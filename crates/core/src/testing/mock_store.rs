//! Mock ticket store with failure and latency injection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Duration;

use crate::store::{
    CasOutcome, MemoryTicketStore, NewTicket, StoreError, TicketStore, TicketUpdate, UpdateGuard,
};
use crate::ticket::TicketRecord;

/// In-memory store with configurable failures, for tests.
pub struct MockTicketStore {
    inner: MemoryTicketStore,
    unavailable: AtomicBool,
    fail_next_update_if: AtomicBool,
    latency: Mutex<Option<Duration>>,
    update_if_calls: AtomicU64,
}

impl MockTicketStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryTicketStore::new(),
            unavailable: AtomicBool::new(false),
            fail_next_update_if: AtomicBool::new(false),
            latency: Mutex::new(None),
            update_if_calls: AtomicU64::new(0),
        }
    }

    /// Make every operation fail with `StoreError::Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only the next conditional update, then recover.
    pub fn fail_next_update_if(&self) {
        self.fail_next_update_if.store(true, Ordering::SeqCst);
    }

    /// Inject artificial latency into every operation.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Number of conditional updates that reached the store.
    pub fn update_if_calls(&self) -> u64 {
        self.update_if_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), StoreError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

impl Default for MockTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for MockTicketStore {
    async fn get(&self, id: &str) -> Result<Option<TicketRecord>, StoreError> {
        self.simulate().await?;
        self.inner.get(id).await
    }

    async fn snapshot(&self) -> Result<Vec<TicketRecord>, StoreError> {
        self.simulate().await?;
        self.inner.snapshot().await
    }

    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord, StoreError> {
        self.simulate().await?;
        self.inner.insert(ticket).await
    }

    async fn update(&self, id: &str, update: TicketUpdate) -> Result<TicketRecord, StoreError> {
        self.simulate().await?;
        self.inner.update(id, update).await
    }

    async fn update_if(
        &self,
        id: &str,
        guard: UpdateGuard,
        update: TicketUpdate,
    ) -> Result<CasOutcome, StoreError> {
        self.simulate().await?;
        if self.fail_next_update_if.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.update_if_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update_if(id, guard, update).await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes()
    }
}
