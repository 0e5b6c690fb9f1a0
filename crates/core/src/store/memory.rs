//! In-memory ticket store.
//!
//! The embedded backend used in tests and single-process deployments. All
//! writes happen under one lock, so the conditional update is trivially
//! indivisible.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use crate::ticket::{TicketRecord, TicketStatus};

use super::{CasOutcome, NewTicket, StoreError, TicketStore, TicketUpdate, UpdateGuard};

/// In-memory ticket store.
pub struct MemoryTicketStore {
    records: RwLock<HashMap<String, TicketRecord>>,
    revision: watch::Sender<u64>,
}

impl MemoryTicketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            records: RwLock::new(HashMap::new()),
            revision,
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn get(&self, id: &str) -> Result<Option<TicketRecord>, StoreError> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn snapshot(&self) -> Result<Vec<TicketRecord>, StoreError> {
        Ok(self.records.read().unwrap().values().cloned().collect())
    }

    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord, StoreError> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(&ticket.id) {
            return Err(StoreError::AlreadyExists(ticket.id));
        }

        let now = Utc::now();
        let record = TicketRecord {
            id: ticket.id.clone(),
            name: ticket.name,
            description: ticket.description,
            status: TicketStatus::Generated,
            owner_id: None,
            used_by: None,
            created_at: now,
            updated_at: now,
            used_at: None,
        };
        records.insert(ticket.id, record.clone());
        drop(records);

        self.bump();
        Ok(record)
    }

    async fn update(&self, id: &str, update: TicketUpdate) -> Result<TicketRecord, StoreError> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // The store clock never steps backwards for a record.
        let now = Utc::now().max(record.updated_at);
        update.apply_to(record, now);
        let updated = record.clone();
        drop(records);

        self.bump();
        Ok(updated)
    }

    async fn update_if(
        &self,
        id: &str,
        guard: UpdateGuard,
        update: TicketUpdate,
    ) -> Result<CasOutcome, StoreError> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !guard.holds_for(record) {
            return Ok(CasOutcome::Rejected(record.clone()));
        }

        let now = Utc::now().max(record.updated_at);
        update.apply_to(record, now);
        let updated = record.clone();
        drop(records);

        self.bump();
        Ok(CasOutcome::Applied(updated))
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_ticket(id: &str) -> NewTicket {
        NewTicket {
            id: id.to_string(),
            name: "single ride".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        tokio_test::block_on(async {
            let store = MemoryTicketStore::new();
            let created = store.insert(new_ticket("t-1")).await.unwrap();

            assert_eq!(created.status, TicketStatus::Generated);
            assert!(created.owner_id.is_none());
            assert_eq!(created.created_at, created.updated_at);

            let fetched = store.get("t-1").await.unwrap().unwrap();
            assert_eq!(fetched, created);
        });
    }

    #[test]
    fn test_get_missing_returns_none() {
        tokio_test::block_on(async {
            let store = MemoryTicketStore::new();
            assert!(store.get("nope").await.unwrap().is_none());
        });
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_fails() {
        let store = MemoryTicketStore::new();
        store.insert(new_ticket("t-1")).await.unwrap();

        let result = store.insert(new_ticket("t-1")).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_refreshes_updated_at() {
        let store = MemoryTicketStore::new();
        let created = store.insert(new_ticket("t-1")).await.unwrap();

        let updated = store
            .update(
                "t-1",
                TicketUpdate::new()
                    .with_name("monthly")
                    .with_owner("rider-1")
                    .with_status(TicketStatus::Inactive),
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "monthly");
        assert_eq!(updated.owner_id.as_deref(), Some("rider-1"));
        assert_eq!(updated.status, TicketStatus::Inactive);
        assert_eq!(updated.id, created.id);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_ticket() {
        let store = MemoryTicketStore::new();
        let result = store.update("nope", TicketUpdate::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_if_applies_when_guard_holds() {
        let store = MemoryTicketStore::new();
        store.insert(new_ticket("t-1")).await.unwrap();
        store
            .update(
                "t-1",
                TicketUpdate::new()
                    .with_owner("rider-1")
                    .with_status(TicketStatus::Active),
            )
            .await
            .unwrap();

        let outcome = store
            .update_if(
                "t-1",
                UpdateGuard::status_is(TicketStatus::Active),
                TicketUpdate::new()
                    .with_status(TicketStatus::Used)
                    .with_used_by("scanner-1"),
            )
            .await
            .unwrap();

        match outcome {
            CasOutcome::Applied(record) => {
                assert_eq!(record.status, TicketStatus::Used);
                assert_eq!(record.used_by.as_deref(), Some("scanner-1"));
                assert!(record.used_at.is_some());
            }
            CasOutcome::Rejected(_) => panic!("guard should have held"),
        }
    }

    #[tokio::test]
    async fn test_update_if_rejects_without_writing() {
        let store = MemoryTicketStore::new();
        store.insert(new_ticket("t-1")).await.unwrap();
        let before = store.get("t-1").await.unwrap().unwrap();

        let outcome = store
            .update_if(
                "t-1",
                UpdateGuard::status_is(TicketStatus::Active),
                TicketUpdate::new().with_status(TicketStatus::Used),
            )
            .await
            .unwrap();

        match outcome {
            CasOutcome::Rejected(current) => assert_eq!(current.status, TicketStatus::Generated),
            CasOutcome::Applied(_) => panic!("guard should have failed"),
        }

        // Nothing was written.
        let after = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_update_if_missing_ticket() {
        let store = MemoryTicketStore::new();
        let result = store
            .update_if(
                "nope",
                UpdateGuard::status_is(TicketStatus::Active),
                TicketUpdate::new(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_changes_tick_on_every_write() {
        let store = MemoryTicketStore::new();
        let changes = store.changes();
        let start = *changes.borrow();

        store.insert(new_ticket("t-1")).await.unwrap();
        store
            .update("t-1", TicketUpdate::new().with_name("x"))
            .await
            .unwrap();

        assert_eq!(*store.changes().borrow(), start + 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cas_has_exactly_one_winner() {
        let store = Arc::new(MemoryTicketStore::new());
        store.insert(new_ticket("t-1")).await.unwrap();
        store
            .update(
                "t-1",
                TicketUpdate::new()
                    .with_owner("rider-1")
                    .with_status(TicketStatus::Active),
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update_if(
                        "t-1",
                        UpdateGuard::status_is(TicketStatus::Active),
                        TicketUpdate::new()
                            .with_status(TicketStatus::Used)
                            .with_used_by(format!("scanner-{i}")),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CasOutcome::Applied(_)) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
    }
}
