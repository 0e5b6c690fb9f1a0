//! Ticket storage contract.
//!
//! Models the remote store all clients share: asynchronous reads and writes,
//! store-assigned timestamps, a conditional-update primitive, and a coalescing
//! change notification stream. No ordering is guaranteed across clients
//! beyond what [`TicketStore::update_if`] provides for a single record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

use crate::ticket::{TicketRecord, TicketStatus};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the id.
    #[error("ticket not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("ticket already exists: {0}")]
    AlreadyExists(String),

    /// Transient backend failure. Safe to retry: conditional operations have
    /// no effect when they fail.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fields for seeding a new pool record.
///
/// Created records always start unowned with status `generated`.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Field-level update. `None` fields are left untouched.
///
/// The store refreshes `updated_at` on every write and stamps `used_at` when
/// a write moves the status to `used`.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub owner_id: Option<String>,
    pub used_by: Option<String>,
}

impl TicketUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Assign an owner.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Record the redeeming identity.
    pub fn with_used_by(mut self, used_by: impl Into<String>) -> Self {
        self.used_by = Some(used_by.into());
        self
    }

    /// Merge this update into `record`, stamping timestamps with the store
    /// clock. Shared by backends so merge semantics cannot drift.
    pub(crate) fn apply_to(self, record: &mut TicketRecord, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(owner_id) = self.owner_id {
            record.owner_id = Some(owner_id);
        }
        if let Some(used_by) = self.used_by {
            record.used_by = Some(used_by);
        }
        if let Some(status) = self.status {
            if status == TicketStatus::Used && record.status != TicketStatus::Used {
                record.used_at = Some(now);
            }
            record.status = status;
        }
        record.updated_at = now;
    }
}

/// Predicate evaluated atomically against the stored record by
/// [`TicketStore::update_if`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateGuard {
    /// Required current status.
    pub status: TicketStatus,
    /// Additionally require the record to have no owner.
    pub unowned: bool,
}

impl UpdateGuard {
    /// Guard on the current status alone.
    pub fn status_is(status: TicketStatus) -> Self {
        Self {
            status,
            unowned: false,
        }
    }

    /// Guard for claiming: the record must still be a `generated`, unowned
    /// spare.
    pub fn unowned_spare() -> Self {
        Self {
            status: TicketStatus::Generated,
            unowned: true,
        }
    }

    /// Evaluate the predicate against a record.
    pub fn holds_for(&self, record: &TicketRecord) -> bool {
        record.status == self.status && (!self.unowned || record.owner_id.is_none())
    }
}

/// Outcome of a conditional update.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The guard held and the update was applied; carries the record after
    /// the write.
    Applied(TicketRecord),
    /// The guard did not hold; carries the record observed at decision time.
    /// Nothing was written.
    Rejected(TicketRecord),
}

/// Trait for ticket storage backends.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Fetch a single record.
    async fn get(&self, id: &str) -> Result<Option<TicketRecord>, StoreError>;

    /// Fetch the full record set, in no particular order.
    async fn snapshot(&self) -> Result<Vec<TicketRecord>, StoreError>;

    /// Seed a new unowned `generated` record.
    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord, StoreError>;

    /// Unconditional field merge. Last writer wins.
    async fn update(&self, id: &str, update: TicketUpdate) -> Result<TicketRecord, StoreError>;

    /// Conditional field merge: apply `update` if and only if `guard` holds
    /// for the stored record at the moment of the write. The check and the
    /// write are a single indivisible operation; an unsatisfied guard writes
    /// nothing.
    async fn update_if(
        &self,
        id: &str,
        guard: UpdateGuard,
        update: TicketUpdate,
    ) -> Result<CasOutcome, StoreError>;

    /// Change notification stream. Receivers observe a monotonically
    /// increasing revision; intermediate revisions may be coalesced.
    fn changes(&self) -> watch::Receiver<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: TicketStatus, owner_id: Option<&str>) -> TicketRecord {
        let now = Utc::now();
        TicketRecord {
            id: "t-1".to_string(),
            name: "ride".to_string(),
            description: String::new(),
            status,
            owner_id: owner_id.map(String::from),
            used_by: None,
            created_at: now,
            updated_at: now,
            used_at: None,
        }
    }

    #[test]
    fn test_guard_on_status() {
        let guard = UpdateGuard::status_is(TicketStatus::Active);
        assert!(guard.holds_for(&record(TicketStatus::Active, Some("r1"))));
        assert!(!guard.holds_for(&record(TicketStatus::Used, Some("r1"))));
    }

    #[test]
    fn test_unowned_spare_guard() {
        let guard = UpdateGuard::unowned_spare();
        assert!(guard.holds_for(&record(TicketStatus::Generated, None)));
        assert!(!guard.holds_for(&record(TicketStatus::Generated, Some("r1"))));
        assert!(!guard.holds_for(&record(TicketStatus::Inactive, None)));
    }

    #[test]
    fn test_apply_stamps_used_at_on_consumption_only() {
        let mut rec = record(TicketStatus::Active, Some("r1"));
        let t1 = Utc::now();
        TicketUpdate::new()
            .with_status(TicketStatus::Used)
            .with_used_by("scanner-1")
            .apply_to(&mut rec, t1);
        assert_eq!(rec.used_at, Some(t1));
        assert_eq!(rec.used_by.as_deref(), Some("scanner-1"));

        // A later write does not move the consumption timestamp.
        let t2 = Utc::now();
        TicketUpdate::new()
            .with_status(TicketStatus::Used)
            .apply_to(&mut rec, t2);
        assert_eq!(rec.used_at, Some(t1));
        assert_eq!(rec.updated_at, t2);
    }

    #[test]
    fn test_apply_leaves_untouched_fields() {
        let mut rec = record(TicketStatus::Generated, None);
        TicketUpdate::new()
            .with_name("monthly")
            .apply_to(&mut rec, Utc::now());
        assert_eq!(rec.name, "monthly");
        assert_eq!(rec.status, TicketStatus::Generated);
        assert!(rec.owner_id.is_none());
    }
}
