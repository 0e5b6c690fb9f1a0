//! Testing utilities and mock implementations.
//!
//! `MockTicketStore` wraps the in-memory backend with failure and latency
//! injection so redemption, issuance and scanner tests can exercise the
//! `StoreUnavailable` paths without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use tornello_core::testing::MockTicketStore;
//!
//! let store = MockTicketStore::new();
//! store.fail_next_update_if();
//! // The next conditional update returns StoreError::Unavailable, then the
//! // store recovers.
//! ```

mod mock_store;

pub use mock_store::MockTicketStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::store::NewTicket;
    use crate::ticket::{TicketRecord, TicketStatus};

    /// A pool spare as seeded by provisioning.
    pub fn spare(id: &str) -> NewTicket {
        NewTicket {
            id: id.to_string(),
            name: format!("spare {id}"),
            description: String::new(),
        }
    }

    /// A record in the given status with plausible surrounding fields.
    pub fn record(id: &str, status: TicketStatus) -> TicketRecord {
        let now = Utc::now();
        let owned = matches!(
            status,
            TicketStatus::Inactive | TicketStatus::Active | TicketStatus::Used
        );
        TicketRecord {
            id: id.to_string(),
            name: "single ride".to_string(),
            description: "downtown loop".to_string(),
            status,
            owner_id: owned.then(|| "rider-1".to_string()),
            used_by: (status == TicketStatus::Used).then(|| "scanner-1".to_string()),
            created_at: now,
            updated_at: now,
            used_at: (status == TicketStatus::Used).then_some(now),
        }
    }
}
