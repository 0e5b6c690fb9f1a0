//! Ticket storage: the remote real-time key-value service seam.

mod memory;
mod sqlite;
mod traits;

pub use memory::*;
pub use sqlite::*;
pub use traits::*;

use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};

/// Factory function to create a ticket store from config.
pub fn create_ticket_store(config: &StoreConfig) -> Result<Arc<dyn TicketStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryTicketStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteTicketStore::new(&config.path)?)),
    }
}
