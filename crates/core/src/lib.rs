//! tornello-core: single-use QR transit tickets.
//!
//! The core issues QR-coded tickets from a recycled pool, tracks them through
//! a forward-only state machine, streams live views to rider and admin
//! surfaces, and consumes them exactly once at unsynchronized turnstile
//! scanners via the store's conditional update.

pub mod config;
pub mod feed;
pub mod issuer;
pub mod metrics;
pub mod redemption;
pub mod roles;
pub mod store;
pub mod testing;
pub mod ticket;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ScannerConfig,
    StoreBackend, StoreConfig,
};
pub use feed::{FeedFilter, FeedSubscription, TicketFeed};
pub use issuer::{IssuerError, TicketIssuer};
pub use redemption::{RedemptionCoordinator, RedemptionResult, ScanOutcome, TurnstileScanner};
pub use roles::{
    require_role, AccessError, MemoryRoleDirectory, Role, RoleDirectory, SqliteRoleDirectory,
};
pub use store::{
    create_ticket_store, CasOutcome, MemoryTicketStore, NewTicket, SqliteTicketStore, StoreError,
    TicketStore, TicketUpdate, UpdateGuard,
};
pub use ticket::{DenyReason, TicketRecord, TicketStatus, Transition, TransitionError};
