//! Redemption coordinator: the single safety-critical operation.
//!
//! Consuming a ticket is one conditional update against the store: move
//! `status` from `active` to `used` if and only if it is still `active` at
//! the moment of the write. Unsynchronized scanners observing the same ticket
//! agree through the store's compare-and-set, not through any client-side
//! check.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::metrics;
use crate::store::{CasOutcome, StoreError, TicketStore, TicketUpdate, UpdateGuard};
use crate::ticket::{lifecycle, DenyReason, TicketRecord, TicketStatus, Transition};

/// Outcome of a redemption attempt.
///
/// Every failure is a typed result, never a process error: the caller decides
/// how to deny passage and what to show the rider.
#[derive(Debug, Clone, PartialEq)]
pub enum RedemptionResult {
    /// The conditional write succeeded; grant passage.
    Redeemed { ticket: TicketRecord },
    /// The ticket was consumed earlier.
    AlreadyUsed {
        used_by: Option<String>,
        used_at: Option<DateTime<Utc>>,
    },
    /// The ticket exists but is not eligible (`generated` or `inactive`).
    NotActive { status: TicketStatus },
    /// No record exists for this payload.
    NotFound,
    /// Transient store failure. Safe to retry the same payload: the
    /// conditional write had no effect.
    StoreUnavailable { reason: String },
}

impl RedemptionResult {
    /// Returns true if the turnstile should open.
    pub fn grants_passage(&self) -> bool {
        matches!(self, RedemptionResult::Redeemed { .. })
    }

    /// Rider-facing text for denial outcomes; `None` when passage is granted.
    pub fn denial_message(&self) -> Option<&'static str> {
        match self {
            RedemptionResult::Redeemed { .. } => None,
            RedemptionResult::AlreadyUsed { .. } => Some("ticket already used"),
            RedemptionResult::NotActive { .. } => Some("ticket not valid: not activated"),
            RedemptionResult::NotFound => Some("ticket not recognized"),
            RedemptionResult::StoreUnavailable { .. } => {
                Some("service unavailable, scan again in a moment")
            }
        }
    }

    /// Stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RedemptionResult::Redeemed { .. } => "redeemed",
            RedemptionResult::AlreadyUsed { .. } => "already_used",
            RedemptionResult::NotActive { .. } => "not_active",
            RedemptionResult::NotFound => "not_found",
            RedemptionResult::StoreUnavailable { .. } => "store_unavailable",
        }
    }
}

/// Performs the at-most-once consumption of tickets at scan time.
pub struct RedemptionCoordinator {
    store: Arc<dyn TicketStore>,
}

impl RedemptionCoordinator {
    /// Create a new coordinator on top of a ticket store.
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Consume `ticket_id` at most once on behalf of `scanner_identity`.
    ///
    /// Nothing is written unless the outcome is [`RedemptionResult::Redeemed`];
    /// `used_at` is stamped by the store at write time.
    pub async fn redeem(&self, ticket_id: &str, scanner_identity: &str) -> RedemptionResult {
        let start = Instant::now();

        let consume = TicketUpdate::new()
            .with_status(TicketStatus::Used)
            .with_used_by(scanner_identity);

        let result = match self
            .store
            .update_if(
                ticket_id,
                UpdateGuard::status_is(TicketStatus::Active),
                consume,
            )
            .await
        {
            Ok(CasOutcome::Applied(ticket)) => {
                info!(ticket_id, scanner = scanner_identity, "ticket redeemed");
                RedemptionResult::Redeemed { ticket }
            }
            Ok(CasOutcome::Rejected(current)) => {
                match lifecycle::check(current.status, current.is_owned(), Transition::Redeem) {
                    Err(e) if e.reason == DenyReason::AlreadyUsed => RedemptionResult::AlreadyUsed {
                        used_by: current.used_by,
                        used_at: current.used_at,
                    },
                    Err(_) => RedemptionResult::NotActive {
                        status: current.status,
                    },
                    // The store rejected the write yet reported an `active`
                    // record; treat as transient and let the device retry.
                    Ok(_) => RedemptionResult::StoreUnavailable {
                        reason: "conflicting store observation".to_string(),
                    },
                }
            }
            Err(StoreError::NotFound(_)) => RedemptionResult::NotFound,
            Err(e) => RedemptionResult::StoreUnavailable {
                reason: e.to_string(),
            },
        };

        if let Some(message) = result.denial_message() {
            warn!(
                ticket_id,
                scanner = scanner_identity,
                outcome = result.label(),
                "redemption denied: {message}"
            );
        }

        metrics::REDEMPTIONS.with_label_values(&[result.label()]).inc();
        metrics::REDEMPTION_DURATION
            .with_label_values(&[result.label()])
            .observe(start.elapsed().as_secs_f64());

        result
    }
}
