//! Ticket issuance, pool recycling, and owner-facing mutations.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::store::{CasOutcome, NewTicket, StoreError, TicketStore, TicketUpdate, UpdateGuard};
use crate::ticket::{lifecycle, TicketRecord, TicketStatus, Transition, TransitionError};

/// Error type for issuance and toggle operations.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// The pool has no unowned `generated` record left. Spares are seeded
    /// out of band via [`TicketIssuer::provision`].
    #[error("ticket pool exhausted: no spare generated record")]
    PoolExhausted,

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Produces ticket identifiers riders can claim, bounding the number of
/// distinct identifiers in circulation by recycling pool spares.
pub struct TicketIssuer {
    store: Arc<dyn TicketStore>,
}

impl TicketIssuer {
    /// Create a new issuer on top of a ticket store.
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Claim a spare `generated` record for `owner_id`, recycling its
    /// identifier.
    ///
    /// The spare keeps its `id` (the QR payload stays stable); `name`,
    /// `description` and ownership are reassigned, and the ticket lands on
    /// `inactive` until the owner explicitly activates it. Claiming is a
    /// conditional write keyed on the record still being an unowned spare, so
    /// two riders racing for the same spare cannot both win; the loser moves
    /// on to the next spare.
    pub async fn create_or_recycle(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        owner_id: &str,
    ) -> Result<TicketRecord, IssuerError> {
        let name = name.into();
        let description = description.into();

        let mut spares: Vec<TicketRecord> = self
            .store
            .snapshot()
            .await?
            .into_iter()
            .filter(TicketRecord::is_spare)
            .collect();
        // Oldest spares first, id as tie-breaker for a stable scan order.
        spares.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        for spare in spares {
            let target = lifecycle::check(
                spare.status,
                spare.is_owned(),
                Transition::Claim {
                    target: TicketStatus::Inactive,
                },
            )?;

            let claim = TicketUpdate::new()
                .with_name(name.clone())
                .with_description(description.clone())
                .with_owner(owner_id)
                .with_status(target);

            match self
                .store
                .update_if(&spare.id, UpdateGuard::unowned_spare(), claim)
                .await
            {
                Ok(CasOutcome::Applied(ticket)) => {
                    info!(ticket_id = %ticket.id, owner_id, "recycled spare ticket");
                    metrics::ISSUANCE.with_label_values(&["recycled"]).inc();
                    return Ok(ticket);
                }
                Ok(CasOutcome::Rejected(_)) => {
                    debug!(ticket_id = %spare.id, "lost claim race, trying next spare");
                    continue;
                }
                // The spare vanished between snapshot and claim.
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        warn!(owner_id, "issuance failed: pool exhausted");
        metrics::ISSUANCE.with_label_values(&["pool_exhausted"]).inc();
        Err(IssuerError::PoolExhausted)
    }

    /// Seed a brand-new unowned spare into the pool (administrative
    /// bulk-create).
    pub async fn provision(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<TicketRecord, IssuerError> {
        let ticket = self
            .store
            .insert(NewTicket {
                id: Uuid::new_v4().to_string(),
                name: name.into(),
                description: description.into(),
            })
            .await?;

        info!(ticket_id = %ticket.id, "provisioned pool ticket");
        metrics::ISSUANCE.with_label_values(&["provisioned"]).inc();
        Ok(ticket)
    }

    /// Owner/admin toggle: make the ticket eligible for redemption.
    ///
    /// Plain write: concurrent toggles on an owned ticket are
    /// last-writer-wins. Only the redemption edge needs the conditional
    /// update.
    pub async fn activate(&self, id: &str) -> Result<TicketRecord, IssuerError> {
        self.toggle(id, Transition::Activate).await
    }

    /// Owner/admin toggle: withdraw the ticket from circulation.
    pub async fn deactivate(&self, id: &str) -> Result<TicketRecord, IssuerError> {
        self.toggle(id, Transition::Deactivate).await
    }

    async fn toggle(&self, id: &str, transition: Transition) -> Result<TicketRecord, IssuerError> {
        let current = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let target = lifecycle::check(current.status, current.is_owned(), transition)?;
        let updated = self
            .store
            .update(id, TicketUpdate::new().with_status(target))
            .await?;

        debug!(ticket_id = %id, status = %updated.status, "toggled ticket");
        Ok(updated)
    }
}
