//! Pure status transition rules.
//!
//! Validation only: given a current status and a requested transition, decide
//! allow or deny with a reason code. All mutation is performed by the calling
//! component (issuer, redemption coordinator), never here.

use std::fmt;

use thiserror::Error;

use super::TicketStatus;

/// A requested status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Assign an unowned pool spare to a rider, landing on `inactive` or
    /// `active`.
    Claim { target: TicketStatus },
    /// Owner/admin makes the ticket eligible for redemption.
    Activate,
    /// Owner/admin withdraws the ticket from circulation.
    Deactivate,
    /// A turnstile consumes the ticket.
    Redeem,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Claim { .. } => write!(f, "claim"),
            Transition::Activate => write!(f, "activate"),
            Transition::Deactivate => write!(f, "deactivate"),
            Transition::Redeem => write!(f, "redeem"),
        }
    }
}

/// Why a transition was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The transition requires an owner but the record has none.
    NotOwned,
    /// Claiming requires an unowned record.
    AlreadyOwned,
    /// Redemption only succeeds from `active`.
    NotActive,
    /// The ticket was already consumed; `used` is terminal.
    AlreadyUsed,
    /// The current status admits no such transition.
    NotAllowed,
}

/// A denied transition, with the status it was attempted from.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot {transition} a {from} ticket: {reason:?}")]
pub struct TransitionError {
    pub from: TicketStatus,
    pub transition: Transition,
    pub reason: DenyReason,
}

/// Validate a transition against the current status and ownership.
///
/// Returns the target status on success. Pure and side-effect free.
pub fn check(
    from: TicketStatus,
    owned: bool,
    transition: Transition,
) -> Result<TicketStatus, TransitionError> {
    use TicketStatus::*;
    use Transition::*;

    let deny = |reason| {
        Err(TransitionError {
            from,
            transition,
            reason,
        })
    };

    match (from, transition) {
        (Generated, Claim { target }) => match target {
            Inactive | Active if owned => deny(DenyReason::AlreadyOwned),
            Inactive | Active => Ok(target),
            _ => deny(DenyReason::NotAllowed),
        },
        (Inactive, Activate) => {
            if owned {
                Ok(Active)
            } else {
                deny(DenyReason::NotOwned)
            }
        }
        (Active, Deactivate) => {
            if owned {
                Ok(Inactive)
            } else {
                deny(DenyReason::NotOwned)
            }
        }
        (Active, Redeem) => Ok(Used),
        (Used, Redeem) => deny(DenyReason::AlreadyUsed),
        (_, Redeem) => deny(DenyReason::NotActive),
        (Used, _) => deny(DenyReason::AlreadyUsed),
        _ => deny(DenyReason::NotAllowed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TicketStatus::*;

    const ALL_STATUSES: [TicketStatus; 5] = [NotGenerated, Generated, Inactive, Active, Used];

    #[test]
    fn test_claim_spare_lands_on_requested_target() {
        assert_eq!(
            check(Generated, false, Transition::Claim { target: Inactive }),
            Ok(Inactive)
        );
        assert_eq!(
            check(Generated, false, Transition::Claim { target: Active }),
            Ok(Active)
        );
    }

    #[test]
    fn test_claim_owned_record_denied() {
        let err = check(Generated, true, Transition::Claim { target: Inactive }).unwrap_err();
        assert_eq!(err.reason, DenyReason::AlreadyOwned);
    }

    #[test]
    fn test_claim_cannot_target_used_or_generated() {
        let err = check(Generated, false, Transition::Claim { target: Used }).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotAllowed);
        let err = check(Generated, false, Transition::Claim { target: Generated }).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotAllowed);
    }

    #[test]
    fn test_owned_toggle_both_directions() {
        assert_eq!(check(Inactive, true, Transition::Activate), Ok(Active));
        assert_eq!(check(Active, true, Transition::Deactivate), Ok(Inactive));
    }

    #[test]
    fn test_toggle_requires_owner() {
        let err = check(Inactive, false, Transition::Activate).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotOwned);
        let err = check(Active, false, Transition::Deactivate).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotOwned);
    }

    #[test]
    fn test_redeem_only_from_active() {
        assert_eq!(check(Active, true, Transition::Redeem), Ok(Used));

        let err = check(Inactive, true, Transition::Redeem).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotActive);
        let err = check(Generated, false, Transition::Redeem).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotActive);
        let err = check(NotGenerated, false, Transition::Redeem).unwrap_err();
        assert_eq!(err.reason, DenyReason::NotActive);
        let err = check(Used, true, Transition::Redeem).unwrap_err();
        assert_eq!(err.reason, DenyReason::AlreadyUsed);
    }

    #[test]
    fn test_used_is_a_dead_end() {
        for owned in [false, true] {
            for transition in [
                Transition::Claim {
                    target: Inactive,
                },
                Transition::Activate,
                Transition::Deactivate,
                Transition::Redeem,
            ] {
                assert!(check(Used, owned, transition).is_err());
            }
        }
    }

    #[test]
    fn test_no_transition_leaves_used() {
        // Whatever is requested, the outcome of a transition out of `used`
        // must never be a different status.
        for owned in [false, true] {
            for transition in [
                Transition::Activate,
                Transition::Deactivate,
                Transition::Redeem,
            ] {
                for from in ALL_STATUSES {
                    if let Ok(target) = check(from, owned, transition) {
                        assert!(from != Used || target == Used);
                    }
                }
            }
        }
    }

    #[test]
    fn test_placeholder_status_admits_nothing() {
        for transition in [
            Transition::Claim {
                target: Inactive,
            },
            Transition::Activate,
            Transition::Deactivate,
            Transition::Redeem,
        ] {
            assert!(check(NotGenerated, false, transition).is_err());
        }
    }
}
