//! Core ticket record types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a ticket record.
///
/// Statuses only move forward:
/// ```text
/// generated -> inactive <-> active -> used
/// ```
/// `used` is terminal. `not_generated` is a logical placeholder for a record
/// that does not exist yet; it is never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    NotGenerated,
    /// Unowned spare sitting in the pool, eligible for recycling.
    Generated,
    /// Owned but not currently presented for travel.
    Inactive,
    /// Owned and eligible for redemption.
    Active,
    /// Consumed at a turnstile (terminal).
    Used,
}

impl TicketStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Used)
    }

    /// Returns the status as its wire/storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::NotGenerated => "not_generated",
            TicketStatus::Generated => "generated",
            TicketStatus::Inactive => "inactive",
            TicketStatus::Active => "active",
            TicketStatus::Used => "used",
        }
    }

    /// Parse a storage string back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_generated" => Some(TicketStatus::NotGenerated),
            "generated" => Some(TicketStatus::Generated),
            "inactive" => Some(TicketStatus::Inactive),
            "active" => Some(TicketStatus::Active),
            "used" => Some(TicketStatus::Used),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-use travel credential. The `id` doubles as the QR payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketRecord {
    /// Stable identifier, immutable once assigned. Encoded verbatim in the QR.
    pub id: String,

    /// Rider/admin supplied display name.
    pub name: String,

    /// Free-text description.
    #[serde(default)]
    pub description: String,

    /// Current lifecycle status.
    pub status: TicketStatus,

    /// Owning rider account; absent while the ticket sits in the pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Identity that consumed the ticket; set on the transition to `used`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,

    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,

    /// Store-assigned time of the last write.
    pub updated_at: DateTime<Utc>,

    /// Store-assigned redemption time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl TicketRecord {
    /// Returns true if a rider account owns this record.
    pub fn is_owned(&self) -> bool {
        self.owner_id.is_some()
    }

    /// Returns true if the record is an unowned pool spare, eligible for
    /// recycling.
    pub fn is_spare(&self) -> bool {
        self.status == TicketStatus::Generated && self.owner_id.is_none()
    }
}
