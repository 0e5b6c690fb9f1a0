//! Role membership directory.
//!
//! Accounts are granted capabilities by their presence under a role path
//! (`users/{uid}`, `admins/{uid}`, `tourniquets/{uid}`). The membership test
//! is key existence, not record content. Identities themselves are opaque
//! strings supplied by the session provider; the core trusts them as given.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Capability roles, one per membership path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Rider account: claims and toggles its own tickets.
    Rider,
    /// Administrator: provisions the pool and sees the unfiltered feed.
    Admin,
    /// Turnstile scanner device: redeems tickets.
    Turnstile,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Rider, Role::Admin, Role::Turnstile];

    /// Store path segment holding this role's membership keys.
    pub fn path(&self) -> &'static str {
        match self {
            Role::Rider => "users",
            Role::Admin => "admins",
            Role::Turnstile => "tourniquets",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Error type for role checks.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The account is not a member of the required role.
    #[error("{uid} is not a member of {role}")]
    PermissionDenied { uid: String, role: Role },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Trait for role membership backends.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Membership test: does a key exist for `uid` under `role`?
    async fn has_role(&self, uid: &str, role: Role) -> Result<bool, StoreError>;

    /// Register `uid` under `role`. Idempotent.
    async fn grant(&self, uid: &str, role: Role) -> Result<(), StoreError>;

    /// Remove `uid` from `role`. Idempotent.
    async fn revoke(&self, uid: &str, role: Role) -> Result<(), StoreError>;
}

/// Deny unless `uid` holds `role`.
pub async fn require_role(
    directory: &dyn RoleDirectory,
    uid: &str,
    role: Role,
) -> Result<(), AccessError> {
    if directory.has_role(uid, role).await? {
        Ok(())
    } else {
        Err(AccessError::PermissionDenied {
            uid: uid.to_string(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_paths_match_store_layout() {
        assert_eq!(Role::Rider.path(), "users");
        assert_eq!(Role::Admin.path(), "admins");
        assert_eq!(Role::Turnstile.path(), "tourniquets");
    }

    #[tokio::test]
    async fn test_require_role_allows_member() {
        let directory = MemoryRoleDirectory::new();
        directory.grant("scanner-1", Role::Turnstile).await.unwrap();

        assert!(require_role(&directory, "scanner-1", Role::Turnstile)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_require_role_denies_non_member() {
        let directory = MemoryRoleDirectory::new();
        directory.grant("scanner-1", Role::Turnstile).await.unwrap();

        let err = require_role(&directory, "scanner-1", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::PermissionDenied { .. }));
    }
}
