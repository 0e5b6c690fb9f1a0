//! In-memory role directory.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::store::StoreError;

use super::{Role, RoleDirectory};

/// In-memory role directory.
pub struct MemoryRoleDirectory {
    members: RwLock<HashMap<Role, HashSet<String>>>,
}

impl MemoryRoleDirectory {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRoleDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn has_role(&self, uid: &str, role: Role) -> Result<bool, StoreError> {
        Ok(self
            .members
            .read()
            .unwrap()
            .get(&role)
            .is_some_and(|set| set.contains(uid)))
    }

    async fn grant(&self, uid: &str, role: Role) -> Result<(), StoreError> {
        self.members
            .write()
            .unwrap()
            .entry(role)
            .or_default()
            .insert(uid.to_string());
        Ok(())
    }

    async fn revoke(&self, uid: &str, role: Role) -> Result<(), StoreError> {
        if let Some(set) = self.members.write().unwrap().get_mut(&role) {
            set.remove(uid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grant_and_check() {
        let directory = MemoryRoleDirectory::new();
        assert!(!directory.has_role("u-1", Role::Rider).await.unwrap());

        directory.grant("u-1", Role::Rider).await.unwrap();
        assert!(directory.has_role("u-1", Role::Rider).await.unwrap());

        // Membership is per role.
        assert!(!directory.has_role("u-1", Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let directory = MemoryRoleDirectory::new();
        directory.grant("u-1", Role::Admin).await.unwrap();
        directory.grant("u-1", Role::Admin).await.unwrap();
        assert!(directory.has_role("u-1", Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke() {
        let directory = MemoryRoleDirectory::new();
        directory.grant("u-1", Role::Turnstile).await.unwrap();
        directory.revoke("u-1", Role::Turnstile).await.unwrap();
        assert!(!directory.has_role("u-1", Role::Turnstile).await.unwrap());

        // Revoking again is a no-op.
        directory.revoke("u-1", Role::Turnstile).await.unwrap();
    }
}
