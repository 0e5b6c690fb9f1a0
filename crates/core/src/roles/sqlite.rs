//! SQLite-backed role directory.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::store::StoreError;

use super::{Role, RoleDirectory};

/// SQLite-backed role directory.
pub struct SqliteRoleDirectory {
    conn: Mutex<Connection>,
}

impl SqliteRoleDirectory {
    /// Open (or create) a directory at `path`.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory directory (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS role_members (
                role TEXT NOT NULL,
                uid TEXT NOT NULL,
                PRIMARY KEY (role, uid)
            );
            "#,
        )
        .map_err(db_err)
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl RoleDirectory for SqliteRoleDirectory {
    async fn has_role(&self, uid: &str, role: Role) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM role_members WHERE role = ? AND uid = ?)",
            params![role.path(), uid],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    async fn grant(&self, uid: &str, role: Role) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO role_members (role, uid) VALUES (?, ?)",
            params![role.path(), uid],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn revoke(&self, uid: &str, role: Role) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM role_members WHERE role = ? AND uid = ?",
            params![role.path(), uid],
        )
        .map_err(db_err)?;
        Ok(())
    }
}
