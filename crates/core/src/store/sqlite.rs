//! SQLite-backed ticket store.
//!
//! Durable backend for single-node deployments. The conditional update is a
//! guarded `UPDATE ... WHERE id = ? AND status = ?` checked via the affected
//! row count, so the predicate and the write are one statement.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;

use crate::ticket::{TicketRecord, TicketStatus};

use super::{CasOutcome, NewTicket, StoreError, TicketStore, TicketUpdate, UpdateGuard};

const SELECT_COLUMNS: &str =
    "id, name, description, status, owner_id, used_by, created_at, updated_at, used_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
}

impl SqliteTicketStore {
    /// Open (or create) a store at `path`.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            revision,
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            revision,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS qr_codes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                owner_id TEXT,
                used_by TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                used_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_qr_codes_status ON qr_codes(status);
            CREATE INDEX IF NOT EXISTS idx_qr_codes_owner ON qr_codes(owner_id);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    fn query_ticket(conn: &Connection, id: &str) -> Result<Option<TicketRecord>, StoreError> {
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM qr_codes WHERE id = ?"),
            params![id],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(db_err)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<TicketRecord> {
        let status_str: String = row.get(3)?;
        let status = TicketStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown ticket status: {status_str}").into(),
            )
        })?;

        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        let used_at: Option<String> = row.get(8)?;

        Ok(TicketRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            status,
            owner_id: row.get(4)?,
            used_by: row.get(5)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            used_at: used_at.as_deref().map(parse_timestamp),
        })
    }

    fn write_merged(
        conn: &Connection,
        merged: &TicketRecord,
        guard: Option<UpdateGuard>,
    ) -> Result<usize, StoreError> {
        let mut sql = String::from(
            "UPDATE qr_codes SET name = ?1, description = ?2, status = ?3, owner_id = ?4, \
             used_by = ?5, updated_at = ?6, used_at = ?7 WHERE id = ?8",
        );
        if let Some(guard) = guard {
            sql.push_str(" AND status = ?9");
            if guard.unowned {
                sql.push_str(" AND owner_id IS NULL");
            }
            conn.execute(
                &sql,
                params![
                    merged.name,
                    merged.description,
                    merged.status.as_str(),
                    merged.owner_id,
                    merged.used_by,
                    merged.updated_at.to_rfc3339(),
                    merged.used_at.map(|t| t.to_rfc3339()),
                    merged.id,
                    guard.status.as_str(),
                ],
            )
            .map_err(db_err)
        } else {
            conn.execute(
                &sql,
                params![
                    merged.name,
                    merged.description,
                    merged.status.as_str(),
                    merged.owner_id,
                    merged.used_by,
                    merged.updated_at.to_rfc3339(),
                    merged.used_at.map(|t| t.to_rfc3339()),
                    merged.id,
                ],
            )
            .map_err(db_err)
        }
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn get(&self, id: &str) -> Result<Option<TicketRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_ticket(&conn, id)
    }

    async fn snapshot(&self) -> Result<Vec<TicketRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM qr_codes"))
            .map_err(db_err)?;

        let rows = stmt.query_map([], Self::row_to_ticket).map_err(db_err)?;

        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row.map_err(db_err)?);
        }
        Ok(tickets)
    }

    async fn insert(&self, ticket: NewTicket) -> Result<TicketRecord, StoreError> {
        let now = Utc::now();
        let record = TicketRecord {
            id: ticket.id,
            name: ticket.name,
            description: ticket.description,
            status: TicketStatus::Generated,
            owner_id: None,
            used_by: None,
            created_at: now,
            updated_at: now,
            used_at: None,
        };

        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO qr_codes (id, name, description, status, owner_id, used_by, created_at, updated_at, used_at) \
             VALUES (?, ?, ?, ?, NULL, NULL, ?, ?, NULL)",
            params![
                record.id,
                record.name,
                record.description,
                record.status.as_str(),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        );
        drop(conn);

        match result {
            Ok(_) => {
                self.bump();
                Ok(record)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists(record.id))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn update(&self, id: &str, update: TicketUpdate) -> Result<TicketRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        let current =
            Self::query_ticket(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // The store clock never steps backwards for a record.
        let now = Utc::now().max(current.updated_at);
        let mut merged = current;
        update.apply_to(&mut merged, now);

        Self::write_merged(&conn, &merged, None)?;
        drop(conn);

        self.bump();
        Ok(merged)
    }

    async fn update_if(
        &self,
        id: &str,
        guard: UpdateGuard,
        update: TicketUpdate,
    ) -> Result<CasOutcome, StoreError> {
        let conn = self.conn.lock().unwrap();
        let current =
            Self::query_ticket(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let now = Utc::now().max(current.updated_at);
        let mut merged = current.clone();
        update.apply_to(&mut merged, now);

        // The guard is re-evaluated inside the UPDATE itself; a stale read of
        // `current` cannot produce a spurious write.
        let changed = Self::write_merged(&conn, &merged, Some(guard))?;
        drop(conn);

        if changed == 1 {
            self.bump();
            Ok(CasOutcome::Applied(merged))
        } else {
            Ok(CasOutcome::Rejected(current))
        }
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
