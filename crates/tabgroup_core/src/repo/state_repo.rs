//! Persisted forest store contracts and implementations.
//!
//! # Responsibility
//! - Hold one persisted forest per workspace state key.
//! - Keep SQL and payload encoding inside the persistence boundary.
//!
//! # Invariants
//! - `save` replaces the whole slot; there is no partial update.
//! - `load` returns `None` for a never-written or cleared slot.
//! - A payload that does not decode is an error, never an empty forest.

use crate::db::DbError;
use crate::model::item::TreeItem;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StateRepoResult<T> = Result<T, StateRepoError>;

#[derive(Debug)]
pub enum StateRepoError {
    Db(DbError),
    /// Stored payload is not a valid forest document.
    Payload(serde_json::Error),
}

impl Display for StateRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Payload(err) => write!(f, "invalid persisted forest payload: {err}"),
        }
    }
}

impl Error for StateRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Payload(err) => Some(err),
        }
    }
}

impl From<DbError> for StateRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StateRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StateRepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

/// Single-slot persisted forest.
pub trait StateStore {
    fn load(&self) -> StateRepoResult<Option<Vec<TreeItem>>>;
    fn save(&self, forest: &[TreeItem]) -> StateRepoResult<()>;
    fn clear(&self) -> StateRepoResult<()>;
}

/// SQLite-backed store keyed by workspace state key.
pub struct SqliteStateStore<'conn> {
    conn: &'conn Connection,
    state_key: String,
}

impl<'conn> SqliteStateStore<'conn> {
    pub fn new(conn: &'conn Connection, state_key: impl Into<String>) -> Self {
        Self {
            conn,
            state_key: state_key.into(),
        }
    }

    pub fn state_key(&self) -> &str {
        &self.state_key
    }
}

impl StateStore for SqliteStateStore<'_> {
    fn load(&self) -> StateRepoResult<Option<Vec<TreeItem>>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM workspace_state WHERE state_key = ?1;",
                params![self.state_key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        payload
            .map(|payload| serde_json::from_str(&payload).map_err(StateRepoError::from))
            .transpose()
    }

    fn save(&self, forest: &[TreeItem]) -> StateRepoResult<()> {
        let payload = serde_json::to_string(forest)?;
        self.conn.execute(
            "INSERT INTO workspace_state (state_key, payload, updated_at)
             VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             ON CONFLICT(state_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at;",
            params![self.state_key.as_str(), payload],
        )?;
        Ok(())
    }

    fn clear(&self) -> StateRepoResult<()> {
        self.conn.execute(
            "DELETE FROM workspace_state WHERE state_key = ?1;",
            params![self.state_key.as_str()],
        )?;
        Ok(())
    }
}

/// Process-local store holding the encoded payload, for hosts without a
/// database and for tests.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    payload: RefCell<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the slot with a raw payload, bypassing encoding.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: RefCell::new(Some(payload.into())),
        }
    }

    pub fn raw_payload(&self) -> Option<String> {
        self.payload.borrow().clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> StateRepoResult<Option<Vec<TreeItem>>> {
        self.payload
            .borrow()
            .as_deref()
            .map(|payload| serde_json::from_str(payload).map_err(StateRepoError::from))
            .transpose()
    }

    fn save(&self, forest: &[TreeItem]) -> StateRepoResult<()> {
        *self.payload.borrow_mut() = Some(serde_json::to_string(forest)?);
        Ok(())
    }

    fn clear(&self) -> StateRepoResult<()> {
        self.payload.borrow_mut().take();
        Ok(())
    }
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn load(&self) -> StateRepoResult<Option<Vec<TreeItem>>> {
        (**self).load()
    }

    fn save(&self, forest: &[TreeItem]) -> StateRepoResult<()> {
        (**self).save(forest)
    }

    fn clear(&self) -> StateRepoResult<()> {
        (**self).clear()
    }
}
