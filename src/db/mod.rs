mod repos;
mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::error::LeaseResult;
use crate::lifecycle::UnitOfWork;
use crate::models::*;

pub use repos::SqliteRepos;

/// Shared handle to the SQLite database.
///
/// All access is serialised through one connection. Units of work open an
/// `IMMEDIATE` transaction, so the write lock is held from the first read
/// and check-then-insert sequences cannot interleave.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// `leasehold.db` in the platform data directory.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "leasehold")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("leasehold.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Property registration
    // ============================================================

    pub fn create_property(
        &self,
        owner_user_id: Uuid,
        input: CreatePropertyInput,
    ) -> LeaseResult<Property> {
        self.atomically(|repos| repos.insert_property(owner_user_id, &input))
    }
}

impl UnitOfWork for Database {
    type Repos<'t> = SqliteRepos<'t>;

    fn atomically<T, F>(&self, work: F) -> LeaseResult<T>
    where
        F: FnOnce(&Self::Repos<'_>) -> LeaseResult<T>,
    {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping `tx` on the error path rolls back.
        let result = work(&SqliteRepos::new(&tx))?;
        tx.commit()?;
        Ok(result)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}
