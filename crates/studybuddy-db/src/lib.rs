pub mod items;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod quizzes;
pub mod scope;
pub mod variants;

use anyhow::Result;
use rusqlite::Transaction;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use items::{ItemFilter, OwnedVariant};
pub use rusqlite::Connection;
pub use models::{ItemRow, QuizRow, UpdateOutcome, UserRow, VariantRow};
pub use scope::{Resource, Scope, scope};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::bootstrap(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        // Cascades depend on this; SQLite leaves it off per connection.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Runs `f` inside one transaction. Any error rolls back every write `f` made.
    pub fn with_tx<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(out)
    }
}
