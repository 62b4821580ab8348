use crate::Database;
use crate::models::UserRow;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode};

impl Database {
    // -- Users --

    /// Inserts a user. Returns `false` when the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, now_timestamp()),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// RFC 3339 UTC timestamp with microseconds, as stored in `created_at` columns.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
