use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, quizzes, variants, items)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE quizzes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_quizzes_owner ON quizzes(owner_id);

            CREATE TABLE variants (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id     INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
                name        TEXT NOT NULL
            );

            CREATE INDEX idx_variants_quiz ON variants(quiz_id);

            CREATE TABLE items (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                variant_id  INTEGER NOT NULL REFERENCES variants(id) ON DELETE CASCADE,
                name        TEXT NOT NULL
            );

            CREATE INDEX idx_items_variant ON items(variant_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, LATEST_VERSION);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
