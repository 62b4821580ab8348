use anyhow::Result;
use rusqlite::{Connection, Row};
use tracing::info;

use crate::Database;
use crate::models::QuizRow;
use crate::queries::{OptionalExt, now_timestamp};
use crate::scope::{Resource, scope};

const QUIZ_COLUMNS: &str = "q.id, q.title, q.owner_id, u.username, q.created_at";

impl Database {
    pub fn list_quizzes(&self, owner_id: &str) -> Result<Vec<QuizRow>> {
        self.with_conn(|conn| {
            let s = scope(owner_id, Resource::Quiz);
            let mut stmt = conn.prepare(&s.select(QUIZ_COLUMNS, ""))?;
            let rows = stmt
                .query_map([owner_id], map_quiz)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_quiz(&self, owner_id: &str, id: i64) -> Result<Option<QuizRow>> {
        self.with_conn(|conn| query_quiz(conn, owner_id, id))
    }

    pub fn create_quiz(&self, owner_id: &str, title: &str) -> Result<QuizRow> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO quizzes (title, owner_id, created_at) VALUES (?1, ?2, ?3)",
                (title, owner_id, now_timestamp()),
            )?;
            let id = tx.last_insert_rowid();
            info!("Quiz {} created for owner {}", id, owner_id);
            query_quiz(tx, owner_id, id)?
                .ok_or_else(|| anyhow::anyhow!("Quiz {} vanished after insert", id))
        })
    }

    /// Renames a quiz. `None` when the quiz is not in the owner's scope.
    pub fn update_quiz(&self, owner_id: &str, id: i64, title: &str) -> Result<Option<QuizRow>> {
        self.with_tx(|tx| {
            let s = scope(owner_id, Resource::Quiz);
            let changed = tx.execute(
                &format!("UPDATE quizzes SET title = ?3 WHERE id = ?2 AND id IN ({})", s.ids()),
                rusqlite::params![owner_id, id, title],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_quiz(tx, owner_id, id)
        })
    }

    /// Deletes a quiz together with its variants and their items.
    /// Returns `false` when the quiz is not in the owner's scope.
    pub fn delete_quiz(&self, owner_id: &str, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let s = scope(owner_id, Resource::Quiz);
            let deleted = conn.execute(
                &format!("DELETE FROM quizzes WHERE id = ?2 AND id IN ({})", s.ids()),
                rusqlite::params![owner_id, id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_quiz(conn: &Connection, owner_id: &str, id: i64) -> Result<Option<QuizRow>> {
    let s = scope(owner_id, Resource::Quiz);
    conn.query_row(
        &s.select(QUIZ_COLUMNS, "AND q.id = ?2"),
        rusqlite::params![owner_id, id],
        map_quiz,
    )
    .optional()
}

fn map_quiz(row: &Row<'_>) -> rusqlite::Result<QuizRow> {
    Ok(QuizRow {
        id: row.get(0)?,
        title: row.get(1)?,
        owner_id: row.get(2)?,
        owner_username: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", "alice", "hash").unwrap();
        db.create_user("bob", "bob", "hash").unwrap();
        db
    }

    #[test]
    fn create_sets_owner_and_timestamp() {
        let db = db_with_users();
        let quiz = db.create_quiz("alice", "Capitals").unwrap();
        assert_eq!(quiz.title, "Capitals");
        assert_eq!(quiz.owner_id, "alice");
        assert_eq!(quiz.owner_username, "alice");
        assert!(!quiz.created_at.is_empty());
    }

    #[test]
    fn other_owner_cannot_read_update_or_delete() {
        let db = db_with_users();
        let quiz = db.create_quiz("alice", "Capitals").unwrap();

        assert!(db.list_quizzes("bob").unwrap().is_empty());
        assert!(db.get_quiz("bob", quiz.id).unwrap().is_none());
        assert!(db.update_quiz("bob", quiz.id, "Stolen").unwrap().is_none());
        assert!(!db.delete_quiz("bob", quiz.id).unwrap());

        let still = db.get_quiz("alice", quiz.id).unwrap().unwrap();
        assert_eq!(still.title, "Capitals");
    }

    #[test]
    fn update_and_delete_by_owner() {
        let db = db_with_users();
        let quiz = db.create_quiz("alice", "Capitals").unwrap();

        let renamed = db.update_quiz("alice", quiz.id, "Rivers").unwrap().unwrap();
        assert_eq!(renamed.title, "Rivers");
        assert_eq!(renamed.created_at, quiz.created_at);

        assert!(db.delete_quiz("alice", quiz.id).unwrap());
        assert!(db.get_quiz("alice", quiz.id).unwrap().is_none());
    }
}
