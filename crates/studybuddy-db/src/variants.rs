use anyhow::Result;
use rusqlite::{Connection, Row};
use tracing::info;

use crate::Database;
use crate::models::{UpdateOutcome, VariantRow};
use crate::queries::OptionalExt;
use crate::scope::{Resource, scope};

const VARIANT_COLUMNS: &str = "v.id, v.quiz_id, v.name";

impl Database {
    /// Lists the owner's variants, optionally only those of `quiz_id`.
    /// A quiz outside the owner's scope yields an empty list.
    pub fn list_variants(&self, owner_id: &str, quiz_id: Option<i64>) -> Result<Vec<VariantRow>> {
        self.with_conn(|conn| {
            let s = scope(owner_id, Resource::Variant);
            let Some(quiz_id) = quiz_id else {
                let mut stmt = conn.prepare(&s.select(VARIANT_COLUMNS, ""))?;
                let rows = stmt
                    .query_map([owner_id], map_variant)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                return Ok(rows);
            };

            if !scope(owner_id, Resource::Quiz).contains(conn, quiz_id)? {
                return Ok(vec![]);
            }
            let mut stmt = conn.prepare(&s.select(VARIANT_COLUMNS, "AND v.quiz_id = ?2"))?;
            let rows = stmt
                .query_map(rusqlite::params![owner_id, quiz_id], map_variant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_variant(&self, owner_id: &str, id: i64) -> Result<Option<VariantRow>> {
        self.with_conn(|conn| query_variant(conn, owner_id, id))
    }

    /// Creates a variant under `quiz_id`. `None` when that quiz is not in the
    /// owner's scope, in which case nothing is written.
    pub fn create_variant(&self, owner_id: &str, quiz_id: i64, name: &str) -> Result<Option<VariantRow>> {
        self.with_tx(|tx| {
            if !scope(owner_id, Resource::Quiz).contains(tx, quiz_id)? {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO variants (quiz_id, name) VALUES (?1, ?2)",
                rusqlite::params![quiz_id, name],
            )?;
            let id = tx.last_insert_rowid();
            info!("Variant {} created in quiz {}", id, quiz_id);
            query_variant(tx, owner_id, id)
        })
    }

    /// Renames and/or moves a variant to another quiz of the same owner.
    pub fn update_variant(
        &self,
        owner_id: &str,
        id: i64,
        name: Option<&str>,
        quiz_id: Option<i64>,
    ) -> Result<UpdateOutcome<VariantRow>> {
        self.with_tx(|tx| {
            let Some(current) = query_variant(tx, owner_id, id)? else {
                return Ok(UpdateOutcome::NotFound);
            };
            if let Some(quiz_id) = quiz_id {
                if !scope(owner_id, Resource::Quiz).contains(tx, quiz_id)? {
                    return Ok(UpdateOutcome::ParentNotOwned);
                }
            }

            tx.execute(
                "UPDATE variants SET name = ?2, quiz_id = ?3 WHERE id = ?1",
                rusqlite::params![
                    id,
                    name.unwrap_or(current.name.as_str()),
                    quiz_id.unwrap_or(current.quiz_id)
                ],
            )?;

            match query_variant(tx, owner_id, id)? {
                Some(row) => Ok(UpdateOutcome::Updated(row)),
                None => Err(anyhow::anyhow!("Variant {} vanished after update", id)),
            }
        })
    }

    /// Deletes a variant and its items. `false` when not in the owner's scope.
    pub fn delete_variant(&self, owner_id: &str, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let s = scope(owner_id, Resource::Variant);
            let deleted = conn.execute(
                &format!("DELETE FROM variants WHERE id = ?2 AND id IN ({})", s.ids()),
                rusqlite::params![owner_id, id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_variant(conn: &Connection, owner_id: &str, id: i64) -> Result<Option<VariantRow>> {
    let s = scope(owner_id, Resource::Variant);
    conn.query_row(
        &s.select(VARIANT_COLUMNS, "AND v.id = ?2"),
        rusqlite::params![owner_id, id],
        map_variant,
    )
    .optional()
}

fn map_variant(row: &Row<'_>) -> rusqlite::Result<VariantRow> {
    Ok(VariantRow {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        name: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", "alice", "hash").unwrap();
        db.create_user("bob", "bob", "hash").unwrap();
        let a = db.create_quiz("alice", "Alice quiz").unwrap();
        let b = db.create_quiz("bob", "Bob quiz").unwrap();
        (db, a.id, b.id)
    }

    #[test]
    fn create_requires_owned_quiz() {
        let (db, alice_quiz, bob_quiz) = setup();

        assert!(db.create_variant("alice", bob_quiz, "Sneaky").unwrap().is_none());
        assert!(db.list_variants("bob", None).unwrap().is_empty());

        let v = db.create_variant("alice", alice_quiz, "Easy").unwrap().unwrap();
        assert_eq!(v.quiz_id, alice_quiz);
        assert_eq!(v.name, "Easy");
    }

    #[test]
    fn quiz_filter_on_foreign_quiz_is_empty() {
        let (db, alice_quiz, bob_quiz) = setup();
        db.create_variant("bob", bob_quiz, "Hard").unwrap().unwrap();
        db.create_variant("alice", alice_quiz, "Easy").unwrap().unwrap();

        assert!(db.list_variants("alice", Some(bob_quiz)).unwrap().is_empty());
        assert_eq!(db.list_variants("alice", Some(alice_quiz)).unwrap().len(), 1);
        assert_eq!(db.list_variants("alice", None).unwrap().len(), 1);
    }

    #[test]
    fn other_owner_cannot_read_variant() {
        let (db, alice_quiz, _) = setup();
        let v = db.create_variant("alice", alice_quiz, "Easy").unwrap().unwrap();

        assert!(db.get_variant("bob", v.id).unwrap().is_none());
        assert!(db.list_variants("bob", None).unwrap().is_empty());
        assert_eq!(db.get_variant("alice", v.id).unwrap().unwrap().name, "Easy");
    }

    #[test]
    fn update_cannot_move_into_foreign_quiz() {
        let (db, alice_quiz, bob_quiz) = setup();
        let v = db.create_variant("alice", alice_quiz, "Easy").unwrap().unwrap();

        assert!(matches!(
            db.update_variant("alice", v.id, None, Some(bob_quiz)).unwrap(),
            UpdateOutcome::ParentNotOwned
        ));
        assert!(matches!(
            db.update_variant("bob", v.id, Some("Mine"), None).unwrap(),
            UpdateOutcome::NotFound
        ));

        match db.update_variant("alice", v.id, Some("Medium"), None).unwrap() {
            UpdateOutcome::Updated(row) => {
                assert_eq!(row.name, "Medium");
                assert_eq!(row.quiz_id, alice_quiz);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
