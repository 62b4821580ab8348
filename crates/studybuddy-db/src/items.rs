use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::Database;
use crate::models::{ItemRow, UpdateOutcome};
use crate::queries::OptionalExt;
use crate::scope::{Resource, scope};

const ITEM_COLUMNS: &str = "i.id, i.variant_id, v.name, i.name";

/// Narrows an item listing. A parent outside the owner's scope yields an
/// empty list rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    All,
    Variant(i64),
    Quiz(i64),
}

/// A variant resolved against the owner's scope. Items are only ever
/// inserted through one, so a write can never land in a foreign variant.
/// Resolve it inside the transaction that performs the inserts.
pub struct OwnedVariant<'c> {
    conn: &'c Connection,
    id: i64,
    name: String,
}

impl<'c> OwnedVariant<'c> {
    pub fn resolve(conn: &'c Connection, owner_id: &str, variant_id: i64) -> Result<Option<Self>> {
        let s = scope(owner_id, Resource::Variant);
        let name: Option<String> = conn
            .query_row(
                &s.select("v.name", "AND v.id = ?2"),
                rusqlite::params![owner_id, variant_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(name.map(|name| Self {
            conn,
            id: variant_id,
            name,
        }))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn insert(&self, name: &str) -> Result<ItemRow> {
        self.conn.execute(
            "INSERT INTO items (variant_id, name) VALUES (?1, ?2)",
            rusqlite::params![self.id, name],
        )?;
        Ok(ItemRow {
            id: self.conn.last_insert_rowid(),
            variant_id: self.id,
            variant_name: self.name.clone(),
            name: name.to_string(),
        })
    }
}

impl Database {
    pub fn list_items(&self, owner_id: &str, filter: ItemFilter) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            let s = scope(owner_id, Resource::Item);
            let (narrow, parent) = match filter {
                ItemFilter::All => {
                    let mut stmt = conn.prepare(&s.select(ITEM_COLUMNS, ""))?;
                    let rows = stmt
                        .query_map([owner_id], map_item)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    return Ok(rows);
                }
                ItemFilter::Variant(id) => ("AND i.variant_id = ?2", (Resource::Variant, id)),
                ItemFilter::Quiz(id) => ("AND v.quiz_id = ?2", (Resource::Quiz, id)),
            };

            let (resource, parent_id) = parent;
            if !scope(owner_id, resource).contains(conn, parent_id)? {
                return Ok(vec![]);
            }

            let mut stmt = conn.prepare(&s.select(ITEM_COLUMNS, narrow))?;
            let rows = stmt
                .query_map(rusqlite::params![owner_id, parent_id], map_item)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_item(&self, owner_id: &str, id: i64) -> Result<Option<ItemRow>> {
        self.with_conn(|conn| query_item(conn, owner_id, id))
    }

    /// Renames and/or moves an item to another variant of the same owner.
    pub fn update_item(
        &self,
        owner_id: &str,
        id: i64,
        name: Option<&str>,
        variant_id: Option<i64>,
    ) -> Result<UpdateOutcome<ItemRow>> {
        self.with_tx(|tx| {
            let Some(current) = query_item(tx, owner_id, id)? else {
                return Ok(UpdateOutcome::NotFound);
            };
            if let Some(variant_id) = variant_id {
                if !scope(owner_id, Resource::Variant).contains(tx, variant_id)? {
                    return Ok(UpdateOutcome::ParentNotOwned);
                }
            }

            tx.execute(
                "UPDATE items SET name = ?2, variant_id = ?3 WHERE id = ?1",
                rusqlite::params![
                    id,
                    name.unwrap_or(current.name.as_str()),
                    variant_id.unwrap_or(current.variant_id)
                ],
            )?;

            match query_item(tx, owner_id, id)? {
                Some(row) => Ok(UpdateOutcome::Updated(row)),
                None => Err(anyhow::anyhow!("Item {} vanished after update", id)),
            }
        })
    }

    pub fn delete_item(&self, owner_id: &str, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let s = scope(owner_id, Resource::Item);
            let deleted = conn.execute(
                &format!("DELETE FROM items WHERE id = ?2 AND id IN ({})", s.ids()),
                rusqlite::params![owner_id, id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_item(conn: &Connection, owner_id: &str, id: i64) -> Result<Option<ItemRow>> {
    let s = scope(owner_id, Resource::Item);
    conn.query_row(
        &s.select(ITEM_COLUMNS, "AND i.id = ?2"),
        rusqlite::params![owner_id, id],
        map_item,
    )
    .optional()
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        variant_id: row.get(1)?,
        variant_name: row.get(2)?,
        name: row.get(3)?,
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
        let av = db.create_variant("alice", a.id, "A").unwrap().unwrap();
        let bv = db.create_variant("bob", b.id, "B").unwrap().unwrap();
        (db, av.id, bv.id)
    }

    fn add(db: &Database, owner: &str, variant_id: i64, names: &[&str]) -> Vec<ItemRow> {
        db.with_tx(|tx| {
            let variant = OwnedVariant::resolve(tx, owner, variant_id)?
                .ok_or_else(|| anyhow::anyhow!("variant {} not owned by {}", variant_id, owner))?;
            names.iter().map(|n| variant.insert(n)).collect::<Result<Vec<_>>>()
        })
        .unwrap()
    }

    #[test]
    fn inserts_keep_order_and_variant_name() {
        let (db, alice_variant, _) = setup();
        let created = add(&db, "alice", alice_variant, &["Item 1", "Item 2", "Item 3"]);

        let got: Vec<&str> = created.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(got, vec!["Item 1", "Item 2", "Item 3"]);
        assert!(created.windows(2).all(|w| w[0].id < w[1].id));
        assert!(created.iter().all(|i| i.variant_name == "A"));

        let listed = db.list_items("alice", ItemFilter::Variant(alice_variant)).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2].name, "Item 3");
    }

    #[test]
    fn foreign_variant_does_not_resolve() {
        let (db, alice_variant, bob_variant) = setup();
        db.with_conn(|conn| {
            assert!(OwnedVariant::resolve(conn, "alice", bob_variant)?.is_none());
            assert!(OwnedVariant::resolve(conn, "alice", 9_999)?.is_none());
            assert_eq!(OwnedVariant::resolve(conn, "alice", alice_variant)?.unwrap().id(), alice_variant);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn failed_batch_rolls_back() {
        let (db, alice_variant, _) = setup();
        let result: anyhow::Result<()> = db.with_tx(|tx| {
            let variant = OwnedVariant::resolve(tx, "alice", alice_variant)?.unwrap();
            variant.insert("kept?")?;
            anyhow::bail!("validation failed mid-batch")
        });
        assert!(result.is_err());
        assert!(db.list_items("alice", ItemFilter::All).unwrap().is_empty());
    }

    #[test]
    fn filters_on_foreign_parents_are_empty() {
        let (db, alice_variant, bob_variant) = setup();
        add(&db, "alice", alice_variant, &["a"]);
        let bob_item = add(&db, "bob", bob_variant, &["b"]).remove(0);

        assert!(db.get_item("alice", bob_item.id).unwrap().is_none());
        assert_eq!(db.get_item("bob", bob_item.id).unwrap().unwrap().name, "b");
        assert!(db.list_items("alice", ItemFilter::Variant(bob_variant)).unwrap().is_empty());
        assert!(db.list_items("alice", ItemFilter::Variant(9_999)).unwrap().is_empty());
        assert_eq!(db.list_items("alice", ItemFilter::All).unwrap().len(), 1);

        let bob_quiz = db.list_quizzes("bob").unwrap()[0].id;
        assert!(db.list_items("alice", ItemFilter::Quiz(bob_quiz)).unwrap().is_empty());
        assert_eq!(db.list_items("bob", ItemFilter::Quiz(bob_quiz)).unwrap().len(), 1);
    }

    #[test]
    fn update_moves_only_within_owned_variants() {
        let (db, alice_variant, bob_variant) = setup();
        let item = add(&db, "alice", alice_variant, &["a"]).remove(0);

        assert!(matches!(
            db.update_item("alice", item.id, None, Some(bob_variant)).unwrap(),
            UpdateOutcome::ParentNotOwned
        ));
        assert!(matches!(
            db.update_item("bob", item.id, Some("b"), None).unwrap(),
            UpdateOutcome::NotFound
        ));
        assert_eq!(db.get_item("alice", item.id).unwrap().unwrap().name, "a");
        assert!(!db.delete_item("bob", item.id).unwrap());
        assert!(db.delete_item("alice", item.id).unwrap());
        assert!(db.get_item("alice", item.id).unwrap().is_none());
    }
}
