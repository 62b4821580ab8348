//! Ownership scoping.
//!
//! Every read and write against quizzes, variants and items goes through a
//! [`Scope`]: the join chain from the resource table up to `quizzes`, plus the
//! predicate `q.owner_id = ?1`. Rows outside the scope are indistinguishable
//! from rows that do not exist.
//!
//! Statements built from a scope always bind the owner id as `?1`; callers
//! number any further parameters from `?2`.

use anyhow::Result;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Quiz,
    Variant,
    Item,
}

#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    owner_id: &'a str,
    resource: Resource,
}

/// Restricts `resource` to the rows transitively owned by `owner_id`.
pub fn scope(owner_id: &str, resource: Resource) -> Scope<'_> {
    Scope { owner_id, resource }
}

impl<'a> Scope<'a> {
    pub fn owner_id(&self) -> &'a str {
        self.owner_id
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Table alias of the scoped resource inside [`Scope::source`].
    pub fn alias(&self) -> &'static str {
        match self.resource {
            Resource::Quiz => "q",
            Resource::Variant => "v",
            Resource::Item => "i",
        }
    }

    /// FROM clause joining the resource up to its owning quiz.
    pub fn source(&self) -> &'static str {
        match self.resource {
            Resource::Quiz => "quizzes q JOIN users u ON u.id = q.owner_id",
            Resource::Variant => "variants v JOIN quizzes q ON q.id = v.quiz_id",
            Resource::Item => {
                "items i JOIN variants v ON v.id = i.variant_id JOIN quizzes q ON q.id = v.quiz_id"
            }
        }
    }

    pub fn predicate(&self) -> &'static str {
        "q.owner_id = ?1"
    }

    /// `SELECT <columns>` over the scoped rows, further narrowed by `narrow`
    /// (an `AND ...` fragment, or empty) and ordered by id.
    pub fn select(&self, columns: &str, narrow: &str) -> String {
        format!(
            "SELECT {columns} FROM {} WHERE {} {narrow} ORDER BY {}.id",
            self.source(),
            self.predicate(),
            self.alias(),
        )
    }

    /// Subquery yielding the ids of every scoped row, for `id IN (...)` in
    /// UPDATE and DELETE statements.
    pub fn ids(&self) -> String {
        format!(
            "SELECT {}.id FROM {} WHERE {}",
            self.alias(),
            self.source(),
            self.predicate()
        )
    }

    pub fn contains(&self, conn: &Connection, id: i64) -> Result<bool> {
        let sql = format!("SELECT EXISTS({} AND {}.id = ?2)", self.ids(), self.alias());
        let found: bool = conn.query_row(&sql, rusqlite::params![self.owner_id, id], |row| row.get(0))?;
        Ok(found)
    }

    pub fn count(&self, conn: &Connection) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM ({})", self.ids());
        let n: i64 = conn.query_row(&sql, [self.owner_id], |row| row.get(0))?;
        Ok(n)
    }
}
