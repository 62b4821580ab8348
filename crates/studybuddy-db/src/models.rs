/// Database row types. These map directly to SQLite rows.
/// Distinct from studybuddy-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct QuizRow {
    pub id: i64,
    pub title: String,
    pub owner_id: String,
    pub owner_username: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct VariantRow {
    pub id: i64,
    pub quiz_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ItemRow {
    pub id: i64,
    pub variant_id: i64,
    pub variant_name: String,
    pub name: String,
}

/// Result of updating a row that may also be re-parented.
#[derive(Debug)]
pub enum UpdateOutcome<T> {
    Updated(T),
    /// The target row is not in the caller's scope.
    NotFound,
    /// The requested new parent is not in the caller's scope.
    ParentNotOwned,
}
