use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `languages` table. `name` is unique across the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Language {
    pub id: i32,
    pub name: String,
}
