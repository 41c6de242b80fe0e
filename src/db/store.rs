//! Store traits shared by the Postgres and in-memory backends.

use async_trait::async_trait;

use super::error::StoreResult;
use crate::models::Race;

/// One open transaction against the store.
///
/// Writes are invisible to readers until [`commit`](UnitOfWork::commit)
/// succeeds. Dropping a unit without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    /// Bulk-load `(name, size, speed)` rows for every race. Either all rows
    /// are staged or an error is returned.
    async fn copy_races(&mut self, races: &[Race]) -> StoreResult<u64>;

    /// Insert one race row and return its assigned id.
    async fn insert_race(&mut self, race: &Race) -> StoreResult<i32>;

    /// Insert a language unless one with this name exists.
    ///
    /// Returns `Some(id)` when a row was created and `None` when the name
    /// was already present.
    async fn insert_language(&mut self, name: &str) -> StoreResult<Option<i32>>;

    /// Link the most recently inserted race named `race` to language `language`.
    async fn link_by_name(&mut self, race: &str, language: &str) -> StoreResult<()>;

    /// Link race `race_id` to language `language`.
    async fn link_by_id(&mut self, race_id: i32, language: &str) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Relational store holding races, languages and the links between them.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RaceStore: Send + Sync + 'static {
    type Unit: UnitOfWork;

    /// Open a new unit of work.
    async fn begin(&self) -> StoreResult<Self::Unit>;

    /// All races ordered by id, each with its language names.
    async fn list_races(&self) -> StoreResult<Vec<Race>>;

    /// One race with its language names, or `None` if no row has this id.
    async fn get_race(&self, id: i32) -> StoreResult<Option<Race>>;

    /// All language names in creation order.
    async fn list_languages(&self) -> StoreResult<Vec<String>>;

    /// Remove every race and every link. Languages are kept.
    async fn truncate_races(&self) -> StoreResult<()>;
}
