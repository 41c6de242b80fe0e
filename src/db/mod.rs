pub mod error;
pub mod memory;
pub mod queries;
pub mod race;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::{FailPoint, MemoryRaceStore};
pub use queries::Queries;
pub use race::RaceRepository;
pub use store::{RaceStore, UnitOfWork};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(options: PgConnectOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
}
