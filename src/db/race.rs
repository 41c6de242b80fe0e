use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use super::error::{StoreError, StoreResult};
use super::queries::Queries;
use super::store::{RaceStore, UnitOfWork};
use crate::models::Race;

/// Postgres-backed [`RaceStore`]
#[derive(Clone)]
pub struct RaceRepository {
    pool: PgPool,
    queries: Arc<Queries>,
}

impl RaceRepository {
    pub fn new(pool: PgPool, queries: Arc<Queries>) -> Self {
        Self { pool, queries }
    }
}

/// An open Postgres transaction
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
    queries: Arc<Queries>,
}

#[async_trait]
impl RaceStore for RaceRepository {
    type Unit = PgUnit;

    async fn begin(&self) -> StoreResult<PgUnit> {
        let tx = self.pool.begin().await?;
        Ok(PgUnit {
            tx,
            queries: Arc::clone(&self.queries),
        })
    }

    async fn list_races(&self) -> StoreResult<Vec<Race>> {
        let races = sqlx::query_as::<_, Race>(&self.queries.read_races)
            .fetch_all(&self.pool)
            .await?;
        Ok(races)
    }

    async fn get_race(&self, id: i32) -> StoreResult<Option<Race>> {
        let race = sqlx::query_as::<_, Race>(&self.queries.read_race)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(race)
    }

    async fn list_languages(&self) -> StoreResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(&self.queries.read_languages)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn truncate_races(&self) -> StoreResult<()> {
        sqlx::query(&self.queries.truncate_races)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn copy_races(&mut self, races: &[Race]) -> StoreResult<u64> {
        let payload = encode_copy_rows(races);
        let mut copy = self.tx.copy_in_raw(&self.queries.copy_races).await?;

        let sent = copy.send(payload.into_bytes()).await.map(|_| ());
        if let Err(e) = sent {
            if let Err(abort_err) = copy.abort(e.to_string()).await {
                tracing::debug!("COPY abort after failed send: {}", abort_err);
            }
            return Err(e.into());
        }

        Ok(copy.finish().await?)
    }

    async fn insert_race(&mut self, race: &Race) -> StoreResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(&self.queries.insert_race)
            .bind(&race.name)
            .bind(&race.size)
            .bind(race.speed)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn insert_language(&mut self, name: &str) -> StoreResult<Option<i32>> {
        // ON CONFLICT DO NOTHING returns no row for an existing name. The
        // savepoint keeps a unique violation that gets through anyway from
        // poisoning the outer transaction.
        let mut savepoint = Acquire::begin(&mut *self.tx).await?;
        let inserted = sqlx::query_scalar::<_, i32>(&self.queries.insert_language)
            .bind(name)
            .fetch_optional(&mut *savepoint)
            .await;

        match inserted {
            Ok(id) => {
                savepoint.commit().await?;
                Ok(id)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::debug!("Language '{}' already exists: {}", name, db);
                savepoint.rollback().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn link_by_name(&mut self, race: &str, language: &str) -> StoreResult<()> {
        let result = sqlx::query(&self.queries.link_by_name)
            .bind(race)
            .bind(language)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Constraint(format!(
                "cannot link race '{}' to language '{}': one side does not exist",
                race, language
            )));
        }
        Ok(())
    }

    async fn link_by_id(&mut self, race_id: i32, language: &str) -> StoreResult<()> {
        let result = sqlx::query(&self.queries.link_by_id)
            .bind(race_id)
            .bind(language)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Constraint(format!(
                "cannot link race {} to language '{}': one side does not exist",
                race_id, language
            )));
        }
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Encode races as `COPY ... (FORMAT csv)` input.
///
/// Text fields are always quoted, so an unquoted empty field means NULL and
/// `Some("")` survives as an empty string.
pub fn encode_copy_rows(races: &[Race]) -> String {
    let mut out = String::new();
    for race in races {
        push_quoted(&mut out, &race.name);
        out.push(',');
        if let Some(size) = &race.size {
            push_quoted(&mut out, size);
        }
        out.push(',');
        if let Some(speed) = race.speed {
            out.push_str(&speed.to_string());
        }
        out.push('\n');
    }
    out
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    out.push_str(&value.replace('"', "\"\""));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_copy_rows_nulls_are_unquoted() {
        let races = vec![
            Race::new("Elf").with_size("Medium").with_speed(30),
            Race::new("Ooze"),
        ];
        assert_eq!(
            encode_copy_rows(&races),
            "\"Elf\",\"Medium\",30\n\"Ooze\",,\n"
        );
    }

    #[test]
    fn test_encode_copy_rows_keeps_empty_string_distinct_from_null() {
        let races = vec![Race::new("Shade").with_size("")];
        assert_eq!(encode_copy_rows(&races), "\"Shade\",\"\",\n");
    }

    #[test]
    fn test_encode_copy_rows_escapes_quotes_commas_and_newlines() {
        let races = vec![Race::new("The \"Old\", Ones\nof the deep").with_speed(-5)];
        assert_eq!(
            encode_copy_rows(&races),
            "\"The \"\"Old\"\", Ones\nof the deep\",,-5\n"
        );
    }

    #[test]
    fn test_encode_copy_rows_empty_batch() {
        assert_eq!(encode_copy_rows(&[]), "");
    }

    #[test]
    fn test_repository_implements_race_store() {
        fn _assert_store<T: RaceStore>() {}
        _assert_store::<RaceRepository>();
    }
}
