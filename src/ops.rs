//! Single-record operations and reads.
//!
//! Every write runs in its own transaction and either fully applies or
//! leaves the store untouched.

use crate::db::{RaceStore, StoreError, UnitOfWork};
use crate::error::{Error, Result};
use crate::models::Race;
use crate::sync::{Phase, Transaction};

/// Outcome of adding a language by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageOutcome {
    Created(i32),
    AlreadyExists,
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("Name must not be blank".to_string()));
    }
    Ok(())
}

/// Insert one race with its languages and return the assigned id.
pub async fn create_race<S>(store: &S, race: &Race) -> Result<i32>
where
    S: RaceStore + ?Sized,
{
    require_name(&race.name)?;

    let mut tx: Transaction<S::Unit> = Transaction::begin(store).await?;
    let unit = tx.unit()?;
    let written = write_race(unit, race).await;

    match written {
        Ok(id) => {
            tx.commit().await?;
            tracing::info!("Created race '{}' with id {}", race.name, id);
            Ok(id)
        }
        Err((phase, cause)) => {
            tracing::error!("Error writing race ({}) to DB: {}", race.name, cause);
            Err(tx.abort(phase, cause).await.into())
        }
    }
}

async fn write_race<U: UnitOfWork>(
    unit: &mut U,
    race: &Race,
) -> std::result::Result<i32, (Phase, StoreError)> {
    let id = unit
        .insert_race(race)
        .await
        .map_err(|e| (Phase::Races, e))?;
    for language in &race.languages {
        unit.insert_language(language)
            .await
            .map_err(|e| (Phase::Languages, e))?;
        unit.link_by_id(id, language)
            .await
            .map_err(|e| (Phase::Links, e))?;
    }
    Ok(id)
}

/// Add a language unless one with this name exists.
pub async fn add_language<S>(store: &S, name: &str) -> Result<LanguageOutcome>
where
    S: RaceStore + ?Sized,
{
    require_name(name)?;

    let mut tx: Transaction<S::Unit> = Transaction::begin(store).await?;
    let unit = tx.unit()?;
    let inserted = unit.insert_language(name).await;

    match inserted {
        Ok(id) => {
            tx.commit().await?;
            Ok(match id {
                Some(id) => LanguageOutcome::Created(id),
                None => LanguageOutcome::AlreadyExists,
            })
        }
        Err(cause) => {
            tracing::error!("Failed to create language '{}': {}", name, cause);
            Err(tx.abort(Phase::Languages, cause).await.into())
        }
    }
}

/// Fetch one race. A missing row is `Ok(None)`, never an error.
pub async fn get_race<S>(store: &S, id: i32) -> Result<Option<Race>>
where
    S: RaceStore + ?Sized,
{
    store.get_race(id).await.map_err(|e| {
        tracing::error!("Failed to query race {}: {}", id, e);
        e.into()
    })
}

pub async fn list_races<S>(store: &S) -> Result<Vec<Race>>
where
    S: RaceStore + ?Sized,
{
    store.list_races().await.map_err(|e| {
        tracing::error!("Failed to query races: {}", e);
        e.into()
    })
}

pub async fn list_languages<S>(store: &S) -> Result<Vec<String>>
where
    S: RaceStore + ?Sized,
{
    store.list_languages().await.map_err(|e| {
        tracing::error!("Failed to get languages: {}", e);
        e.into()
    })
}

/// Remove every race and its links. Languages are kept.
pub async fn delete_all_races<S>(store: &S) -> Result<()>
where
    S: RaceStore + ?Sized,
{
    store.truncate_races().await.map_err(|e| {
        tracing::error!("Truncate failed: {}", e);
        e.into()
    })
}
