//! In-memory store for tests and local runs without Postgres.
//!
//! Mirrors the Postgres schema: races, languages with unique names, and a
//! link table with foreign keys on both sides. A unit of work copies the
//! committed tables, writes to the copy, and publishes it on commit. Writers
//! are serialized by an async mutex held for the life of the unit; readers
//! only ever see committed tables.
//!
//! Failures can be injected per operation with [`MemoryRaceStore::fail_at`]
//! to exercise rollback paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::error::{StoreError, StoreResult};
use super::store::{RaceStore, UnitOfWork};
use crate::models::{Language, Race};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    CopyRaces,
    InsertRace,
    InsertLanguage,
    Link,
    Commit,
    Rollback,
    Read,
    Truncate,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    races: Vec<Race>,
    languages: Vec<Language>,
    links: Vec<(i32, i32)>,
    last_race_id: i32,
    last_language_id: i32,
}

impl Tables {
    fn language_id(&self, name: &str) -> Option<i32> {
        self.languages.iter().find(|l| l.name == name).map(|l| l.id)
    }

    fn push_race(&mut self, race: &Race) -> i32 {
        self.last_race_id += 1;
        self.races.push(Race {
            id: self.last_race_id,
            name: race.name.clone(),
            size: race.size.clone(),
            speed: race.speed,
            languages: Vec::new(),
        });
        self.last_race_id
    }

    fn with_languages(&self, race: &Race) -> Race {
        let mut languages: Vec<String> = self
            .links
            .iter()
            .filter(|(race_id, _)| *race_id == race.id)
            .filter_map(|(_, language_id)| {
                self.languages
                    .iter()
                    .find(|l| l.id == *language_id)
                    .map(|l| l.name.clone())
            })
            .collect();
        languages.sort();
        Race {
            languages,
            ..race.clone()
        }
    }
}

/// Remaining successful calls before an injected failure fires
#[derive(Debug, Default)]
struct Faults {
    armed: Mutex<HashMap<FailPoint, usize>>,
}

impl Faults {
    fn check(&self, point: FailPoint) -> StoreResult<()> {
        let mut armed = self.armed.lock().map_err(|_| poisoned())?;
        match armed.get_mut(&point) {
            Some(0) => {
                armed.remove(&point);
                Err(match point {
                    FailPoint::Read | FailPoint::Begin => {
                        StoreError::Unavailable(format!("injected outage at {:?}", point))
                    }
                    _ => StoreError::Query(format!("injected failure at {:?}", point)),
                })
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

/// In-memory implementation of [`RaceStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryRaceStore {
    tables: Arc<RwLock<Tables>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    faults: Arc<Faults>,
}

impl MemoryRaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `point` fail.
    pub fn fail_at(&self, point: FailPoint) {
        self.fail_after(point, 0);
    }

    /// Let `successes` calls to `point` through, then fail the next one.
    pub fn fail_after(&self, point: FailPoint, successes: usize) {
        if let Ok(mut armed) = self.faults.armed.lock() {
            armed.insert(point, successes);
        }
    }

    /// Number of committed rows in (races, languages, links).
    pub fn row_counts(&self) -> (usize, usize, usize) {
        match self.tables.read() {
            Ok(t) => (t.races.len(), t.languages.len(), t.links.len()),
            Err(_) => (0, 0, 0),
        }
    }

    /// Committed links as (race name, language name) pairs, in insertion order.
    pub fn link_names(&self) -> Vec<(String, String)> {
        let Ok(t) = self.tables.read() else {
            return Vec::new();
        };
        t.links
            .iter()
            .filter_map(|(race_id, language_id)| {
                let race = t.races.iter().find(|r| r.id == *race_id)?;
                let language = t.languages.iter().find(|l| l.id == *language_id)?;
                Some((race.name.clone(), language.name.clone()))
            })
            .collect()
    }

    fn read_tables(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.faults.check(FailPoint::Read)?;
        self.tables.read().map_err(|_| poisoned())
    }
}

/// A snapshot transaction over [`MemoryRaceStore`]
#[derive(Debug)]
pub struct MemoryUnit {
    staged: Tables,
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
    _writer: OwnedMutexGuard<()>,
}

#[async_trait]
impl RaceStore for MemoryRaceStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> StoreResult<MemoryUnit> {
        self.faults.check(FailPoint::Begin)?;
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let staged = self.tables.read().map_err(|_| poisoned())?.clone();
        Ok(MemoryUnit {
            staged,
            tables: Arc::clone(&self.tables),
            faults: Arc::clone(&self.faults),
            _writer: writer,
        })
    }

    async fn list_races(&self) -> StoreResult<Vec<Race>> {
        let t = self.read_tables()?;
        Ok(t.races.iter().map(|r| t.with_languages(r)).collect())
    }

    async fn get_race(&self, id: i32) -> StoreResult<Option<Race>> {
        let t = self.read_tables()?;
        Ok(t.races.iter().find(|r| r.id == id).map(|r| t.with_languages(r)))
    }

    async fn list_languages(&self) -> StoreResult<Vec<String>> {
        let t = self.read_tables()?;
        Ok(t.languages.iter().map(|l| l.name.clone()).collect())
    }

    async fn truncate_races(&self) -> StoreResult<()> {
        self.faults.check(FailPoint::Truncate)?;
        let _writer = self.writer.lock().await;
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        t.links.clear();
        t.races.clear();
        t.last_race_id = 0;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn copy_races(&mut self, races: &[Race]) -> StoreResult<u64> {
        self.faults.check(FailPoint::CopyRaces)?;
        // Stage into a scratch copy so a failed load leaves nothing behind.
        let mut scratch = self.staged.clone();
        for race in races {
            scratch.push_race(race);
        }
        self.staged = scratch;
        Ok(races.len() as u64)
    }

    async fn insert_race(&mut self, race: &Race) -> StoreResult<i32> {
        self.faults.check(FailPoint::InsertRace)?;
        Ok(self.staged.push_race(race))
    }

    async fn insert_language(&mut self, name: &str) -> StoreResult<Option<i32>> {
        self.faults.check(FailPoint::InsertLanguage)?;
        if self.staged.language_id(name).is_some() {
            return Ok(None);
        }
        self.staged.last_language_id += 1;
        let id = self.staged.last_language_id;
        self.staged.languages.push(Language {
            id,
            name: name.to_string(),
        });
        Ok(Some(id))
    }

    async fn link_by_name(&mut self, race: &str, language: &str) -> StoreResult<()> {
        self.faults.check(FailPoint::Link)?;
        let race_id = self
            .staged
            .races
            .iter()
            .rev()
            .find(|r| r.name == race)
            .map(|r| r.id)
            .ok_or_else(|| StoreError::Constraint(format!("no race named '{}'", race)))?;
        let language_id = self
            .staged
            .language_id(language)
            .ok_or_else(|| StoreError::Constraint(format!("no language named '{}'", language)))?;
        self.staged.links.push((race_id, language_id));
        Ok(())
    }

    async fn link_by_id(&mut self, race_id: i32, language: &str) -> StoreResult<()> {
        self.faults.check(FailPoint::Link)?;
        if !self.staged.races.iter().any(|r| r.id == race_id) {
            return Err(StoreError::Constraint(format!("no race with id {}", race_id)));
        }
        let language_id = self
            .staged
            .language_id(language)
            .ok_or_else(|| StoreError::Constraint(format!("no language named '{}'", language)))?;
        self.staged.links.push((race_id, language_id));
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.faults.check(FailPoint::Commit)?;
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        *tables = self.staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.faults.check(FailPoint::Rollback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryRaceStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_race(&Race::new("Elf")).await.unwrap();

        assert!(store.list_races().await.unwrap().is_empty());

        unit.commit().await.unwrap();
        assert_eq!(store.list_races().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_unit_discards_writes() {
        let store = MemoryRaceStore::new();
        {
            let mut unit = store.begin().await.unwrap();
            unit.insert_language("Elvish").await.unwrap();
        }
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_insert_language_is_idempotent() {
        let store = MemoryRaceStore::new();
        let mut unit = store.begin().await.unwrap();
        assert_eq!(unit.insert_language("Common").await.unwrap(), Some(1));
        assert_eq!(unit.insert_language("Common").await.unwrap(), None);
        unit.commit().await.unwrap();
        assert_eq!(store.list_languages().await.unwrap(), vec!["Common"]);
    }

    #[tokio::test]
    async fn test_link_requires_existing_language() {
        let store = MemoryRaceStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_race(&Race::new("Elf")).await.unwrap();
        let err = unit.link_by_name("Elf", "Elvish").await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_link_by_name_targets_latest_race() {
        let store = MemoryRaceStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_race(&Race::new("Elf")).await.unwrap();
        let latest = unit.insert_race(&Race::new("Elf")).await.unwrap();
        unit.insert_language("Elvish").await.unwrap();
        unit.link_by_name("Elf", "Elvish").await.unwrap();
        unit.commit().await.unwrap();

        let race = store.get_race(latest).await.unwrap().unwrap();
        assert_eq!(race.languages, vec!["Elvish"]);
        assert!(store.get_race(1).await.unwrap().unwrap().languages.is_empty());
    }

    #[tokio::test]
    async fn test_fail_after_lets_calls_through_first() {
        let store = MemoryRaceStore::new();
        store.fail_after(FailPoint::InsertLanguage, 1);
        let mut unit = store.begin().await.unwrap();
        assert!(unit.insert_language("a").await.is_ok());
        assert!(unit.insert_language("b").await.is_err());
        assert!(unit.insert_language("c").await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_read_failure_is_unavailable() {
        let store = MemoryRaceStore::new();
        store.fail_at(FailPoint::Read);
        assert!(store.get_race(1).await.unwrap_err().is_unavailable());
        assert_eq!(store.get_race(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_truncate_keeps_languages_and_restarts_ids() {
        let store = MemoryRaceStore::new();
        let mut unit = store.begin().await.unwrap();
        let id = unit.insert_race(&Race::new("Elf")).await.unwrap();
        unit.insert_language("Elvish").await.unwrap();
        unit.link_by_id(id, "Elvish").await.unwrap();
        unit.commit().await.unwrap();

        store.truncate_races().await.unwrap();
        assert_eq!(store.row_counts(), (0, 1, 0));

        let mut unit = store.begin().await.unwrap();
        assert_eq!(unit.insert_race(&Race::new("Orc")).await.unwrap(), 1);
    }
}
