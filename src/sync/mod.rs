//! Bulk synchronization of a race batch into the store.
//!
//! A batch is written in one transaction: races are bulk-loaded, each
//! distinct language is inserted if absent, then every race-language
//! reference becomes a link. Any failure rolls the whole batch back.

pub mod dedup;
pub mod transaction;
pub mod writer;

pub use dedup::{LanguagePlan, LinkRef};
pub use transaction::{Phase, Transaction, TransactionError, TxState};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::db::{RaceStore, StoreError, UnitOfWork};
use crate::models::Race;
use crate::remote::RaceSource;

/// Row counts written by one committed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub races: u64,
    pub languages_created: usize,
    pub links: usize,
}

/// Apply `races` to `store` atomically.
pub async fn sync_batch<S>(store: &S, races: &[Race]) -> Result<SyncReport, TransactionError>
where
    S: RaceStore + ?Sized,
{
    if races.is_empty() {
        tracing::debug!("Empty batch, nothing to write");
        return Ok(SyncReport::default());
    }

    let plan = LanguagePlan::from_batch(races);
    let mut tx: Transaction<S::Unit> = Transaction::begin(store).await?;

    let unit = tx.unit()?;
    let written = write_batch(unit, races, &plan).await;

    match written {
        Ok(report) => {
            tx.commit().await?;
            Ok(report)
        }
        Err((phase, cause)) => Err(tx.abort(phase, cause).await),
    }
}

async fn write_batch<U: UnitOfWork>(
    unit: &mut U,
    races: &[Race],
    plan: &LanguagePlan<'_>,
) -> Result<SyncReport, (Phase, StoreError)> {
    let races = writer::populate_races(unit, races)
        .await
        .map_err(|e| (Phase::Races, e))?;
    let languages_created = writer::populate_languages(unit, plan)
        .await
        .map_err(|e| (Phase::Languages, e))?;
    let links = writer::populate_links(unit, plan)
        .await
        .map_err(|e| (Phase::Links, e))?;

    Ok(SyncReport {
        races,
        languages_created,
        links,
    })
}

/// Fetch from `source` and write the result. Failures are logged and
/// swallowed so the caller can simply try again on the next cycle.
pub async fn run_sync_cycle<S, R>(store: &S, source: &R) -> Option<SyncReport>
where
    S: RaceStore + ?Sized,
    R: RaceSource + ?Sized,
{
    let races = match source.fetch_races().await {
        Ok(races) => races,
        Err(e) => {
            tracing::warn!("Failed to collect data from race source: {:#}", e);
            return None;
        }
    };

    match sync_batch(store, &races).await {
        Ok(report) => {
            tracing::info!(
                "Synced {} races ({} new languages, {} links)",
                report.races,
                report.languages_created,
                report.links
            );
            Some(report)
        }
        Err(e) => {
            tracing::warn!("Failed to write race source data: {}", e);
            None
        }
    }
}

/// Run a sync cycle immediately and then once per `period`.
pub fn spawn_periodic_sync<S, R>(store: Arc<S>, source: Arc<R>, period: Duration) -> JoinHandle<()>
where
    S: RaceStore,
    R: RaceSource + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_sync_cycle(store.as_ref(), source.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FailPoint, MemoryRaceStore};
    use async_trait::async_trait;

    struct StaticSource(anyhow::Result<Vec<Race>>);

    #[async_trait]
    impl RaceSource for StaticSource {
        async fn fetch_races(&self) -> anyhow::Result<Vec<Race>> {
            match &self.0 {
                Ok(races) => Ok(races.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn batch() -> Vec<Race> {
        vec![
            Race::new("A").with_languages(["x", "y"]),
            Race::new("B").with_languages(["y", "z"]),
        ]
    }

    #[tokio::test]
    async fn test_sync_batch_reports_counts() {
        let store = MemoryRaceStore::new();
        let report = sync_batch(&store, &batch()).await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                races: 2,
                languages_created: 3,
                links: 4
            }
        );
    }

    #[tokio::test]
    async fn test_sync_batch_existing_languages_are_not_recreated() {
        let store = MemoryRaceStore::new();
        sync_batch(&store, &batch()).await.unwrap();
        let report = sync_batch(&store, &[Race::new("C").with_languages(["x", "w"])])
            .await
            .unwrap();
        assert_eq!(report.languages_created, 1);
        assert_eq!(store.row_counts(), (3, 4, 6));
    }

    #[tokio::test]
    async fn test_empty_batch_opens_no_transaction() {
        let store = MemoryRaceStore::new();
        store.fail_at(FailPoint::Begin);
        assert_eq!(sync_batch(&store, &[]).await.unwrap(), SyncReport::default());
    }

    #[tokio::test]
    async fn test_failure_in_each_phase_is_attributed() {
        for (point, phase) in [
            (FailPoint::CopyRaces, Phase::Races),
            (FailPoint::InsertLanguage, Phase::Languages),
            (FailPoint::Link, Phase::Links),
        ] {
            let store = MemoryRaceStore::new();
            store.fail_at(point);
            let err = sync_batch(&store, &batch()).await.unwrap_err();
            assert_eq!(err.phase(), Some(phase));
            assert_eq!(store.row_counts(), (0, 0, 0));
        }
    }

    #[tokio::test]
    async fn test_cycle_survives_source_failure() {
        let store = MemoryRaceStore::new();
        let source = StaticSource(Err(anyhow::anyhow!("connection refused")));
        assert_eq!(run_sync_cycle(&store, &source).await, None);
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_cycle_survives_write_failure_and_next_cycle_retries() {
        let store = MemoryRaceStore::new();
        let source = StaticSource(Ok(batch()));

        store.fail_at(FailPoint::Link);
        assert_eq!(run_sync_cycle(&store, &source).await, None);
        assert_eq!(store.row_counts(), (0, 0, 0));

        let report = run_sync_cycle(&store, &source).await.unwrap();
        assert_eq!(report.links, 4);
    }

    #[tokio::test]
    async fn test_repeated_cycles_append_races_but_reuse_languages() {
        let store = MemoryRaceStore::new();
        let source = StaticSource(Ok(vec![Race::new("Elf").with_languages(["Elvish"])]));

        run_sync_cycle(&store, &source).await.unwrap();
        let report = run_sync_cycle(&store, &source).await.unwrap();

        assert_eq!(report.languages_created, 0);
        assert_eq!(store.row_counts(), (2, 1, 2));
    }

    #[tokio::test]
    async fn test_periodic_sync_runs_first_cycle_immediately() {
        let store = Arc::new(MemoryRaceStore::new());
        let source = Arc::new(StaticSource(Ok(batch())));
        let handle = spawn_periodic_sync(Arc::clone(&store), source, Duration::from_secs(3600));

        for _ in 0..50 {
            if store.row_counts().0 > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(store.row_counts(), (2, 3, 4));
    }
}
