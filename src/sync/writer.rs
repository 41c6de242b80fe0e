//! Set-oriented writes for one batch, run inside an already-open unit of work.
//!
//! Phases must run in order: races, languages, links. Links resolve both
//! sides by name, so every language has to be staged first.

use super::dedup::LanguagePlan;
use crate::db::{StoreResult, UnitOfWork};
use crate::models::Race;

/// Bulk-load one row per race. Returns the number of rows loaded.
pub async fn populate_races<U: UnitOfWork>(unit: &mut U, races: &[Race]) -> StoreResult<u64> {
    let loaded = unit.copy_races(races).await?;
    tracing::debug!("Loaded {} race rows", loaded);
    Ok(loaded)
}

/// Insert each distinct language unless it already exists. Returns how many
/// rows were actually created.
pub async fn populate_languages<U: UnitOfWork>(
    unit: &mut U,
    plan: &LanguagePlan<'_>,
) -> StoreResult<usize> {
    let mut created = 0;
    for name in &plan.distinct {
        if unit.insert_language(name).await?.is_some() {
            created += 1;
        }
    }
    tracing::debug!(
        "Created {} of {} distinct languages",
        created,
        plan.distinct.len()
    );
    Ok(created)
}

/// Write one link per language reference in the batch.
pub async fn populate_links<U: UnitOfWork>(
    unit: &mut U,
    plan: &LanguagePlan<'_>,
) -> StoreResult<usize> {
    for link in &plan.links {
        unit.link_by_name(link.race, link.language).await?;
    }
    tracing::debug!("Wrote {} race-language links", plan.links.len());
    Ok(plan.links.len())
}
