pub mod types;
pub mod client;

pub use client::RaceApiClient;

use async_trait::async_trait;

use crate::models::Race;

/// Where a sync cycle gets its batch from
#[async_trait]
pub trait RaceSource: Send + Sync {
    async fn fetch_races(&self) -> anyhow::Result<Vec<Race>>;
}

#[async_trait]
impl RaceSource for RaceApiClient {
    async fn fetch_races(&self) -> anyhow::Result<Vec<Race>> {
        RaceApiClient::fetch_races(self).await
    }
}
