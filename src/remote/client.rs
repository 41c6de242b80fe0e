use super::types::{GraphQlRequest, GraphQlResponse, RacesData};
use crate::models::Race;
use anyhow::{Context, Result};
use reqwest::Client;

const RACES_QUERY: &str = include_str!("../../graphql/races.gql");

/// Client for the GraphQL endpoint that publishes race records
#[derive(Clone)]
pub struct RaceApiClient {
    client: Client,
    endpoint: String,
}

impl RaceApiClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch every race the source knows about, converted to the stored shape
    pub async fn fetch_races(&self) -> Result<Vec<Race>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query: RACES_QUERY })
            .send()
            .await
            .context("Failed to reach race source")?
            .error_for_status()
            .context("Race source returned an error status")?;

        let body: GraphQlResponse<RacesData> = response
            .json()
            .await
            .context("Failed to decode race source response")?;

        if let Some(err) = body.errors.first() {
            anyhow::bail!("Race source GraphQL error: {}", err.message);
        }

        let races = body
            .data
            .context("Race source response carried no data")?
            .races;
        tracing::info!("Retrieved {} rows of race data", races.len());

        Ok(races.into_iter().map(|r| r.into_race()).collect())
    }
}
