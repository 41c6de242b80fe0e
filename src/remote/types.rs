use crate::models::Race;
use serde::{Deserialize, Serialize};

/// Body of a GraphQL POST request
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
}

/// GraphQL response envelope. A response may carry data, errors, or both.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RacesData {
    #[serde(default)]
    pub races: Vec<RaceRecord>,
}

/// A race as the remote source describes it
#[derive(Debug, Clone, Deserialize)]
pub struct RaceRecord {
    pub name: String,
    #[serde(default)]
    pub languages: Vec<LanguageRecord>,
    pub size: Option<String>,
    pub speed: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRecord {
    pub name: String,
}

impl RaceRecord {
    /// Project the record onto the stored shape. Nothing is validated here:
    /// empty names and repeated languages pass through as-is.
    pub fn into_race(self) -> Race {
        Race {
            id: 0,
            name: self.name,
            size: self.size,
            speed: self.speed,
            languages: self.languages.into_iter().map(|l| l.name).collect(),
        }
    }
}
