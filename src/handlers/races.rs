use super::{error_response, AppState};
use crate::db::RaceStore;
use crate::models::Race;
use crate::ops;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct RaceList {
    races: Vec<Race>,
}

/// Body accepted by `POST /race/new`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewRace {
    pub name: String,
    pub size: Option<String>,
    pub speed: Option<i32>,
    pub languages: Vec<String>,
}

impl From<NewRace> for Race {
    fn from(new: NewRace) -> Self {
        Race {
            id: 0,
            name: new.name,
            size: new.size,
            speed: new.speed,
            languages: new.languages,
        }
    }
}

pub async fn list_races<S: RaceStore>(State(state): State<Arc<AppState<S>>>) -> Response {
    match ops::list_races(&state.store).await {
        Ok(races) if races.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(races) => Json(RaceList { races }).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn show_race<S: RaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<i32>() else {
        return error_response(StatusCode::NOT_FOUND, "No resource with this id");
    };

    match ops::get_race(&state.store, id).await {
        Ok(Some(race)) => Json(race).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("No race with id {}", id)),
        Err(e) => e.into_response(),
    }
}

pub async fn add_race<S: RaceStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Response {
    let new: NewRace = if body.is_empty() {
        NewRace::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(new) => new,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        }
    };

    let mut race = Race::from(new);
    match ops::create_race(&state.store, &race).await {
        Ok(id) => {
            race.id = id;
            (StatusCode::CREATED, Json(race)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn delete_races<S: RaceStore>(State(state): State<Arc<AppState<S>>>) -> Response {
    match ops::delete_all_races(&state.store).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
