use super::{error_response, AppState};
use crate::db::RaceStore;
use crate::models::Language;
use crate::ops::{self, LanguageOutcome};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct LanguageList {
    languages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewLanguage {
    name: String,
}

pub async fn list_languages<S: RaceStore>(State(state): State<Arc<AppState<S>>>) -> Response {
    match ops::list_languages(&state.store).await {
        Ok(languages) if languages.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(languages) => Json(LanguageList { languages }).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn add_language<S: RaceStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Response {
    let new: NewLanguage = if body.is_empty() {
        NewLanguage::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(new) => new,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        }
    };

    match ops::add_language(&state.store, &new.name).await {
        Ok(LanguageOutcome::Created(id)) => {
            let language = Language { id, name: new.name };
            (StatusCode::CREATED, Json(language)).into_response()
        }
        Ok(LanguageOutcome::AlreadyExists) => {
            tracing::info!("Language '{}' already exists", new.name);
            StatusCode::NOT_MODIFIED.into_response()
        }
        Err(e) => e.into_response(),
    }
}
