mod languages;
mod races;

use crate::db::RaceStore;
use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState<S> {
    pub store: S,
}

impl<S: RaceStore> AppState<S> {
    pub fn new(store: S) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

/// Every route served, as (path, method, description)
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("/", "GET", "this index"),
    ("/health", "GET", "liveness check"),
    ("/races", "GET", "list all races"),
    ("/races/delete", "DELETE", "delete all races"),
    ("/race/{id}", "GET", "show one race"),
    ("/race/new", "POST", "create a race from {name, size?, speed?, languages?}"),
    ("/languages", "GET", "list all languages"),
    ("/language/new", "POST", "create a language from {name}"),
];

pub fn router<S: RaceStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/races", get(races::list_races::<S>))
        .route("/races/delete", delete(races::delete_races::<S>))
        .route("/race/new", post(races::add_race::<S>))
        .route("/race/:id", get(races::show_race::<S>))
        .route("/languages", get(languages::list_languages::<S>))
        .route("/language/new", post(languages::add_language::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> String {
    let mut index = String::from("Race API\n\n");
    for (path, method, description) in ROUTES {
        index.push_str(&format!("{:<7} {:<15} {}\n", method, path, description));
    }
    index
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    status_code: u16,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        message: message.into(),
        status_code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Validation(message) => error_response(StatusCode::BAD_REQUEST, message.clone()),
            _ => {
                tracing::error!("Request failed: {}", self);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}
