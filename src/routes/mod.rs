pub mod switch;

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::config::AppConfig;
use crate::server::appstate::AppState;

async fn get_config(State(state): State<AppState>) -> Json<AppConfig> {
    Json((*state.config()).clone())
}

async fn get_bridges(State(state): State<AppState>) -> Json<BTreeMap<String, bool>> {
    Json(state.bridges().summary().await)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/switch", switch::router())
        .route("/config", get(get_config))
        .route("/bridges", get(get_bridges))
}
