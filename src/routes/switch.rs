use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::server::appstate::AppState;
use crate::switch::SwitchInfo;

async fn get_switch(State(state): State<AppState>) -> Json<SwitchInfo> {
    Json(state.switch().info())
}

async fn post_turn_on(State(state): State<AppState>) -> Json<SwitchInfo> {
    let switch = state.switch();
    log::info!("Turning on {}", switch.entity_id());
    switch.turn_on();
    switch.schedule_update_state();
    Json(switch.info())
}

async fn post_turn_off(State(state): State<AppState>) -> Json<SwitchInfo> {
    let switch = state.switch();
    log::info!("Turning off {}", switch.entity_id());
    switch.turn_off();
    switch.schedule_update_state();
    Json(switch.info())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_switch))
        .route("/turn_on", post(post_turn_on))
        .route("/turn_off", post(post_turn_off))
}
