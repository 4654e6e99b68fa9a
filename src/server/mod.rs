pub mod appstate;
pub mod http;
pub mod scheduler;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::server::appstate::AppState;

pub fn build_service(appstate: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(appstate)
}
