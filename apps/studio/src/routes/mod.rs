pub mod health;
pub mod typeset;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Typeset API
        .route("/api/v1/typeset/source", post(typeset::handle_source))
        .route("/api/v1/typeset/render", post(typeset::handle_render))
        .with_state(state)
}
