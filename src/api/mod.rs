pub mod handlers;

pub use handlers::*;

use axum::{
    routing::{delete, get, post},
    Router,
};

/// All HTTP routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/search", post(search))
        .route("/api/pages/extract", post(extract_page))
        .route("/api/session", get(get_session))
        .route("/api/session/select", post(select_service))
        .route("/api/session/search", post(search_selected))
        .route("/api/session/accept", post(accept_candidate))
        .route("/api/session/skip", post(skip_service))
        .route("/api/budget", get(get_budget).delete(clear_budget))
        .route("/api/budget/lines/:index", delete(remove_budget_line))
        .route("/api/budget/export", get(export_budget))
        .with_state(state)
}
