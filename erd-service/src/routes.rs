//! Route table.

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/erd", get(handlers::get_erd))
        .route("/api/tables", get(handlers::get_tables))
        .route("/api/fields/{table_id}", get(handlers::get_fields))
        .route("/api/health", get(handlers::health_check))
}
