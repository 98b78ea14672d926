//! Baserow ERD service
//!
//! Aggregates workspace, database, table and field metadata from Baserow
//! into a single graph for entity-relationship diagrams:
//! - `/api/erd` consolidated graph with link-field relationships
//! - `/api/tables` and `/api/fields/{table_id}` raw pass-through

mod client;
mod credentials;
mod handlers;
mod routes;
mod service;
mod state;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::{http::HeaderValue, middleware, routing::get, Json, Router};
use common::config::{AppConfig, BaserowSettings};
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "erd-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Baserow ERD API",
        version = "0.1.0",
        description = "Schema graph of Baserow workspaces for ERD viewers"
    ),
    paths(
        handlers::root,
        handlers::get_erd,
        handlers::get_tables,
        handlers::get_fields,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ErdGraph,
        common::models::Workspace,
        common::models::Database,
        common::models::Table,
        common::models::Relationship,
        common::response::ErrorDetail,
        common::response::MessageResponse,
        common::response::HealthResponse,
        handlers::EmptyErd,
    )),
    tags(
        (name = "erd", description = "Schema graph endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::load_with_service(SERVICE_NAME);
    let baserow = BaserowSettings::load();
    info!(api_url = %baserow.api_url, timeout = ?baserow.timeout, "Baserow settings loaded");

    let state = AppState::new(config.clone(), baserow)?;
    let app = create_router(state)?;

    let addr = format!("{}:{}", config.host, config.port);
    info!(service = %config.service_name, address = %addr, "starting service");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn create_router(state: AppState) -> anyhow::Result<Router> {
    let origin = match &state.config.cors_allow_origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid CORS_ALLOW_ORIGIN: {}", origin))?,
        ),
        None => AllowOrigin::from(Any),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            // Only set if not already set by the environment
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}
