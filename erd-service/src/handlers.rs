//! HTTP handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use common::errors::AppError;
use common::models::{ErdGraph, Field, Relationship, Table};
use common::response::{HealthResponse, MessageResponse};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::service::ErdService;
use crate::state::AppState;

const SERVICE_NAME: &str = "erd-service";
const NO_TABLES_MESSAGE: &str = "No tables found in your Baserow databases";

/// `/api/erd` body: the full graph, or an empty graph with an explanation.
#[derive(Serialize)]
#[serde(untagged)]
pub enum ErdResponse {
    Graph(ErdGraph),
    Empty(EmptyErd),
}

/// Returned when the account has no tables at all.
#[derive(Serialize, ToSchema)]
pub struct EmptyErd {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub message: String,
}

impl EmptyErd {
    fn new() -> Self {
        Self {
            tables: Vec::new(),
            relationships: Vec::new(),
            message: NO_TABLES_MESSAGE.to_string(),
        }
    }
}

/// Welcome message
#[utoipa::path(
    get,
    path = "/",
    tag = "erd",
    responses(
        (status = 200, description = "Welcome message", body = MessageResponse)
    )
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to Baserow ERD API"))
}

/// Consolidated schema graph of every workspace
#[utoipa::path(
    get,
    path = "/api/erd",
    tag = "erd",
    responses(
        (status = 200, description = "Schema graph, or an empty graph with a message", body = ErdGraph),
        (status = 401, description = "Baserow credentials missing or rejected", body = common::response::ErrorDetail),
        (status = 500, description = "Remote service failure", body = common::response::ErrorDetail)
    )
)]
pub async fn get_erd(State(state): State<AppState>) -> Result<Json<ErdResponse>, AppError> {
    let service = ErdService::new(state.baserow_client().await?);
    let graph = service
        .build_graph()
        .await
        .map_err(|e| e.context("Error fetching ERD data"))?;

    if graph.tables.is_empty() {
        return Ok(Json(ErdResponse::Empty(EmptyErd::new())));
    }
    Ok(Json(ErdResponse::Graph(graph)))
}

/// Raw table records of every database
#[utoipa::path(
    get,
    path = "/api/tables",
    tag = "erd",
    responses(
        (status = 200, description = "Table records as returned by Baserow"),
        (status = 401, description = "Baserow credentials missing or rejected", body = common::response::ErrorDetail),
        (status = 500, description = "Remote service failure", body = common::response::ErrorDetail)
    )
)]
pub async fn get_tables(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let service = ErdService::new(state.baserow_client().await?);
    Ok(Json(service.all_tables().await?))
}

/// Field records of one table
#[utoipa::path(
    get,
    path = "/api/fields/{table_id}",
    tag = "erd",
    params(
        ("table_id" = i64, Path, description = "Baserow table id")
    ),
    responses(
        (status = 200, description = "Field records as returned by Baserow"),
        (status = 401, description = "Baserow credentials missing or rejected", body = common::response::ErrorDetail),
        (status = 500, description = "Remote service failure", body = common::response::ErrorDetail)
    )
)]
pub async fn get_fields(
    State(state): State<AppState>,
    Path(table_id): Path<i64>,
) -> Result<Json<Vec<Field>>, AppError> {
    let service = ErdService::new(state.baserow_client().await?);
    Ok(Json(service.fields(table_id).await?))
}

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(SERVICE_NAME, env!("CARGO_PKG_VERSION")))
}
