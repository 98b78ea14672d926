//! Application state for the ERD service.

use common::config::{AppConfig, BaserowSettings};
use common::errors::{AppError, AppResult};

use crate::client::BaserowClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub baserow: BaserowSettings,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, baserow: BaserowSettings) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(baserow.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            baserow,
            http_client,
        })
    }

    /// Connects a fresh Baserow client for the current request.
    ///
    /// Credentials refused by the token endpoint surface as `Unauthorized`.
    /// Token endpoint outages, malformed token answers and refresh failures
    /// later in the walk stay server errors.
    pub async fn baserow_client(&self) -> AppResult<BaserowClient> {
        BaserowClient::connect(&self.baserow, self.http_client.clone())
            .await
            .map_err(|e| {
                if e.is_credential_rejection() {
                    AppError::Unauthorized(e.to_string())
                } else {
                    e
                }
            })
    }
}
