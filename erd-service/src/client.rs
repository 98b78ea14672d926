//! Baserow REST client.
//!
//! Authenticates with the account email/password, keeps the JWT pair in a
//! [`CredentialStore`] and re-authenticates once when a GET comes back 401.

use std::time::Duration;

use async_trait::async_trait;
use common::config::{AccountCredentials, BaserowSettings};
use common::errors::{AppError, AppResult};
use common::models::Field;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Tokens};
use crate::service::SchemaSource;

/// Authorization scheme Baserow expects for user JWTs.
const AUTH_SCHEME: &str = "JWT";

/// Application type holding tables.
const DATABASE_APPLICATION: &str = "database";

/// Client for one Baserow account.
pub struct BaserowClient {
    api_url: String,
    timeout: Duration,
    http: reqwest::Client,
    account: AccountCredentials,
    credentials: CredentialStore,
}

impl BaserowClient {
    /// Validates the settings and performs the initial token exchange.
    pub async fn connect(settings: &BaserowSettings, http: reqwest::Client) -> AppResult<Self> {
        let account = settings.credentials()?;
        let tokens = request_tokens(&http, &settings.api_url, settings.timeout, &account).await?;

        info!(api_url = %settings.api_url, "Baserow client initialized");
        Ok(Self {
            api_url: settings.api_url.clone(),
            timeout: settings.timeout,
            http,
            account,
            credentials: CredentialStore::new(tokens),
        })
    }

    /// Exchanges the account email/password for a fresh token pair.
    pub async fn authenticate(&self) -> AppResult<Tokens> {
        request_tokens(&self.http, &self.api_url, self.timeout, &self.account).await
    }

    /// GETs `path` with the current access token.
    ///
    /// A 401 triggers exactly one re-authentication and one retry; a second
    /// 401, or a refresh that fails for any reason, is returned as
    /// `AppError::Authentication`. Other statuses are handed back to the
    /// caller untouched.
    pub async fn authorized_get(&self, path: &str) -> AppResult<Response> {
        let url = self.url(path);
        let token = self.credentials.access_token().await;
        let response = self.send_get(&url, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(url = %url, "access token rejected, re-authenticating");
        let fresh = self
            .credentials
            .refresh_with(&token, || self.authenticate())
            .await
            .map_err(refresh_failed)?;

        let response = self.send_get(&url, &fresh).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Authentication {
                status: Some(StatusCode::UNAUTHORIZED.as_u16()),
                body,
            });
        }
        Ok(response)
    }

    /// Raw workspace records.
    pub async fn list_workspaces(&self) -> AppResult<Vec<Value>> {
        let workspaces = self.get_list("workspaces/").await?;
        info!(count = workspaces.len(), "fetched workspaces");
        Ok(workspaces)
    }

    /// Database applications of a workspace; other application types are dropped.
    pub async fn list_databases(&self, workspace_id: i64) -> AppResult<Vec<Value>> {
        let applications = self
            .get_list(&format!("applications/workspace/{}/", workspace_id))
            .await?;

        let total = applications.len();
        let databases: Vec<Value> = applications
            .into_iter()
            .filter(|app| {
                app.is_object()
                    && app.get("type").and_then(Value::as_str) == Some(DATABASE_APPLICATION)
            })
            .collect();
        debug!(
            workspace_id,
            databases = databases.len(),
            skipped = total - databases.len(),
            "filtered applications"
        );
        Ok(databases)
    }

    /// Tables of a database.
    ///
    /// When the table endpoint answers with anything but 200, the `tables`
    /// array embedded in the application detail is used instead.
    pub async fn list_tables(&self, database_id: i64) -> AppResult<Vec<Value>> {
        let path = format!("database/tables/database/{}/", database_id);
        let response = self.authorized_get(&path).await?;
        if response.status() == StatusCode::OK {
            return parse_list(response, &self.url(&path)).await;
        }

        warn!(
            database_id,
            status = response.status().as_u16(),
            "table listing failed, falling back to application detail"
        );
        let detail = self
            .get_json(&format!("applications/{}/", database_id))
            .await?;
        match detail.get("tables") {
            Some(Value::Array(tables)) => Ok(tables.clone()),
            _ => Err(AppError::RemoteService(format!(
                "no tables available for database {}",
                database_id
            ))),
        }
    }

    /// Fields of a table; entries that are not JSON objects are dropped.
    pub async fn list_fields(&self, table_id: i64) -> AppResult<Vec<Field>> {
        let raw = self
            .get_list(&format!("database/fields/table/{}/", table_id))
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|value| {
                let field = Field::from_value(value);
                if field.is_none() {
                    warn!(table_id, "dropping malformed field record");
                }
                field
            })
            .collect())
    }

    /// Display name of a database, or `"Database {id}"` if it cannot be fetched.
    pub async fn database_name(&self, database_id: i64) -> String {
        match self.get_json(&format!("applications/{}/", database_id)).await {
            Ok(detail) => match detail.get("name").and_then(Value::as_str) {
                Some(name) => name.to_string(),
                None => fallback_database_name(database_id),
            },
            Err(e) => {
                warn!(database_id, error = %e, "could not fetch database details");
                fallback_database_name(database_id)
            }
        }
    }

    async fn get_json(&self, path: &str) -> AppResult<Value> {
        let url = self.url(path);
        let response = self.authorized_get(path).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::remote_status(&url, status.as_u16(), &body));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::RemoteService(format!("invalid JSON from {}: {}", url, e)))
    }

    async fn get_list(&self, path: &str) -> AppResult<Vec<Value>> {
        match self.get_json(path).await? {
            Value::Array(items) => Ok(items),
            other => Err(AppError::RemoteService(format!(
                "expected a list from {}, got {}",
                self.url(path),
                json_kind(&other)
            ))),
        }
    }

    async fn send_get(&self, url: &str, token: &str) -> AppResult<Response> {
        self.http
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", AUTH_SCHEME, token),
            )
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::RemoteService(format!("GET {} failed: {}", url, e)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }
}

#[async_trait]
impl SchemaSource for BaserowClient {
    async fn list_workspaces(&self) -> AppResult<Vec<Value>> {
        BaserowClient::list_workspaces(self).await
    }

    async fn list_databases(&self, workspace_id: i64) -> AppResult<Vec<Value>> {
        BaserowClient::list_databases(self, workspace_id).await
    }

    async fn list_tables(&self, database_id: i64) -> AppResult<Vec<Value>> {
        BaserowClient::list_tables(self, database_id).await
    }

    async fn list_fields(&self, table_id: i64) -> AppResult<Vec<Field>> {
        BaserowClient::list_fields(self, table_id).await
    }

    async fn database_name(&self, database_id: i64) -> String {
        BaserowClient::database_name(self, database_id).await
    }
}

async fn request_tokens(
    http: &reqwest::Client,
    api_url: &str,
    timeout: Duration,
    account: &AccountCredentials,
) -> AppResult<Tokens> {
    let url = format!("{}/user/token-auth/", api_url);
    let response = http
        .post(&url)
        .json(&json!({ "email": account.email, "password": account.password }))
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AppError::RemoteService(format!("POST {} failed: {}", url, e)))?;

    let status = response.status();
    debug!(status = status.as_u16(), "token-auth response");
    let body = response.text().await.unwrap_or_default();
    if status != StatusCode::OK {
        warn!(status = status.as_u16(), "Baserow authentication failed");
        return Err(AppError::Authentication {
            status: Some(status.as_u16()),
            body,
        });
    }

    parse_tokens(&body).ok_or_else(|| AppError::Authentication {
        status: Some(status.as_u16()),
        body: format!("malformed token response: {}", body),
    })
}

/// A token refresh that did not produce a token is an authentication failure,
/// whether the endpoint refused or never answered.
fn refresh_failed(e: AppError) -> AppError {
    match e {
        AppError::RemoteService(cause) => AppError::Authentication {
            status: None,
            body: format!("token refresh failed: {}", cause),
        },
        other => other,
    }
}

/// Reads `access_token` (or the older `token` key) and an optional
/// `refresh_token` from a token-auth response body.
fn parse_tokens(body: &str) -> Option<Tokens> {
    let value: Value = serde_json::from_str(body).ok()?;
    let access = value
        .get("access_token")
        .or_else(|| value.get("token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?;
    let refresh = value
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(String::from);

    Some(Tokens {
        access: access.to_string(),
        refresh,
    })
}

async fn parse_list(response: Response, url: &str) -> AppResult<Vec<Value>> {
    match response.json::<Value>().await {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(AppError::RemoteService(format!(
            "expected a list from {}, got {}",
            url,
            json_kind(&other)
        ))),
        Err(e) => Err(AppError::RemoteService(format!(
            "invalid JSON from {}: {}",
            url, e
        ))),
    }
}

fn fallback_database_name(database_id: i64) -> String {
    format!("Database {}", database_id)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
