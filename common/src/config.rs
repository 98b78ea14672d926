//! Configuration loaded from the process environment.

use std::time::Duration;

use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Default Baserow API root.
pub const DEFAULT_BASEROW_API_URL: &str = "https://api.baserow.io/api";

/// Default per-request timeout for calls to Baserow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    /// Loads the server configuration for the named service.
    ///
    /// Reads `SERVER_HOST`, `SERVER_PORT` and `CORS_ALLOW_ORIGIN`
    /// (`*` allows any origin).
    pub fn load_with_service(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    fn from_lookup(service_name: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cors_allow_origin = match lookup("CORS_ALLOW_ORIGIN") {
            Some(origin) if origin.trim() == "*" => None,
            Some(origin) if !origin.trim().is_empty() => Some(origin.trim().to_string()),
            _ => Some(DEFAULT_CORS_ORIGIN.to_string()),
        };

        Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            cors_allow_origin,
        }
    }
}

/// Connection settings for the Baserow API.
#[derive(Clone)]
pub struct BaserowSettings {
    /// API root without a trailing slash, e.g. `https://api.baserow.io/api`.
    pub api_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for BaserowSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaserowSettings")
            .field("api_url", &self.api_url)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BaserowSettings {
    /// Settings from explicit values. A `None` api url falls back to the
    /// public Baserow instance.
    pub fn new(api_url: Option<String>, email: Option<String>, password: Option<String>) -> Self {
        Self {
            api_url: normalize_url(api_url.as_deref().unwrap_or(DEFAULT_BASEROW_API_URL)),
            email,
            password,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Settings from `BASEROW_API_URL`, `BASEROW_EMAIL`, `BASEROW_PASSWORD`
    /// and `BASEROW_TIMEOUT_SECS`.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::new(
            lookup("BASEROW_API_URL"),
            lookup("BASEROW_EMAIL"),
            lookup("BASEROW_PASSWORD"),
        );
        if let Some(secs) = lookup("BASEROW_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            settings.timeout = Duration::from_secs(secs);
        }
        settings
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the validated account credentials.
    ///
    /// Fails with `AppError::Configuration` when the email or password is
    /// missing or blank.
    pub fn credentials(&self) -> AppResult<AccountCredentials> {
        let credentials = AccountCredentials {
            email: self.email.as_deref().unwrap_or_default().trim().to_string(),
            password: self.password.clone().unwrap_or_default(),
        };
        credentials
            .validate()
            .map_err(|_| AppError::Configuration("Baserow email and password are required".to_string()))?;
        Ok(credentials)
    }
}

/// Email/password pair posted to the token endpoint.
#[derive(Clone, Validate)]
pub struct AccountCredentials {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
