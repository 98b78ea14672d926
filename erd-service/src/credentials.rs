//! Access/refresh token holder for the Baserow client.

use std::future::Future;

use common::errors::AppResult;
use tokio::sync::Mutex;

/// Token pair returned by the token endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokens {
    pub access: String,
    pub refresh: Option<String>,
}

/// Owns the current token pair of one client instance.
///
/// All reads and the refresh path go through a single mutex, so flows sharing
/// a client never observe a half-written pair.
#[derive(Debug)]
pub struct CredentialStore {
    tokens: Mutex<Tokens>,
}

impl CredentialStore {
    pub fn new(tokens: Tokens) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    /// Current access token.
    pub async fn access_token(&self) -> String {
        self.tokens.lock().await.access.clone()
    }

    /// Replaces the token pair after `stale` was rejected.
    ///
    /// If another flow already swapped in a new token while this one waited
    /// for the lock, that token is returned and `authenticate` is not called.
    pub async fn refresh_with<F, Fut>(&self, stale: &str, authenticate: F) -> AppResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Tokens>>,
    {
        let mut tokens = self.tokens.lock().await;
        if tokens.access != stale {
            tracing::debug!("token already refreshed by another request");
            return Ok(tokens.access.clone());
        }

        *tokens = authenticate().await?;
        tracing::info!(has_refresh = tokens.refresh.is_some(), "access token refreshed");
        Ok(tokens.access.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tokens(access: &str) -> Tokens {
        Tokens {
            access: access.to_string(),
            refresh: None,
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_stale_token() {
        let store = CredentialStore::new(tokens("old"));
        let fresh = store
            .refresh_with("old", || async { Ok(tokens("new")) })
            .await
            .unwrap();

        assert_eq!(fresh, "new");
        assert_eq!(store.access_token().await, "new");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_authenticates_once() {
        let store = Arc::new(CredentialStore::new(tokens("old")));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                store
                    .refresh_with("old", || async {
                        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        Ok(tokens(&format!("new-{}", n)))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "new-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let store = CredentialStore::new(tokens("old"));
        let result = store
            .refresh_with("old", || async {
                Err(AppError::Authentication {
                    status: Some(400),
                    body: "invalid".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::Authentication { .. })));
        assert_eq!(store.access_token().await, "old");
    }
}
