use crate::error::{AppError, Result};
use crate::models::{Account, CredentialSet};
use crate::services::spotify::TokenEndpoint;
use crate::store::AccountStore;
use chrono::Utc;
use std::sync::Arc;

/// Tokens expiring within this window are refreshed before use.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Owns access-token validity for a request. Refresh is an explicit step
/// here rather than hidden inside an SDK client, so it can be observed,
/// tested and persisted deterministically.
pub struct CredentialManager {
    tokens: Arc<dyn TokenEndpoint>,
    store: Arc<dyn AccountStore>,
}

impl CredentialManager {
    pub fn new(tokens: Arc<dyn TokenEndpoint>, store: Arc<dyn AccountStore>) -> Self {
        Self { tokens, store }
    }

    /// Produce a credential set valid for immediate use, refreshing and
    /// persisting first when the stored token is about to expire.
    pub async fn ensure_valid(&self, account: &Account) -> Result<CredentialSet> {
        self.ensure_valid_at(account, Utc::now().timestamp()).await
    }

    pub async fn ensure_valid_at(&self, account: &Account, now: i64) -> Result<CredentialSet> {
        if account.expires_at > now + EXPIRY_MARGIN_SECS {
            tracing::debug!("Access token for account {} still valid", account.id);
            return Ok(CredentialSet::from_account(account));
        }

        tracing::info!(
            "Access token for account {} expired or nearing expiry, refreshing",
            account.id
        );

        let refresh_token = account.refresh_token.as_deref().ok_or_else(|| {
            tracing::warn!("Account {} has no refresh token", account.id);
            AppError::ReauthRequired
        })?;

        let grant = match self.tokens.refresh_access_token(refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!("Token refresh for account {} rejected: {}", account.id, e);
                return Err(AppError::ReauthRequired);
            }
        };

        let creds = CredentialSet {
            access_token: grant.access_token,
            // Refresh tokens are not guaranteed to rotate; keep the old
            // one when Spotify did not issue a replacement.
            refresh_token: grant
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: now + grant.expires_in,
        };

        // Persist best-effort. The conditional write loses to a concurrent
        // refresh of the same account; either way this request keeps its
        // in-memory token and the row self-corrects on the next refresh.
        match self
            .store
            .update_tokens(&account.id, &creds, account.expires_at)
            .await
        {
            Ok(true) => tracing::debug!("Persisted refreshed tokens for account {}", account.id),
            Ok(false) => tracing::debug!(
                "Concurrent refresh already persisted tokens for account {}",
                account.id
            ),
            Err(e) => tracing::warn!(
                "Failed to persist refreshed tokens for account {}: {}",
                account.id,
                e
            ),
        }

        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::spotify::TokenGrant;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockTokens {
        calls: AtomicUsize,
        grant: Option<TokenGrant>,
    }

    #[async_trait]
    impl TokenEndpoint for MockTokens {
        async fn refresh_access_token(&self, _refresh_token: &str) -> Result<TokenGrant> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.grant
                .clone()
                .ok_or_else(|| AppError::Spotify("invalid_grant".into()))
        }
    }

    #[derive(Default)]
    struct MockStore {
        updates: Mutex<Vec<(String, i64, i64)>>,
        fail_updates: bool,
    }

    #[async_trait]
    impl AccountStore for MockStore {
        async fn find_by_api_key(&self, _api_key: &str) -> Result<Option<Account>> {
            Ok(None)
        }

        async fn update_tokens(
            &self,
            account_id: &str,
            creds: &CredentialSet,
            expected_expires_at: i64,
        ) -> Result<bool> {
            if self.fail_updates {
                return Err(AppError::Internal(anyhow::anyhow!("store down")));
            }
            self.updates.lock().unwrap().push((
                account_id.to_string(),
                creds.expires_at,
                expected_expires_at,
            ));
            Ok(true)
        }
    }

    fn account(expires_at: i64, refresh_token: Option<&str>) -> Account {
        Account {
            id: "user-1".into(),
            access_token: "old-access".into(),
            refresh_token: refresh_token.map(String::from),
            expires_at,
            api_key: "key".into(),
            created_at: Utc::now(),
        }
    }

    fn manager(tokens: Arc<MockTokens>, store: Arc<MockStore>) -> CredentialManager {
        CredentialManager::new(tokens, store)
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_refresh() {
        let tokens = Arc::new(MockTokens {
            calls: AtomicUsize::new(0),
            grant: None,
        });
        let store = Arc::new(MockStore::default());
        let now = 1_000_000;

        let creds = manager(tokens.clone(), store.clone())
            .ensure_valid_at(&account(now + EXPIRY_MARGIN_SECS + 1, Some("rt")), now)
            .await
            .unwrap();

        assert_eq!(creds.access_token, "old-access");
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 0);
        assert!(store.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed_once_and_persisted() {
        let tokens = Arc::new(MockTokens {
            calls: AtomicUsize::new(0),
            grant: Some(TokenGrant {
                access_token: "new-access".into(),
                refresh_token: None,
                expires_in: 3600,
            }),
        });
        let store = Arc::new(MockStore::default());
        let now = 1_000_000;
        let old_expiry = now + 100;

        let creds = manager(tokens.clone(), store.clone())
            .ensure_valid_at(&account(old_expiry, Some("rt")), now)
            .await
            .unwrap();

        assert_eq!(tokens.calls.load(Ordering::SeqCst), 1);
        assert_eq!(creds.access_token, "new-access");
        // No rotation from the endpoint means the old refresh token stays.
        assert_eq!(creds.refresh_token.as_deref(), Some("rt"));
        assert_eq!(creds.expires_at, now + 3600);

        let updates = store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (id, persisted_expiry, expected_old) = &updates[0];
        assert_eq!(id, "user-1");
        assert!(*persisted_expiry > old_expiry);
        assert_eq!(*expected_old, old_expiry);
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_kept() {
        let tokens = Arc::new(MockTokens {
            calls: AtomicUsize::new(0),
            grant: Some(TokenGrant {
                access_token: "new-access".into(),
                refresh_token: Some("rt-2".into()),
                expires_in: 3600,
            }),
        });
        let store = Arc::new(MockStore::default());

        let creds = manager(tokens, store)
            .ensure_valid_at(&account(0, Some("rt-1")), 1_000_000)
            .await
            .unwrap();

        assert_eq!(creds.refresh_token.as_deref(), Some("rt-2"));
    }

    #[tokio::test]
    async fn missing_refresh_token_requires_reauth() {
        let tokens = Arc::new(MockTokens {
            calls: AtomicUsize::new(0),
            grant: None,
        });
        let store = Arc::new(MockStore::default());

        let err = manager(tokens.clone(), store)
            .ensure_valid_at(&account(0, None), 1_000_000)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReauthRequired));
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_refresh_requires_reauth() {
        let tokens = Arc::new(MockTokens {
            calls: AtomicUsize::new(0),
            grant: None,
        });
        let store = Arc::new(MockStore::default());

        let err = manager(tokens.clone(), store)
            .ensure_valid_at(&account(0, Some("rt")), 1_000_000)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReauthRequired));
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persistence_failure_still_yields_fresh_token() {
        let tokens = Arc::new(MockTokens {
            calls: AtomicUsize::new(0),
            grant: Some(TokenGrant {
                access_token: "new-access".into(),
                refresh_token: None,
                expires_in: 3600,
            }),
        });
        let store = Arc::new(MockStore {
            fail_updates: true,
            ..Default::default()
        });

        let creds = manager(tokens, store)
            .ensure_valid_at(&account(0, Some("rt")), 1_000_000)
            .await
            .unwrap();

        assert_eq!(creds.access_token, "new-access");
    }
}
