use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A linked Spotify account. Created by the OAuth callback, read by the
/// add pipeline. Only the token columns are ever updated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Spotify user id.
    pub id: String,
    pub access_token: String,
    /// Absent when Spotify did not issue one; such accounts cannot be
    /// refreshed and must re-link once the access token expires.
    pub refresh_token: Option<String>,
    /// Epoch seconds at which `access_token` stops working.
    pub expires_at: i64,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

/// The token triple a single request works with. Owned by that request;
/// never shared between concurrent requests in memory.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

impl CredentialSet {
    pub fn from_account(account: &Account) -> Self {
        CredentialSet {
            access_token: account.access_token.clone(),
            refresh_token: account.refresh_token.clone(),
            expires_at: account.expires_at,
        }
    }
}
