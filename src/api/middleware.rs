use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::Account;
use crate::store::AccountStore;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "__session";

/// Authenticates an add request by opaque API key, taken from the
/// `Authorization: Bearer` header or the `token` query parameter (the
/// latter for clients that cannot set headers).
pub struct ApiKeyAuth(pub Account);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ApiKeyAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .or_else(|| {
                parts.uri.query().and_then(|q| {
                    q.split('&')
                        .find(|p| p.starts_with("token="))
                        .and_then(|p| p.strip_prefix("token="))
                })
            })
            .ok_or(AppError::MissingApiKey)?;

        let account = state
            .store
            .find_by_api_key(token)
            .await?
            .ok_or(AppError::InvalidApiKey)?;

        Ok(ApiKeyAuth(account))
    }
}

/// Authenticates account-management requests by the session cookie set
/// during the OAuth callback.
pub struct SessionAuth(pub Account);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let session_id = parts
            .headers
            .get("Cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| cookie_value(cookies, SESSION_COOKIE))
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or(AppError::Unauthorized)?;

        let account = state
            .store
            .account_for_session(session_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(SessionAuth(account))
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_session_among_others() {
        let header = "theme=dark; __session=0a43b1ce-1db4-4a52-ae24-9b67d0ca2d4f; lang=en";
        assert_eq!(
            cookie_value(header, SESSION_COOKIE),
            Some("0a43b1ce-1db4-4a52-ae24-9b67d0ca2d4f")
        );
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
