use crate::api::middleware::{SessionAuth, SESSION_COOKIE};
use crate::api::AppState;
use crate::error::Result;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use std::sync::Arc;

const API_KEY_LEN: usize = 32;

pub fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/account", get(show_account))
        .route("/account/rotate-key", post(rotate_key))
        .route("/account/delete", post(delete_account))
}

#[derive(Debug, Serialize)]
struct AccountSummary {
    id: String,
    api_key: String,
}

async fn show_account(SessionAuth(account): SessionAuth) -> Json<AccountSummary> {
    Json(AccountSummary {
        id: account.id,
        api_key: account.api_key,
    })
}

async fn rotate_key(
    State(state): State<Arc<AppState>>,
    SessionAuth(account): SessionAuth,
) -> Result<Json<AccountSummary>> {
    let new_key = generate_api_key();
    state.store.rotate_api_key(&account.id, &new_key).await?;
    tracing::info!("API key rotated for account {}", account.id);

    Ok(Json(AccountSummary {
        id: account.id,
        api_key: new_key,
    }))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    SessionAuth(account): SessionAuth,
) -> Result<impl IntoResponse> {
    state.store.delete_account(&account.id).await?;
    tracing::info!("Account {} deleted", account.id);

    let clear_cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE);
    Ok((
        [(header::SET_COOKIE, clear_cookie)],
        "Your account has been deleted.",
    ))
}

/// Opaque bearer credential for the add endpoint. 62^32 possibilities.
pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_long_random_and_alphanumeric() {
        let a = generate_api_key();
        let b = generate_api_key();

        assert_eq!(a.len(), API_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
