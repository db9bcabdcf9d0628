use crate::api::account::generate_api_key;
use crate::api::middleware::SESSION_COOKIE;
use crate::api::AppState;
use crate::error::Result;
use crate::models::CredentialSet;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// Scopes needed to read the profile id, list playlists and modify them.
const SPOTIFY_SCOPES: &[&str] = &[
    "user-read-private",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
}

async fn login(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let url = state
        .spotify
        .authorize_url(&state.config.redirect_uri(), SPOTIFY_SCOPES)?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// OAuth callback: exchange the code, upsert the account and open a
/// session. Existing accounts keep their API key; new ones get a fresh
/// key issued here.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(error) = params.error {
        tracing::warn!("Spotify OAuth denied: {}", error);
        return Ok((
            StatusCode::BAD_REQUEST,
            format!("Spotify authentication failed: {}", error),
        )
            .into_response());
    }
    let Some(code) = params.code else {
        return Ok((
            StatusCode::BAD_REQUEST,
            "No authorization code received from Spotify.".to_string(),
        )
            .into_response());
    };

    let grant = state
        .spotify
        .exchange_code(&code, &state.config.redirect_uri())
        .await?;
    let account_id = state.spotify.current_user_id(&grant.access_token).await?;

    let creds = CredentialSet {
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        expires_at: Utc::now().timestamp() + grant.expires_in,
    };

    let account = state
        .store
        .upsert_linked_account(&account_id, &creds, &generate_api_key())
        .await?;
    tracing::info!("Linked Spotify account {}", account.id);

    let session_id = state.store.create_session(&account.id).await?;
    let cookie = session_cookie(session_id, state.config.public_url.starts_with("https://"));

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/account")).into_response())
}

/// `Secure` is only set when the service is reachable over https, so
/// local http deployments still get a working session.
fn session_cookie(session_id: uuid::Uuid, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session_id, SESSION_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
