use crate::api::middleware::ApiKeyAuth;
use crate::api::AppState;
use crate::error::Result;
use crate::services::orchestrator::AddRequest;
use axum::{
    extract::{Form, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AddParams {
    query: Option<String>,
    playlist: Option<String>,
    /// Opt-in AI query normalization.
    #[serde(default)]
    ai: bool,
}

impl From<AddParams> for AddRequest {
    fn from(params: AddParams) -> Self {
        AddRequest {
            query: params.query,
            playlist: params.playlist,
            use_ai: params.ai,
        }
    }
}

pub fn add_routes() -> Router<Arc<AppState>> {
    Router::new().route("/add", get(add_via_query).post(add_via_form))
}

/// GET form, parameters in the query string. The usual path for phone
/// shortcuts and bookmarklets.
async fn add_via_query(
    State(state): State<Arc<AppState>>,
    ApiKeyAuth(account): ApiKeyAuth,
    Query(params): Query<AddParams>,
) -> Result<String> {
    run_add(&state, account, params.into()).await
}

async fn add_via_form(
    State(state): State<Arc<AppState>>,
    ApiKeyAuth(account): ApiKeyAuth,
    Form(params): Form<AddParams>,
) -> Result<String> {
    run_add(&state, account, params.into()).await
}

async fn run_add(
    state: &AppState,
    account: crate::models::Account,
    request: AddRequest,
) -> Result<String> {
    let confirmation = state.orchestrator.add_track(&account, &request).await?;
    Ok(confirmation.message())
}
