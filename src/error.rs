use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("API key is missing. Pass it as ?token= or an Authorization: Bearer header")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Not signed in")]
    Unauthorized,

    #[error("Spotify session expired. Please log in again to re-link your account")]
    ReauthRequired,

    #[error("No track found for query \"{0}\"")]
    TrackNotFound(String),

    #[error("Playlist \"{0}\" not found among your playlists")]
    PlaylistNotFound(String),

    #[error("Spotify error: {0}")]
    Spotify(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MissingParam(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::MissingApiKey => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidApiKey => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::ReauthRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TrackNotFound(_) | AppError::PlaylistNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Spotify(ref msg) => {
                tracing::error!("Spotify upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
