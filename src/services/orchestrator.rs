use crate::error::{AppError, Result};
use crate::models::{Account, ResolvedPlaylist, ResolvedTrack};
use crate::services::resolver;
use crate::services::spotify::Catalog;
use crate::services::{CredentialManager, QueryNormalizer};
use std::sync::Arc;

/// Inbound parameters of one add request, still unvalidated.
#[derive(Debug, Default, Clone)]
pub struct AddRequest {
    pub query: Option<String>,
    pub playlist: Option<String>,
    pub use_ai: bool,
}

#[derive(Debug, Clone)]
pub struct AddConfirmation {
    pub track: ResolvedTrack,
    pub playlist: ResolvedPlaylist,
}

impl AddConfirmation {
    /// Plain-text confirmation for automation clients that display the
    /// response verbatim.
    pub fn message(&self) -> String {
        if self.track.artist_names.is_empty() {
            format!(
                "Successfully added \"{}\" to \"{}\".",
                self.track.name, self.playlist.name
            )
        } else {
            format!(
                "Successfully added \"{}\" by {} to \"{}\".",
                self.track.name,
                self.track.artists_joined(),
                self.playlist.name
            )
        }
    }
}

/// Sequences one add request: parameter validation, credential check,
/// optional normalization, track and playlist resolution, then the single
/// mutating add call. Earlier stages never get retried by later ones.
pub struct AddOrchestrator {
    credentials: Arc<CredentialManager>,
    normalizer: QueryNormalizer,
    catalog: Arc<dyn Catalog>,
}

impl AddOrchestrator {
    pub fn new(
        credentials: Arc<CredentialManager>,
        normalizer: QueryNormalizer,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            credentials,
            normalizer,
            catalog,
        }
    }

    pub async fn add_track(&self, account: &Account, request: &AddRequest) -> Result<AddConfirmation> {
        // Fail fast on bad parameters, before any external call.
        let query = request
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or(AppError::MissingParam("query"))?;
        let playlist_name = request
            .playlist
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(AppError::MissingParam("playlist"))?;

        let creds = self.credentials.ensure_valid(account).await?;

        let normalized = self.normalizer.normalize(query, request.use_ai).await;
        let song = normalized.song();

        let track =
            resolver::resolve_track(self.catalog.as_ref(), &creds.access_token, &song.search_terms())
                .await?;
        tracing::info!(
            "Resolved track \"{}\" by {} for account {}",
            track.name,
            track.artists_joined(),
            account.id
        );

        let playlist =
            resolver::resolve_playlist(self.catalog.as_ref(), &creds.access_token, playlist_name)
                .await?;
        tracing::info!("Resolved playlist \"{}\" ({})", playlist.name, playlist.id);

        // Both resolutions succeeded; this is the only mutating call.
        self.catalog
            .add_to_playlist(&creds.access_token, &playlist.id, &track.uri)
            .await?;

        tracing::info!(
            "Added \"{}\" to \"{}\" for account {}",
            track.name,
            playlist.name,
            account.id
        );

        Ok(AddConfirmation { track, playlist })
    }
}
