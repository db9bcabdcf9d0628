use crate::error::{AppError, Result};
use crate::models::{PlaylistPage, ResolvedPlaylist, ResolvedTrack};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Tokens issued by the Spotify accounts service. A refresh grant may or
/// may not rotate the refresh token.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// The OAuth token endpoint, split out from the catalog so token refresh
/// stays an explicit step owned by the credential manager.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// The authenticated Spotify Web API surface the pipeline touches.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Single search restricted to tracks, limit 1. `None` when the
    /// result set is empty.
    async fn search_track(&self, access_token: &str, query: &str) -> Result<Option<ResolvedTrack>>;

    /// One page of the current user's playlists.
    async fn playlists_page(
        &self,
        access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PlaylistPage>;

    async fn add_to_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        track_uri: &str,
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: String,
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistItem>,
}

#[derive(Debug, Deserialize)]
struct ArtistItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    id: String,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            client: Client::new(),
        }
    }

    /// The URL a user is sent to for the consent screen.
    pub fn authorize_url(&self, redirect_uri: &str, scopes: &[&str]) -> Result<String> {
        let scope = scopes.join(" ");
        let url = reqwest::Url::parse_with_params(
            &format!("{}/authorize", SPOTIFY_ACCOUNTS_URL),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build authorize URL: {}", e)))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for the initial token grant.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        self.token_request(&params).await
    }

    /// Spotify user id of the token's owner.
    pub async fn current_user_id(&self, access_token: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/me", SPOTIFY_API_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Profile request failed: {}", e)))?;

        let profile: ProfileResponse = Self::read_json(response, "profile").await?;
        Ok(profile.id)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant> {
        let response = self
            .client
            .post(format!("{}/api/token", SPOTIFY_ACCOUNTS_URL))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Token request failed: {}", e)))?;

        let token: TokenResponse = Self::read_json(response, "token").await?;
        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }

    /// Checks the status and decodes the body, surfacing Spotify's error
    /// text when the call was rejected.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Spotify(format!("Failed to read {} response: {}", what, e)))?;

        if !status.is_success() {
            tracing::error!("Spotify {} call returned {}: {}", what, status, body);
            return Err(AppError::Spotify(format!(
                "{} call returned status {}: {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::Spotify(format!("Failed to parse {} response: {}", what, e))
        })
    }
}

#[async_trait]
impl TokenEndpoint for SpotifyClient {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&params).await
    }
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn search_track(&self, access_token: &str, query: &str) -> Result<Option<ResolvedTrack>> {
        tracing::debug!("Searching Spotify catalog for: {}", query);

        let response = self
            .client
            .get(format!("{}/search", SPOTIFY_API_URL))
            .bearer_auth(access_token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Search request failed: {}", e)))?;

        let data: SearchResponse = Self::read_json(response, "search").await?;

        let track = data
            .tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|item| ResolvedTrack {
                id: item.id,
                uri: item.uri,
                name: item.name,
                artist_names: item.artists.into_iter().map(|a| a.name).collect(),
            });

        Ok(track)
    }

    async fn playlists_page(
        &self,
        access_token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<PlaylistPage> {
        let response = self
            .client
            .get(format!("{}/me/playlists", SPOTIFY_API_URL))
            .bearer_auth(access_token)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Playlist listing failed: {}", e)))?;

        let data: PlaylistListResponse = Self::read_json(response, "playlist listing").await?;

        Ok(PlaylistPage {
            items: data
                .items
                .into_iter()
                .map(|item| ResolvedPlaylist {
                    id: item.id,
                    name: item.name,
                })
                .collect(),
            has_next: data.next.is_some(),
        })
    }

    async fn add_to_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        track_uri: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/playlists/{}/tracks", SPOTIFY_API_URL, playlist_id))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": [track_uri] }))
            .send()
            .await
            .map_err(|e| AppError::Spotify(format!("Add-to-playlist request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Add-to-playlist returned {}: {}", status, body);
            return Err(AppError::Spotify(format!(
                "add call returned status {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
