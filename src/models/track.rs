use serde::Serialize;

/// A concrete track picked from the catalog search. Ephemeral; lives for
/// one request and is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTrack {
    pub id: String,
    /// Spotify track URI, e.g. `spotify:track:...`. This is what the
    /// add-to-playlist endpoint takes.
    pub uri: String,
    pub name: String,
    pub artist_names: Vec<String>,
}

impl ResolvedTrack {
    pub fn artists_joined(&self) -> String {
        self.artist_names.join(", ")
    }
}

/// A playlist owned by the requesting account, matched by name.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlaylist {
    pub id: String,
    pub name: String,
}

/// One page of the current user's playlists.
#[derive(Debug, Clone)]
pub struct PlaylistPage {
    pub items: Vec<ResolvedPlaylist>,
    /// Whether the listing endpoint reports a further page.
    pub has_next: bool,
}
