use serde::{Deserialize, Serialize};

/// A song query broken into its parts. Either extracted by the language
/// model or built trivially from the raw query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInfo {
    pub title: String,
    /// Artists in the order they appeared in the source text.
    pub artists: Vec<String>,
}

impl SongInfo {
    /// The identity normalization: the whole raw query as the title.
    pub fn raw(query: &str) -> Self {
        SongInfo {
            title: query.to_string(),
            artists: Vec::new(),
        }
    }

    /// Search text handed to the catalog: title followed by artists.
    pub fn search_terms(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.artists.join(" "))
        }
    }
}

/// Outcome of query normalization. Both carry usable `SongInfo`, but
/// callers and tests can tell a successful extraction from a degrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedQuery {
    /// The language model produced a valid extraction.
    Normalized(SongInfo),
    /// Normalization was skipped or failed; the raw query is used as-is.
    Fallback(SongInfo),
}

impl NormalizedQuery {
    pub fn song(&self) -> &SongInfo {
        match self {
            NormalizedQuery::Normalized(song) | NormalizedQuery::Fallback(song) => song,
        }
    }
}
