//! trackdrop adds songs to Spotify playlists from a single HTTP request.
//!
//! A user links their Spotify account once and receives an opaque API key.
//! `GET /add?token=...&query=...&playlist=...` then resolves the free-text
//! query to a track (optionally cleaning it up with a Gemini call first)
//! and appends it to the named playlist.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
