pub mod account;
pub mod song;
pub mod track;

pub use account::{Account, CredentialSet};
pub use song::{NormalizedQuery, SongInfo};
pub use track::{PlaylistPage, ResolvedPlaylist, ResolvedTrack};
