use crate::error::{AppError, Result};
use crate::models::{ResolvedPlaylist, ResolvedTrack};
use crate::services::spotify::Catalog;

pub const PLAYLIST_PAGE_SIZE: u32 = 50;

/// Single catalog search, first result wins. No retry: a transient search
/// failure propagates to the caller.
pub async fn resolve_track(
    catalog: &dyn Catalog,
    access_token: &str,
    query: &str,
) -> Result<ResolvedTrack> {
    catalog
        .search_track(access_token, query)
        .await?
        .ok_or_else(|| AppError::TrackNotFound(query.to_string()))
}

/// Walk the user's playlists page by page until a case-insensitive exact
/// name match turns up. First match in listing order wins; the loop stops
/// when the listing reports no further page.
pub async fn resolve_playlist(
    catalog: &dyn Catalog,
    access_token: &str,
    name: &str,
) -> Result<ResolvedPlaylist> {
    let target = name.to_lowercase();
    let mut offset = 0;

    loop {
        let page = catalog
            .playlists_page(access_token, PLAYLIST_PAGE_SIZE, offset)
            .await?;

        if let Some(playlist) = page
            .items
            .into_iter()
            .find(|p| p.name.to_lowercase() == target)
        {
            return Ok(playlist);
        }

        if !page.has_next {
            return Err(AppError::PlaylistNotFound(name.to_string()));
        }
        offset += PLAYLIST_PAGE_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaylistPage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves canned playlist pages and records the offsets requested.
    struct PagedCatalog {
        pages: Vec<Vec<&'static str>>,
        offsets_seen: Mutex<Vec<u32>>,
        track: Option<ResolvedTrack>,
    }

    impl PagedCatalog {
        fn with_pages(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                offsets_seen: Mutex::new(Vec::new()),
                track: None,
            }
        }
    }

    #[async_trait]
    impl Catalog for PagedCatalog {
        async fn search_track(
            &self,
            _access_token: &str,
            _query: &str,
        ) -> Result<Option<ResolvedTrack>> {
            Ok(self.track.clone())
        }

        async fn playlists_page(
            &self,
            _access_token: &str,
            limit: u32,
            offset: u32,
        ) -> Result<PlaylistPage> {
            self.offsets_seen.lock().unwrap().push(offset);
            let index = (offset / limit) as usize;
            let names = self.pages.get(index).cloned().unwrap_or_default();
            Ok(PlaylistPage {
                items: names
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| ResolvedPlaylist {
                        id: format!("pl-{}-{}", index, i),
                        name: name.to_string(),
                    })
                    .collect(),
                has_next: index + 1 < self.pages.len(),
            })
        }

        async fn add_to_playlist(
            &self,
            _access_token: &str,
            _playlist_id: &str,
            _track_uri: &str,
        ) -> Result<()> {
            panic!("resolver must not add");
        }
    }

    #[tokio::test]
    async fn matches_case_insensitively_across_pages_and_stops() {
        let catalog = PagedCatalog::with_pages(vec![
            vec!["Road Trip", "Chill"],
            vec!["WORKOUT"],
            vec!["Never Reached"],
        ]);

        let playlist = resolve_playlist(&catalog, "tok", "workout").await.unwrap();

        assert_eq!(playlist.name, "WORKOUT");
        // Stopped on the page that matched, offsets strictly in page order.
        assert_eq!(
            *catalog.offsets_seen.lock().unwrap(),
            vec![0, PLAYLIST_PAGE_SIZE]
        );
    }

    #[tokio::test]
    async fn exhausted_pages_mean_not_found() {
        let catalog = PagedCatalog::with_pages(vec![vec!["Road Trip"], vec!["Chill"]]);

        let err = resolve_playlist(&catalog, "tok", "Workout")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PlaylistNotFound(name) if name == "Workout"));
        assert_eq!(catalog.offsets_seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn first_match_in_listing_order_wins() {
        let catalog = PagedCatalog::with_pages(vec![vec!["Mix", "mix"]]);

        let playlist = resolve_playlist(&catalog, "tok", "MIX").await.unwrap();
        assert_eq!(playlist.id, "pl-0-0");
    }

    #[tokio::test]
    async fn empty_search_result_is_track_not_found() {
        let catalog = PagedCatalog::with_pages(vec![]);

        let err = resolve_track(&catalog, "tok", "obscure song")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TrackNotFound(q) if q == "obscure song"));
    }

    #[tokio::test]
    async fn first_search_result_is_returned_unfiltered() {
        let mut catalog = PagedCatalog::with_pages(vec![]);
        catalog.track = Some(ResolvedTrack {
            id: "t1".into(),
            uri: "spotify:track:t1".into(),
            name: "Lunar Drift".into(),
            artist_names: vec!["Echo Prime".into()],
        });

        let track = resolve_track(&catalog, "tok", "lunar drift").await.unwrap();
        assert_eq!(track.id, "t1");
    }
}
