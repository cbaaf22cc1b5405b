use rand::Rng;
use tracing::info;

use crate::api::ApiClient;
use crate::models::{ActivePlaylistPage, Credential, PlaylistCandidate};
use crate::FocusError;

/// A borrowed slice that is known to hold at least one element.
#[derive(Debug)]
pub struct NonEmpty<'a, T>(&'a [T]);

// Manual impls: the derives would demand `T: Copy`.
impl<T> Clone for NonEmpty<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NonEmpty<'_, T> {}

impl<'a, T> NonEmpty<'a, T> {
    pub fn new(items: &'a [T]) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.0
    }
}

/// Uniform pick over `[0, len)`.
pub fn choose_index<T, R: Rng + ?Sized>(candidates: NonEmpty<'_, T>, rng: &mut R) -> usize {
    rng.random_range(0..candidates.len())
}

pub fn choose_random<'a, T, R: Rng + ?Sized>(candidates: NonEmpty<'a, T>, rng: &mut R) -> &'a T {
    &candidates.as_slice()[choose_index(candidates, rng)]
}

/// Fetch the chosen playlist together with its first page of tracks.
pub async fn resolve(
    api: &ApiClient,
    credential: &Credential,
    candidate: &PlaylistCandidate,
) -> Result<ActivePlaylistPage, FocusError> {
    let playlist = api.playlist(credential, &candidate.id).await?;
    let page = ActivePlaylistPage::from_playlist(playlist);
    info!(
        playlist_id = %page.playlist_id,
        name = %page.name,
        tracks = page.items.len(),
        has_next = page.has_next_page(),
        "Resolved playlist"
    );
    Ok(page)
}
