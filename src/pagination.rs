use rand::Rng;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::models::{ActivePlaylistPage, Credential, PlaylistCandidate, TrackQueue};
use crate::selector::{self, NonEmpty};
use crate::FocusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    NoPlaylist,
    PlaylistLoaded,
    FetchingNextPage,
    SelectingNew,
}

impl CursorState {
    pub fn as_str(self) -> &'static str {
        match self {
            CursorState::NoPlaylist => "NO_PLAYLIST",
            CursorState::PlaylistLoaded => "PLAYLIST_LOADED",
            CursorState::FetchingNextPage => "FETCHING_NEXT_PAGE",
            CursorState::SelectingNew => "SELECTING_NEW",
        }
    }
}

/// How a requeue was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Next page of the same playlist.
    NextPage,
    /// Playlist exhausted; a new random candidate replaced it.
    NewPlaylist,
}

/// Tracks the loaded playlist page and refills the queue when the device runs dry.
#[derive(Debug)]
pub struct PlaylistCursor {
    category: String,
    state: CursorState,
    candidates: Vec<PlaylistCandidate>,
    page: Option<ActivePlaylistPage>,
    queue: TrackQueue,
}

impl PlaylistCursor {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            state: CursorState::NoPlaylist,
            candidates: Vec::new(),
            page: None,
            queue: TrackQueue::default(),
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn page(&self) -> Option<&ActivePlaylistPage> {
        self.page.as_ref()
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub fn candidates(&self) -> &[PlaylistCandidate] {
        &self.candidates
    }

    pub fn set_candidates(&mut self, candidates: Vec<PlaylistCandidate>) {
        debug!(count = candidates.len(), "Candidate playlists stored");
        self.candidates = candidates;
    }

    /// Forget everything; used when the session is torn down.
    pub fn clear(&mut self) {
        self.state = CursorState::NoPlaylist;
        self.candidates.clear();
        self.page = None;
        self.queue = TrackQueue::default();
    }

    fn replace_page(&mut self, page: ActivePlaylistPage) {
        self.queue = page.track_queue();
        debug!(
            playlist_id = %page.playlist_id,
            tracks = self.queue.len(),
            "Track queue recomputed"
        );
        self.page = Some(page);
        self.state = CursorState::PlaylistLoaded;
    }

    /// Pick a random candidate and load its first page, replacing the current playlist.
    pub async fn select_new<R: Rng + ?Sized>(
        &mut self,
        api: &ApiClient,
        credential: &Credential,
        rng: &mut R,
    ) -> Result<&ActivePlaylistPage, FocusError> {
        let candidate = match NonEmpty::new(&self.candidates) {
            Some(candidates) => selector::choose_random(candidates, rng).clone(),
            None => return Err(FocusError::NoPlaylists(self.category.clone())),
        };
        info!(playlist_id = %candidate.id, name = %candidate.name, "Selected playlist");

        let previous = self.state;
        self.state = CursorState::SelectingNew;
        match selector::resolve(api, credential, &candidate).await {
            Ok(page) => {
                self.replace_page(page);
                self.page
                    .as_ref()
                    .ok_or_else(|| FocusError::InvalidResponse("Playlist page missing".into()))
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// React to the device reporting an empty upcoming-track buffer.
    ///
    /// Returns `Ok(None)` when no playlist is loaded or a refill is already running.
    pub async fn on_buffer_empty<R: Rng + ?Sized>(
        &mut self,
        api: &ApiClient,
        credential: &Credential,
        rng: &mut R,
    ) -> Result<Option<Requeue>, FocusError> {
        if self.state != CursorState::PlaylistLoaded {
            debug!(state = self.state.as_str(), "Buffer-empty ignored");
            return Ok(None);
        }
        let Some(current) = self.page.as_ref() else {
            return Ok(None);
        };

        match current.next.clone() {
            Some(locator) => {
                debug!(%locator, "Fetching next page of current playlist");
                self.state = CursorState::FetchingNextPage;
                match api.playlist_tracks_page(credential, &locator).await {
                    Ok(paging) => {
                        let next_page = current_page_or_err(&self.page)?.with_next_page(paging);
                        self.replace_page(next_page);
                        Ok(Some(Requeue::NextPage))
                    }
                    Err(e) => {
                        self.state = CursorState::PlaylistLoaded;
                        Err(e)
                    }
                }
            }
            None => {
                debug!("Playlist exhausted, selecting a new one");
                self.select_new(api, credential, rng).await?;
                Ok(Some(Requeue::NewPlaylist))
            }
        }
    }
}

fn current_page_or_err(page: &Option<ActivePlaylistPage>) -> Result<&ActivePlaylistPage, FocusError> {
    page.as_ref()
        .ok_or_else(|| FocusError::InvalidResponse("Playlist page missing".into()))
}
