use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential handed back by the identity provider.
///
/// Only ever held in memory; `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// Response types for API calls
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

impl UserProfile {
    /// Name to greet the user with; falls back to the account id.
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Provider paging envelope. `next` is an absolute URI or null once exhausted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaylistCandidate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryPlaylists {
    pub playlists: Paging<Option<PlaylistCandidate>>,
}

impl CategoryPlaylists {
    /// Drops the null entries the provider sometimes returns for unavailable lists.
    pub fn into_candidates(self) -> Vec<PlaylistCandidate> {
        self.playlists.items.into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackObject {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
    pub tracks: Paging<PlaylistItem>,
}

/// The currently loaded page of the chosen playlist. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePlaylistPage {
    pub playlist_id: String,
    pub name: String,
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

impl ActivePlaylistPage {
    pub fn from_playlist(playlist: Playlist) -> Self {
        Self {
            playlist_id: playlist.id,
            name: playlist.name,
            items: playlist.tracks.items,
            next: playlist.tracks.next,
        }
    }

    /// Build the following page of the same playlist.
    pub fn with_next_page(&self, page: Paging<PlaylistItem>) -> Self {
        Self {
            playlist_id: self.playlist_id.clone(),
            name: self.name.clone(),
            items: page.items,
            next: page.next,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next.is_some()
    }

    pub fn track_queue(&self) -> TrackQueue {
        TrackQueue::from_page(self)
    }
}

/// Ordered, playable track URIs derived from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackQueue(Vec<String>);

impl TrackQueue {
    /// Removed tracks and local files are skipped; neither can be queued remotely.
    pub fn from_page(page: &ActivePlaylistPage) -> Self {
        Self(
            page.items
                .iter()
                .filter_map(|item| item.track.as_ref())
                .filter(|track| !track.is_local && !track.uri.is_empty())
                .map(|track| track.uri.clone())
                .collect(),
        )
    }

    pub fn uris(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body of the start-playback command.
#[derive(Debug, Serialize)]
pub(crate) struct PlayRequest<'a> {
    pub(crate) uris: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    pub uri: String,
    pub name: String,
}

impl TrackRef {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
        }
    }
}

/// Player state as reported by the playback SDK.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceState {
    pub paused: bool,
    pub current_track: Option<TrackRef>,
    pub next_tracks: Vec<TrackRef>,
    pub position_ms: u64,
}

impl DeviceState {
    pub fn has_loaded_track(&self) -> bool {
        self.current_track.is_some()
    }

    /// The device is on its last queued track.
    pub fn buffer_empty(&self) -> bool {
        self.current_track.is_some() && self.next_tracks.is_empty()
    }
}
