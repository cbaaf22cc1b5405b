use reqwest::{header, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

use crate::models::{
    CategoryPlaylists, Credential, Paging, PlayRequest, Playlist, PlaylistCandidate,
    PlaylistItem, TrackQueue, UserProfile,
};
use crate::FocusError;

/// Thin authenticated wrapper around the provider's Web API.
///
/// Relative endpoints resolve against the configured base; absolute URIs (such as the
/// provider's own `next` links) are used verbatim. No retries happen here.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(api_base: &str, request_timeout: Duration) -> Result<Self, FocusError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()?;
        Self::with_client(api_base, http)
    }

    /// Reuse an existing reqwest client (shared pool, custom proxy, ...).
    pub fn with_client(api_base: &str, http: Client) -> Result<Self, FocusError> {
        let normalized = if api_base.ends_with('/') {
            api_base.to_string()
        } else {
            format!("{}/", api_base)
        };
        let base = Url::parse(&normalized)
            .map_err(|e| FocusError::InvalidUrl(format!("{}: {}", api_base, e)))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute URIs pass through unchanged; everything else is joined onto the base.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, FocusError> {
        let result = if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
            Url::parse(endpoint)
        } else {
            self.base.join(endpoint.trim_start_matches('/'))
        };
        result.map_err(|e| FocusError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }

    /// Authenticated GET returning the raw JSON document.
    pub async fn call(
        &self,
        credential: &Credential,
        endpoint: &str,
    ) -> Result<serde_json::Value, FocusError> {
        self.get_json(credential, endpoint).await
    }

    /// Authenticated GET decoded into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        endpoint: &str,
    ) -> Result<T, FocusError> {
        let url = self.resolve(endpoint)?;
        trace!(%url, "GET");
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(credential.as_str())
            .send()
            .await?;
        let response = check_status(url.as_str(), response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            error!(%url, error = %e, "Malformed response body");
            FocusError::ParseFailed(e)
        })
    }

    pub async fn current_user(&self, credential: &Credential) -> Result<UserProfile, FocusError> {
        self.get_json(credential, "me").await
    }

    pub async fn category_playlists(
        &self,
        credential: &Credential,
        category: &str,
    ) -> Result<Vec<PlaylistCandidate>, FocusError> {
        let endpoint = format!("browse/categories/{}/playlists", category);
        let listing: CategoryPlaylists = self.get_json(credential, &endpoint).await?;
        Ok(listing.into_candidates())
    }

    /// Full playlist object, including the first page of tracks.
    pub async fn playlist(
        &self,
        credential: &Credential,
        playlist_id: &str,
    ) -> Result<Playlist, FocusError> {
        self.get_json(credential, &format!("playlists/{}", playlist_id))
            .await
    }

    /// Follow a provider-issued `next` locator for a playlist's tracks.
    pub async fn playlist_tracks_page(
        &self,
        credential: &Credential,
        locator: &str,
    ) -> Result<Paging<PlaylistItem>, FocusError> {
        self.get_json(credential, locator).await
    }

    /// `PUT me/player/play?device_id=...`. With `queue` the device's queue is replaced;
    /// without it the body is empty and the device resumes its current queue.
    pub async fn start_playback(
        &self,
        credential: &Credential,
        device_id: &str,
        queue: Option<&TrackQueue>,
    ) -> Result<(), FocusError> {
        let mut url = self.resolve("me/player/play")?;
        url.query_pairs_mut().append_pair("device_id", device_id);

        let request = self
            .http
            .put(url.clone())
            .bearer_auth(credential.as_str());
        let request = match queue {
            Some(queue) => {
                debug!(device_id, tracks = queue.len(), "Starting playback from queue");
                request.json(&PlayRequest {
                    uris: queue.uris(),
                })
            }
            None => {
                debug!(device_id, "Resuming current queue");
                // The endpoint answers 411 when a PUT carries no length at all.
                request.header(header::CONTENT_LENGTH, "0")
            }
        };

        let response = request.send().await?;
        check_status(url.as_str(), response).await?;
        Ok(())
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, FocusError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        warn!(endpoint, "Access token rejected (401)");
        return Err(FocusError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    error!(endpoint, %status, body = %body, "Request failed");
    Err(FocusError::ApiStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
