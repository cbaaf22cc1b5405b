use thiserror::Error;

/// Coarse classification of failures, used by the session's failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The login redirect could not be trusted (forged, replayed or denied).
    StateMismatch,
    /// Any failed authenticated call: network, status or body.
    Api,
    /// The playback SDK refused to connect or to execute a command.
    Device,
}

// Basic error handling with thiserror
#[derive(Error, Debug)]
pub enum FocusError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("URL encoding failed: {0}")]
    UrlEncodingFailed(#[from] serde_urlencoded::ser::Error),

    #[error("Redirect fragment could not be decoded: {0}")]
    FragmentDecodeFailed(#[from] serde_urlencoded::de::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Login state mismatch; the authorization redirect may have been forged or replayed")]
    StateMismatch,

    #[error("Authorization was denied: {0}")]
    AuthorizationDenied(String),

    #[error("Access token rejected (HTTP 401)")]
    Unauthorized,

    #[error("Request to {endpoint} failed with status {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No playlists available in category '{0}'")]
    NoPlaylists(String),

    #[error("Track queue is empty, nothing to play")]
    EmptyQueue,

    #[error("Playback device error: {0}")]
    Device(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Session task is no longer running")]
    SessionClosed,

    #[error("Task panicked or cancelled")]
    TaskJoinError(#[from] tokio::task::JoinError),
}

impl FocusError {
    /// Which bucket of the failure taxonomy this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            FocusError::StateMismatch
            | FocusError::AuthorizationDenied(_)
            | FocusError::FragmentDecodeFailed(_) => ErrorClass::StateMismatch,
            FocusError::Device(_) | FocusError::EmptyQueue => ErrorClass::Device,
            _ => ErrorClass::Api,
        }
    }

    /// True when the provider rejected the credential itself.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FocusError::Unauthorized)
    }
}
