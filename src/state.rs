/// Where the session is in its login-to-playback pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    /// Anti-forgery token exists; waiting for the login redirect.
    TokenObtained,
    CredentialObtained,
    IdentityFetched,
    PlaylistsFetched,
    /// Playlist loaded and device ready; playback not started yet.
    PlaylistActive,
    Playing,
    Paused,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Unauthenticated => "UNAUTHENTICATED",
            SessionPhase::TokenObtained => "TOKEN_OBTAINED",
            SessionPhase::CredentialObtained => "CREDENTIAL_OBTAINED",
            SessionPhase::IdentityFetched => "IDENTITY_FETCHED",
            SessionPhase::PlaylistsFetched => "PLAYLISTS_FETCHED",
            SessionPhase::PlaylistActive => "PLAYLIST_ACTIVE",
            SessionPhase::Playing => "PLAYING",
            SessionPhase::Paused => "PAUSED",
        }
    }

    /// Playlist and device are both present, so the player controls can be shown.
    pub fn is_ready(self) -> bool {
        matches!(
            self,
            SessionPhase::PlaylistActive | SessionPhase::Playing | SessionPhase::Paused
        )
    }

    /// A credential is held in this phase.
    pub fn is_authenticated(self) -> bool {
        !matches!(
            self,
            SessionPhase::Unauthenticated | SessionPhase::TokenObtained
        )
    }
}
