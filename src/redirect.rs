//! Login round-trip for the browser-only implicit grant: build the authorize URL
//! carrying the anti-forgery token, then validate what comes back in the fragment.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::Credential;
use crate::settings::Settings;
use crate::FocusError;

#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    access_token: Option<String>,
    state: Option<String>,
    error: Option<String>,
    token_type: Option<String>,
    expires_in: Option<String>,
}

/// Parse the redirect fragment (with or without the leading `#`).
///
/// `Ok(None)` means the user has not logged in yet. A credential is only returned when
/// the echoed `state` equals `expected_token`.
pub fn parse_redirect(
    fragment: &str,
    expected_token: &str,
) -> Result<Option<Credential>, FocusError> {
    let fragment = fragment.trim().trim_start_matches('#');
    if fragment.is_empty() {
        return Ok(None);
    }

    let params: RedirectParams = serde_urlencoded::from_str(fragment)?;
    let state_matches = params.state.as_deref() == Some(expected_token);

    let Some(access_token) = params.access_token else {
        return match params.error {
            Some(_) if !state_matches => {
                warn!("Authorization error echoed with a foreign state value");
                Err(FocusError::StateMismatch)
            }
            Some(reason) => Err(FocusError::AuthorizationDenied(reason)),
            None => Ok(None),
        };
    };

    if !state_matches {
        warn!("Redirect state does not match the stored token; rejecting credential");
        return Err(FocusError::StateMismatch);
    }
    if access_token.is_empty() {
        return Err(FocusError::InvalidResponse(
            "Redirect carried an empty access_token".to_string(),
        ));
    }

    debug!(
        token_type = params.token_type.as_deref().unwrap_or("<none>"),
        expires_in = params.expires_in.as_deref().unwrap_or("<none>"),
        "Accepted credential from redirect"
    );
    Ok(Some(Credential::new(access_token)))
}

/// Authorize URL the login prompt links to, with `state` set to the anti-forgery token.
pub fn authorize_url(settings: &Settings, state: &str) -> Result<String, FocusError> {
    let query = serde_urlencoded::to_string([
        ("client_id", settings.client_id.as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
        ("scope", settings.scopes.as_str()),
        ("response_type", "token"),
        ("state", state),
    ])?;
    Ok(format!("{}?{}", settings.authorize_url, query))
}
