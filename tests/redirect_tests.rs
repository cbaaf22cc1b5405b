use pomodoro_focus_rs::{authorize_url, parse_redirect, FocusError, Settings};

const STATE: &str = "Zq3kVb8Tn2mXcP0aLw7yRd5sHf1gJu9eKo4iNt6B";

#[test]
fn test_matching_state_yields_credential() {
    let fragment = format!(
        "#access_token=BQDtoken&token_type=Bearer&expires_in=3600&state={}",
        STATE
    );
    let credential = parse_redirect(&fragment, STATE).unwrap().unwrap();
    assert_eq!(credential.as_str(), "BQDtoken");

    // The leading '#' is optional
    let fragment = format!("access_token=BQDtoken&state={}", STATE);
    assert!(parse_redirect(&fragment, STATE).unwrap().is_some());
}

#[test]
fn test_mismatched_state_rejected() {
    let fragment = "#access_token=BQDtoken&token_type=Bearer&state=forged";
    let result = parse_redirect(fragment, STATE);
    assert!(matches!(result, Err(FocusError::StateMismatch)));

    // Missing state counts as a mismatch
    let result = parse_redirect("#access_token=BQDtoken", STATE);
    assert!(matches!(result, Err(FocusError::StateMismatch)));
}

#[test]
fn test_no_credential_yet() {
    assert!(parse_redirect("", STATE).unwrap().is_none());
    assert!(parse_redirect("#", STATE).unwrap().is_none());
    assert!(parse_redirect("#foo=bar", STATE).unwrap().is_none());
}

#[test]
fn test_denied_authorization() {
    let fragment = format!("#error=access_denied&state={}", STATE);
    match parse_redirect(&fragment, STATE) {
        Err(FocusError::AuthorizationDenied(reason)) => assert_eq!(reason, "access_denied"),
        other => panic!("unexpected result: {:?}", other),
    }

    let result = parse_redirect("#error=access_denied&state=other", STATE);
    assert!(matches!(result, Err(FocusError::StateMismatch)));
}

#[test]
fn test_empty_access_token() {
    let fragment = format!("#access_token=&state={}", STATE);
    let result = parse_redirect(&fragment, STATE);
    assert!(matches!(result, Err(FocusError::InvalidResponse(_))));
}

#[test]
fn test_authorize_url() {
    let settings = Settings::default();
    let url = authorize_url(&settings, STATE).unwrap();

    assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
    assert!(url.contains("client_id=637350d3910a4c31a0f06caa6c31366a"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000"));
    assert!(url.contains(
        "scope=streaming+user-read-email+user-read-private+user-modify-playback-state"
    ));
    assert!(url.contains("response_type=token"));
    assert!(url.ends_with(&format!("state={}", STATE)));
}
