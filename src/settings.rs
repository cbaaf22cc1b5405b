use once_cell::sync::Lazy;
use std::{env, time::Duration};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Holds all tunables, read-once from ENV with fallbacks.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub authorize_url: String,
    pub api_base: String,
    pub playlist_category: String,
    pub player_name: String,
    pub interval: Duration,
    pub state_token_length: usize,
    pub request_timeout: Duration,
    pub device_ready_timeout: Duration,
    pub intent_grace: Duration,
    pub event_buffer_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            client_id: "637350d3910a4c31a0f06caa6c31366a".to_string(),
            redirect_uri: "http://localhost:3000".to_string(),
            scopes: "streaming user-read-email user-read-private user-modify-playback-state"
                .to_string(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            api_base: "https://api.spotify.com/v1/".to_string(),
            playlist_category: "focus".to_string(),
            player_name: "Pomodoro Focus Player".to_string(),
            interval: Duration::from_secs(1500),
            state_token_length: 40,
            request_timeout: Duration::from_secs(10),
            device_ready_timeout: Duration::from_secs(15),
            intent_grace: Duration::from_millis(2000),
            event_buffer_capacity: 100,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        // optionally load .env
        let _ = dotenvy::dotenv();

        let defaults = Settings::default();

        fn parse_string(var: &str, default: String) -> String {
            env::var(var).ok().filter(|v| !v.is_empty()).unwrap_or(default)
        }

        // helper to parse usize
        fn parse_usize(var: &str, default: usize) -> usize {
            env::var(var)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        // helper to parse seconds into Duration
        fn parse_secs(var: &str, default: Duration) -> Duration {
            env::var(var)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        }

        // helper to parse millis into Duration
        fn parse_millis(var: &str, default: Duration) -> Duration {
            env::var(var)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        }

        Settings {
            client_id: parse_string("FOCUS_CLIENT_ID", defaults.client_id),
            redirect_uri: parse_string("FOCUS_REDIRECT_URI", defaults.redirect_uri),
            scopes: parse_string("FOCUS_SCOPES", defaults.scopes),
            authorize_url: parse_string("FOCUS_AUTHORIZE_URL", defaults.authorize_url),
            api_base: parse_string("FOCUS_API_BASE", defaults.api_base),
            playlist_category: parse_string("FOCUS_PLAYLIST_CATEGORY", defaults.playlist_category),
            player_name: parse_string("FOCUS_PLAYER_NAME", defaults.player_name),
            interval: parse_secs("FOCUS_INTERVAL_SECS", defaults.interval).max(MIN_INTERVAL),
            state_token_length: parse_usize("STATE_TOKEN_LENGTH", defaults.state_token_length)
                .max(1),
            request_timeout: parse_secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            device_ready_timeout: parse_secs(
                "DEVICE_READY_TIMEOUT_SECS",
                defaults.device_ready_timeout,
            ),
            intent_grace: parse_millis("INTENT_GRACE_MS", defaults.intent_grace),
            event_buffer_capacity: parse_usize(
                "EVENT_BUFFER_CAPACITY",
                defaults.event_buffer_capacity,
            )
            .max(1),
        }
    }

    /// Length of one work interval in whole seconds, never below one.
    pub fn interval_secs(&self) -> u32 {
        u32::try_from(self.interval.as_secs())
            .unwrap_or(u32::MAX)
            .max(1)
    }
}

/// Global settings instance
pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);
