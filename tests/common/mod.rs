#![allow(dead_code)]

use async_trait::async_trait;
use pomodoro_focus_rs::{
    DeviceEvent, DeviceState, FocusError, PlayerSdk, PlayerSdkFactory, Settings, TokenProvider,
    TrackRef,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-access-token";
pub const DEVICE_ID: &str = "device-123";

/// Settings pointed at a mock server, with short timeouts.
pub fn settings_for(server: &MockServer) -> Settings {
    Settings {
        api_base: format!("{}/v1/", server.uri()),
        device_ready_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        intent_grace: Duration::ZERO,
        ..Settings::default()
    }
}

pub fn track_items(uris: &[&str]) -> Value {
    Value::Array(
        uris.iter()
            .map(|uri| json!({ "track": { "uri": uri, "name": format!("Track {}", uri), "is_local": false } }))
            .collect(),
    )
}

pub fn playlist_json(id: &str, name: &str, uris: &[&str], next: Option<String>) -> Value {
    json!({
        "id": id,
        "name": name,
        "uri": format!("spotify:playlist:{}", id),
        "tracks": {
            "items": track_items(uris),
            "next": next,
            "total": uris.len(),
        }
    })
}

pub fn tracks_page_json(uris: &[&str], next: Option<String>) -> Value {
    json!({ "items": track_items(uris), "next": next })
}

pub async fn mount_identity(server: &MockServer, display_name: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "display_name": display_name,
            "email": "user@example.com",
            "product": "premium"
        })))
        .mount(server)
        .await;
}

pub async fn mount_category(server: &MockServer, ids: &[&str]) {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "name": format!("Focus {}", id) }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v1/browse/categories/focus/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "playlists": { "items": items, "next": null }
        })))
        .mount(server)
        .await;
}

pub async fn mount_playlist(server: &MockServer, id: &str, uris: &[&str], next: Option<String>) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/playlists/{}", id).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(playlist_json(id, &format!("Playlist {}", id), uris, next)),
        )
        .mount(server)
        .await;
}

pub async fn mount_play(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/play"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// PUT play requests received so far, as `(device_id query, body bytes)`.
pub async fn play_requests(server: &MockServer) -> Vec<(Option<String>, Vec<u8>)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.to_string() == "PUT" && r.url.path() == "/v1/me/player/play")
        .map(|r| {
            let device = r
                .url
                .query_pairs()
                .find(|(k, _)| k == "device_id")
                .map(|(_, v)| v.into_owned());
            (device, r.body)
        })
        .collect()
}

pub fn body_uris(body: &[u8]) -> Vec<String> {
    let value: Value = serde_json::from_slice(body).expect("play body is json");
    value["uris"]
        .as_array()
        .expect("uris array")
        .iter()
        .map(|v| v.as_str().expect("uri string").to_string())
        .collect()
}

pub fn playing_state(current: &str, next: &[&str]) -> DeviceState {
    DeviceState {
        paused: false,
        current_track: Some(TrackRef::new(current, current)),
        next_tracks: next.iter().map(|u| TrackRef::new(*u, *u)).collect(),
        position_ms: 0,
    }
}

/// Scripted stand-in for the in-browser playback SDK.
pub struct MockSdk {
    pub name: String,
    token: TokenProvider,
    events: broadcast::Sender<DeviceEvent>,
    device_id: String,
    connect_ok: bool,
    emit_ready: bool,
    state: Mutex<Option<DeviceState>>,
    calls: Mutex<Vec<String>>,
}

impl MockSdk {
    pub fn emit(&self, event: DeviceEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_state(&self, state: Option<DeviceState>) {
        *self.state.lock().unwrap() = state;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pulled_token(&self) -> Option<String> {
        (self.token)()
    }

    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl PlayerSdk for MockSdk {
    fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    async fn connect(&self) -> Result<bool, FocusError> {
        self.record("connect");
        if self.connect_ok && self.emit_ready {
            self.emit(DeviceEvent::Ready {
                device_id: self.device_id.clone(),
            });
        }
        Ok(self.connect_ok)
    }

    async fn disconnect(&self) {
        self.record("disconnect");
    }

    async fn get_current_state(&self) -> Result<Option<DeviceState>, FocusError> {
        self.record("get_current_state");
        Ok(self.state.lock().unwrap().clone())
    }

    async fn pause(&self) -> Result<(), FocusError> {
        self.record("pause");
        if let Some(state) = self.state.lock().unwrap().as_mut() {
            state.paused = true;
        }
        Ok(())
    }

    async fn resume(&self) -> Result<(), FocusError> {
        self.record("resume");
        if let Some(state) = self.state.lock().unwrap().as_mut() {
            state.paused = false;
        }
        Ok(())
    }
}

pub struct MockFactory {
    pub connect_ok: bool,
    pub emit_ready: bool,
    pub initial_state: Option<DeviceState>,
    pub created: Mutex<Vec<Arc<MockSdk>>>,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self {
            connect_ok: true,
            emit_ready: true,
            initial_state: None,
            created: Mutex::new(Vec::new()),
        }
    }
}

impl MockFactory {
    pub fn with_state(state: DeviceState) -> Self {
        Self {
            initial_state: Some(state),
            ..Self::default()
        }
    }

    pub fn last(&self) -> Arc<MockSdk> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no player created")
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl PlayerSdkFactory for MockFactory {
    fn create(&self, name: &str, token: TokenProvider) -> Arc<dyn PlayerSdk> {
        let (events, _) = broadcast::channel(64);
        let sdk = Arc::new(MockSdk {
            name: name.to_string(),
            token,
            events,
            device_id: DEVICE_ID.to_string(),
            connect_ok: self.connect_ok,
            emit_ready: self.emit_ready,
            state: Mutex::new(self.initial_state.clone()),
            calls: Mutex::new(Vec::new()),
        });
        self.created.lock().unwrap().push(sdk.clone());
        sdk
    }
}
