use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

use crate::api::ApiClient;
use crate::models::{Credential, DeviceState, TrackQueue};
use crate::FocusError;

/// Pull-based credential callback handed to the SDK. It is asked for a token whenever
/// the device reconnects, so it always reflects the session's current credential.
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync + 'static>;

/// Notifications emitted by the playback SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Ready { device_id: String },
    NotReady { device_id: String },
    /// `None` means the SDK no longer controls playback (moved to another device).
    StateChanged(Option<DeviceState>),
}

impl DeviceEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DeviceEvent::Ready { .. } => "ready",
            DeviceEvent::NotReady { .. } => "not_ready",
            DeviceEvent::StateChanged(_) => "player_state_changed",
        }
    }
}

/// The in-browser playback SDK object, as consumed by this crate.
#[async_trait]
pub trait PlayerSdk: Send + Sync {
    /// Register a listener. Each call yields an independent receiver.
    fn events(&self) -> broadcast::Receiver<DeviceEvent>;
    /// Returns `false` when the SDK declined to connect.
    async fn connect(&self) -> Result<bool, FocusError>;
    async fn disconnect(&self);
    async fn get_current_state(&self) -> Result<Option<DeviceState>, FocusError>;
    async fn pause(&self) -> Result<(), FocusError>;
    async fn resume(&self) -> Result<(), FocusError>;
}

/// Constructs SDK players; mirrors `new Player({ name, getOAuthToken })`.
pub trait PlayerSdkFactory: Send + Sync {
    fn create(&self, name: &str, token: TokenProvider) -> Arc<dyn PlayerSdk>;
}

/// Which branch "toggle to play" took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    /// Device was paused on a loaded track and resumed in place.
    ResumedInPlace,
    /// A track was loaded but not paused; the device's own queue was resumed.
    ResumedQueue,
    /// Nothing loaded; the whole track queue was sent.
    StartedQueue,
}

/// Owned listener registration. Dropping it stops forwarding and releases the
/// SDK receiver.
#[derive(Debug)]
pub struct DeviceSubscription {
    _guard: DropGuard,
    handle: JoinHandle<()>,
}

impl DeviceSubscription {
    fn spawn(
        mut events: broadcast::Receiver<DeviceEvent>,
        forward_to: mpsc::Sender<DeviceEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => {
                        debug!("Device subscription cancelled");
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(DeviceEvent::Ready { device_id }) => {
                            trace!(%device_id, "Repeated ready notification ignored");
                        }
                        Ok(event) => {
                            trace!(event = event.event_type(), "Forwarding device event");
                            if forward_to.send(event).await.is_err() {
                                debug!("Device event consumer gone, stopping subscription");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Device events lagged; older notifications dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Device event stream closed");
                            break;
                        }
                    }
                }
            }
        });
        Self {
            _guard: cancel.drop_guard(),
            handle,
        }
    }

    /// True once the forwarding task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// A connected SDK player bound to the session's credential.
pub struct PlaybackDevice {
    sdk: Arc<dyn PlayerSdk>,
    device_id: String,
    subscription: Option<DeviceSubscription>,
}

impl PlaybackDevice {
    /// Create the player, connect, and wait for its single `ready` notification.
    ///
    /// State changes observed after `ready` are forwarded to `forward_to` for as long as
    /// the returned device lives.
    pub async fn open(
        factory: &dyn PlayerSdkFactory,
        name: &str,
        token: TokenProvider,
        ready_timeout: Duration,
        forward_to: mpsc::Sender<DeviceEvent>,
    ) -> Result<Self, FocusError> {
        let sdk = factory.create(name, token);
        // Listen before connecting so the ready notification cannot slip past.
        let mut events = sdk.events();

        let device_id = match await_ready(sdk.as_ref(), &mut events, name, ready_timeout).await {
            Ok(device_id) => device_id,
            Err(e) => {
                warn!(name, error = %e, "Player failed to become ready, disconnecting");
                sdk.disconnect().await;
                return Err(e);
            }
        };

        info!(%device_id, name, "Playback device ready");
        let subscription = DeviceSubscription::spawn(events, forward_to);
        Ok(Self {
            sdk,
            device_id,
            subscription: Some(subscription),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub async fn current_state(&self) -> Result<Option<DeviceState>, FocusError> {
        self.sdk.get_current_state().await
    }

    pub async fn pause(&self) -> Result<(), FocusError> {
        debug!(device_id = %self.device_id, "Pausing");
        self.sdk.pause().await
    }

    /// Resume through the SDK without touching the queue.
    pub async fn resume_in_place(&self) -> Result<(), FocusError> {
        debug!(device_id = %self.device_id, "Resuming in place");
        self.sdk.resume().await
    }

    /// Replace the device's queue and start from its first track.
    pub async fn play_from_queue(
        &self,
        api: &ApiClient,
        credential: &Credential,
        queue: &TrackQueue,
    ) -> Result<(), FocusError> {
        if queue.is_empty() {
            return Err(FocusError::EmptyQueue);
        }
        api.start_playback(credential, &self.device_id, Some(queue))
            .await
    }

    /// Resume the device's current queue (play command with an empty body).
    pub async fn resume_current(
        &self,
        api: &ApiClient,
        credential: &Credential,
    ) -> Result<(), FocusError> {
        api.start_playback(credential, &self.device_id, None).await
    }

    /// Start or continue playback without restarting the playlist from track one.
    pub async fn toggle_to_play(
        &self,
        api: &ApiClient,
        credential: &Credential,
        queue: &TrackQueue,
    ) -> Result<PlayAction, FocusError> {
        let state = self.current_state().await?;
        match state {
            Some(state) if state.paused && state.has_loaded_track() => {
                self.resume_in_place().await?;
                Ok(PlayAction::ResumedInPlace)
            }
            Some(state) if state.has_loaded_track() => {
                self.resume_current(api, credential).await?;
                Ok(PlayAction::ResumedQueue)
            }
            _ => {
                self.play_from_queue(api, credential, queue).await?;
                Ok(PlayAction::StartedQueue)
            }
        }
    }

    /// Stop listening and disconnect the SDK player.
    pub async fn close(mut self) {
        info!(device_id = %self.device_id, "Closing playback device");
        self.subscription.take();
        self.sdk.disconnect().await;
    }
}

async fn await_ready(
    sdk: &dyn PlayerSdk,
    events: &mut broadcast::Receiver<DeviceEvent>,
    name: &str,
    ready_timeout: Duration,
) -> Result<String, FocusError> {
    if !sdk.connect().await? {
        return Err(FocusError::Device(format!(
            "player '{}' refused to connect",
            name
        )));
    }
    debug!(name, "Player connected, waiting for ready");

    let wait_ready = async {
        loop {
            match events.recv().await {
                Ok(DeviceEvent::Ready { device_id }) => return Ok(device_id),
                Ok(other) => trace!(event = other.event_type(), "Event before ready"),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(FocusError::Device(
                        "player closed before becoming ready".to_string(),
                    ))
                }
            }
        }
    };
    match timeout(ready_timeout, wait_ready).await {
        Ok(result) => result,
        Err(_) => Err(FocusError::Device(format!(
            "player not ready after {:?}",
            ready_timeout
        ))),
    }
}

impl std::fmt::Debug for PlaybackDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackDevice")
            .field("device_id", &self.device_id)
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}
