use futures::future::OptionFuture;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::commands::SessionCommand;
use crate::device::{DeviceEvent, PlayAction, PlaybackDevice, PlayerSdkFactory, TokenProvider};
use crate::events::SessionEvent;
use crate::models::{Credential, DeviceState, UserProfile};
use crate::pagination::PlaylistCursor;
use crate::redirect;
use crate::settings::Settings;
use crate::state::SessionPhase;
use crate::state_token::StateTokenManager;
use crate::store::{KeyValueStore, COUNT_KEY};
use crate::timer::{CountdownTimer, TimerSignal};
use crate::view::{break_minutes, SessionView};
use crate::FocusError;

/// Sequential coordinator owning every piece of cross-component state.
///
/// Each mutable slot has exactly one writer: the methods below, called one at a time
/// (directly, or from [`run`](Self::run)). Any failure of the authenticated pipeline
/// goes through [`fail_closed`](Self::fail_closed).
pub struct FocusSession {
    session_id: Uuid,
    settings: Settings,
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    tokens: StateTokenManager,
    sdk_factory: Arc<dyn PlayerSdkFactory>,
    rng: StdRng,
    phase: SessionPhase,
    credential_tx: watch::Sender<Option<Credential>>,
    user: Option<UserProfile>,
    cursor: PlaylistCursor,
    device: Option<PlaybackDevice>,
    device_rx: Option<mpsc::Receiver<DeviceEvent>>,
    is_playing: bool,
    last_intent: Option<Instant>,
    // Track whose empty buffer already triggered a requeue.
    exhausted_track: Option<String>,
    // Queue was replaced while paused; the next play must start it fresh.
    queue_stale: bool,
    // Queue was replaced while this track plays; start it once the track ends.
    pending_restart: Option<String>,
    timer: CountdownTimer,
    completed: u32,
    just_completed: bool,
    error: Option<String>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl FocusSession {
    pub fn new(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        sdk_factory: Arc<dyn PlayerSdkFactory>,
    ) -> Result<Self, FocusError> {
        let api = ApiClient::new(&settings.api_base, settings.request_timeout)?;
        let completed = store
            .get(COUNT_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let (credential_tx, _) = watch::channel(None);
        let (event_tx, _) = broadcast::channel(settings.event_buffer_capacity.max(1));
        let session_id = Uuid::new_v4();
        debug!(%session_id, completed, "Focus session created");

        Ok(Self {
            session_id,
            tokens: StateTokenManager::new(store.clone(), settings.state_token_length),
            cursor: PlaylistCursor::new(settings.playlist_category.clone()),
            timer: CountdownTimer::new(settings.interval_secs()),
            api,
            store,
            sdk_factory,
            rng: StdRng::from_os_rng(),
            phase: SessionPhase::Unauthenticated,
            credential_tx,
            user: None,
            device: None,
            device_rx: None,
            is_playing: false,
            last_intent: None,
            exhausted_track: None,
            queue_stale: false,
            pending_restart: None,
            completed,
            just_completed: false,
            error: None,
            event_tx,
            settings,
        })
    }

    /// Replace the playlist-selection randomness, e.g. with a seeded generator.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential_tx.borrow().clone()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn cursor(&self) -> &PlaylistCursor {
        &self.cursor
    }

    pub fn device(&self) -> Option<&PlaybackDevice> {
        self.device.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn completed_intervals(&self) -> u32 {
        self.completed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Credential callback for the SDK, reading whatever the session holds right now.
    pub fn token_provider(&self) -> TokenProvider {
        let credential_rx = self.credential_tx.subscribe();
        Arc::new(move || {
            credential_rx
                .borrow()
                .as_ref()
                .map(|c| c.as_str().to_string())
        })
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }
        info!(
            session_id = %self.session_id,
            from = self.phase.as_str(),
            to = phase.as_str(),
            "Session phase changed"
        );
        self.phase = phase;
        let _ = self.event_tx.send(SessionEvent::PhaseChanged(phase));
    }

    fn ensure_state_token(&mut self) -> Result<String, FocusError> {
        let token = self.tokens.get_or_create_token()?;
        if self.phase == SessionPhase::Unauthenticated {
            self.set_phase(SessionPhase::TokenObtained);
        }
        Ok(token)
    }

    fn require_credential(&self) -> Result<Credential, FocusError> {
        self.credential().ok_or(FocusError::NotAuthenticated)
    }

    /// Link for the login prompt. Reuses the persisted anti-forgery token.
    pub fn authorize_url(&mut self) -> Result<String, FocusError> {
        let token = self.ensure_state_token()?;
        redirect::authorize_url(&self.settings, &token)
    }

    /// Run the pipeline from the redirect fragment up to a loaded playlist and a ready
    /// device. `Ok(false)` means the fragment carried no credential yet.
    pub async fn start(&mut self, fragment: &str) -> Result<bool, FocusError> {
        match self.try_start(fragment).await {
            Ok(authenticated) => Ok(authenticated),
            Err(e) => {
                self.fail_closed(&e).await;
                Err(e)
            }
        }
    }

    async fn try_start(&mut self, fragment: &str) -> Result<bool, FocusError> {
        if self.phase.is_authenticated() {
            debug!(session_id = %self.session_id, "Re-authenticating, tearing down current session");
            self.teardown().await;
        }

        let token = self.ensure_state_token()?;
        let Some(credential) = redirect::parse_redirect(fragment, &token)? else {
            debug!(session_id = %self.session_id, "No credential in redirect yet");
            return Ok(false);
        };

        self.error = None;
        self.credential_tx.send_replace(Some(credential.clone()));
        self.set_phase(SessionPhase::CredentialObtained);

        let user = self.api.current_user(&credential).await?;
        info!(session_id = %self.session_id, user = user.display_label(), "Fetched user profile");
        self.user = Some(user);
        self.set_phase(SessionPhase::IdentityFetched);

        if self.cursor.candidates().is_empty() {
            let category = self.settings.playlist_category.clone();
            let candidates = self.api.category_playlists(&credential, &category).await?;
            if candidates.is_empty() {
                return Err(FocusError::NoPlaylists(category));
            }
            self.cursor.set_candidates(candidates);
        }
        self.set_phase(SessionPhase::PlaylistsFetched);

        self.cursor
            .select_new(&self.api, &credential, &mut self.rng)
            .await?;

        let (device_tx, device_rx) = mpsc::channel(self.settings.event_buffer_capacity.max(1));
        let device = PlaybackDevice::open(
            self.sdk_factory.as_ref(),
            &self.settings.player_name,
            self.token_provider(),
            self.settings.device_ready_timeout,
            device_tx,
        )
        .await?;
        self.device = Some(device);
        self.device_rx = Some(device_rx);
        self.is_playing = false;
        self.queue_stale = false;
        self.pending_restart = None;
        self.exhausted_track = None;
        self.set_phase(SessionPhase::PlaylistActive);
        Ok(true)
    }

    /// User-initiated play/pause. Also starts or stops the countdown.
    pub async fn toggle_playback(&mut self) -> Result<(), FocusError> {
        if !self.phase.is_ready() || self.device.is_none() {
            debug!(phase = self.phase.as_str(), "Toggle ignored, player not ready");
            return Ok(());
        }
        let result = if self.is_playing {
            self.pause_playback().await
        } else {
            self.resume_playback().await
        };
        match result {
            Ok(()) => {
                self.reconcile_timer().await;
                Ok(())
            }
            Err(e) => {
                self.fail_closed(&e).await;
                Err(e)
            }
        }
    }

    async fn pause_playback(&mut self) -> Result<(), FocusError> {
        let device = self.device.as_ref().ok_or(FocusError::NotAuthenticated)?;
        device.pause().await?;
        self.is_playing = false;
        self.last_intent = Some(Instant::now());
        self.set_phase(SessionPhase::Paused);
        Ok(())
    }

    async fn resume_playback(&mut self) -> Result<(), FocusError> {
        let credential = self.require_credential()?;
        let action = {
            let device = self.device.as_ref().ok_or(FocusError::NotAuthenticated)?;
            let queue = self.cursor.queue();
            if self.queue_stale {
                device.play_from_queue(&self.api, &credential, queue).await?;
                PlayAction::StartedQueue
            } else {
                device.toggle_to_play(&self.api, &credential, queue).await?
            }
        };
        debug!(session_id = %self.session_id, ?action, "Playback started");
        if action == PlayAction::StartedQueue {
            self.pending_restart = None;
        }
        self.queue_stale = false;
        self.is_playing = true;
        self.just_completed = false;
        self.last_intent = Some(Instant::now());
        self.set_phase(SessionPhase::Playing);
        Ok(())
    }

    /// Apply one elapsed second of the countdown.
    pub async fn advance_timer(&mut self) {
        self.timer.tick();
        trace!(remaining = self.timer.remaining(), "Countdown tick");
        self.reconcile_timer().await;
    }

    /// Restart the current interval without counting it.
    pub async fn reset_timer(&mut self) {
        self.timer.reset();
        self.just_completed = false;
        self.reconcile_timer().await;
    }

    async fn reconcile_timer(&mut self) {
        loop {
            match self.timer.evaluate(self.is_playing, Instant::now()) {
                TimerSignal::Idle => break,
                TimerSignal::PauseRequested => {
                    info!(session_id = %self.session_id, "Interval elapsed, pausing playback");
                    if let Err(e) = self.pause_playback().await {
                        self.fail_closed(&e).await;
                    }
                }
                TimerSignal::IntervalComplete => self.complete_interval(),
            }
        }
    }

    fn complete_interval(&mut self) {
        self.completed = self.completed.saturating_add(1);
        self.just_completed = true;
        if let Err(e) = self.store.set(COUNT_KEY, &self.completed.to_string()) {
            warn!(error = %e, "Could not persist completed interval count");
        }
        info!(
            session_id = %self.session_id,
            count = self.completed,
            "Work interval complete"
        );
        let _ = self.event_tx.send(SessionEvent::IntervalComplete {
            count: self.completed,
        });
    }

    pub async fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::StateChanged(state) => self.on_device_state(state).await,
            DeviceEvent::NotReady { device_id } => {
                let e = FocusError::Device(format!("device {} went offline", device_id));
                self.fail_closed(&e).await;
            }
            DeviceEvent::Ready { device_id } => {
                trace!(%device_id, "Ready notification after open ignored");
            }
        }
    }

    async fn on_device_state(&mut self, state: Option<DeviceState>) {
        if self.device.is_none() {
            trace!("State notification without a device ignored");
            return;
        }
        if self.exhausted_track_ended(state.as_ref()) {
            self.pending_restart = None;
            if self.is_playing {
                self.restart_queue().await;
            } else {
                self.queue_stale = true;
            }
            self.reconcile_timer().await;
            return;
        }
        self.adopt_device_state(state.as_ref());
        self.reconcile_timer().await;

        let Some(state) = state else {
            return;
        };
        if !state.buffer_empty() {
            if !state.next_tracks.is_empty() {
                self.exhausted_track = None;
            }
            return;
        }
        let current_uri = state.current_track.map(|t| t.uri);
        if self.exhausted_track.is_some() && self.exhausted_track == current_uri {
            trace!("Buffer-empty already handled for this track");
            return;
        }
        self.exhausted_track = current_uri;
        self.requeue().await;
    }

    // The held-back track finished (rewound and paused) or the device moved past it.
    fn exhausted_track_ended(&self, state: Option<&DeviceState>) -> bool {
        let (Some(pending), Some(state)) = (self.pending_restart.as_deref(), state) else {
            return false;
        };
        match &state.current_track {
            Some(track) if track.uri == pending => state.paused && state.position_ms == 0,
            _ => true,
        }
    }

    // Local intent wins inside the grace window; otherwise the device is authoritative.
    fn adopt_device_state(&mut self, state: Option<&DeviceState>) {
        let device_playing = state
            .map(|s| !s.paused && s.has_loaded_track())
            .unwrap_or(false);
        if device_playing == self.is_playing {
            return;
        }
        let within_grace = self
            .last_intent
            .map(|at| at.elapsed() < self.settings.intent_grace)
            .unwrap_or(false);
        if within_grace {
            debug!(device_playing, "Device disagrees with recent local command, keeping intent");
            return;
        }
        info!(device_playing, "Adopting device-reported playback state");
        self.is_playing = device_playing;
        if device_playing {
            self.just_completed = false;
            self.set_phase(SessionPhase::Playing);
        } else {
            self.set_phase(SessionPhase::Paused);
        }
    }

    async fn requeue(&mut self) {
        let credential = match self.require_credential() {
            Ok(c) => c,
            Err(e) => {
                self.fail_closed(&e).await;
                return;
            }
        };
        let outcome = self
            .cursor
            .on_buffer_empty(&self.api, &credential, &mut self.rng)
            .await;
        let kind = match outcome {
            Ok(Some(kind)) => kind,
            Ok(None) => return,
            Err(e) => {
                self.fail_closed(&e).await;
                return;
            }
        };

        let (playlist_id, tracks) = match self.cursor.page() {
            Some(page) => (page.playlist_id.clone(), self.cursor.queue().len()),
            None => (String::new(), 0),
        };
        info!(session_id = %self.session_id, ?kind, %playlist_id, tracks, "Queue refilled");
        let _ = self.event_tx.send(SessionEvent::Requeued {
            kind,
            playlist_id,
            tracks,
        });

        if self.is_playing {
            // Let the current track finish; the new queue starts when it ends.
            self.pending_restart = self.exhausted_track.clone();
        } else {
            self.queue_stale = true;
        }
    }

    async fn restart_queue(&mut self) {
        let credential = match self.require_credential() {
            Ok(c) => c,
            Err(e) => {
                self.fail_closed(&e).await;
                return;
            }
        };
        let restarted = match self.device.as_ref() {
            Some(device) => {
                device
                    .play_from_queue(&self.api, &credential, self.cursor.queue())
                    .await
            }
            None => Err(FocusError::NotAuthenticated),
        };
        match restarted {
            Ok(()) => {
                debug!(session_id = %self.session_id, "Previous track ended, playing refilled queue");
                self.queue_stale = false;
                self.last_intent = Some(Instant::now());
            }
            Err(e) => self.fail_closed(&e).await,
        }
    }

    /// Failure policy: drop the credential and everything derived from it, keep the
    /// persisted token and interval count, and surface the message.
    pub async fn fail_closed(&mut self, err: &FocusError) {
        error!(
            session_id = %self.session_id,
            class = ?err.class(),
            error = %err,
            "Session failed, returning to login"
        );
        let message = err.to_string();
        self.error = Some(message.clone());
        self.teardown().await;
        let _ = self.event_tx.send(SessionEvent::Failed(message));
    }

    async fn teardown(&mut self) {
        self.credential_tx.send_replace(None);
        self.user = None;
        self.cursor.clear();
        if let Some(device) = self.device.take() {
            device.close().await;
        }
        self.device_rx = None;
        self.is_playing = false;
        self.last_intent = None;
        self.exhausted_track = None;
        self.queue_stale = false;
        self.pending_restart = None;
        self.timer.reset();
        self.just_completed = false;
        self.set_phase(SessionPhase::Unauthenticated);
    }

    /// Tear the session down without recording an error.
    pub async fn close(&mut self) {
        info!(session_id = %self.session_id, "Closing session");
        self.teardown().await;
    }

    pub fn view(&self) -> SessionView {
        let player_visible = self.phase.is_ready() && self.device.is_some();
        SessionView {
            phase: self.phase,
            display_name: self.user.as_ref().map(|u| u.display_label().to_string()),
            playlist_name: self.cursor.page().map(|p| p.name.clone()),
            is_playing: self.is_playing,
            countdown: self.timer.display(),
            completed_intervals: self.completed,
            break_minutes: (self.just_completed && self.completed > 0)
                .then(|| break_minutes(self.completed)),
            error: self.error.clone(),
            player_visible,
        }
    }

    pub async fn handle_command(&mut self, command: SessionCommand) {
        debug!(command = command.name(), "Handling session command");
        match command {
            SessionCommand::Start { fragment } => {
                if let Err(e) = self.start(&fragment).await {
                    debug!(error = %e, "Start failed");
                }
            }
            SessionCommand::TogglePlayback => {
                if let Err(e) = self.toggle_playback().await {
                    debug!(error = %e, "Toggle failed");
                }
            }
            SessionCommand::ResetTimer => self.reset_timer().await,
            SessionCommand::Shutdown => self.close().await,
        }
    }

    /// Drive the session from commands, device notifications and the countdown until
    /// `Shutdown` arrives or every command sender is dropped.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        view_tx: watch::Sender<SessionView>,
    ) {
        info!(session_id = %self.session_id, "Session loop started");
        loop {
            let tick = OptionFuture::from(self.timer.pending_tick().map(sleep_until));
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                event = next_device_event(&mut self.device_rx), if self.device_rx.is_some() => {
                    match event {
                        Some(event) => self.handle_device_event(event).await,
                        None => {
                            self.device_rx = None;
                            if self.device.is_some() {
                                let e = FocusError::Device("device event stream closed".to_string());
                                self.fail_closed(&e).await;
                            }
                        }
                    }
                }
                Some(()) = tick => self.advance_timer().await,
            }
            view_tx.send_replace(self.view());
        }
        self.close().await;
        view_tx.send_replace(self.view());
        info!(session_id = %self.session_id, "Session loop finished");
    }
}

async fn next_device_event(rx: &mut Option<mpsc::Receiver<DeviceEvent>>) -> Option<DeviceEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

impl std::fmt::Debug for FocusSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusSession")
            .field("session_id", &self.session_id)
            .field("phase", &self.phase)
            .field("is_playing", &self.is_playing)
            .field("completed", &self.completed)
            .finish()
    }
}
