mod api;
pub use api::ApiClient;
pub mod commands;
pub use commands::SessionCommand;
pub mod device;
pub use device::{
    DeviceEvent, DeviceSubscription, PlayAction, PlaybackDevice, PlayerSdk, PlayerSdkFactory,
    TokenProvider,
};
mod error;
pub use error::{ErrorClass, FocusError};
mod events;
pub use events::SessionEvent;
pub mod models;
pub use models::{
    ActivePlaylistPage, Credential, DeviceState, Paging, Playlist, PlaylistCandidate,
    PlaylistItem, TrackObject, TrackQueue, TrackRef, UserProfile,
};
pub mod pagination;
pub use pagination::{CursorState, PlaylistCursor, Requeue};
pub mod redirect;
pub use redirect::{authorize_url, parse_redirect};
pub mod selector;
mod session;
pub use session::FocusSession;
mod settings;
pub use settings::{Settings, SETTINGS};
mod state;
pub use state::SessionPhase;
pub mod state_token;
pub use state_token::StateTokenManager;
pub mod store;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub mod timer;
pub use timer::{format_countdown, CountdownTimer, TimerSignal};
mod view;
pub use view::{break_minutes, SessionView};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a [`FocusSession`] running on its own task.
///
/// The session task owns all state; this handle only sends commands and observes the
/// published [`SessionView`] and [`SessionEvent`]s.
///
/// # Logging
///
/// This library uses the `tracing` crate for logging. To enable logs, you'll need to
/// initialize a tracing subscriber in your application.
///
/// Example using `tracing_subscriber`:
/// ```no_run
/// use tracing::Level;
/// use tracing_subscriber::FmtSubscriber;
///
/// let subscriber = FmtSubscriber::builder()
///     .with_max_level(Level::DEBUG)
///     .finish();
///
/// tracing::subscriber::set_global_default(subscriber)
///     .expect("Failed to set tracing subscriber");
/// ```
///
/// - `TRACE`: countdown ticks and every forwarded device notification
/// - `DEBUG`: requests, queue recomputation, ignored triggers
/// - `INFO`: phase changes, playlist selection, completed intervals
/// - `WARN`/`ERROR`: rejected redirects, failed requests, fail-closed teardown
pub struct FocusClient {
    commands: mpsc::Sender<SessionCommand>,
    view_rx: watch::Receiver<SessionView>,
    event_sender: broadcast::Sender<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl FocusClient {
    /// Move `session` onto a tokio task and return a handle to it.
    pub fn spawn(session: FocusSession) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (view_tx, view_rx) = watch::channel(session.view());
        let event_sender = session.event_sender();
        let task = tokio::spawn(session.run(command_rx, view_tx));
        debug!("Focus session task spawned");
        Self {
            commands: command_tx,
            view_rx,
            event_sender,
            task: Some(task),
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), FocusError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FocusError::SessionClosed)
    }

    /// Hand over the location fragment from the login redirect.
    pub async fn start(&self, fragment: impl Into<String>) -> Result<(), FocusError> {
        self.send(SessionCommand::Start {
            fragment: fragment.into(),
        })
        .await
    }

    pub async fn toggle_playback(&self) -> Result<(), FocusError> {
        self.send(SessionCommand::TogglePlayback).await
    }

    pub async fn reset_timer(&self) -> Result<(), FocusError> {
        self.send(SessionCommand::ResetTimer).await
    }

    /// Latest published snapshot.
    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    pub fn view_receiver(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    pub fn event_receiver(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    /// Stop the session task and wait for the device teardown to finish.
    pub async fn shutdown(mut self) -> Result<(), FocusError> {
        info!("Shutting down focus session");
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            task.await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FocusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusClient")
            .field("phase", &self.view_rx.borrow().phase)
            .field("running", &self.task.is_some())
            .finish()
    }
}

// Ensure the session task tears the device down when the handle goes away
impl Drop for FocusClient {
    fn drop(&mut self) {
        if self.task.is_some() {
            info!("Dropping FocusClient, signaling session task to stop.");
            if self.commands.try_send(SessionCommand::Shutdown).is_err() {
                warn!("Session command queue full or closed; task stops once the channel closes.");
            }
        }
    }
}
