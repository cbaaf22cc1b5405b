use crate::pagination::Requeue;
use crate::state::SessionPhase;

// Event types broadcast by the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// A new playlist page was loaded because the device ran out of tracks.
    Requeued {
        kind: Requeue,
        playlist_id: String,
        tracks: usize,
    },
    /// A work interval finished; `count` is the new persisted total.
    IntervalComplete { count: u32 },
    /// The session failed closed and returned to the login view.
    Failed(String),
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::PhaseChanged(_) => "phaseChanged",
            SessionEvent::Requeued { .. } => "requeued",
            SessionEvent::IntervalComplete { .. } => "intervalComplete",
            SessionEvent::Failed(_) => "failed",
        }
    }
}
