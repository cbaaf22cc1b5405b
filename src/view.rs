use crate::state::SessionPhase;

/// Plain snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub display_name: Option<String>,
    pub playlist_name: Option<String>,
    pub is_playing: bool,
    pub countdown: String,
    pub completed_intervals: u32,
    /// Suggested break length, set right after an interval completes.
    pub break_minutes: Option<u32>,
    pub error: Option<String>,
    /// Playlist and device are both present.
    pub player_visible: bool,
}

impl SessionView {
    pub fn toggle_label(&self) -> &'static str {
        if self.is_playing {
            "Pause Timer"
        } else {
            "Start Timer"
        }
    }

    pub fn progress_meter(&self) -> String {
        "🍅".repeat(self.completed_intervals as usize)
    }
}

/// Every fourth interval earns the long break.
pub fn break_minutes(completed: u32) -> u32 {
    if completed % 4 == 0 {
        15
    } else {
        5
    }
}
