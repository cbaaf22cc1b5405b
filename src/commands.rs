// Commands accepted by the session run loop
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Run the login-to-playlist pipeline with the current location fragment.
    Start { fragment: String },
    TogglePlayback,
    ResetTimer,
    Shutdown,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Start { .. } => "start",
            SessionCommand::TogglePlayback => "togglePlayback",
            SessionCommand::ResetTimer => "resetTimer",
            SessionCommand::Shutdown => "shutdown",
        }
    }
}
