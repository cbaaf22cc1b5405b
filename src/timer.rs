use tokio::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(1);

/// What the session has to do after re-evaluating the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Idle,
    /// Countdown hit zero during playback; playback must be paused first.
    PauseRequested,
    /// A full interval elapsed. The countdown has already been reset.
    IntervalComplete,
}

/// Work-interval countdown with at most one pending one-second decrement.
///
/// The countdown never schedules anything itself; the owner sleeps until
/// [`pending_tick`](Self::pending_tick), calls [`tick`](Self::tick), then
/// [`evaluate`](Self::evaluate) again.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    interval: u32,
    remaining: u32,
    pending: Option<Instant>,
}

impl CountdownTimer {
    /// `interval_secs` is clamped to at least one second.
    pub fn new(interval_secs: u32) -> Self {
        let interval = interval_secs.max(1);
        Self {
            interval,
            remaining: interval,
            pending: None,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Deadline of the scheduled decrement, if one is armed.
    pub fn pending_tick(&self) -> Option<Instant> {
        self.pending
    }

    /// Reconcile the countdown with the playing flag.
    pub fn evaluate(&mut self, is_playing: bool, now: Instant) -> TimerSignal {
        if !is_playing {
            self.pending = None;
            if self.remaining == 0 {
                self.remaining = self.interval;
                return TimerSignal::IntervalComplete;
            }
            return TimerSignal::Idle;
        }
        if self.remaining == 0 {
            self.pending = None;
            return TimerSignal::PauseRequested;
        }
        if self.pending.is_none() {
            self.pending = Some(now + TICK);
        }
        TimerSignal::Idle
    }

    /// Apply one elapsed second. The pending decrement is consumed either way.
    pub fn tick(&mut self) {
        self.pending = None;
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Back to a full interval without signalling completion.
    pub fn reset(&mut self) {
        self.pending = None;
        self.remaining = self.interval;
    }

    pub fn display(&self) -> String {
        format_countdown(self.remaining)
    }
}

/// `HH:MM:SS`, zero padded.
pub fn format_countdown(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
