//! Replicated walk timer: one authority per session, everyone else mirrors

use shared::TimerState;
use std::time::Instant;

/// The authoritative side of the walk timer
///
/// Exactly one participant per session drives this. Elapsed time is
/// recomputed from the captured start instant on every tick rather than
/// incremented, so delayed ticks never accumulate drift. Ending the walk is
/// terminal: a finished timer refuses to start again.
pub struct WalkTimer {
    started_at: Option<Instant>,
    state: TimerState,
}

impl WalkTimer {
    pub fn new() -> Self {
        Self {
            started_at: None,
            state: TimerState::default(),
        }
    }

    /// Starts the walk, returning the state to announce
    ///
    /// None if a walk is already running or has already ended.
    pub fn start(&mut self) -> Option<TimerState> {
        if self.state.is_walking || self.state.has_ended {
            return None;
        }

        self.started_at = Some(Instant::now());
        self.state = TimerState {
            is_walking: true,
            elapsed_seconds: 0,
            has_ended: false,
        };
        Some(self.state)
    }

    /// Recomputes elapsed time, returning the state to announce
    ///
    /// None while no walk is running.
    pub fn tick(&mut self) -> Option<TimerState> {
        if !self.state.is_walking {
            return None;
        }
        let started_at = self.started_at?;

        self.state.elapsed_seconds = started_at.elapsed().as_secs().min(u32::MAX as u64) as u32;
        Some(self.state)
    }

    /// Ends the walk, returning the terminal state to announce
    ///
    /// None if no walk is running; a walk ends at most once.
    pub fn end(&mut self) -> Option<TimerState> {
        if !self.state.is_walking || self.state.has_ended {
            return None;
        }

        if let Some(started_at) = self.started_at {
            self.state.elapsed_seconds =
                started_at.elapsed().as_secs().min(u32::MAX as u64) as u32;
        }
        self.state.is_walking = false;
        self.state.has_ended = true;
        Some(self.state)
    }

    pub fn is_walking(&self) -> bool {
        self.state.is_walking
    }

    pub fn has_ended(&self) -> bool {
        self.state.has_ended
    }

    pub fn state(&self) -> TimerState {
        self.state
    }
}

impl Default for WalkTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// The mirroring side of the walk timer
///
/// Received updates overwrite the local copy wholesale (last write wins).
/// The one exception is terminality: once an update with `has_ended` has
/// been observed, updates claiming an active walk are refused.
pub struct TimerReplica {
    state: TimerState,
    ended: bool,
}

impl TimerReplica {
    pub fn new() -> Self {
        Self {
            state: TimerState::default(),
            ended: false,
        }
    }

    /// Applies a received update; false means it was refused
    pub fn apply(&mut self, update: TimerState) -> bool {
        if self.ended && update.is_walking {
            return false;
        }

        self.state = update;
        self.ended = self.ended || update.has_ended;
        true
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_walking(&self) -> bool {
        self.state.is_walking
    }

    /// Whether a terminal update has ever been observed
    pub fn has_ended(&self) -> bool {
        self.ended
    }
}

impl Default for TimerReplica {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a second count as zero-padded HH:MM:SS
pub fn format_elapsed(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
