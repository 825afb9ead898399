//! Position sources and the watch task that samples them

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Position, DEFAULT_POSITION};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Maximum per-sample drift of the simulated walk, in degrees
const WALK_STEP_DEGREES: f64 = 0.0001;

/// Why a position source failed to produce a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchError {
    PermissionDenied,
    Timeout,
    Unavailable,
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchError::PermissionDenied => write!(f, "location permission denied"),
            WatchError::Timeout => write!(f, "location request timed out"),
            WatchError::Unavailable => write!(f, "location source unavailable"),
        }
    }
}

impl std::error::Error for WatchError {}

/// Anything that can produce position fixes on demand
pub trait LocationSource: Send {
    fn sample(&mut self) -> Result<Position, WatchError>;
}

/// A random walk standing in for a real positioning device
///
/// Each sample drifts at most `WALK_STEP_DEGREES` from the previous one,
/// roughly ten meters of movement per sample at walking latitudes. Seeded
/// construction makes a walk reproducible.
pub struct SimulatedWalk {
    position: Position,
    rng: StdRng,
}

impl SimulatedWalk {
    pub fn new(start: Position, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            position: start,
            rng,
        }
    }
}

impl LocationSource for SimulatedWalk {
    fn sample(&mut self) -> Result<Position, WatchError> {
        self.position.latitude += self.rng.gen_range(-WALK_STEP_DEGREES..WALK_STEP_DEGREES);
        self.position.longitude += self.rng.gen_range(-WALK_STEP_DEGREES..WALK_STEP_DEGREES);
        Ok(self.position)
    }
}

/// One-shot fix used to place the map before any walk starts
///
/// A failing source is logged and replaced by the default coordinate; the
/// failure never propagates further.
pub fn initial_position(source: &mut dyn LocationSource) -> Position {
    match source.sample() {
        Ok(position) => {
            info!(
                "Initial position: ({:.4}, {:.4})",
                position.latitude, position.longitude
            );
            position
        }
        Err(e) => {
            warn!("Failed to read initial position, using default: {}", e);
            DEFAULT_POSITION
        }
    }
}

/// A running position watch
///
/// Wraps the task that samples a source at a fixed cadence and feeds fixes
/// into a channel. Dropping the receiver ends the task on its own; `stop`
/// ends it immediately.
pub struct GeoWatch {
    task: JoinHandle<()>,
}

impl GeoWatch {
    pub fn spawn(
        mut source: Box<dyn LocationSource>,
        sample_interval: Duration,
        tx: mpsc::UnboundedSender<Position>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sample_interval);

            loop {
                ticker.tick().await;
                match source.sample() {
                    Ok(fix) => {
                        if tx.send(fix).is_err() {
                            break;
                        }
                    }
                    // Failed samples stay local; nothing crosses the network
                    Err(e) => warn!("Position watch error: {}", e),
                }
            }
        });

        Self { task }
    }

    /// Stops sampling immediately; safe on a watch that already finished
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}
