//! Location signal conditioning with throttling and trailing-mean smoothing

use shared::{Position, LOCATION_MIN_INTERVAL, SMOOTHING_WINDOW};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Turns the raw high-frequency position stream into the stream that goes
/// on the wire
///
/// Two stages run back to back: a throttle that drops (never queues) samples
/// arriving faster than the minimum interval, and a trailing-window mean over
/// the samples that survive it. Partial windows emit, so the first accepted
/// sample already produces output.
pub struct SignalConditioner {
    min_interval: Duration,
    window: VecDeque<Position>,
    window_capacity: usize,
    last_accepted: Option<Instant>,
}

impl SignalConditioner {
    pub fn new(min_interval: Duration, window_capacity: usize) -> Self {
        Self {
            min_interval,
            window: VecDeque::with_capacity(window_capacity),
            window_capacity,
            last_accepted: None,
        }
    }

    /// Offers a raw sample; returns the smoothed position if it was accepted
    ///
    /// A sample inside the throttle window is discarded entirely and leaves
    /// no trace in the smoothing window.
    pub fn offer(&mut self, raw: Position, now: Instant) -> Option<Position> {
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < self.min_interval {
                return None;
            }
        }

        self.last_accepted = Some(now);
        self.window.push_back(raw);
        while self.window.len() > self.window_capacity {
            self.window.pop_front();
        }

        Some(self.smoothed())
    }

    /// Arithmetic mean of the current window contents
    fn smoothed(&self) -> Position {
        let count = self.window.len() as f64;
        let (lat_sum, lon_sum) = self
            .window
            .iter()
            .fold((0.0, 0.0), |(lat, lon), sample| {
                (lat + sample.latitude, lon + sample.longitude)
            });
        Position::new(lat_sum / count, lon_sum / count)
    }

    /// Number of samples currently held by the smoothing window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Clears the window and the throttle clock for a fresh session
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_accepted = None;
    }
}

impl Default for SignalConditioner {
    fn default() -> Self {
        Self::new(LOCATION_MIN_INTERVAL, SMOOTHING_WINDOW)
    }
}
