//! Rolling sample windows for trend estimation.
//!
//! A window keeps the readings of one signal that are no older than the
//! horizon (60 minutes) relative to the newest reading. Trimming is relative
//! to the newest timestamp, not to the wall clock, so a synthetic clock gives
//! reproducible slopes.

use std::collections::VecDeque;

use chrono::TimeDelta;
use fh_core::{Timestamp, ensure_finite, hours_between};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Default window horizon in minutes.
pub const WINDOW_HORIZON_MINUTES: i64 = 60;

/// One timestamped reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Time-ordered buffer of samples with age-based eviction from the front.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    horizon: TimeDelta,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    /// Create an empty window with the default 60 minute horizon.
    pub fn new() -> Self {
        Self::with_horizon(TimeDelta::minutes(WINDOW_HORIZON_MINUTES))
    }

    /// Create an empty window with a custom horizon.
    pub fn with_horizon(horizon: TimeDelta) -> Self {
        Self {
            samples: VecDeque::new(),
            horizon,
        }
    }

    /// Append a reading and evict everything older than the horizon.
    ///
    /// # Errors
    ///
    /// Returns an error (and leaves the window untouched) if `value` is not
    /// finite or `timestamp` precedes the newest sample.
    pub fn push(&mut self, timestamp: Timestamp, value: f64) -> ControlResult<()> {
        let value = ensure_finite(value, "sample value")?;
        if let Some(newest) = self.samples.back() {
            if timestamp < newest.timestamp {
                return Err(ControlError::OutOfOrder {
                    newest: newest.timestamp,
                    attempted: timestamp,
                });
            }
        }
        self.samples.push_back(Sample { timestamp, value });
        self.trim(timestamp);
        Ok(())
    }

    fn trim(&mut self, newest: Timestamp) {
        let cutoff = newest - self.horizon;
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Rate of change across the window in units per hour.
    ///
    /// Zero for fewer than two samples or when oldest and newest share a
    /// timestamp.
    pub fn slope_per_hour(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let dt_h = hours_between(oldest.timestamp, newest.timestamp);
        if dt_h <= 0.0 {
            return 0.0;
        }
        (newest.value - oldest.value) / dt_h
    }

    /// Net change across the window (`newest - oldest`), zero for fewer than
    /// two samples.
    pub fn delta(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(oldest), Some(newest)) if self.samples.len() >= 2 => newest.value - oldest.value,
            _ => 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn horizon(&self) -> TimeDelta {
        self.horizon
    }
}
