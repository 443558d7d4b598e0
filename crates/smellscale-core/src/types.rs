//! Persisted domain types.
//!
//! `ScaleState` is the single record the service stores. It is serialized
//! as JSON with `base` as the canonical field name; the legacy names
//! `scale_value` and `scale` are accepted when reading older data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest value a vote or the base may take.
pub const MIN_SCALE: f64 = 1.0;

/// Highest value a vote or the base may take.
pub const MAX_SCALE: f64 = 10.0;

/// Base value for a freshly created state.
pub const DEFAULT_BASE: f64 = 5.0;

// ── Vote ───────────────────────────────────────────────────────────

/// A single accepted vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }

    /// Whether the stored value lies within the accepted range.
    pub fn in_range(&self) -> bool {
        self.value.is_finite() && (MIN_SCALE..=MAX_SCALE).contains(&self.value)
    }
}

// ── ScaleState ─────────────────────────────────────────────────────

/// The singleton scale record: base value plus full vote history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScaleState {
    #[serde(alias = "scale_value", alias = "scale")]
    pub base: f64,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    /// Votes in insertion order. Never evicted.
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl ScaleState {
    /// A fresh state with the default base and no votes.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            base: DEFAULT_BASE,
            last_updated: now,
            votes: Vec::new(),
        }
    }

    /// Append an already-validated vote.
    pub fn record_vote(&mut self, vote: Vote) {
        self.votes.push(vote);
    }

    /// Set the base to an absolute value, clamped to the scale range.
    pub fn set_base(&mut self, value: f64, now: DateTime<Utc>) {
        self.base = clamp_base(value, self.base);
        self.last_updated = now;
    }

    /// Shift the base by `delta`, clamped to the scale range.
    pub fn adjust_base(&mut self, delta: f64, now: DateTime<Utc>) {
        self.base = clamp_base(self.base + delta, self.base);
        self.last_updated = now;
    }

    /// Repair data read from an older or hand-edited blob: clamp the base
    /// and drop votes outside the accepted range.
    ///
    /// Returns the number of votes dropped.
    pub fn normalize(&mut self) -> usize {
        self.base = clamp_base(self.base, DEFAULT_BASE);
        let before = self.votes.len();
        self.votes.retain(Vote::in_range);
        before - self.votes.len()
    }
}

/// Clamp `value` to `[MIN_SCALE, MAX_SCALE]`. NaN yields `fallback`.
pub fn clamp_base(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(MIN_SCALE, MAX_SCALE)
    }
}
