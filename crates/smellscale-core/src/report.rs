//! The published view of the scale: what `GET /api/scale` returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decay::{blended_scale, decayed_average, round2};
use crate::types::ScaleState;

/// Current scale, with the inputs it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScaleReport {
    /// Blended value (base only when there are no votes).
    pub scale: f64,
    pub base: f64,
    /// Decayed vote average rounded to two places, `None` without votes.
    pub decayed: Option<f64>,
    /// Total number of stored votes.
    pub votes: usize,
}

impl ScaleReport {
    pub fn compute(state: &ScaleState, half_life_hours: f64, now: DateTime<Utc>) -> Self {
        let decayed = decayed_average(&state.votes, half_life_hours, now);
        Self {
            scale: blended_scale(state.base, decayed),
            base: state.base,
            decayed: decayed.map(round2),
            votes: state.votes.len(),
        }
    }
}
