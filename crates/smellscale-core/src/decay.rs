//! Half-life weighted vote averaging and base blending.
//!
//! A vote's weight is `0.5 ^ (age_hours / half_life_hours)`: 1.0 when
//! fresh, 0.5 after one half-life, 0.25 after two. The decayed average is
//! the weight-normalised mean of all vote values.

use chrono::{DateTime, Utc};

use crate::types::Vote;

/// Half-life used when no configuration overrides it.
pub const DEFAULT_HALF_LIFE_HOURS: f64 = 1.0;

/// Share of the blended scale taken from the base value.
pub const BASE_WEIGHT: f64 = 0.3;

/// Share of the blended scale taken from the decayed vote average.
pub const VOTE_WEIGHT: f64 = 0.7;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Weight of a vote that is `age_hours` old.
pub fn vote_weight(age_hours: f64, half_life_hours: f64) -> f64 {
    0.5_f64.powf(age_hours / half_life_hours)
}

/// Age of `vote` at `now` in fractional hours. Future timestamps count as age 0.
pub fn age_hours(vote: &Vote, now: DateTime<Utc>) -> f64 {
    let millis = (now - vote.timestamp).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_HOUR
}

/// Recency-weighted mean of vote values.
///
/// Returns `None` when there is no signal: either no votes, or every vote
/// is so old that its weight underflows to zero.
pub fn decayed_average(votes: &[Vote], half_life_hours: f64, now: DateTime<Utc>) -> Option<f64> {
    let mut sum = 0.0;
    let mut total_weight = 0.0;

    for vote in votes {
        let weight = vote_weight(age_hours(vote, now), half_life_hours);
        sum += vote.value * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return None;
    }
    Some(sum / total_weight)
}

/// Combine the base value with the decayed average.
///
/// Without a decayed average the base is returned unchanged; otherwise the
/// 30/70 blend is rounded to two decimal places.
pub fn blended_scale(base: f64, decayed: Option<f64>) -> f64 {
    match decayed {
        None => base,
        Some(avg) => round2(base * BASE_WEIGHT + avg * VOTE_WEIGHT),
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
