//! Vote validation at the request boundary.

use serde_json::Value;
use thiserror::Error;

use crate::types::{MAX_SCALE, MIN_SCALE};

/// Why a submitted vote was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoteError {
    #[error("vote value must be a number")]
    NotNumeric,

    #[error("vote value must be a finite number")]
    NotFinite,

    #[error("vote must be between 1 and 10, got {0}")]
    OutOfRange(f64),
}

/// Accept `value` if it is finite and within `[1, 10]`.
pub fn validate_vote(value: f64) -> Result<f64, VoteError> {
    if !value.is_finite() {
        return Err(VoteError::NotFinite);
    }
    if !(MIN_SCALE..=MAX_SCALE).contains(&value) {
        return Err(VoteError::OutOfRange(value));
    }
    Ok(value)
}

/// Extract and validate a vote from a raw JSON value.
///
/// Only JSON numbers are accepted; numeric strings such as `"7"` are not.
pub fn parse_vote_value(raw: &Value) -> Result<f64, VoteError> {
    let value = raw.as_f64().ok_or(VoteError::NotNumeric)?;
    validate_vote(value)
}
