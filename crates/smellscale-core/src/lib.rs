//! smellscale-core — domain model for the Smell Scale service.
//!
//! Holds the persisted record (`ScaleState` and its `Vote`s), the pure
//! decayed-average calculator, vote validation, the daily base-adjustment
//! schedule, and `smellscale.toml` configuration parsing. Nothing in this
//! crate performs I/O except `ScaleConfig::from_file`.

pub mod config;
pub mod decay;
pub mod report;
pub mod schedule;
pub mod types;
pub mod vote;

pub use config::{ConfigError, ScaleConfig};
pub use decay::{blended_scale, decayed_average, vote_weight};
pub use report::ScaleReport;
pub use schedule::{BaseAction, ScheduleEntry, ScheduleError};
pub use types::*;
pub use vote::{VoteError, parse_vote_value, validate_vote};
