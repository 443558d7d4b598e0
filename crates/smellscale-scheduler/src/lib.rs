//! smellscale-scheduler — the daily base-adjustment driver.
//!
//! Fires `ScheduleEntry`s (from `smellscale-core`) at their wall-clock
//! times and applies them to the shared `ScaleStore`.
//!
//! # Architecture
//!
//! ```text
//! BaseScheduler
//!   ├── ScaleStore (update: load → set/adjust base → save)
//!   ├── Vec<ScheduleEntry> (time-of-day, action)
//!   └── last_checked watermark (each occurrence fires once)
//! ```
//!
//! The firing logic lives in [`BaseScheduler::tick`], which takes the
//! current instant explicitly; [`BaseScheduler::run`] is a thin tokio loop
//! around it.

pub mod error;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{BaseScheduler, FiredEntry, next_occurrence};
