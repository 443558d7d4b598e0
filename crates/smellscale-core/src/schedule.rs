//! Daily base-adjustment schedule.
//!
//! A schedule is a list of `(time-of-day, action)` pairs. The model here is
//! independent of whatever timer fires the entries; `smellscale-scheduler`
//! provides the tokio driver.
//!
//! In TOML each entry reads:
//!
//! ```toml
//! [[schedule]]
//! time = "02:00"
//! action = "change"
//! value = -1
//! ```

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MAX_SCALE, MIN_SCALE, ScaleState};

/// What a schedule entry does to the base value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaseAction {
    /// Replace the base with an absolute value.
    Set(f64),
    /// Shift the base by a relative amount.
    Change(f64),
}

impl BaseAction {
    /// Apply the action, clamping the result and stamping `last_updated`.
    pub fn apply(&self, state: &mut ScaleState, now: DateTime<Utc>) {
        match *self {
            BaseAction::Set(value) => state.set_base(value, now),
            BaseAction::Change(delta) => state.adjust_base(delta, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid schedule time {time:?}: {reason}")]
    InvalidTime { time: String, reason: String },

    #[error("schedule value at {time} must be finite")]
    NotFinite { time: String },

    #[error("schedule set value at {time} must be between 1 and 10, got {value}")]
    SetOutOfRange { time: String, value: f64 },
}

/// One firing of the daily schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleEntry", into = "RawScheduleEntry")]
pub struct ScheduleEntry {
    /// Wall-clock time of day, interpreted in the host's local zone.
    pub time: NaiveTime,
    pub action: BaseAction,
}

impl ScheduleEntry {
    pub fn new(time: NaiveTime, action: BaseAction) -> Self {
        Self { time, action }
    }

    /// Build an entry from an `HH:MM` string.
    pub fn parse(time: &str, action: BaseAction) -> Result<Self, ScheduleError> {
        let raw = RawScheduleEntry {
            time: time.to_string(),
            action: match action {
                BaseAction::Set(_) => ActionKind::Set,
                BaseAction::Change(_) => ActionKind::Change,
            },
            value: match action {
                BaseAction::Set(v) | BaseAction::Change(v) => v,
            },
        };
        Self::try_from(raw)
    }
}

/// The stock daily cycle: reset to 10 at midnight, drift down through the
/// early morning, and creep back up in the evening.
pub fn default_schedule() -> Vec<ScheduleEntry> {
    let at = |h: u32, action| ScheduleEntry::new(hm(h, 0), action);
    vec![
        at(0, BaseAction::Set(10.0)),
        at(2, BaseAction::Change(-1.0)),
        at(4, BaseAction::Change(-1.0)),
        at(6, BaseAction::Change(-1.0)),
        at(8, BaseAction::Change(-1.0)),
        at(20, BaseAction::Change(1.0)),
        at(22, BaseAction::Change(1.0)),
    ]
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

// ── Serde representation ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActionKind {
    Set,
    Change,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawScheduleEntry {
    time: String,
    action: ActionKind,
    value: f64,
}

impl TryFrom<RawScheduleEntry> for ScheduleEntry {
    type Error = ScheduleError;

    fn try_from(raw: RawScheduleEntry) -> Result<Self, Self::Error> {
        let time = NaiveTime::parse_from_str(&raw.time, "%H:%M").map_err(|e| {
            ScheduleError::InvalidTime {
                time: raw.time.clone(),
                reason: e.to_string(),
            }
        })?;

        if !raw.value.is_finite() {
            return Err(ScheduleError::NotFinite { time: raw.time });
        }

        let action = match raw.action {
            ActionKind::Set => {
                if !(MIN_SCALE..=MAX_SCALE).contains(&raw.value) {
                    return Err(ScheduleError::SetOutOfRange {
                        time: raw.time,
                        value: raw.value,
                    });
                }
                BaseAction::Set(raw.value)
            }
            ActionKind::Change => BaseAction::Change(raw.value),
        };

        Ok(Self { time, action })
    }
}

impl From<ScheduleEntry> for RawScheduleEntry {
    fn from(entry: ScheduleEntry) -> Self {
        let (action, value) = match entry.action {
            BaseAction::Set(v) => (ActionKind::Set, v),
            BaseAction::Change(v) => (ActionKind::Change, v),
        };
        Self {
            time: entry.time.format("%H:%M").to_string(),
            action,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_schedule_matches_daily_cycle() {
        let schedule = default_schedule();
        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule[0], ScheduleEntry::new(hm(0, 0), BaseAction::Set(10.0)));
        assert_eq!(schedule[6], ScheduleEntry::new(hm(22, 0), BaseAction::Change(1.0)));
    }

    #[test]
    fn running_the_default_day_keeps_base_in_range() {
        let mut state = ScaleState::new(now());
        for _ in 0..3 {
            for entry in default_schedule() {
                entry.action.apply(&mut state, now());
                assert!((MIN_SCALE..=MAX_SCALE).contains(&state.base));
            }
        }
        // 10 - 4 + 2
        assert_eq!(state.base, 8.0);
    }

    #[test]
    fn parse_accepts_hh_mm() {
        let entry = ScheduleEntry::parse("08:30", BaseAction::Change(-0.5)).unwrap();
        assert_eq!(entry.time, hm(8, 30));
    }

    #[test]
    fn parse_rejects_bad_time() {
        for time in ["25:00", "noon"] {
            let err = ScheduleEntry::parse(time, BaseAction::Change(1.0)).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidTime { .. }), "{time}");
        }
    }

    #[test]
    fn parse_rejects_non_finite_change() {
        let err = ScheduleEntry::parse("03:00", BaseAction::Change(f64::NAN)).unwrap_err();
        assert_eq!(err, ScheduleError::NotFinite { time: "03:00".into() });
    }

    #[test]
    fn parse_rejects_out_of_range_set() {
        let err = ScheduleEntry::parse("00:00", BaseAction::Set(11.0)).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::SetOutOfRange {
                time: "00:00".into(),
                value: 11.0
            }
        );
        assert!(err.to_string().contains("between 1 and 10"));
    }

    #[test]
    fn deserializes_from_json() {
        let entry: ScheduleEntry =
            serde_json::from_str(r#"{ "time": "20:00", "action": "change", "value": 1 }"#).unwrap();
        assert_eq!(entry, ScheduleEntry::new(hm(20, 0), BaseAction::Change(1.0)));
    }

    #[test]
    fn serializes_time_as_hh_mm() {
        let entry = ScheduleEntry::new(hm(4, 0), BaseAction::Change(-1.0));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["time"], "04:00");
        assert_eq!(json["action"], "change");
        assert_eq!(json["value"], -1.0);
    }
}
