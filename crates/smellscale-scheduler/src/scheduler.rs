//! BaseScheduler — applies the daily schedule to the stored base value.
//!
//! Each tick fires every entry whose next occurrence after the previous
//! tick is at or before the current instant, in chronological order. An
//! entry fires at most once per tick, so a long pause (suspend, clock jump)
//! replays one day's worth of adjustments instead of flooding the store.

use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info};

use smellscale_core::{BaseAction, ScheduleEntry};
use smellscale_state::ScaleStore;

use crate::error::SchedulerResult;

/// Record of one schedule entry applied during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEntry {
    /// The occurrence that was due.
    pub scheduled_for: DateTime<Utc>,
    pub action: BaseAction,
    /// Base value after the action was applied.
    pub base: f64,
}

/// Drives a list of `ScheduleEntry`s against a `ScaleStore`.
pub struct BaseScheduler<Tz: TimeZone = Local> {
    store: ScaleStore,
    schedule: Vec<ScheduleEntry>,
    /// Zone the entries' times of day are read in.
    tz: Tz,
    /// Occurrences at or before this instant have already been handled.
    last_checked: DateTime<Utc>,
}

impl BaseScheduler<Local> {
    /// A scheduler in the host's local time zone, starting now.
    pub fn local(store: ScaleStore, schedule: Vec<ScheduleEntry>) -> Self {
        Self::new(store, schedule, Local, Utc::now())
    }
}

impl<Tz: TimeZone> BaseScheduler<Tz> {
    pub fn new(store: ScaleStore, schedule: Vec<ScheduleEntry>, tz: Tz, start: DateTime<Utc>) -> Self {
        Self {
            store,
            schedule,
            tz,
            last_checked: start,
        }
    }

    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    /// Apply a single entry now, returning the resulting base.
    pub fn apply(&self, entry: &ScheduleEntry, now: DateTime<Utc>) -> SchedulerResult<f64> {
        let base = self.store.update_at(now, |state| {
            entry.action.apply(state, now);
            state.base
        })?;
        Ok(base)
    }

    /// Earliest occurrence of any entry strictly after `after`.
    pub fn next_due(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.tz);
        self.schedule
            .iter()
            .filter_map(|entry| next_occurrence(entry.time, &local))
            .map(|at| at.with_timezone(&Utc))
            .min()
    }

    /// Fire every entry that came due in `(last_checked, now]`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<FiredEntry> {
        if now <= self.last_checked {
            if now < self.last_checked {
                debug!(%now, last_checked = %self.last_checked, "clock moved backwards, resetting watermark");
                self.last_checked = now;
            }
            return Vec::new();
        }

        let after = self.last_checked.with_timezone(&self.tz);
        let mut due: Vec<(DateTime<Utc>, &ScheduleEntry)> = self
            .schedule
            .iter()
            .filter_map(|entry| {
                let at = next_occurrence(entry.time, &after)?.with_timezone(&Utc);
                (at <= now).then_some((at, entry))
            })
            .collect();
        due.sort_by_key(|(at, _)| *at);

        let mut fired = Vec::with_capacity(due.len());
        for (at, entry) in due {
            match self.apply(entry, now) {
                Ok(base) => {
                    info!(
                        time = %entry.time.format("%H:%M"),
                        action = ?entry.action,
                        base,
                        "scheduled update applied"
                    );
                    fired.push(FiredEntry {
                        scheduled_for: at,
                        action: entry.action,
                        base,
                    });
                }
                Err(e) => {
                    error!(time = %entry.time.format("%H:%M"), error = %e, "scheduled update failed");
                }
            }
        }

        self.last_checked = now;
        fired
    }

    /// How long to sleep before the next tick: until the next occurrence,
    /// but never longer than `cap`.
    fn wait_for(&self, now: DateTime<Utc>, cap: Duration) -> Duration {
        self.next_due(now)
            .and_then(|due| (due - now).to_std().ok())
            .map_or(cap, |wait| wait.min(cap))
    }

    /// Run the schedule loop until shutdown signal.
    ///
    /// `poll_interval` bounds each sleep so wall-clock changes are picked
    /// up within one interval.
    pub async fn run(mut self, poll_interval: Duration, mut shutdown: watch::Receiver<bool>)
    where
        Tz: Send,
    {
        info!(
            entries = self.schedule.len(),
            poll_secs = poll_interval.as_secs(),
            "base scheduler started"
        );

        loop {
            let wait = self.wait_for(Utc::now(), poll_interval);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.tick(Utc::now());
                }
                _ = shutdown.changed() => {
                    info!("base scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// The first instant strictly after `after` whose wall-clock time in
/// `after`'s zone is `time`.
///
/// Times that do not exist on a given day (DST gaps) move to the next day;
/// ambiguous times resolve to the earlier instant.
pub fn next_occurrence<Tz: TimeZone>(time: NaiveTime, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = after.timezone();
    let today = after.date_naive();
    (0..=2u64).find_map(|offset| {
        let date = today.checked_add_days(Days::new(offset))?;
        let candidate = tz.from_local_datetime(&date.and_time(time)).earliest()?;
        (candidate > *after).then_some(candidate)
    })
}
