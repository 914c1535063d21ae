//! Randomized daily trigger computation and persisted schedule state.
//!
//! The daemon posts once per day at a uniformly random instant inside a
//! configured window, in a configured time zone. Randomizing inside the
//! window avoids a detectable fixed-time posting pattern. The chosen instant
//! is persisted so a restart honors an already-computed trigger instead of
//! re-rolling it.

use crate::error::{PosterError, Result};
use crate::storage;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Daily posting window in a fixed time zone.
#[derive(Debug, Clone)]
pub struct PostingWindow {
    start_hour: u32,
    end_hour: u32,
    end_minute: u32,
    tz: Tz,
}

impl PostingWindow {
    /// Build a window from the schedule configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range hours/minutes, an inverted window,
    /// or an unknown time zone.
    pub fn from_config(config: &crate::config::ScheduleConfig) -> Result<Self> {
        if config.start_hour > 23 || config.end_hour > 23 || config.end_minute > 59 {
            return Err(PosterError::Schedule(format!(
                "window out of range: {}:00-{}:{:02}",
                config.start_hour, config.end_hour, config.end_minute
            )));
        }
        if config.start_hour > config.end_hour {
            return Err(PosterError::Schedule(format!(
                "window start {} is after end {}",
                config.start_hour, config.end_hour
            )));
        }
        Ok(Self {
            start_hour: config.start_hour,
            end_hour: config.end_hour,
            end_minute: config.end_minute,
            tz: config.tz()?,
        })
    }

    /// Compute the next trigger instant from `now`.
    ///
    /// Draws a random instant inside today's window; if the draw has already
    /// passed, draws inside tomorrow's window instead.
    pub fn next_trigger(&self, now: DateTime<Utc>) -> Result<DateTime<FixedOffset>> {
        let today = now.with_timezone(&self.tz).date_naive();
        let draw = self.draw_in_day(today)?;
        if draw.with_timezone(&Utc) > now {
            return Ok(draw.fixed_offset());
        }
        self.draw_in_day(next_day(today)?).map(|dt| dt.fixed_offset())
    }

    /// Compute a trigger for the day after `now`.
    ///
    /// Used after a completed cycle so a second trigger can never land on
    /// the same calendar day.
    pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<FixedOffset>> {
        let today = now.with_timezone(&self.tz).date_naive();
        self.draw_in_day(next_day(today)?).map(|dt| dt.fixed_offset())
    }

    /// Uniform random instant in `[start_hour:00:00, end_hour:end_minute:59]`
    /// of the given day.
    fn draw_in_day(&self, day: NaiveDate) -> Result<DateTime<Tz>> {
        let span_secs =
            u64::from(self.end_hour * 3600 + self.end_minute * 60 + 60 - self.start_hour * 3600);
        let offset_micros = rand::thread_rng().gen_range(0..span_secs * 1_000_000);

        let start = day
            .and_hms_opt(self.start_hour, 0, 0)
            .ok_or_else(|| PosterError::Schedule(format!("invalid window start on {day}")))?;
        let naive = start + Duration::microseconds(offset_micros as i64);

        // A zone transition can make the drawn local time ambiguous or
        // nonexistent; take the earliest mapping, shifting across a gap.
        let local = self.tz.from_local_datetime(&naive);
        local
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .ok_or_else(|| {
                PosterError::Schedule(format!("cannot map {naive} into zone {}", self.tz))
            })
    }
}

fn next_day(day: NaiveDate) -> Result<NaiveDate> {
    day.succ_opt()
        .ok_or_else(|| PosterError::Schedule(format!("no day after {day}")))
}

/// Persisted schedule state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleState {
    /// The next computed trigger instant, absent before the first cycle.
    pub next_trigger_at: Option<DateTime<FixedOffset>>,
}

/// Schedule state backed by a single JSON file.
pub struct ScheduleStore {
    state: ScheduleState,
    path: PathBuf,
}

impl ScheduleStore {
    /// Load the store; a missing file yields an empty state.
    pub fn load(path: PathBuf) -> Result<Self> {
        let state: ScheduleState = storage::load_json(&path)?.unwrap_or_default();
        Ok(Self { state, path })
    }

    /// The persisted trigger instant, if any.
    #[must_use]
    pub fn next_trigger_at(&self) -> Option<DateTime<FixedOffset>> {
        self.state.next_trigger_at
    }

    /// Persist a newly computed trigger instant.
    pub fn set(&mut self, trigger: DateTime<FixedOffset>) -> Result<()> {
        let state = ScheduleState {
            next_trigger_at: Some(trigger),
        };
        storage::save_json(&self.path, &state)?;
        self.state = state;
        Ok(())
    }
}
