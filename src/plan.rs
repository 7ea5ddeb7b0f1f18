//! Time-bound plans: "keep doing pomodoros until HH:MM".

use crate::models::{BoundPhase, Settings, TimeBoundPomodoro};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeInputError {
    #[error("Enter a valid time (HH:MM)")]
    Format,
    #[error("Choose a time later than now")]
    NotInFuture,
}

/// Resolves `HH:MM` to that time today in `now`'s time zone.
/// The result must lie strictly after `now`.
pub fn parse_time_input<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, TimeInputError> {
    let time =
        NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| TimeInputError::Format)?;
    let naive = now.date_naive().and_time(time);
    // None only inside a DST gap, where the wall-clock time does not exist.
    let target = now
        .timezone()
        .from_local_datetime(&naive)
        .earliest()
        .ok_or(TimeInputError::Format)?;

    if target <= *now {
        return Err(TimeInputError::NotInFuture);
    }
    Ok(target)
}

/// Builds a plan that fits as many work + short break cycles as possible
/// before `target`, but always at least one.
pub fn plan_until<Tz: TimeZone>(
    target: &DateTime<Tz>,
    now: &DateTime<Tz>,
    settings: &Settings,
    auto_advance: bool,
) -> TimeBoundPomodoro {
    let available = target.clone().signed_duration_since(now.clone()).num_minutes().max(0);
    let cycle = i64::from(settings.work_duration + settings.short_break_duration);
    let sets = (available / cycle).clamp(1, i64::from(u32::MAX));

    TimeBoundPomodoro {
        target_time: target.with_timezone(&Utc),
        // Clamped into u32 range above.
        estimated_sets: sets as u32,
        completed_sets: 0,
        current_phase: BoundPhase::Work,
        auto_advance,
    }
}
