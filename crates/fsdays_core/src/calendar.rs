//! Elapsed-day arithmetic for a change of days per period.
//!
//! The game stores a single running `currentDay` counter and derives the
//! month and day-of-month from it using the configured period length. When the
//! period length changes the counter has to be rebuilt so that the number of
//! fully completed periods stays the same.

use serde::Serialize;

use crate::core_api::{CoreError, CoreErrorCode};

/// How the day within the current period is chosen after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayPolicy {
    /// Keep the old day-of-period, clamped to the new period length.
    KeepDay,
    /// Jump to this 1-based day of the current period.
    Target(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayShift {
    pub old_current_day: i64,
    pub old_days_per_period: i64,
    pub new_days_per_period: i64,
    pub old_day_in_period: i64,
    pub periods_completed: i64,
    pub day_in_period: i64,
    pub new_current_day: i64,
}

pub fn validate_days_per_period(days: i64) -> Result<i64, CoreError> {
    if days < 1 {
        return Err(CoreError::new(
            CoreErrorCode::InvalidConfiguration,
            format!("days per period must be positive, got {days}"),
        ));
    }
    Ok(days)
}

pub fn validate_policy(policy: DayPolicy, new_days: i64) -> Result<(), CoreError> {
    match policy {
        DayPolicy::KeepDay => Ok(()),
        DayPolicy::Target(day) if (1..=new_days).contains(&day) => Ok(()),
        DayPolicy::Target(day) => Err(CoreError::new(
            CoreErrorCode::InvalidTargetDay,
            format!("target day must be 1..{new_days}, got {day}"),
        )),
    }
}

/// 1-based day within the last (possibly partial) period.
pub fn day_in_period(current_day: i64, days_per_period: i64) -> i64 {
    let day = (i128::from(current_day) - 1).rem_euclid(i128::from(days_per_period)) + 1;
    i64::try_from(day).unwrap_or(days_per_period)
}

pub fn recompute_current_day(
    old_current: i64,
    old_days: i64,
    new_days: i64,
    policy: DayPolicy,
) -> Result<DayShift, CoreError> {
    let old_days = validate_days_per_period(old_days)?;
    let new_days = validate_days_per_period(new_days)?;
    validate_policy(policy, new_days)?;

    let old_day_in_period = day_in_period(old_current, old_days);
    let periods_completed = old_current
        .checked_sub(old_day_in_period)
        .ok_or_else(|| out_of_range(old_current, new_days))?
        .div_euclid(old_days);
    let day_in_period = match policy {
        DayPolicy::KeepDay => old_day_in_period.clamp(1, new_days),
        DayPolicy::Target(day) => day,
    };

    let new_current_day = periods_completed
        .checked_mul(new_days)
        .and_then(|days| days.checked_add(day_in_period))
        .ok_or_else(|| out_of_range(old_current, new_days))?;

    Ok(DayShift {
        old_current_day: old_current,
        old_days_per_period: old_days,
        new_days_per_period: new_days,
        old_day_in_period,
        periods_completed,
        day_in_period,
        new_current_day,
    })
}

fn out_of_range(old_current: i64, new_days: i64) -> CoreError {
    CoreError::new(
        CoreErrorCode::InvalidConfiguration,
        format!("currentDay {old_current} cannot be expressed with {new_days} days per period"),
    )
}
