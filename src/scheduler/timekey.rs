use chrono::{Datelike, Timelike};

use crate::error::{AppError, Result};

pub fn day_key<T: Datelike>(moment: &T) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        moment.year(),
        moment.month(),
        moment.day()
    )
}

pub fn minute_key<T: Timelike>(moment: &T) -> String {
    format!("{:02}:{:02}", moment.hour(), moment.minute())
}

pub fn run_key<T: Datelike + Timelike>(moment: &T) -> String {
    format!("{}-{}", day_key(moment), minute_key(moment))
}

// Checks that `value` is a zero-padded `HH:mm` string that `minute_key`
// can produce.
pub fn validate_minute_key(value: &str) -> Result<()> {
    let invalid = || AppError::InvalidSchedule(format!("expected HH:mm, got {value:?}"));

    let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;
    if hour.len() != 2 || minute.len() != 2 {
        return Err(invalid());
    }
    if !hour.chars().chain(minute.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(())
}
