//! Pure time formatting for session rows and message headers.

use chrono::{DateTime, TimeZone};

/// Bucketed label for how long ago `then` was, relative to `now`.
///
/// Counts are floored. Anything a week or older is shown as a date.
pub fn relative_time<Tz: TimeZone>(now: &DateTime<Tz>, then: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let elapsed = now.clone().signed_duration_since(then.clone());

    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        ago(minutes, "minute")
    } else if hours < 24 {
        ago(hours, "hour")
    } else if days < 7 {
        ago(days, "day")
    } else {
        then.format("%Y-%m-%d").to_string()
    }
}

fn ago(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Header label for a message: the time for today's messages, date and time
/// otherwise.
pub fn message_time_label<Tz: TimeZone>(now: &DateTime<Tz>, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if now.date_naive() == at.date_naive() {
        at.format("%H:%M").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}
