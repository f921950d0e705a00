use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use std::fmt::Display;

/// Parse a reminder time relative to `now`.
///
/// Accepted forms:
/// - `30m`, `2h`, `1d`: offset from now
/// - `HH:MM`: today at that time, or tomorrow if it has already passed
/// - `MM-DD HH:MM` or `YYYY-MM-DD HH:MM`: an absolute date (current year by default)
///
/// The result is not checked to be in the future; callers decide that.
pub fn parse_time_string<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let input = input.trim();

    if let Some(offset) = parse_relative(input) {
        return now
            .clone()
            .checked_add_signed(offset?)
            .ok_or_else(|| anyhow!("Time is too far in the future"));
    }

    if let Some(time) = parse_clock(input) {
        let today = now.date_naive().and_time(time);
        let target = resolve_local(&now.timezone(), today)?;
        if target <= *now {
            return resolve_local(&now.timezone(), today + Duration::days(1));
        }
        return Ok(target);
    }

    if let Some((date_part, time_part)) = input.split_once(char::is_whitespace) {
        let time = parse_clock(time_part.trim())
            .ok_or_else(|| anyhow!("Invalid time '{}', expected HH:MM", time_part.trim()))?;
        let date = parse_date(date_part, now.year())?;
        return resolve_local(&now.timezone(), date.and_time(time));
    }

    Err(anyhow!(
        "Unrecognized time '{}'. Use 30m, 2h, 1d, HH:MM or MM-DD HH:MM",
        input
    ))
}

fn parse_relative(input: &str) -> Option<Result<Duration>> {
    let last = input.chars().last()?;
    let digits = &input[..input.len() - last.len_utf8()];
    let unit = last.to_ascii_lowercase();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !matches!(unit, 'm' | 'h' | 'd') {
        return None;
    }

    let value: i64 = match digits.parse() {
        Ok(v) => v,
        Err(_) => return Some(Err(anyhow!("Time offset is too large"))),
    };
    let offset = match unit {
        'm' => Duration::try_minutes(value),
        'h' => Duration::try_hours(value),
        _ => Duration::try_days(value),
    };
    Some(offset.ok_or_else(|| anyhow!("Time offset is too large")))
}

fn parse_clock(input: &str) -> Option<NaiveTime> {
    let (hour, minute) = input.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

fn parse_date(input: &str, current_year: i32) -> Result<NaiveDate> {
    let parts: Vec<&str> = input.split('-').collect();
    let (year, month, day) = match parts.as_slice() {
        [month, day] => (current_year, *month, *day),
        [year, month, day] if year.len() == 4 => (
            year.parse().map_err(|_| anyhow!("Invalid year '{}'", year))?,
            *month,
            *day,
        ),
        _ => return Err(anyhow!("Invalid date '{}', expected MM-DD or YYYY-MM-DD", input)),
    };

    let month: u32 = month.parse().map_err(|_| anyhow!("Invalid month '{}'", month))?;
    let day: u32 = day.parse().map_err(|_| anyhow!("Invalid day '{}'", day))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow!("Date {}-{:02}-{:02} does not exist", year, month, day))
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("Time {} does not exist in this timezone", naive))
}

/// Short human format used in replies, e.g. `2025-03-14 09:30`.
pub fn format_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_offsets() {
        assert_eq!(parse_time_string("30m", &now()).unwrap(), now() + Duration::minutes(30));
        assert_eq!(parse_time_string("2h", &now()).unwrap(), now() + Duration::hours(2));
        assert_eq!(parse_time_string("1D", &now()).unwrap(), now() + Duration::days(1));
    }

    #[test]
    fn test_clock_today_or_tomorrow() {
        let later = parse_time_string("18:30", &now()).unwrap();
        assert_eq!(later, Utc.with_ymd_and_hms(2025, 3, 14, 18, 30, 0).unwrap());

        let earlier = parse_time_string("9:05", &now()).unwrap();
        assert_eq!(earlier, Utc.with_ymd_and_hms(2025, 3, 15, 9, 5, 0).unwrap());

        let exact = parse_time_string("12:00", &now()).unwrap();
        assert_eq!(exact, Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_absolute_dates() {
        let short = parse_time_string("12-25 10:00", &now()).unwrap();
        assert_eq!(short, Utc.with_ymd_and_hms(2025, 12, 25, 10, 0, 0).unwrap());

        let full = parse_time_string("2026-01-02 07:15", &now()).unwrap();
        assert_eq!(full, Utc.with_ymd_and_hms(2026, 1, 2, 7, 15, 0).unwrap());

        // Past dates parse; the caller rejects them.
        let past = parse_time_string("01-01 00:00", &now()).unwrap();
        assert!(past < now());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(parse_time_string("", &now()).is_err());
        assert!(parse_time_string("soon", &now()).is_err());
        assert!(parse_time_string("10x", &now()).is_err());
        assert!(parse_time_string("25:00", &now()).is_err());
        assert!(parse_time_string("12:60", &now()).is_err());
        assert!(parse_time_string("02-30 10:00", &now()).is_err());
        assert!(parse_time_string("12-25 noon", &now()).is_err());
        assert!(parse_time_string("99999999999999999999m", &now()).is_err());
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime(&now()), "2025-03-14 12:00");
    }
}
