// src/engine/period.rs

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};

/// Parse a "YYYY-MM" month identifier into its first day. Strict: chrono
/// would happily accept "2026-2", but the column is compared as text so
/// every writer must use the padded form.
pub fn parse_month(month: &str) -> AppResult<NaiveDate> {
    let invalid =
        || AppError::Validation(format!("Invalid month '{month}', expected format YYYY-MM"));
    if month.len() != 7 || month.as_bytes()[4] != b'-' {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").map_err(|_| invalid())
}

/// Half-open UTC timestamp range covering the calendar month:
/// `[first day 00:00, first day of next month 00:00)`.
pub fn month_range(month: &str) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = parse_month(month)?;
    let end = start + Months::new(1);
    Ok((
        DateTime::from_naive_utc_and_offset(start.and_time(NaiveTime::MIN), Utc),
        DateTime::from_naive_utc_and_offset(end.and_time(NaiveTime::MIN), Utc),
    ))
}

/// Last calendar day of the month, used as the streak walk horizon.
pub fn last_day(month: &str) -> AppResult<NaiveDate> {
    let start = parse_month(month)?;
    Ok(start + Months::new(1) - chrono::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_month() {
        assert_eq!(
            parse_month("2026-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_months() {
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("2026").is_err());
        assert!(parse_month("Feb 2026").is_err());
        assert!(parse_month("2026-2").is_err());
    }

    #[test]
    fn month_range_is_half_open() {
        let (start, end) = month_range("2026-01").unwrap();
        assert_eq!(start.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-02-01T00:00:00+00:00");
    }

    #[test]
    fn last_day_handles_leap_february() {
        assert_eq!(
            last_day("2024-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day("2026-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }
}
