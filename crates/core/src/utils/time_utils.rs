use chrono::{Datelike, Months, NaiveDate};

use crate::errors::{Error, Result, ValidationError};

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")?)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Shifts `date` by a signed number of whole months, clamping the day to the
/// target month's length.
pub fn shift_months(date: NaiveDate, months: i32) -> Result<NaiveDate> {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.ok_or_else(|| {
        Error::Validation(ValidationError::InvalidInput(format!(
            "Cannot shift {} by {} months",
            date, months
        )))
    })
}

/// Signed number of calendar months from `start`'s month to `target`'s month.
///
/// Only year and month take part; the day of month is ignored.
pub fn month_offset(start: NaiveDate, target: NaiveDate) -> i64 {
    (target.year() as i64 - start.year() as i64) * 12 + target.month() as i64
        - start.month() as i64
}

/// Number of calendar months touched by the inclusive range `[start, end]`.
///
/// Returns 0 when `end` falls in a month before `start`.
pub fn month_count(start: NaiveDate, end: NaiveDate) -> usize {
    let offset = month_offset(start, end);
    if offset < 0 {
        0
    } else {
        offset as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_end_handles_leap_february() {
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 1)), d(2023, 2, 28));
        assert_eq!(month_end(d(2023, 12, 31)), d(2023, 12, 31));
    }

    #[test]
    fn test_month_count_spans_year_boundary() {
        assert_eq!(month_count(d(2023, 11, 15), d(2024, 2, 1)), 4);
        assert_eq!(month_count(d(2024, 3, 1), d(2024, 3, 31)), 1);
        assert_eq!(month_count(d(2024, 3, 1), d(2024, 2, 28)), 0);
    }

    #[test]
    fn test_month_offset_ignores_day() {
        assert_eq!(month_offset(d(2024, 1, 31), d(2024, 2, 1)), 1);
        assert_eq!(month_offset(d(2024, 5, 1), d(2024, 3, 20)), -2);
    }

    #[test]
    fn test_shift_months_backwards_clamps_day() {
        assert_eq!(shift_months(d(2024, 3, 31), -1).unwrap(), d(2024, 2, 29));
        assert_eq!(shift_months(d(2024, 1, 15), -1).unwrap(), d(2023, 12, 15));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(" 2024-06-03 ").unwrap(), d(2024, 6, 3));
        assert!(parse_date("2024/06/03").is_err());
    }
}
