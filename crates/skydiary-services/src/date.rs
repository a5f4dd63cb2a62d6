//! Strict `yyyy-MM-dd` parsing.
//!
//! Chrono alone accepts single-digit months and days and signed years, so the
//! shape is checked byte by byte before the calendar check.

use chrono::NaiveDate;

use crate::error::{DiaryError, DiaryResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a diary date, rejecting anything but a real `yyyy-MM-dd` day.
///
/// # Errors
/// `DiaryError::InvalidDateFormat` for wrong shape or non-existent days
/// such as `2024-02-30`.
pub fn parse_diary_date(input: &str) -> DiaryResult<NaiveDate> {
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(DiaryError::InvalidDateFormat(input.to_string()));
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| DiaryError::InvalidDateFormat(input.to_string()))
}

/// An inclusive `start..=end` range of diary dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatePeriod {
    /// # Errors
    /// `DiaryError::InvalidDatePeriod` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> DiaryResult<Self> {
        if start > end {
            return Err(DiaryError::InvalidDatePeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds strictly, then check their order.
    pub fn parse(start: &str, end: &str) -> DiaryResult<Self> {
        let start = parse_diary_date(start)?;
        let end = parse_diary_date(end)?;
        Self::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_parses_exact_day() {
        let date = parse_diary_date("2024-06-29").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 29).unwrap());
    }

    #[test]
    fn test_leap_day() {
        assert!(parse_diary_date("2024-02-29").is_ok());
        assert!(parse_diary_date("2023-02-29").is_err());
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in [
            "2024/06/29",
            "2024-6-29",
            "2024-06-9",
            "24-06-29",
            "+2024-06-29",
            "2024-06-29 ",
            " 2024-06-29",
            "2024-06-29T00:00",
            "２０２４-06-29",
            "",
            "yyyy-MM-dd",
        ] {
            assert!(
                matches!(parse_diary_date(input), Err(DiaryError::InvalidDateFormat(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_rejects_calendar_overflow() {
        for input in ["2024-02-30", "2024-13-01", "2024-00-10", "2024-04-31", "2024-06-00"] {
            assert!(
                matches!(parse_diary_date(input), Err(DiaryError::InvalidDateFormat(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_period_order() {
        assert!(DatePeriod::parse("2024-06-29", "2024-06-29").is_ok());
        assert!(matches!(
            DatePeriod::parse("2024-06-30", "2024-06-29"),
            Err(DiaryError::InvalidDatePeriod { .. })
        ));
    }

    #[test]
    fn test_period_format_checked_before_order() {
        assert!(matches!(
            DatePeriod::parse("2024-06-30", "2024/06/29"),
            Err(DiaryError::InvalidDateFormat(_))
        ));
    }
}
