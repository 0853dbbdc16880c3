//! Reference date input handling
//!
//! Validation runs at the UI boundary: a date that fails here never
//! reaches the analysis.

use chrono::NaiveDate;
use thiserror::Error;

/// Canonical date text format (`YYYY-MM-DD`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// First day covered by the Sentinel-2 surface reflectance archive
pub const ARCHIVE_START: NaiveDate = match NaiveDate::from_ymd_opt(2018, 4, 1) {
    Some(date) => date,
    None => panic!("invalid archive start"),
};

/// Rejected reference date input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateInputError {
    #[error("expected a date formatted as YYYY-MM-DD, got '{0}'")]
    Malformed(String),

    #[error("'{0}' is not a calendar date")]
    Invalid(String),

    #[error("{date} is outside the imagery archive ({min} to {max})")]
    OutOfRange {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
}

impl DateInputError {
    /// Inline message shown next to the date field
    pub fn user_message(&self) -> &'static str {
        "Please enter a valid date between Apr 2018 and today"
    }
}

/// Format a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a strict `YYYY-MM-DD` date without any range check
pub fn parse_date(input: &str) -> Result<NaiveDate, DateInputError> {
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(DateInputError::Malformed(input.to_string()));
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| DateInputError::Invalid(input.to_string()))
}

/// Validate a user-supplied reference date.
///
/// Accepts `YYYY-MM-DD` dates from [`ARCHIVE_START`] through `today`,
/// both inclusive.
pub fn parse_reference_date(input: &str, today: NaiveDate) -> Result<NaiveDate, DateInputError> {
    let date = parse_date(input)?;
    if date < ARCHIVE_START || date > today {
        return Err(DateInputError::OutOfRange {
            date,
            min: ARCHIVE_START,
            max: today,
        });
    }
    Ok(date)
}

/// Preset reference dates offered next to the date field: midsummer of
/// each archive year through 2022, then today.
pub fn quick_select_dates(today: NaiveDate) -> Vec<(String, NaiveDate)> {
    let mut dates: Vec<(String, NaiveDate)> = (2018..=2022)
        .filter_map(|year| NaiveDate::from_ymd_opt(year, 6, 21))
        .map(|d| (d.format("%Y").to_string(), d))
        .collect();
    dates.push(("Today".to_string(), today));
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn accepts_archive_dates() {
        let d = parse_reference_date("2021-06-21", today()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2021, 6, 21).unwrap());
        assert!(parse_reference_date("2018-04-01", today()).is_ok());
        assert!(parse_reference_date("2026-10-19", today()).is_ok());
    }

    #[test]
    fn rejects_before_archive_start() {
        let err = parse_reference_date("2018-03-31", today()).unwrap_err();
        assert!(matches!(err, DateInputError::OutOfRange { .. }));
    }

    #[test]
    fn rejects_future_dates() {
        let err = parse_reference_date("2026-10-20", today()).unwrap_err();
        assert!(matches!(err, DateInputError::OutOfRange { .. }));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["21-06-2021", "2021/06/21", "2021-6-21", " 2021-06-21", "", "20210621xx"] {
            assert!(
                matches!(parse_reference_date(input, today()), Err(DateInputError::Malformed(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        assert!(matches!(
            parse_reference_date("2021-02-30", today()),
            Err(DateInputError::Invalid(_))
        ));
        assert!(matches!(
            parse_reference_date("2021-13-01", today()),
            Err(DateInputError::Invalid(_))
        ));
    }

    #[test]
    fn quick_select_ends_with_today() {
        let dates = quick_select_dates(today());
        assert_eq!(dates.len(), 6);
        assert_eq!(dates[0].0, "2018");
        assert_eq!(dates[5], ("Today".to_string(), today()));
    }
}
