//! Pre/post disturbance windows

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use nbrwatch_core::{Error, Result};
use serde::{Deserialize, Serialize};

use super::input::format_date;

/// Default length of both analysis windows, in days
pub const DEFAULT_WINDOW_DAYS: u32 = 60;

/// Half-open calendar interval `[start, end)`.
///
/// Imagery acquired on `end` belongs to the next window, matching how
/// archive queries filter by acquisition date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct WindowBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<WindowBounds> for TimeWindow {
    type Error = Error;

    fn try_from(bounds: WindowBounds) -> Result<Self> {
        Self::new(bounds.start, bounds.end)
    }
}

impl TimeWindow {
    /// Create a window; fails when `end` precedes `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidParameter {
                name: "window",
                value: format!("{} .. {}", start, end),
                reason: "end precedes start".into(),
            });
        }
        Ok(Self { start, end })
    }

    /// First day inside the window
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the window
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside `[start, end)`
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Number of days covered
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Calendar year of the window start, used to label layers
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// The same window `years` calendar years earlier.
    ///
    /// Month and day are kept; 29 February becomes 28 February in a
    /// non-leap target year.
    pub fn years_earlier(&self, years: u32) -> Result<Self> {
        let months = Months::new(12 * years);
        Ok(Self {
            start: sub_months(self.start, months)?,
            end: sub_months(self.end, months)?,
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", format_date(self.start), format_date(self.end))
    }
}

fn sub_months(date: NaiveDate, months: Months) -> Result<NaiveDate> {
    date.checked_sub_months(months).ok_or_else(|| overflow(date))
}

fn overflow(date: NaiveDate) -> Error {
    Error::InvalidParameter {
        name: "date",
        value: date.to_string(),
        reason: "outside the representable calendar range".into(),
    }
}

/// The two windows compared by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindows {
    /// Starts the day after the reference date
    pub post: TimeWindow,
    /// `post` moved back one calendar year
    pub pre: TimeWindow,
}

/// Resolve the post-disturbance window following `reference` and the
/// matching pre-disturbance window one year earlier.
///
/// ```text
/// post.start = reference + 1 day
/// post.end   = post.start + window_days
/// pre.start  = post.start - 1 year
/// pre.end    = post.end - 1 year
/// ```
///
/// The only failure is leaving chrono's representable date range.
pub fn resolve_windows(reference: NaiveDate, window_days: u32) -> Result<AnalysisWindows> {
    let start = reference
        .checked_add_days(Days::new(1))
        .ok_or_else(|| overflow(reference))?;
    let end = start
        .checked_add_days(Days::new(u64::from(window_days)))
        .ok_or_else(|| overflow(start))?;

    let post = TimeWindow { start, end };
    let pre = post.years_earlier(1)?;

    Ok(AnalysisWindows { post, pre })
}
