//! Date handling for the disturbance analysis
//!
//! - Window resolution: reference date → post window and the same window
//!   one year earlier
//! - Reference date input: format/range validation at the UI boundary,
//!   canonical formatting and the quick-select dates

mod input;
mod windows;

pub use input::{
    format_date, parse_date, parse_reference_date, quick_select_dates, DateInputError,
    ARCHIVE_START, DATE_FORMAT,
};
pub use windows::{resolve_windows, AnalysisWindows, TimeWindow, DEFAULT_WINDOW_DAYS};
