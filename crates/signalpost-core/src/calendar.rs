//! Calendar gate — decides whether a date counts as an eligible business day.
//!
//! Pure and infallible: a date outside the configured holiday years simply
//! falls through to the weekday check, so the caller only has to refresh the
//! holiday list once a year.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;

/// A fixed holiday calendar plus the weekday rule.
#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar {
    holidays: HashSet<NaiveDate>,
}

impl BusinessCalendar {
    /// Build a calendar from externally supplied holiday dates.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// True if `date` is a weekday and not a configured public holiday.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Number of configured holidays.
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}
