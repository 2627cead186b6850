//! Accounting periods: the window over which caps and minimum spend accumulate.
//!
//! The engine never hardcodes a calendar rule; callers inject any
//! [`AccountingPeriod`], including a plain closure over the date.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::error::{CashbackError, Result};

pub trait AccountingPeriod {
    fn contains(&self, date: NaiveDate) -> bool;
}

impl<F> AccountingPeriod for F
where
    F: Fn(NaiveDate) -> bool,
{
    fn contains(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

/// A calendar month, the conventional statement period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

impl CalendarMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl AccountingPeriod for CalendarMonth {
    fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for CalendarMonth {
    type Err = CashbackError;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map(Self::of)
            .map_err(|_| CashbackError::InvalidPeriod(s.to_string()))
    }
}

/// Every date qualifies. For hosts that pre-filter their snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllTime;

impl AccountingPeriod for AllTime {
    fn contains(&self, _date: NaiveDate) -> bool {
        true
    }
}
