// src/dates.rs

use crate::error::BillingError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use time::{Date, Month};

/// Optional time-of-day suffix after a calendar date, e.g. " 10:00:00",
/// "T10:00:00.000Z", " 9:30 PM".
const TIME_OF_DAY: &str =
    r"(?:[T ]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?\s*(?:Z|[+-]\d{2}:?\d{2}|[AaPp][Mm])?)?";

/// `2025-03-07`, `2025/3/7`
static YEAR_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(\d{{4}})[-/](\d{{1,2}})[-/](\d{{1,2}}){TIME_OF_DAY}$"))
        .expect("hardcoded regex should be valid")
});

/// `3/7/2025`, `03/07/2025`
static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(\d{{1,2}})/(\d{{1,2}})/(\d{{4}}){TIME_OF_DAY}$"))
        .expect("hardcoded regex should be valid")
});

/// `Mar 7, 2025`, `March 7th 2025`, `Sept. 7, 2025`
static MONTH_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^([A-Za-z]{{3,9}})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}}){TIME_OF_DAY}$"
    ))
    .expect("hardcoded regex should be valid")
});

/// `7 Mar 2025`, `7 March, 2025`
static DAY_FIRST_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(\d{{1,2}})\s+([A-Za-z]{{3,9}})\.?,?\s+(\d{{4}}){TIME_OF_DAY}$"
    ))
    .expect("hardcoded regex should be valid")
});

/// Outcome of reading a listing-date cell.
///
/// Both the date filter and the invoice date cell branch on this value, so
/// the fallback for bad input is explicit rather than a swallowed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingDate {
    Parsed(Date),
    /// Non-empty text that is not a recognisable calendar date.
    Unparsed(String),
    Missing,
}

impl ListingDate {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return ListingDate::Missing;
        };
        match parse_calendar_date(raw) {
            Some(date) => ListingDate::Parsed(date),
            None => ListingDate::Unparsed(raw.to_string()),
        }
    }

    pub fn date(&self) -> Option<Date> {
        match self {
            ListingDate::Parsed(date) => Some(*date),
            _ => None,
        }
    }

    /// Text for the invoice "Date" column: `M/D/YYYY` when parsed, the first
    /// whitespace-delimited token of the raw text otherwise, empty if absent.
    pub fn cell_text(&self) -> String {
        match self {
            ListingDate::Parsed(date) => format_us_date(*date),
            ListingDate::Unparsed(raw) => raw.split_whitespace().next().unwrap_or("").to_string(),
            ListingDate::Missing => String::new(),
        }
    }
}

fn parse_calendar_date(raw: &str) -> Option<Date> {
    let (year, month, day): (i32, Month, u8) = if let Some(c) = YEAR_FIRST.captures(raw) {
        (c[1].parse().ok()?, numeric_month(&c[2])?, c[3].parse().ok()?)
    } else if let Some(c) = MONTH_FIRST.captures(raw) {
        (c[3].parse().ok()?, numeric_month(&c[1])?, c[2].parse().ok()?)
    } else if let Some(c) = MONTH_NAME_FIRST.captures(raw) {
        (c[3].parse().ok()?, month_from_name(&c[1])?, c[2].parse().ok()?)
    } else if let Some(c) = DAY_FIRST_NAMED.captures(raw) {
        (c[3].parse().ok()?, month_from_name(&c[2])?, c[1].parse().ok()?)
    } else {
        return None;
    };
    Date::from_calendar_date(year, month, day).ok()
}

fn numeric_month(text: &str) -> Option<Month> {
    Month::try_from(text.parse::<u8>().ok()?).ok()
}

/// English month name or a prefix of at least three letters ("Mar", "Sept").
fn month_from_name(name: &str) -> Option<Month> {
    let name = name.to_ascii_lowercase();
    (1..=12u8)
        .filter_map(|n| Month::try_from(n).ok())
        .find(|month| month.to_string().to_ascii_lowercase().starts_with(&name))
}

/// `M/D/YYYY` with no leading zeros.
pub fn format_us_date(date: Date) -> String {
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

/// The (month, year) pair an invoice covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub month: Month,
    pub year: i32,
}

impl BillingPeriod {
    pub fn new(month: u8, year: i32) -> Result<Self, BillingError> {
        let month = Month::try_from(month).map_err(|_| BillingError::InvalidDate(month))?;
        Ok(Self { month, year })
    }

    pub fn contains(&self, date: Date) -> bool {
        date.month() == self.month && date.year() == self.year
    }

    pub fn month_number(&self) -> u8 {
        u8::from(self.month)
    }
}

impl fmt::Display for BillingPeriod {
    /// "March 2025"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}
