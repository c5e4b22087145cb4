//! Conversion between the API's compact period encodings and calendar dates.
//!
//! The API writes periods as `2003` (year), `2003M05` (month) or `2003Q2`
//! (quarter). Parsing maps each to the first day of the period; formatting
//! goes the other way for a requested [`Frequency`].

use crate::error::DateError;
use crate::models::Row;
use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static PATTERN_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static PATTERN_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})M(\d{1,2})").unwrap());
static PATTERN_QUARTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})Q(\d{1,2})").unwrap());

/// Values that stand in for a date: "most recent value" and "no value".
const SENTINELS: [&str; 2] = ["MRV", "-"];

/// Period granularity of a date parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Frequency {
    #[default]
    Year,
    Month,
    Quarter,
}

impl Frequency {
    pub fn tag(self) -> &'static str {
        match self {
            Frequency::Year => "Y",
            Frequency::Month => "M",
            Frequency::Quarter => "Q",
        }
    }
}

impl FromStr for Frequency {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Y" => Ok(Frequency::Year),
            "M" => Ok(Frequency::Month),
            "Q" => Ok(Frequency::Quarter),
            other => Err(DateError::UnknownFrequency(other.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A date given either as a calendar date or as text to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Date(NaiveDate),
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

/// One date or an inclusive `start:end` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dates {
    Single(DateInput),
    Range(DateInput, DateInput),
}

impl From<DateInput> for Dates {
    fn from(d: DateInput) -> Self {
        Dates::Single(d)
    }
}

impl From<NaiveDate> for Dates {
    fn from(d: NaiveDate) -> Self {
        Dates::Single(d.into())
    }
}

impl From<&str> for Dates {
    fn from(s: &str) -> Self {
        Dates::Single(s.into())
    }
}

impl From<String> for Dates {
    fn from(s: String) -> Self {
        Dates::Single(s.into())
    }
}

impl<A: Into<DateInput>, B: Into<DateInput>> From<(A, B)> for Dates {
    fn from((start, end): (A, B)) -> Self {
        Dates::Range(start.into(), end.into())
    }
}

impl Dates {
    /// Read `"2010"` or `"2010:2020"` style text. Free-text dates may contain
    /// colons themselves (`2021-07-15T10:00:00Z`), so text that parses as one
    /// date stays whole, and a range is split at the first colon where both
    /// halves parse. Anything else splits at the first colon and fails later,
    /// in [`format_dates`].
    pub fn from_arg(s: &str) -> Self {
        let s = s.trim();
        let parses = |t: &str| parse_date(&t.into()).is_ok();
        if parses(s) {
            return s.into();
        }
        let split = |i: usize| (s[..i].trim(), s[i + 1..].trim());
        s.match_indices(':')
            .map(|(i, _)| split(i))
            .find(|&(a, b)| parses(a) && parses(b))
            .or_else(|| s.find(':').map(|i| split(i)))
            .map_or_else(|| s.into(), Into::into)
    }
}

fn ymd(year: i32, month: u32, text: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| DateError::Parse(text.to_string()))
}

fn leading_int<T: FromStr>(s: &str, text: &str) -> Result<T, DateError> {
    s.parse().map_err(|_| DateError::Parse(text.to_string()))
}

/// `"2003"` → 2003-01-01.
pub fn parse_year(s: &str) -> Result<NaiveDate, DateError> {
    let year = leading_int(s.trim(), s)?;
    ymd(year, 1, s)
}

/// `"2003M12"` → 2003-12-01.
pub fn parse_month(s: &str) -> Result<NaiveDate, DateError> {
    let caps = PATTERN_MONTH
        .captures(s)
        .ok_or_else(|| DateError::Parse(s.to_string()))?;
    ymd(leading_int(&caps[1], s)?, leading_int(&caps[2], s)?, s)
}

/// `"2003Q2"` → 2003-04-01.
pub fn parse_quarter(s: &str) -> Result<NaiveDate, DateError> {
    let caps = PATTERN_QUARTER
        .captures(s)
        .ok_or_else(|| DateError::Parse(s.to_string()))?;
    let quarter: u32 = leading_int(&caps[2], s)?;
    if !(1..=4).contains(&quarter) {
        return Err(DateError::Parse(s.to_string()));
    }
    ymd(leading_int(&caps[1], s)?, 3 * (quarter - 1) + 1, s)
}

/// Parse a compact period string, falling back to common free-text formats.
/// Dates pass through unchanged.
pub fn parse_date(input: &DateInput) -> Result<NaiveDate, DateError> {
    let s = match input {
        DateInput::Date(d) => return Ok(*d),
        DateInput::Text(s) => s.trim(),
    };
    if PATTERN_YEAR.is_match(s) {
        return parse_year(s);
    }
    if is_full_match(&PATTERN_MONTH, s) {
        return parse_month(s);
    }
    if is_full_match(&PATTERN_QUARTER, s) {
        return parse_quarter(s);
    }
    parse_free_text(s).ok_or_else(|| DateError::Parse(s.to_string()))
}

fn is_full_match(re: &Regex, s: &str) -> bool {
    re.find(s).is_some_and(|m| m.end() == s.len())
}

const DAY_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const MONTH_FORMATS: &[&str] = &["%b %Y", "%B %Y", "%Y-%m", "%Y/%m", "%m/%Y"];

/// Best-effort parse of human-written dates ("Feb 3, 2025", "May 2018",
/// RFC 3339 timestamps). Month-only inputs resolve to the first of the month.
fn parse_free_text(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    if let Some(d) = DAY_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    // chrono needs a day to build a date; pin it to the 1st.
    let pinned = format!("{s} 1");
    MONTH_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(&pinned, &format!("{f} %d")).ok())
}

/// Render a date at the given frequency: `2003`, `2003M05` or `2003Q2`.
pub fn format_date(date: NaiveDate, freq: Frequency) -> String {
    match freq {
        Frequency::Year => date.format("%Y").to_string(),
        Frequency::Month => date.format("%YM%m").to_string(),
        Frequency::Quarter => format!("{}Q{}", date.year(), date.month0() / 3 + 1),
    }
}

/// [`format_date`] with the frequency given as its tag (`"Y"`, `"M"`, `"Q"`).
pub fn format_date_tag(date: NaiveDate, freq: &str) -> Result<String, DateError> {
    Ok(format_date(date, freq.parse()?))
}

/// Build the API's `date` parameter from one date or a `start:end` range.
///
/// ```
/// use chrono::NaiveDate;
/// use wbdata::dates::{format_dates, Frequency};
///
/// let start = NaiveDate::from_ymd_opt(2006, 2, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2008, 10, 1).unwrap();
/// assert_eq!(format_dates((start, end), Frequency::Quarter)?, "2006Q1:2008Q4");
/// assert_eq!(format_dates("2020M01", Frequency::Year)?, "2020");
/// # Ok::<(), wbdata::DateError>(())
/// ```
pub fn format_dates(dates: impl Into<Dates>, freq: Frequency) -> Result<String, DateError> {
    let one = |d: &DateInput| parse_date(d).map(|d| format_date(d, freq));
    match dates.into() {
        Dates::Single(d) => one(&d),
        Dates::Range(start, end) => Ok(format!("{}:{}", one(&start)?, one(&end)?)),
    }
}

/// Rewrite each row's `date` field in place as an ISO `YYYY-MM-DD` string.
///
/// The first row decides the encoding for the whole collection. `MRV`, `-`
/// and non-string values are left alone, and so are dates already rewritten,
/// so running this twice is harmless. Nothing happens when the first row's
/// date is not a string.
pub fn parse_row_dates(rows: &mut [Row]) -> Result<(), DateError> {
    let Some(Value::String(first)) = rows.first().and_then(|r| r.get("date")) else {
        return Ok(());
    };
    let converter: fn(&str) -> Result<NaiveDate, DateError> = if PATTERN_MONTH.is_match(first) {
        parse_month
    } else if PATTERN_QUARTER.is_match(first) {
        parse_quarter
    } else {
        parse_year
    };
    for row in rows.iter_mut() {
        let Some(Value::String(date)) = row.get("date") else {
            continue;
        };
        if SENTINELS.iter().any(|s| date.contains(s)) {
            continue;
        }
        let parsed = converter(date)?;
        row.insert("date".into(), Value::String(parsed.format("%Y-%m-%d").to_string()));
    }
    Ok(())
}
