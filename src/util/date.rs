use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

/// Time of day written for sources that only publish a calendar date.
const PLACEHOLDER_TIME: &str = "00:00:00";

/// Calendar patterns used by the scraped sites.
///
/// Month names are English and matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DateFormat {
    /// `01/02/2023` (day first)
    #[serde(rename = "dd/mm/yyyy")]
    DayMonthYear,
    /// `2 January 2006`
    #[serde(rename = "d month yyyy")]
    DayMonthNameYear,
    /// `December 2025`, read as the first of the month
    #[serde(rename = "month yyyy")]
    MonthNameYear,
}

impl DateFormat {
    /// Parse a trimmed date token according to this pattern.
    ///
    /// The token must spell the date exactly as the pattern renders it, up to
    /// ASCII case: zero padding where the pattern pads, full month names,
    /// single spaces. Anything looser is markup drift and yields `None`.
    pub fn parse(self, token: &str) -> Option<NaiveDate> {
        let (date, spellings): (NaiveDate, &[&str]) = match self {
            DateFormat::DayMonthYear => (
                NaiveDate::parse_from_str(token, "%d/%m/%Y").ok()?,
                &["%d/%m/%Y"][..],
            ),
            DateFormat::DayMonthNameYear => (
                NaiveDate::parse_from_str(token, "%d %B %Y").ok()?,
                &["%-d %B %Y", "%d %B %Y"][..],
            ),
            DateFormat::MonthNameYear => (
                NaiveDate::parse_from_str(&format!("1 {token}"), "%d %B %Y").ok()?,
                &["%B %Y"][..],
            ),
        };
        spellings
            .iter()
            .any(|spelling| date.format(spelling).to_string().eq_ignore_ascii_case(token))
            .then_some(date)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pattern = match self {
            DateFormat::DayMonthYear => "dd/mm/yyyy",
            DateFormat::DayMonthNameYear => "d month yyyy",
            DateFormat::MonthNameYear => "month yyyy",
        };
        f.write_str(pattern)
    }
}

/// Render a date in the feed's pubDate convention (RFC 822 with a 4-digit year).
///
/// ```
/// use chrono::NaiveDate;
/// use rss_builder::util::format_pub_date;
///
/// let date = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
/// assert_eq!(format_pub_date(date), "Wed, 01 Feb 2023 00:00:00 UTC");
/// ```
pub fn format_pub_date(date: NaiveDate) -> String {
    format!("{} {} UTC", date.format("%a, %d %b %Y"), PLACEHOLDER_TIME)
}
