use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Timestamps without an offset, read as UTC
const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, RFC 3339 timestamps (the date part,
/// in UTC) and offset-less `YYYY-MM-DD[T ]HH:MM[:SS]` timestamps. Anything
/// else yields `None`; callers decide the fallback.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    calendar_date(s).or_else(|| timestamp(s).map(|dt| dt.date_naive()))
}

/// Parse a date or timestamp into an instant.
///
/// A bare date is midnight UTC of that day; a timestamp keeps its time of
/// day.
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    calendar_date(s).map(start_of_day).or_else(|| timestamp(s))
}

fn calendar_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Format a date the way the store keeps it (`YYYY-MM-DD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Calendar month index (`year * 12 + month0`), convenient for month
/// arithmetic without worrying about day-of-month overflow.
pub fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// First day of the month with the given month index.
pub fn month_start(index: i32) -> Option<NaiveDate> {
    let year = index.div_euclid(12);
    let month0 = index.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Short month name and four-digit year, e.g. `Jan 2025`.
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}
