use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a sampling date (`dateprel`) into a calendar date.
///
/// Fast path for `YYYY-MM-DD` / `YYYY/MM/DD`; falls back to a few
/// date-time layouts seen in the yearly exports. Time of day is dropped.
pub fn parse_sample_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim().trim_matches('"');

    if s.len() == 10 {
        let sep = s.get(4..5)?;
        if (sep == "-" || sep == "/") && s.get(7..8)? == sep {
            let year: i32 = s.get(0..4)?.parse().ok()?;
            let month: u32 = s.get(5..7)?.parse().ok()?;
            let day: u32 = s.get(8..10)?.parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}
