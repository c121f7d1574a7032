// src/scrape/extract/date.rs
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{4})[-/]([0-9]{1,2})[-/]([0-9]{1,2})").expect("ymd regex"));
static RE_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2})[-/]([0-9]{1,2})[-/]([0-9]{4})").expect("dmy regex"));
static RE_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+([0-9]{1,2})(?:st|nd|rd|th)?,?\s+([0-9]{4})",
    )
    .expect("month-name regex")
});

fn num(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

fn ymd(caps: &Captures<'_>) -> Option<NaiveDate> {
    let y = num(caps, 1)? as i32;
    NaiveDate::from_ymd_opt(y, num(caps, 2)?, num(caps, 3)?)
}

fn dmy(caps: &Captures<'_>) -> Option<NaiveDate> {
    let (a, b) = (num(caps, 1)?, num(caps, 2)?);
    let y = num(caps, 3)? as i32;
    // day-first; month-first when that is the only valid reading (12/25/2024)
    NaiveDate::from_ymd_opt(y, b, a).or_else(|| NaiveDate::from_ymd_opt(y, a, b))
}

fn month_name(caps: &Captures<'_>) -> Option<NaiveDate> {
    let month = match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(num(caps, 3)? as i32, month, num(caps, 2)?)
}

/// First parseable date in `context`. Patterns are tried in order and only
/// their first occurrence counts; one that matches but does not parse is skipped.
pub fn find_date(context: &str) -> Option<NaiveDate> {
    let patterns: [(&Lazy<Regex>, fn(&Captures<'_>) -> Option<NaiveDate>); 3] = [
        (&RE_YMD, ymd),
        (&RE_DMY, dmy),
        (&RE_MONTH_NAME, month_name),
    ];
    patterns
        .iter()
        .find_map(|(re, parse)| re.captures(context).and_then(|c| parse(&c)))
}
