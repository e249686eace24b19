use std::{fs, path::Path};

use anyhow::Result;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

/// Parse WordPress post date.
///
/// WordPress serves `date` and `date_gmt` as `YYYY-MM-DDTHH:MM:SS` without any offset.
/// `date_gmt` is preferred, `date` is treated as UTC if the former is missing or invalid.
pub fn parse_wp_datetime(date_gmt: Option<&str>, date: &str) -> Option<OffsetDateTime> {
    date_gmt
        .and_then(parse_datetime)
        .or_else(|| parse_datetime(date))
}

fn parse_datetime(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(datetime) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(datetime);
    }
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

/// Format the relative time between `then` and `now`, such as `5 MINS AGO`.
///
/// Dates in the future are treated as just published.
pub fn time_ago(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let minutes = (now - then).whole_minutes();
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = days / 365;

    if minutes < 1 {
        "JUST NOW".into()
    } else if minutes < 60 {
        format!("{minutes} MINS AGO")
    } else if hours < 24 {
        format!("{hours} HOURS AGO")
    } else if days < 30 {
        format!("{days} DAYS AGO")
    } else if months < 12 {
        format!("{months} MONTH{} AGO", plural(months))
    } else {
        // 360..365 days is already 12 months but not a whole year yet.
        let years = years.max(1);
        format!("{years} YEAR{} AGO", plural(years))
    }
}

fn plural(n: i64) -> &'static str {
    if n > 1 {
        "S"
    } else {
        ""
    }
}

/// Format date like `September 12, 2025`.
pub fn format_long_date(datetime: OffsetDateTime) -> String {
    format!(
        "{} {}, {}",
        datetime.month(),
        datetime.day(),
        datetime.year()
    )
}

/// Capitalize the first char of `text`.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join the site url and an internal path.
pub fn absolute_url(site_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Copy directory recursively, overwriting existing files.
pub fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(source) {
        let entry = entry?;
        let path = entry.path();
        let to = dest.join(path.strip_prefix(source)?);
        if path.is_dir() {
            fs::create_dir_all(to)?;
        } else if path.is_file() {
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, to)?;
        }
    }
    Ok(())
}
