use std::fmt;
use std::fmt::Formatter;
use std::ops::Index;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use spdlog::warn;

pub const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock timestamp as written in a post header. No timezone attached:
/// `2024-02-12 22:54:00` means 22:54 wherever the blog is edited.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostDate(pub NaiveDateTime);

fn to_int<T: std::str::FromStr>(num_str: &str, date_str: &str) -> Result<T, String> {
    match num_str.parse::<T>() {
        Ok(x) => Ok(x),
        Err(_) => Err(format!("Error parsing {} from the date {}", num_str, date_str)),
    }
}

fn parse_local(buf: &str) -> Option<NaiveDateTime> {
    lazy_static! {
        static ref LOCAL_REGEX: Regex =
            Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2}) (\d{1,2}):(\d{1,2}):(\d{1,2})(\.\d{1,9})?$").unwrap();
    }

    let caps = LOCAL_REGEX.captures(buf)?;
    let parts = || -> Result<NaiveDateTime, String> {
        let y: i32 = to_int(caps.index(1), buf)?;
        let m: u32 = to_int(caps.index(2), buf)?;
        let d: u32 = to_int(caps.index(3), buf)?;
        let h: u32 = to_int(caps.index(4), buf)?;
        let mn: u32 = to_int(caps.index(5), buf)?;
        let s: u32 = to_int(caps.index(6), buf)?;

        let date = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("Invalid date {}", buf))?;
        let time = NaiveTime::from_hms_opt(h, mn, s).ok_or_else(|| format!("Invalid time {}", buf))?;
        Ok(NaiveDateTime::new(date, time))
    };

    parts().ok()
}

fn parse_iso(buf: &str) -> Option<NaiveDateTime> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(buf) {
        return Some(date_time.with_timezone(&Local).naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(buf, format) {
            return Some(date_time);
        }
    }

    NaiveDate::parse_from_str(buf, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

impl PostDate {
    pub fn now() -> PostDate {
        let now = Local::now().naive_local();
        PostDate(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Accepts the local `YYYY-MM-DD HH:mm:ss` form or ISO-8601. Anything else is
    /// returned as the error so the caller can echo it back.
    pub fn parse_strict(buf: &str) -> Result<PostDate, String> {
        let buf = buf.trim();
        parse_local(buf)
            .or_else(|| parse_iso(buf))
            .map(PostDate)
            .ok_or_else(|| buf.to_string())
    }

    /// Read path: never fails. Tries RFC 2822 as a last resort and then falls
    /// back to the current time.
    pub fn parse_lenient(buf: &str, context: &str) -> PostDate {
        if let Ok(date) = Self::parse_strict(buf) {
            return date;
        }

        if let Ok(date_time) = DateTime::parse_from_rfc2822(buf.trim()) {
            warn!("Loose date format '{}' in {}. Interpreting as {}", buf, context, date_time);
            return PostDate(date_time.with_timezone(&Local).naive_local());
        }

        warn!("Unparsable date '{}' in {}. Using current time", buf, context);
        Self::now()
    }

    pub fn format_date_time(&self) -> (String, String) {
        let date = self.0.format("%Y-%m-%d").to_string();
        let time = self.0.format("%H:%M:%S").to_string();
        (date, time)
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LOCAL_FORMAT))
    }
}

impl Serialize for PostDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
