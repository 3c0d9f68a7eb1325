use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};

use humanize_duration::{Truncate, prelude::DurationExt};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

fn format_age(age: Duration) -> String {
    let truncate = match age.as_secs() {
        s if s < MINUTE => Truncate::Second,
        s if s < HOUR => Truncate::Minute,
        s if s < DAY => Truncate::Hour,
        s if s < MONTH => Truncate::Day,
        s if s < YEAR => Truncate::Month,
        _ => Truncate::Year,
    };
    format!("{} ago", age.human(truncate))
}

/// How long ago the file at `path` was created, e.g. `3d ago`.
pub fn file_age(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()?;
    let age = SystemTime::now()
        .duration_since(created)
        .unwrap_or_default();
    Some(format_age(age))
}
