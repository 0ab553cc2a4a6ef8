//! Output formatting for CLI display.

use jiff::Timestamp;

use crate::model::Cycle;

/// Remaining time as `MM:SS`. Minutes widen past two digits when needed.
pub(super) fn format_countdown(remaining_seconds: i64) -> String {
    let remaining = remaining_seconds.max(0);
    format!("{:02}:{:02}", remaining / 60, remaining % 60)
}

pub(super) fn format_minutes(minutes: u32) -> String {
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

/// How long ago `then` was, in rough English.
pub(super) fn format_relative(then: Timestamp, now: Timestamp) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let secs = now.duration_since(then).as_secs();
    let rounded = |unit: i64| (secs + unit / 2) / unit;

    match secs {
        s if s < 45 => "less than a minute ago".to_string(),
        s if s < 90 => "1 minute ago".to_string(),
        s if s < 45 * MINUTE => format!("{} minutes ago", rounded(MINUTE)),
        s if s < 90 * MINUTE => "about 1 hour ago".to_string(),
        s if s < DAY => format!("about {} hours ago", rounded(HOUR)),
        s if s < 42 * HOUR => "1 day ago".to_string(),
        s if s < MONTH => format!("{} days ago", rounded(DAY)),
        s if s < 45 * DAY => "about 1 month ago".to_string(),
        s if s < YEAR => format!("{} months ago", rounded(MONTH)),
        s if s < 2 * YEAR => "about 1 year ago".to_string(),
        _ => format!("about {} years ago", secs / YEAR),
    }
}

/// Renders the history table, one row per cycle in creation order.
pub(super) fn format_history(cycles: &[Cycle], now: Timestamp) -> String {
    let header = ["Task", "Duration", "Started", "Status"].map(String::from);
    let rows: Vec<[String; 4]> = cycles
        .iter()
        .map(|c| {
            [
                c.task.clone(),
                format_minutes(c.minutes_amount),
                format_relative(c.start_date, now),
                c.status().label().to_string(),
            ]
        })
        .collect();

    let mut widths = header.clone().map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(&header)
        .chain(&rows)
        .map(|row| {
            row.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
