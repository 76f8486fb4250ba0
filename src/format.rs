//! Human-readable formatting helpers for `ql` output.

use chrono::{DateTime, Utc};

/// Describe `then` relative to `now`, e.g. "3 hours ago".
///
/// Future instants read as "just now".
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return plural(hours, "hour");
    }
    plural(elapsed.num_days(), "day")
}

/// Cut `text` to at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let ago = |d: Duration| format_relative_time(now - d, now);

        assert_eq!(ago(Duration::seconds(30)), "just now");
        assert_eq!(ago(Duration::seconds(-30)), "just now");
        assert_eq!(ago(Duration::minutes(1)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(ago(Duration::hours(2)), "2 hours ago");
        assert_eq!(ago(Duration::hours(25)), "1 day ago");
        assert_eq!(ago(Duration::days(9)), "9 days ago");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly ten", 11), "exactly ten");
        assert_eq!(truncate_text("a much longer title", 10), "a much ...");
        assert_eq!(truncate_text("ééééé", 4), "é...");
    }
}
