//! Total normalization of untrusted session data
//!
//! Session data reaches the store from persisted snapshots, older schemas and
//! network payloads. Every function here accepts any `serde_json::Value` and
//! returns a fully populated record; none of them can fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashSet;

use super::types::{
    generate_session_id, Message, MessageRole, Session, DEFAULT_SESSION_TITLE, UNKNOWN_TIMESTAMP,
};

/// Label used when a timestamp cannot be placed in time
pub const RECENTLY: &str = "recently";

/// Keep a non-empty string timestamp as-is, otherwise use the sentinel
pub fn sanitize_timestamp(input: &Value) -> String {
    match input.as_str() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNKNOWN_TIMESTAMP.to_string(),
    }
}

/// Human-relative distance from now, e.g. "5 minutes ago"
pub fn sanitize_relative_time(input: &str) -> String {
    relative_time_from(input, Utc::now())
}

/// Human-relative distance between `input` and `now`; "recently" when
/// `input` is not a recognizable date
pub fn relative_time_from(input: &str, now: DateTime<Utc>) -> String {
    let Some(then) = parse_timestamp(input) else {
        return RECENTLY.to_string();
    };

    let delta = now.signed_duration_since(then);
    let seconds = delta.num_seconds();
    let distance = format_distance(seconds.unsigned_abs());

    if seconds >= 0 {
        format!("{} ago", distance)
    } else {
        format!("in {}", distance)
    }
}

/// Parse the timestamp shapes seen in stored and received messages
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }

    // Epoch milliseconds
    if input.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = input.parse().ok()?;
        return Utc.timestamp_millis_opt(millis).single();
    }

    None
}

fn format_distance(seconds: u64) -> String {
    const MINUTES_IN_DAY: u64 = 1440;
    const MINUTES_IN_MONTH: u64 = 43_200;
    const MINUTES_IN_YEAR: u64 = 525_600;

    let minutes = (seconds + 30) / 60;

    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = (minutes + 30) / 60;
        return format!("about {}", plural(hours, "hour"));
    }
    if minutes < 2520 {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = (minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY;
        return plural(days, "day");
    }
    if minutes < MINUTES_IN_MONTH * 2 {
        let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
        return format!("about {}", plural(months, "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        return plural(months, "month");
    }

    let years = minutes / MINUTES_IN_YEAR;
    let remainder_months = (minutes % MINUTES_IN_YEAR) / MINUTES_IN_MONTH;
    if remainder_months < 3 {
        format!("about {}", plural(years, "year"))
    } else if remainder_months < 9 {
        format!("over {}", plural(years, "year"))
    } else {
        format!("almost {}", plural(years + 1, "year"))
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Coerce any value into a message
pub fn sanitize_message(input: &Value) -> Message {
    let role = input
        .get("role")
        .and_then(Value::as_str)
        .and_then(MessageRole::parse)
        .unwrap_or_default();

    let content = input
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Message {
        role,
        content,
        timestamp: sanitize_timestamp(input.get("timestamp").unwrap_or(&Value::Null)),
    }
}

/// Trimmed title, or the default title when nothing usable is left
pub fn sanitize_title(input: &Value) -> String {
    match input.as_str().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => DEFAULT_SESSION_TITLE.to_string(),
    }
}

/// Coerce any value into a session, generating an id when none is usable
pub fn sanitize_session(input: &Value) -> Session {
    let title = sanitize_title(input.get("title").unwrap_or(&Value::Null));

    let messages = match input.get("messages") {
        Some(Value::Array(items)) => items.iter().map(sanitize_message).collect(),
        _ => Vec::new(),
    };

    let id = input
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_session_id);

    Session { id, title, messages }
}

/// Result of normalizing a serialized store
#[derive(Debug, Clone, Default)]
pub struct SanitizedSnapshot {
    pub sessions: Vec<Session>,
    pub active_session_id: Option<String>,
    /// Human-readable notes about data that was dropped or defaulted
    pub warnings: Vec<String>,
}

/// Normalize a serialized `{sessions, activeSessionId}` document
pub fn sanitize_snapshot(input: &Value) -> SanitizedSnapshot {
    let mut snapshot = SanitizedSnapshot::default();

    let Some(object) = input.as_object() else {
        if !input.is_null() {
            snapshot
                .warnings
                .push("stored session data is not an object; starting empty".to_string());
        }
        return snapshot;
    };

    match object.get("sessions") {
        Some(Value::Array(items)) => {
            let mut seen = HashSet::new();
            for (index, item) in items.iter().enumerate() {
                if !item.is_object() {
                    snapshot
                        .warnings
                        .push(format!("skipped session #{}: not an object", index));
                    continue;
                }
                let session = sanitize_session(item);
                if !seen.insert(session.id.clone()) {
                    snapshot.warnings.push(format!(
                        "skipped session #{}: duplicate id {}",
                        index, session.id
                    ));
                    continue;
                }
                snapshot.sessions.push(session);
            }
        }
        None | Some(Value::Null) => {}
        Some(_) => snapshot
            .warnings
            .push("stored sessions field is not a list; ignoring it".to_string()),
    }

    snapshot.active_session_id = match object.get("activeSessionId") {
        Some(Value::String(id)) => Some(id.clone()),
        None | Some(Value::Null) => None,
        Some(_) => {
            snapshot
                .warnings
                .push("stored active session id is not a string; clearing it".to_string());
            None
        }
    };

    snapshot
}
