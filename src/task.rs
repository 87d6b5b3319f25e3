use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub completed: bool,
    #[serde(deserialize_with = "utc_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "utc_timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateTaskRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// The backend emits naive UTC timestamps; RFC 3339 is accepted as well.
fn utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()),
    }
}

/// "just now", "5 minutes ago", ... falling back to a short date after a week.
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    let plural = |n: i64, unit: &str| format!("{n} {unit}{} ago", if n > 1 { "s" } else { "" });
    if secs < 60 {
        "just now".to_string()
    } else if mins < 60 {
        plural(mins, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        at.format("%b %-d, %Y").to_string()
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_backend_task_with_null_description() {
        let json = r#"{
            "id": "3f2c",
            "user_id": "u1",
            "title": "Buy milk",
            "description": null,
            "completed": false,
            "created_at": "2026-02-02T10:00:00.123456",
            "updated_at": "2026-02-02T10:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.description, "");
        assert_eq!(
            task.updated_at,
            Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap()
        );
        assert!(task.created_at > task.updated_at);
    }

    #[test]
    fn update_request_skips_absent_fields() {
        let req = UpdateTaskRequest {
            title: Some("New".into()),
            description: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"title":"New"}"#);
        assert!(UpdateTaskRequest::default().is_empty());
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now, now), "just now");
        assert_eq!(format_relative(now - chrono::Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative(now - chrono::Duration::hours(3), now), "3 hours ago");
        assert_eq!(format_relative(now - chrono::Duration::days(2), now), "2 days ago");
        assert_eq!(format_relative(now - chrono::Duration::days(9), now), "Feb 1, 2026");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 8), "a lon...");
    }
}
