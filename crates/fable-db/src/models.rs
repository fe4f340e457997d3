/// Database row types — these map directly to SQLite rows.
/// Distinct from fable-types API models to keep the DB layer independent.
use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub user_name: String,
    pub body: String,
    pub created_at: String,
}

pub struct BookmarkRow {
    pub post_id: String,
    pub post_title: String,
    pub created_at: String,
}

pub struct ReadingEventRow {
    pub post_id: String,
    pub post_title: String,
    pub date_key: String,
    pub created_at: String,
}

/// The per-user streak record. Absence is equivalent to
/// {streak: 0, longest_streak: 0, last_read_date: none}.
pub struct StreakRow {
    pub streak: u32,
    pub longest_streak: u32,
    pub last_read_date: Option<String>,
}

/// Parse a stored timestamp. Rows written by this code carry RFC 3339;
/// rows created through SQLite defaults are "YYYY-MM-DD HH:MM:SS" naive
/// UTC, so fall back to that before giving up.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .ok()
}
