use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A full post as stored in the static content source (`posts.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date: NaiveDate,
    pub read_time: u32,
    pub author: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub url: Option<String>,
}

/// The lighter index entry (`posts-index.json`) used for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date: NaiveDate,
    pub read_time: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub post_id: String,
    pub post_title: String,
    pub created_at: DateTime<Utc>,
}

/// One reading-history entry. At most one exists per (user, post, day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingEntry {
    pub post_id: String,
    pub post_title: String,
    pub date_key: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A table-of-contents entry extracted from an article body. `level` is the
/// heading depth (2 or 3) and `anchor` the id injected into the heading tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u8,
    pub anchor: String,
    pub text: String,
}

/// Derived statistics for one user. Computed on demand from independent
/// queries, never stored as a whole; the streak fields pass through the
/// stored streak record and default to zero when it is absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub streak: u32,
    pub longest_streak: u32,
    pub articles_read: u32,
    pub comments_posted: u32,
    pub bookmarks: u32,
}
