use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Post, PostSummary, TocEntry};

// -- JWT Claims --

/// JWT claims shared between fable-api (REST middleware) and fable-gateway
/// (WebSocket identify handshake). Canonical definition lives here in
/// fable-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register, login and `GET /auth/me`. The token is omitted
/// from `/auth/me` responses.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: String,
}

// -- Posts --

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<PostSummary>,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub post: Post,
    pub toc: Vec<TocEntry>,
    pub related: Vec<PostSummary>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostCommentRequest {
    pub body: String,
}

// -- Likes / bookmarks --

#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub count: u32,
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookmarkRequest {
    pub post_title: String,
}

// -- Activity --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordReadingRequest {
    pub post_id: String,
    pub post_title: String,
}

/// `recorded` is false when the (user, post, day) event already existed;
/// the call still succeeds.
#[derive(Debug, Serialize)]
pub struct RecordReadingResponse {
    pub recorded: bool,
    pub newly_unlocked: Vec<String>,
}

/// One row of the profile achievements grid: a static definition plus this
/// user's unlock state. `progress` is a 0-100 percentage toward the
/// threshold and is absent for manually granted achievements.
#[derive(Debug, Serialize)]
pub struct AchievementStatus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}
