use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, warn};

use fable_db::models::parse_timestamp;
use fable_types::api::{BookmarkRequest, Claims, LikeStatusResponse};
use fable_types::events::GatewayEvent;
use fable_types::models::Bookmark;

use crate::auth::AppState;

fn storage_err<E: std::fmt::Display>(e: E) -> StatusCode {
    error!("Like/bookmark storage failure: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// `PUT /posts/{post_id}/like` — keyed on (user, post), so a double-click
/// collapses into one row; last write wins.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    state
        .db
        .upsert_like(&claims.sub.to_string(), &post_id, &Utc::now().to_rfc3339())
        .map_err(storage_err)?;

    broadcast_like_count(&state, &post_id);
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /posts/{post_id}/like` — removing an absent like is a no-op.
pub async fn unlike_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let removed = state
        .db
        .delete_like(&claims.sub.to_string(), &post_id)
        .map_err(storage_err)?;

    if removed {
        broadcast_like_count(&state, &post_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /posts/{post_id}/likes` — total count plus whether this user liked
/// the post.
pub async fn like_status(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let count = state.db.count_likes_for_post(&post_id).map_err(storage_err)?;
    let liked = state
        .db
        .like_exists(&claims.sub.to_string(), &post_id)
        .map_err(storage_err)?;

    Ok(Json(LikeStatusResponse { count, liked }))
}

/// Push the fresh count to subscribed article pages. Best effort: a count
/// that fails to load here is only a missed UI refresh.
fn broadcast_like_count(state: &AppState, post_id: &str) {
    match state.db.count_likes_for_post(post_id) {
        Ok(count) => state.dispatcher.broadcast(GatewayEvent::LikeUpdate {
            post_id: post_id.to_string(),
            count,
        }),
        Err(e) => warn!("Skipping like-count broadcast: {}", e),
    }
}

/// `PUT /posts/{post_id}/bookmark`
pub async fn bookmark_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BookmarkRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    state
        .db
        .upsert_bookmark(
            &claims.sub.to_string(),
            &post_id,
            &req.post_title,
            &Utc::now().to_rfc3339(),
        )
        .map_err(storage_err)?;

    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /posts/{post_id}/bookmark`
pub async fn remove_bookmark(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    state
        .db
        .delete_bookmark(&claims.sub.to_string(), &post_id)
        .map_err(storage_err)?;

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /posts/{post_id}/bookmark` — whether this post is bookmarked.
pub async fn bookmark_status(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let bookmarked = state
        .db
        .bookmark_exists(&claims.sub.to_string(), &post_id)
        .map_err(storage_err)?;

    Ok(Json(serde_json::json!({ "bookmarked": bookmarked })))
}

/// `GET /bookmarks` — the user's bookmarks, newest first.
pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .get_bookmarks_for_user(&claims.sub.to_string())
        .map_err(storage_err)?;

    let bookmarks: Vec<Bookmark> = rows
        .into_iter()
        .map(|row| Bookmark {
            created_at: parse_timestamp(&row.created_at).unwrap_or_default(),
            post_id: row.post_id,
            post_title: row.post_title,
        })
        .collect();

    Ok(Json(bookmarks))
}
