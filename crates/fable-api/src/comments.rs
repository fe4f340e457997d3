use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use fable_db::models::{CommentRow, parse_timestamp};
use fable_types::api::{Claims, PostCommentRequest};
use fable_types::events::GatewayEvent;
use fable_types::models::Comment;

use crate::activity;
use crate::auth::AppState;

const MAX_COMMENT_LEN: usize = 1000;

/// Inline form errors for the comment box, mirrored under the input field.
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Please enter a comment")]
    Empty,
    #[error("Comment is too long (max 1000 characters)")]
    TooLong,
    #[error("Failed to post comment. Please try again.")]
    Storage,
}

impl IntoResponse for CommentError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            CommentError::Empty | CommentError::TooLong => StatusCode::BAD_REQUEST,
            CommentError::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// `GET /posts/{post_id}/comments` — newest first. Public; the comment
/// list renders for signed-out readers too.
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.get_comments_for_post(&post_id).map_err(|e| {
        error!("Failed to load comments: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let comments: Vec<Comment> = rows.into_iter().map(comment_from_row).collect();
    Ok(Json(comments))
}

/// `POST /posts/{post_id}/comments`
pub async fn post_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostCommentRequest>,
) -> Result<impl IntoResponse, CommentError> {
    let body = req.body.trim();
    if body.is_empty() {
        return Err(CommentError::Empty);
    }
    if body.chars().count() > MAX_COMMENT_LEN {
        return Err(CommentError::TooLong);
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id,
        user_id: claims.sub,
        user_name: claims.name.clone(),
        body: body.to_string(),
        created_at: Utc::now(),
    };

    state
        .db
        .insert_comment(
            &comment.id.to_string(),
            &comment.post_id,
            &comment.user_id.to_string(),
            &comment.user_name,
            &comment.body,
            &comment.created_at.to_rfc3339(),
        )
        .map_err(|e| {
            error!("Failed to insert comment: {}", e);
            CommentError::Storage
        })?;

    state.dispatcher.broadcast(GatewayEvent::CommentCreate {
        comment: comment.clone(),
    });

    // A first comment can unlock an achievement; losing that evaluation is
    // not worth failing a comment that is already stored.
    if let Err(e) = activity::evaluate_achievements(&state, claims.sub).await {
        error!("Achievement evaluation failed: {}", e);
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

/// `DELETE /comments/{comment_id}` — authors can delete their own comments
/// and nobody else's.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let id = comment_id.to_string();

    let (post_id, owner_id) = state
        .db
        .get_comment_owner(&id)
        .map_err(|e| {
            error!("Failed to look up comment: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    if owner_id != claims.sub.to_string() {
        return Err(StatusCode::FORBIDDEN);
    }

    state.db.delete_comment(&id).map_err(|e| {
        error!("Failed to delete comment: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    state.dispatcher.broadcast(GatewayEvent::CommentDelete {
        post_id,
        comment_id,
    });

    Ok(StatusCode::NO_CONTENT)
}

fn comment_from_row(row: CommentRow) -> Comment {
    Comment {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt comment id '{}': {}", row.id, e);
            Uuid::default()
        }),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id on comment '{}': {}", row.id, e);
            Uuid::default()
        }),
        post_id: row.post_id,
        user_name: row.user_name,
        body: row.body,
        created_at: parse_timestamp(&row.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at on comment '{}'", row.id);
            Default::default()
        }),
    }
}
