use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Comment;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// A comment was posted on a post
    CommentCreate { comment: Comment },

    /// A comment was deleted by its author
    CommentDelete { post_id: String, comment_id: Uuid },

    /// The like count of a post changed
    LikeUpdate { post_id: String, count: u32 },

    /// The receiving user unlocked an achievement. Targeted, never
    /// broadcast; carries everything the client needs to render the
    /// transient notification card.
    AchievementUnlocked {
        id: String,
        name: String,
        description: String,
        icon: String,
    },
}

impl GatewayEvent {
    /// Returns the post id if this event is scoped to a single post.
    /// Events that return `None` are delivered regardless of subscriptions.
    pub fn post_id(&self) -> Option<&str> {
        match self {
            Self::CommentCreate { comment } => Some(&comment.post_id),
            Self::CommentDelete { post_id, .. } => Some(post_id),
            Self::LikeUpdate { post_id, .. } => Some(post_id),
            // Ready and AchievementUnlocked are per-connection
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to post-scoped events for specific posts. Replaces any
    /// previous subscription set; an article page subscribes to the post
    /// it displays and the old set is dropped on navigation.
    Subscribe { post_ids: Vec<String> },
}
