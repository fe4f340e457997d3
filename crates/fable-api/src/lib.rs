pub mod activity;
pub mod auth;
pub mod comments;
pub mod likes;
pub mod middleware;
pub mod posts;
pub mod prefs;
