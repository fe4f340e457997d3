use std::collections::HashSet;

use anyhow::Result;
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use fable_core::achievements::{self, AchievementDef};
use fable_core::prefs::NotificationKind;
use fable_core::streak::StreakState;
use fable_db::Database;
use fable_db::models::{StreakRow, parse_timestamp};
use fable_types::api::{
    AchievementStatus, Claims, RecordReadingRequest, RecordReadingResponse,
};
use fable_types::events::GatewayEvent;
use fable_types::models::{ReadingEntry, UserStats};

use crate::auth::{AppState, AppStateInner};

/// `POST /activity/read` — record that the user read a post today, then
/// re-evaluate achievements. Idempotent per (user, post, calendar day); a
/// repeat still succeeds with `recorded: false`.
pub async fn record_reading(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RecordReadingRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.post_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let recorded = record_reading_at(&state.db, &claims.sub.to_string(), &req.post_id, &req.post_title, Utc::now())
        .map_err(|e| {
            error!("Failed to record reading: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    // Achievement evaluation failing should not fail the recording that
    // already happened.
    let newly_unlocked = match evaluate_achievements(&state, claims.sub).await {
        Ok(defs) => defs.iter().map(|d| d.id.to_string()).collect(),
        Err(e) => {
            error!("Achievement evaluation failed: {}", e);
            Vec::new()
        }
    };

    Ok(Json(RecordReadingResponse {
        recorded,
        newly_unlocked,
    }))
}

/// Insert the reading event and, when it is the first for this
/// (user, post) today, advance the streak record with a merge-upsert.
pub fn record_reading_at(
    db: &Database,
    user_id: &str,
    post_id: &str,
    post_title: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let today = now.date_naive();
    let inserted = db.insert_reading_event(
        user_id,
        post_id,
        &today.to_string(),
        post_title,
        &now.to_rfc3339(),
    )?;

    if !inserted {
        // Already counted for this (post, day); the streak is untouched.
        return Ok(false);
    }

    let prev = db
        .get_streak(user_id)?
        .map(streak_state_from_row)
        .unwrap_or_default();
    let next = prev.advance(today);
    if next != prev {
        db.upsert_streak(
            user_id,
            next.streak,
            next.longest_streak,
            &today.to_string(),
        )?;
    }

    Ok(true)
}

fn streak_state_from_row(row: StreakRow) -> StreakState {
    let last_read_date = row.last_read_date.as_deref().and_then(|raw| {
        raw.parse().map_err(|e| warn!("Corrupt last_read_date '{}': {}", raw, e)).ok()
    });
    StreakState {
        streak: row.streak,
        longest_streak: row.longest_streak,
        last_read_date,
    }
}

/// Derived statistics: four independent queries over one connection. There
/// is deliberately no snapshot isolation across them; a write that lands
/// in between yields a momentarily stale combination, which the dashboard
/// tolerates.
pub fn load_stats(db: &Database, user_id: &str) -> Result<UserStats> {
    let streak = db.get_streak(user_id)?;
    let (streak, longest_streak) = streak
        .map(|row| (row.streak, row.longest_streak))
        .unwrap_or((0, 0));

    Ok(UserStats {
        streak,
        longest_streak,
        articles_read: db.count_distinct_posts_read(user_id)?,
        comments_posted: db.count_comments_by_user(user_id)?,
        bookmarks: db.count_bookmarks_by_user(user_id)?,
    })
}

/// Compare current stats against every locked, non-manual definition and
/// persist all new unlocks in one batched write. Per unlock, a targeted
/// gateway notification is sent fire-and-forget after persistence, so a
/// disconnected client never loses the achievement itself.
pub async fn evaluate_achievements(
    state: &AppStateInner,
    user_id: Uuid,
) -> Result<Vec<&'static AchievementDef>> {
    let uid = user_id.to_string();
    let stats = load_stats(&state.db, &uid)?;
    let unlocked: HashSet<String> = state.db.unlocked_achievements(&uid)?.into_iter().collect();

    let new = achievements::newly_unlocked(&stats, &unlocked);
    if new.is_empty() {
        return Ok(new);
    }

    let ids: Vec<String> = new.iter().map(|d| d.id.to_string()).collect();
    state
        .db
        .unlock_achievements(&uid, &ids, &Utc::now().to_rfc3339())?;

    // Notifications come after persistence and are gated by the stored
    // preference toggle; the unlock itself is never withheld.
    if !state
        .prefs
        .load()
        .should_notify(NotificationKind::Achievement)
    {
        return Ok(new);
    }

    for def in &new {
        state
            .dispatcher
            .send_to_user(
                user_id,
                GatewayEvent::AchievementUnlocked {
                    id: def.id.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    icon: def.icon.to_string(),
                },
            )
            .await;
    }

    Ok(new)
}

/// `GET /activity/stats`
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let stats = load_stats(&state.db, &claims.sub.to_string()).map_err(|e| {
        error!("Failed to load stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    10
}

/// `GET /activity/history` — most recent reading events, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .get_reading_history(&claims.sub.to_string(), query.limit.min(100))
        .map_err(|e| {
            error!("Failed to load reading history: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let history: Vec<ReadingEntry> = rows
        .into_iter()
        .filter_map(|row| {
            let date_key = row
                .date_key
                .parse()
                .map_err(|e| warn!("Corrupt date_key '{}': {}", row.date_key, e))
                .ok()?;
            Some(ReadingEntry {
                post_id: row.post_id,
                post_title: row.post_title,
                date_key,
                created_at: parse_timestamp(&row.created_at).unwrap_or_default(),
            })
        })
        .collect();

    Ok(Json(history))
}

/// `GET /activity/achievements` — every definition with this user's unlock
/// state and progress, in declaration order.
pub async fn list_achievements(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = claims.sub.to_string();
    let (stats, unlocked) = (|| -> Result<_> {
        let stats = load_stats(&state.db, &uid)?;
        let unlocked: HashSet<String> = state.db.unlocked_achievements(&uid)?.into_iter().collect();
        Ok((stats, unlocked))
    })()
    .map_err(|e| {
        error!("Failed to load achievements: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let grid: Vec<AchievementStatus> = achievements::ACHIEVEMENTS
        .iter()
        .map(|def| {
            let is_unlocked = unlocked.contains(def.id);
            AchievementStatus {
                id: def.id.to_string(),
                name: def.name.to_string(),
                description: def.description.to_string(),
                icon: def.icon.to_string(),
                unlocked: is_unlocked,
                // Unlocked badges render without a progress bar.
                progress: if is_unlocked {
                    None
                } else {
                    def.requirement.progress(&stats)
                },
            }
        })
        .collect();

    Ok(Json(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db_with_user(id: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user(id, &format!("{id}@example.com"), "hash", None)
            .unwrap();
        db
    }

    fn at(date: &str) -> DateTime<Utc> {
        let naive: chrono::NaiveDateTime = format!("{date}T12:00:00").parse().unwrap();
        Utc.from_utc_datetime(&naive)
    }

    #[test]
    fn first_reading_of_day_starts_streak() {
        let db = db_with_user("u1");

        let recorded = record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-29")).unwrap();
        assert!(recorded);

        let row = db.get_streak("u1").unwrap().unwrap();
        assert_eq!(row.streak, 1);
        assert_eq!(row.longest_streak, 1);
        assert_eq!(row.last_read_date.as_deref(), Some("2026-08-29"));
    }

    #[test]
    fn repeat_same_day_is_noop_on_stats() {
        let db = db_with_user("u1");
        record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-29")).unwrap();

        let recorded = record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-29")).unwrap();
        assert!(!recorded);

        let row = db.get_streak("u1").unwrap().unwrap();
        assert_eq!(row.streak, 1);
        assert_eq!(row.longest_streak, 1);
    }

    #[test]
    fn different_post_same_day_keeps_streak_at_one() {
        let db = db_with_user("u1");
        record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-29")).unwrap();
        record_reading_at(&db, "u1", "post-b", "Post B", at("2026-08-29")).unwrap();

        let row = db.get_streak("u1").unwrap().unwrap();
        assert_eq!(row.streak, 1);
    }

    #[test]
    fn consecutive_days_increment_and_gap_resets() {
        let db = db_with_user("u1");
        record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-27")).unwrap();
        record_reading_at(&db, "u1", "post-b", "Post B", at("2026-08-28")).unwrap();
        record_reading_at(&db, "u1", "post-c", "Post C", at("2026-08-29")).unwrap();

        let row = db.get_streak("u1").unwrap().unwrap();
        assert_eq!(row.streak, 3);
        assert_eq!(row.longest_streak, 3);

        record_reading_at(&db, "u1", "post-d", "Post D", at("2026-09-05")).unwrap();
        let row = db.get_streak("u1").unwrap().unwrap();
        assert_eq!(row.streak, 1);
        assert_eq!(row.longest_streak, 3);
    }

    #[test]
    fn stats_default_to_zero_for_new_user() {
        let db = db_with_user("u1");
        let stats = load_stats(&db, "u1").unwrap();
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.longest_streak, 0);
        assert_eq!(stats.articles_read, 0);
        assert_eq!(stats.comments_posted, 0);
        assert_eq!(stats.bookmarks, 0);
    }

    fn test_state() -> (crate::auth::AppState, Uuid) {
        use crate::auth::LoginThrottle;
        use crate::posts::ContentLibrary;
        use fable_core::prefs::PrefStore;
        use fable_gateway::dispatcher::Dispatcher;

        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        db.create_user(&user.to_string(), "reader@example.com", "hash", None)
            .unwrap();

        let prefs_path = std::env::temp_dir().join(format!(
            "fable-activity-{}-{}.json",
            std::process::id(),
            user
        ));

        let state = std::sync::Arc::new(AppStateInner {
            db,
            content: ContentLibrary::from_json("[]", "[]").unwrap(),
            dispatcher: Dispatcher::new(),
            jwt_secret: "test-secret".into(),
            throttle: LoginThrottle::new(),
            prefs: PrefStore::new(prefs_path),
        });
        (state, user)
    }

    #[tokio::test]
    async fn first_article_unlocks_first_read_only_once() {
        let (state, user) = test_state();
        let uid = user.to_string();
        record_reading_at(&state.db, &uid, "post-a", "Post A", at("2026-08-29")).unwrap();

        let (_, mut rx) = state.dispatcher.register_user_channel(user).await;

        let new = evaluate_achievements(&state, user).await.unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, "first-read");
        assert!(matches!(
            rx.try_recv(),
            Ok(GatewayEvent::AchievementUnlocked { id, .. }) if id == "first-read"
        ));

        // Already persisted: a second evaluation unlocks nothing more.
        let again = evaluate_achievements(&state, user).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(state.db.unlocked_achievements(&uid).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ten_articles_batch_both_reader_tiers() {
        let (state, user) = test_state();
        let uid = user.to_string();
        for n in 0..10 {
            record_reading_at(&state.db, &uid, &format!("post-{n}"), "Post", at("2026-08-29"))
                .unwrap();
        }

        let new = evaluate_achievements(&state, user).await.unwrap();
        let ids: Vec<&str> = new.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["first-read", "avid-reader"]);
    }

    #[test]
    fn stats_count_distinct_articles() {
        let db = db_with_user("u1");
        record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-28")).unwrap();
        record_reading_at(&db, "u1", "post-a", "Post A", at("2026-08-29")).unwrap();
        record_reading_at(&db, "u1", "post-b", "Post B", at("2026-08-29")).unwrap();

        let stats = load_stats(&db, "u1").unwrap();
        assert_eq!(stats.articles_read, 2);
        assert_eq!(stats.streak, 2);
    }
}
