use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            display_name    TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id),
            user_name   TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_comments_user
            ON comments(user_id);

        -- Deterministic per-user-per-post key: a repeat like is a
        -- last-write-wins upsert, never a duplicate row.
        CREATE TABLE IF NOT EXISTS likes (
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);

        CREATE TABLE IF NOT EXISTS bookmarks (
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL,
            post_title  TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, post_id)
        );

        -- One reading event per (user, post, calendar day); rows are
        -- immutable once written.
        CREATE TABLE IF NOT EXISTS reading_events (
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL,
            date_key    TEXT NOT NULL,
            post_title  TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, post_id, date_key)
        );

        CREATE TABLE IF NOT EXISTS user_stats (
            user_id         TEXT PRIMARY KEY REFERENCES users(id),
            streak          INTEGER NOT NULL DEFAULT 0,
            longest_streak  INTEGER NOT NULL DEFAULT 0,
            last_read_date  TEXT
        );

        -- Append-only: achievement ids are added, never removed.
        CREATE TABLE IF NOT EXISTS user_achievements (
            user_id         TEXT NOT NULL REFERENCES users(id),
            achievement_id  TEXT NOT NULL,
            unlocked_at     TEXT NOT NULL,
            PRIMARY KEY (user_id, achievement_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
