use crate::Database;
use crate::models::{BookmarkRow, CommentRow, ReadingEventRow, StreakRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, display_name) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, email, password_hash, display_name],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn update_display_name(&self, id: &str, display_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET display_name = ?1 WHERE id = ?2",
                rusqlite::params![display_name, id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        user_name: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, user_name, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, post_id, user_id, user_name, body, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, user_id, user_name, body, created_at
                 FROM comments
                 WHERE post_id = ?1
                 ORDER BY created_at DESC",
            )?;

            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        user_name: row.get(3)?,
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// (post_id, author user_id) for ownership checks before deletion.
    pub fn get_comment_owner(&self, id: &str) -> Result<Option<(String, String)>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT post_id, user_id FROM comments WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn count_comments_by_user(&self, user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Likes --

    pub fn upsert_like(&self, user_id: &str, post_id: &str, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, post_id, created_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                rusqlite::params![user_id, post_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn like_exists(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2",
                    rusqlite::params![user_id, post_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn count_likes_for_post(&self, post_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Bookmarks --

    pub fn upsert_bookmark(
        &self,
        user_id: &str,
        post_id: &str,
        post_title: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO bookmarks (user_id, post_id, post_title, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, post_id, post_title, created_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_bookmark(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM bookmarks WHERE user_id = ?1 AND post_id = ?2",
                rusqlite::params![user_id, post_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn bookmark_exists(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM bookmarks WHERE user_id = ?1 AND post_id = ?2",
                    rusqlite::params![user_id, post_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_bookmarks_for_user(&self, user_id: &str) -> Result<Vec<BookmarkRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT post_id, post_title, created_at
                 FROM bookmarks
                 WHERE user_id = ?1
                 ORDER BY created_at DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(BookmarkRow {
                        post_id: row.get(0)?,
                        post_title: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_bookmarks_by_user(&self, user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM bookmarks WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Reading events --

    /// Insert a reading event. Returns true when the row is new; a repeat
    /// within the same (user, post, day) is ignored and returns false.
    pub fn insert_reading_event(
        &self,
        user_id: &str,
        post_id: &str,
        date_key: &str,
        post_title: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO reading_events (user_id, post_id, date_key, post_title, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![user_id, post_id, date_key, post_title, created_at],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn count_distinct_posts_read(&self, user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(DISTINCT post_id) FROM reading_events WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn get_reading_history(&self, user_id: &str, limit: u32) -> Result<Vec<ReadingEventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT post_id, post_title, date_key, created_at
                 FROM reading_events
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(ReadingEventRow {
                        post_id: row.get(0)?,
                        post_title: row.get(1)?,
                        date_key: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Streak record --

    pub fn get_streak(&self, user_id: &str) -> Result<Option<StreakRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT streak, longest_streak, last_read_date FROM user_stats WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(StreakRow {
                        streak: row.get(0)?,
                        longest_streak: row.get(1)?,
                        last_read_date: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Merge-upsert of the streak fields only; any other column on the
    /// stats row is left untouched.
    pub fn upsert_streak(
        &self,
        user_id: &str,
        streak: u32,
        longest_streak: u32,
        last_read_date: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_stats (user_id, streak, longest_streak, last_read_date)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                     streak = excluded.streak,
                     longest_streak = excluded.longest_streak,
                     last_read_date = excluded.last_read_date",
                rusqlite::params![user_id, streak, longest_streak, last_read_date],
            )?;
            Ok(())
        })
    }

    // -- Achievements --

    pub fn unlocked_achievements(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT achievement_id FROM user_achievements WHERE user_id = ?1",
            )?;

            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            Ok(ids)
        })
    }

    /// Append a batch of newly unlocked achievement ids in one write.
    /// `INSERT OR IGNORE` keeps the set monotonic even if two evaluations
    /// race on the same id.
    pub fn unlock_achievements(
        &self,
        user_id: &str,
        ids: &[String],
        unlocked_at: &str,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, unlocked_at)
                     VALUES (?1, ?2, ?3)",
                )?;
                for id in ids {
                    stmt.execute(rusqlite::params![user_id, id, unlocked_at])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, password, display_name, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_user(id: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user(id, &format!("{id}@example.com"), "hash", None)
            .unwrap();
        db
    }

    #[test]
    fn reading_event_is_once_per_day() {
        let db = db_with_user("u1");

        let first = db
            .insert_reading_event("u1", "post-a", "2026-08-29", "Post A", "t0")
            .unwrap();
        let repeat = db
            .insert_reading_event("u1", "post-a", "2026-08-29", "Post A", "t1")
            .unwrap();
        let next_day = db
            .insert_reading_event("u1", "post-a", "2026-08-30", "Post A", "t2")
            .unwrap();

        assert!(first);
        assert!(!repeat);
        assert!(next_day);
    }

    #[test]
    fn distinct_post_count_deduplicates() {
        let db = db_with_user("u1");
        db.insert_reading_event("u1", "post-a", "2026-08-28", "Post A", "t0")
            .unwrap();
        db.insert_reading_event("u1", "post-a", "2026-08-29", "Post A", "t1")
            .unwrap();
        db.insert_reading_event("u1", "post-b", "2026-08-29", "Post B", "t2")
            .unwrap();

        assert_eq!(db.count_distinct_posts_read("u1").unwrap(), 2);
    }

    #[test]
    fn like_upsert_collapses_double_click() {
        let db = db_with_user("u1");
        db.upsert_like("u1", "post-a", "t0").unwrap();
        db.upsert_like("u1", "post-a", "t1").unwrap();

        assert_eq!(db.count_likes_for_post("post-a").unwrap(), 1);
        assert!(db.delete_like("u1", "post-a").unwrap());
        assert!(!db.delete_like("u1", "post-a").unwrap());
        assert_eq!(db.count_likes_for_post("post-a").unwrap(), 0);
    }

    #[test]
    fn streak_upsert_replaces_fields() {
        let db = db_with_user("u1");
        assert!(db.get_streak("u1").unwrap().is_none());

        db.upsert_streak("u1", 1, 1, "2026-08-28").unwrap();
        db.upsert_streak("u1", 2, 5, "2026-08-29").unwrap();

        let row = db.get_streak("u1").unwrap().unwrap();
        assert_eq!(row.streak, 2);
        assert_eq!(row.longest_streak, 5);
        assert_eq!(row.last_read_date.as_deref(), Some("2026-08-29"));
    }

    #[test]
    fn unlocked_set_never_shrinks() {
        let db = db_with_user("u1");
        db.unlock_achievements("u1", &["first-read".into()], "t0")
            .unwrap();
        // Re-unlocking an id alongside a new one is harmless.
        db.unlock_achievements("u1", &["first-read".into(), "avid-reader".into()], "t1")
            .unwrap();

        let mut ids = db.unlocked_achievements("u1").unwrap();
        ids.sort();
        assert_eq!(ids, vec!["avid-reader".to_string(), "first-read".to_string()]);
    }
}
