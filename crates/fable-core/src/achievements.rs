//! Static achievement definitions and the threshold evaluator.

use std::collections::HashSet;

use fable_types::models::UserStats;

/// What a user must reach for an achievement to unlock. `Manual` marks
/// achievements granted out of band (administrative); the evaluator never
/// unlocks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    ArticlesRead(u32),
    CommentsPosted(u32),
    Streak(u32),
    Bookmarks(u32),
    Manual,
}

impl Requirement {
    /// The stat this requirement is measured against, or `None` for manual
    /// grants.
    pub fn measure(&self, stats: &UserStats) -> Option<(u32, u32)> {
        match *self {
            Requirement::ArticlesRead(target) => Some((stats.articles_read, target)),
            Requirement::CommentsPosted(target) => Some((stats.comments_posted, target)),
            Requirement::Streak(target) => Some((stats.streak, target)),
            Requirement::Bookmarks(target) => Some((stats.bookmarks, target)),
            Requirement::Manual => None,
        }
    }

    pub fn satisfied(&self, stats: &UserStats) -> bool {
        self.measure(stats)
            .is_some_and(|(value, target)| value >= target)
    }

    /// Percentage toward the threshold, capped at 100. `None` for manual
    /// achievements, which have no meaningful progress bar.
    pub fn progress(&self, stats: &UserStats) -> Option<f32> {
        self.measure(stats)
            .map(|(value, target)| (value as f32 / target.max(1) as f32 * 100.0).min(100.0))
    }
}

#[derive(Debug)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub requirement: Requirement,
}

/// Declaration order is the evaluation (and notification display) order.
pub static ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "first-read",
        name: "First Steps",
        description: "Read your first article",
        icon: "📖",
        requirement: Requirement::ArticlesRead(1),
    },
    AchievementDef {
        id: "avid-reader",
        name: "Avid Reader",
        description: "Read 10 articles",
        icon: "📚",
        requirement: Requirement::ArticlesRead(10),
    },
    AchievementDef {
        id: "bookworm",
        name: "Bookworm",
        description: "Read 50 articles",
        icon: "🐛",
        requirement: Requirement::ArticlesRead(50),
    },
    AchievementDef {
        id: "first-comment",
        name: "Breaking the Ice",
        description: "Post your first comment",
        icon: "💬",
        requirement: Requirement::CommentsPosted(1),
    },
    AchievementDef {
        id: "conversationalist",
        name: "Conversationalist",
        description: "Post 25 comments",
        icon: "💭",
        requirement: Requirement::CommentsPosted(25),
    },
    AchievementDef {
        id: "week-streak",
        name: "Week Warrior",
        description: "7 day reading streak",
        icon: "🔥",
        requirement: Requirement::Streak(7),
    },
    AchievementDef {
        id: "month-streak",
        name: "Month Master",
        description: "30 day reading streak",
        icon: "⭐",
        requirement: Requirement::Streak(30),
    },
    AchievementDef {
        id: "collector",
        name: "Collector",
        description: "Bookmark 10 articles",
        icon: "🔖",
        requirement: Requirement::Bookmarks(10),
    },
    AchievementDef {
        id: "early-bird",
        name: "Early Supporter",
        description: "One of the first users",
        icon: "🐦",
        requirement: Requirement::Manual,
    },
];

/// Every definition that the given stats satisfy and that is not already
/// in `unlocked`. Manual achievements are never returned. The result
/// preserves declaration order.
pub fn newly_unlocked(
    stats: &UserStats,
    unlocked: &HashSet<String>,
) -> Vec<&'static AchievementDef> {
    ACHIEVEMENTS
        .iter()
        .filter(|def| !unlocked.contains(def.id))
        .filter(|def| def.requirement.satisfied(stats))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(articles: u32, comments: u32, streak: u32, bookmarks: u32) -> UserStats {
        UserStats {
            streak,
            longest_streak: streak,
            articles_read: articles,
            comments_posted: comments,
            bookmarks,
        }
    }

    fn ids(defs: &[&AchievementDef]) -> Vec<&'static str> {
        defs.iter().map(|d| d.id).collect()
    }

    #[test]
    fn one_article_unlocks_only_first_read() {
        let new = newly_unlocked(&stats(1, 0, 0, 0), &HashSet::new());
        assert_eq!(ids(&new), vec!["first-read"]);
    }

    #[test]
    fn ten_articles_unlock_both_reader_tiers() {
        let new = newly_unlocked(&stats(10, 0, 0, 0), &HashSet::new());
        assert_eq!(ids(&new), vec!["first-read", "avid-reader"]);
    }

    #[test]
    fn already_unlocked_are_skipped() {
        let unlocked: HashSet<String> = ["first-read".to_string()].into();
        let new = newly_unlocked(&stats(10, 0, 0, 0), &unlocked);
        assert_eq!(ids(&new), vec!["avid-reader"]);
    }

    #[test]
    fn manual_is_never_auto_unlocked() {
        let maxed = stats(u32::MAX, u32::MAX, u32::MAX, u32::MAX);
        let new = newly_unlocked(&maxed, &HashSet::new());
        assert!(!ids(&new).contains(&"early-bird"));
        assert_eq!(new.len(), ACHIEVEMENTS.len() - 1);
    }

    #[test]
    fn streak_and_bookmark_thresholds() {
        let new = newly_unlocked(&stats(0, 0, 7, 10), &HashSet::new());
        assert_eq!(ids(&new), vec!["week-streak", "collector"]);
    }

    #[test]
    fn progress_is_capped_at_hundred() {
        let def = ACHIEVEMENTS
            .iter()
            .find(|d| d.id == "avid-reader")
            .unwrap();
        assert_eq!(def.requirement.progress(&stats(5, 0, 0, 0)), Some(50.0));
        assert_eq!(def.requirement.progress(&stats(40, 0, 0, 0)), Some(100.0));

        let manual = ACHIEVEMENTS.iter().find(|d| d.id == "early-bird").unwrap();
        assert_eq!(manual.requirement.progress(&stats(40, 0, 0, 0)), None);
    }
}
