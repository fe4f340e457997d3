//! Daily reading-streak transition.
//!
//! The streak counts consecutive calendar days with at least one recorded
//! reading event. The transition is a pure function of the stored record
//! and today's date, so the persistence layer stays a single merge-upsert.

use chrono::{Days, NaiveDate};

/// The per-user streak record. An absent database row is represented as
/// [`StreakState::default`]: streak 0, longest 0, no last-read date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub streak: u32,
    pub longest_streak: u32,
    pub last_read_date: Option<NaiveDate>,
}

impl StreakState {
    /// Apply one reading day.
    ///
    /// - already counted today: unchanged
    /// - last read yesterday: streak + 1
    /// - gap of more than one day, or never read: reset to 1
    ///
    /// Afterwards `longest_streak >= streak` always holds and the state is
    /// a fixed point for repeat calls with the same `today`.
    pub fn advance(self, today: NaiveDate) -> StreakState {
        if self.last_read_date == Some(today) {
            return self;
        }

        let yesterday = today.checked_sub_days(Days::new(1));
        let streak = if self.last_read_date.is_some() && self.last_read_date == yesterday {
            self.streak + 1
        } else {
            1
        };

        StreakState {
            streak,
            longest_streak: self.longest_streak.max(streak),
            last_read_date: Some(today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn first_read_starts_at_one() {
        let state = StreakState::default().advance(day("2026-08-29"));
        assert_eq!(state.streak, 1);
        assert_eq!(state.longest_streak, 1);
        assert_eq!(state.last_read_date, Some(day("2026-08-29")));
    }

    #[test]
    fn consecutive_day_increments() {
        let prev = StreakState {
            streak: 4,
            longest_streak: 6,
            last_read_date: Some(day("2026-08-28")),
        };
        let state = prev.advance(day("2026-08-29"));
        assert_eq!(state.streak, 5);
        assert_eq!(state.longest_streak, 6);
    }

    #[test]
    fn increment_can_set_new_longest() {
        let prev = StreakState {
            streak: 6,
            longest_streak: 6,
            last_read_date: Some(day("2026-08-28")),
        };
        let state = prev.advance(day("2026-08-29"));
        assert_eq!(state.streak, 7);
        assert_eq!(state.longest_streak, 7);
    }

    #[test]
    fn gap_resets_to_one_and_keeps_longest() {
        let prev = StreakState {
            streak: 9,
            longest_streak: 9,
            last_read_date: Some(day("2026-08-20")),
        };
        let state = prev.advance(day("2026-08-29"));
        assert_eq!(state.streak, 1);
        assert_eq!(state.longest_streak, 9);
    }

    #[test]
    fn same_day_is_idempotent() {
        let today = day("2026-08-29");
        let once = StreakState {
            streak: 3,
            longest_streak: 5,
            last_read_date: Some(day("2026-08-28")),
        }
        .advance(today);
        let twice = once.advance(today);
        assert_eq!(once, twice);
    }

    #[test]
    fn longest_never_below_current() {
        let mut state = StreakState::default();
        let mut today = day("2026-01-01");
        for _ in 0..40 {
            state = state.advance(today);
            assert!(state.longest_streak >= state.streak);
            today = today.succ_opt().unwrap();
        }
        assert_eq!(state.streak, 40);
        assert_eq!(state.longest_streak, 40);
    }
}
