pub mod achievements;
pub mod prefs;
pub mod streak;
pub mod toc;
