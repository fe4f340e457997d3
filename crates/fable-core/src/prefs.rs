//! User display preferences, persisted to a single namespaced JSON file
//! on local storage. Reads and writes are synchronous; a missing or
//! unreadable file falls back to the defaults, and loading merges defaults
//! over any fields a saved file does not carry.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub font_size: u32,
    pub email_notifications: bool,
    pub comment_notifications: bool,
    pub achievement_notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            font_size: 16,
            email_notifications: true,
            comment_notifications: true,
            achievement_notifications: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Email,
    Comment,
    Achievement,
}

impl Preferences {
    pub fn should_notify(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Email => self.email_notifications,
            NotificationKind::Comment => self.comment_notifications,
            NotificationKind::Achievement => self.achievement_notifications,
        }
    }
}

pub struct PrefStore {
    path: PathBuf,
}

impl PrefStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Never fails: corruption and absence both degrade to the defaults.
    pub fn load(&self) -> Preferences {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Preferences::default(),
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Unreadable preferences at {}: {}", self.path.display(), e);
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(test: &str) -> PrefStore {
        let path = std::env::temp_dir()
            .join(format!("fable-prefs-{}-{}", std::process::id(), test))
            .join("preferences.json");
        let _ = fs::remove_file(&path);
        PrefStore::new(path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = store("missing");
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = store("roundtrip");
        let prefs = Preferences {
            font_size: 20,
            email_notifications: false,
            comment_notifications: true,
            achievement_notifications: false,
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load(), prefs);
    }

    #[test]
    fn partial_file_merges_defaults() {
        let store = store("partial");
        store.save(&Preferences::default()).unwrap();
        fs::write(&store.path, r#"{ "font_size": 18 }"#).unwrap();

        let prefs = store.load();
        assert_eq!(prefs.font_size, 18);
        assert!(prefs.email_notifications);
        assert!(prefs.achievement_notifications);
    }

    #[test]
    fn corrupt_file_degrades_to_defaults() {
        let store = store("corrupt");
        store.save(&Preferences::default()).unwrap();
        fs::write(&store.path, "not json").unwrap();
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn notification_gating_follows_toggles() {
        let prefs = Preferences {
            comment_notifications: false,
            ..Preferences::default()
        };
        assert!(prefs.should_notify(NotificationKind::Email));
        assert!(!prefs.should_notify(NotificationKind::Comment));
        assert!(prefs.should_notify(NotificationKind::Achievement));
    }
}
