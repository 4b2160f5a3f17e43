//! Durable storage of [`UserPreferences`].
//!
//! One JSON record under a fixed key in the app's config directory. The
//! record is rewritten whole on every save and discarded whole when it
//! cannot be parsed.

use anyhow::{Context, Result};
use shared::preferences::UserPreferences;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage key; the record lives at `<dir>/user-preferences.json`.
pub const PREFERENCES_KEY: &str = "user-preferences";

pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Store in the platform config directory.
    pub fn new() -> Self {
        Self::in_dir(crate::settings::config_dir())
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", PREFERENCES_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored record. Unparseable content is purged.
    pub fn load(&self) -> Option<UserPreferences> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read preferences");
                return None;
            }
        };

        match serde_json::from_str::<UserPreferences>(&content) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                tracing::info!(error = %e, "discarding malformed preferences");
                if let Err(e) = self.clear() {
                    tracing::warn!(error = %e, "could not purge malformed preferences");
                }
                None
            }
        }
    }

    pub fn save(&self, prefs: &UserPreferences) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the record. Nothing stored is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::agent_api::ChatMessage;
    use tempfile::TempDir;

    fn sample() -> UserPreferences {
        UserPreferences {
            name: "Ada".into(),
            remember_me: true,
            last_chat: vec![
                ChatMessage::assistant("Hi Ada!"),
                ChatMessage::user("Draw me a lighthouse"),
            ],
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        let prefs = sample();

        store.save(&prefs).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.name, prefs.name);
        assert_eq!(loaded.remember_me, prefs.remember_me);
        assert_eq!(loaded.last_chat.len(), 2);
        for (a, b) in loaded.last_chat.iter().zip(&prefs.last_chat) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.text, b.text);
            assert_eq!(a.sender, b.sender);
            assert_eq!(a.timestamp.timestamp_millis(), b.timestamp.timestamp_millis());
        }
    }

    #[test]
    fn test_missing_record_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(PreferenceStore::in_dir(dir.path()).load().is_none());
    }

    #[test]
    fn test_malformed_record_is_purged() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        fs::write(store.path(), r#"{"name":"Ada","rememberMe":tru"#).unwrap();

        assert!(store.load().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        store.clear().unwrap();

        store.save(&sample()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path().join("nested"));
        store.save(&sample()).unwrap();
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
    }
}
