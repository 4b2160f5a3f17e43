//! Loading `settings.json` from the platform config directory.

use anyhow::{Context, Result};
use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("com.local", "Persona Studio", "PersonaStudio")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./config"))
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Read settings, falling back to defaults when the file is absent or broken.
pub fn load_settings_or_default(path: &Path) -> AppSettings {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<AppSettings>(&bytes) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                AppSettings::default()
            }
        },
        Err(_) => AppSettings::default(),
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
