use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Language, Theme};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error: {0}")] Io(#[from] std::io::Error),
    #[error("settings serialize error: {0}")] Serialize(#[from] serde_json::Error),
}

/// On-disk layout, keyed the same way the browser build keyed local storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient")]
    pub language: Language,
    #[serde(default, deserialize_with = "lenient")]
    pub theme: Theme,
    #[serde(default, rename = "gemini_api_key")]
    pub api_key: String,
}

// Unknown values fall back to the default instead of rejecting the whole file.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// What clients get to see; the credential itself never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub language: Language,
    pub theme: Theme,
    pub has_api_key: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub language: Option<Language>,
    pub theme: Option<Theme>,
    pub api_key: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
    inner: RwLock<Settings>,
}

impl SettingsStore {
    /// Reads persisted settings; a missing or unreadable file yields defaults.
    pub fn load(path: impl Into<PathBuf>, env_api_key: Option<String>) -> Self {
        let path = path.into();
        let mut settings = read_settings(&path);
        if settings.api_key.trim().is_empty() {
            if let Some(key) = env_api_key {
                info!("Using API key from environment: {}...", key.chars().take(6).collect::<String>());
                settings.api_key = key;
            }
        }
        Self { path, inner: RwLock::new(settings) }
    }

    pub fn public(&self) -> PublicSettings {
        let s = self.inner.read();
        PublicSettings { language: s.language, theme: s.theme, has_api_key: !s.api_key.trim().is_empty() }
    }

    pub fn language(&self) -> Language { self.inner.read().language }
    pub fn theme(&self) -> Theme { self.inner.read().theme }
    pub fn api_key(&self) -> String { self.inner.read().api_key.clone() }

    pub fn toggle_language(&self) -> Result<Language, SettingsError> {
        self.modify(|s| s.language = s.language.toggled())?;
        Ok(self.language())
    }

    pub fn toggle_theme(&self) -> Result<Theme, SettingsError> {
        self.modify(|s| s.theme = s.theme.toggled())?;
        Ok(self.theme())
    }

    pub fn update(&self, update: SettingsUpdate) -> Result<PublicSettings, SettingsError> {
        self.modify(|s| {
            if let Some(language) = update.language { s.language = language; }
            if let Some(theme) = update.theme { s.theme = theme; }
            if let Some(key) = update.api_key { s.api_key = key.trim().to_string(); }
        })?;
        Ok(self.public())
    }

    // Write-through: every change rewrites the whole file.
    fn modify(&self, f: impl FnOnce(&mut Settings)) -> Result<(), SettingsError> {
        let mut guard = self.inner.write();
        let mut next = guard.clone();
        f(&mut next);
        write_settings(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings file {}: {}", path.display(), e);
                Settings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(e) => {
            warn!("Could not read settings file {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(settings)?)?;
    Ok(())
}
