//! Persisted user settings.
//!
//! The file is loaded and saved whole. A missing or unreadable file never fails a
//! request: `load` falls back to defaults and logs a warning.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{PersistError, StoryError};

pub const DEFAULT_MODEL: &str = "openrouter/polaris-alpha";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const MAX_TEMPERATURE: f32 = 2.0;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// BYOK credential; `None` means use the operator default, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt_template: Option<String>,
    #[serde(default = "default_model")]
    pub model_identifier: String,
    #[serde(default = "default_temperature")]
    pub sampling_temperature: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            credential: None,
            custom_prompt_template: None,
            model_identifier: default_model(),
            sampling_temperature: default_temperature(),
        }
    }
}

impl Settings {
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_custom_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.custom_prompt_template = Some(template.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_identifier = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.sampling_temperature = temperature;
        self
    }

    /// The credential, if one is set and not blank.
    pub fn credential(&self) -> Option<&str> {
        non_blank(self.credential.as_deref())
    }

    /// The custom template, if one is set and not blank.
    pub fn custom_prompt_template(&self) -> Option<&str> {
        non_blank(self.custom_prompt_template.as_deref())
    }

    pub fn validate(&self) -> Result<(), StoryError> {
        validate_sampling(&self.model_identifier, self.sampling_temperature)
    }
}

/// Checks a model name and temperature, wherever they came from.
pub fn validate_sampling(model: &str, temperature: f32) -> Result<(), StoryError> {
    if model.trim().is_empty() {
        return Err(StoryError::invalid_input("model", "model name cannot be blank"));
    }
    if !temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(StoryError::invalid_input(
            "temperature",
            format!("must be between 0 and {}", MAX_TEMPERATURE),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// JSON file backed settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/storygen/settings.json`, or `settings.json` in the working
    /// directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("storygen").join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::debug!("Loaded settings from {}", self.path.display());
                    settings
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse settings at {}: {} - using defaults",
                        self.path.display(),
                        e
                    );
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "No settings file at {} - using defaults",
                    self.path.display()
                );
                Settings::default()
            }
            Err(e) => {
                log::warn!(
                    "Failed to read settings at {}: {} - using defaults",
                    self.path.display(),
                    e
                );
                Settings::default()
            }
        }
    }

    /// Writes the whole record to a temp file next to the target and renames it
    /// into place, so readers see either the old file or the new one.
    pub fn save(&self, settings: &Settings) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(settings)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        write_synced(&mut tmp, json.as_bytes()).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        log::info!("Saved settings to {}", self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn write_synced(tmp: &mut NamedTempFile, contents: &[u8]) -> std::io::Result<()> {
    tmp.write_all(contents)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()
}
