//! Persisted user preferences
//!
//! Settings live in a small JSON document. The selected model is stored as
//! its wire name, so a settings file written by a newer build that knows
//! more models still loads (the unknown model resolves to the fallback).

use crate::models::AiModel;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: AiModel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: AiModel::GeminiPro,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, returning defaults when the file does not exist yet.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            tracing::debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write settings atomically: a temp file in the same directory is
    /// renamed over the target.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, settings)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| e.error)?;

        tracing::info!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Load, apply `f`, save, and return the updated settings.
    pub fn update<F: FnOnce(&mut Settings)>(&self, f: F) -> Result<Settings> {
        let mut settings = self.load()?;
        f(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}
