// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FarbwerkError, Result};

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Builtin PDF fonts usable for re-rendered text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextFont {
    #[default]
    Helvetica,
    TimesRoman,
    Courier,
}

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scheme used when none is given on the command line.
    pub default_scheme: String,
    /// Preview resolution in dots per inch (72 page units per inch).
    pub preview_dpi: u32,
    /// Appended to the input file stem to name the default output.
    pub output_suffix: String,
    /// Builtin font used for re-rendered text.
    pub text_font: TextFont,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_scheme: "High Contrast".into(),
            preview_dpi: 150,
            output_suffix: "_converted".into(),
            text_font: TextFont::Helvetica,
        }
    }
}

impl AppConfig {
    /// Read a config file. A missing file is an error here; see
    /// [`AppConfig::load_or_default`] for the lenient variant.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| FarbwerkError::Config(format!("{}: {e}", path.display())))
    }

    /// Read a config file, falling back to defaults if it is absent or
    /// malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Default output path for `input`: `<stem><suffix>.pdf` beside it.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());
        input.with_file_name(format!("{stem}{}.pdf", self.output_suffix))
    }

    /// Preview zoom factor relative to page space.
    pub fn preview_scale(&self) -> f32 {
        self.preview_dpi as f32 / 72.0
    }
}

/// Default config location: `$XDG_CONFIG_HOME/farbwerk/config.json`, then
/// `$HOME/.config/farbwerk/config.json`.
pub fn default_config_path() -> PathBuf {
    config_base().join("farbwerk").join(CONFIG_FILE)
}

fn config_base() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    // Last resort
    PathBuf::from(".")
}
