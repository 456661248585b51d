//! User-level program settings, read from `settings.toml` in the myopic config directory.
use crate::get_myopic_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Location of the settings file (which may not exist)
pub fn get_settings_file_path() -> PathBuf {
    get_myopic_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings. Any field missing from the file takes its default value.
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The program log level (off, error, warn, info, debug or trace)
    pub log_level: String,
    /// Whether to overwrite existing output folders by default
    pub overwrite: bool,
    /// Whether to write additional debugging information (e.g. dispatch) to CSV files
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.into(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Load settings from the settings file, or use defaults if there isn't one
    pub fn load() -> Result<Settings> {
        Self::from_file_or_default(&get_settings_file_path())
    }

    fn from_file_or_default(file_path: &Path) -> Result<Settings> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// A settings file template in which every setting is documented and commented out
    pub fn default_file_contents() -> Result<String> {
        let defaults =
            toml::to_string(&Settings::default()).context("Could not serialise settings")?;

        let mut out = String::from("# Settings for myopic. Uncomment a line to change it.\n");
        for line in defaults.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };
            let field = field.trim();
            let docs = Settings::get_field_docs(field)
                .ok()
                .with_context(|| format!("Setting {field} is undocumented"))?;
            writeln!(out)?;
            for doc_line in docs.lines() {
                writeln!(out, "# # {}", doc_line.trim())?;
            }
            writeln!(out, "# {line}")?;
        }

        Ok(out)
    }
}
