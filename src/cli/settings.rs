//! The `settings` subcommands
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands of `settings`
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in an editor, creating it first if needed
    Edit,
    /// Print the location of the settings file
    Path,
    /// Print a documented settings file containing the default values
    DumpDefault,
}

impl SettingsSubcommands {
    /// Carry out the subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => {
                let file_path = get_settings_file_path();
                write_template_if_missing(&file_path)?;
                println!("Opening {} for editing", file_path.display());
                edit::edit_file(&file_path)
                    .with_context(|| format!("Could not edit {}", file_path.display()))?;
            }
            Self::Path => println!("{}", get_settings_file_path().display()),
            Self::DumpDefault => print!("{}", Settings::default_file_contents()?),
        }

        Ok(())
    }
}

fn write_template_if_missing(file_path: &Path) -> Result<()> {
    if file_path.exists() {
        return Ok(());
    }

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents()?)
        .with_context(|| format!("Failed to write {}", file_path.display()))
}
