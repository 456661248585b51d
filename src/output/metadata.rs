//! Run metadata, written alongside the results so a run can be traced back to its inputs and the
//! build which produced it.
use anyhow::Result;
use chrono::prelude::*;
use log::warn;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // Generated by the build script
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The short git hash of the build, marked if the tree had local changes
fn get_git_hash() -> String {
    match (built_info::GIT_COMMIT_HASH_SHORT, built_info::GIT_DIRTY) {
        (None, _) => "unknown".into(),
        (Some(hash), Some(true)) => format!("{hash}-dirty"),
        (Some(hash), _) => hash.into(),
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata,
    platform: Option<PlatformMetadata>,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model directory
    model_path: &'a Path,
    /// First simulated year
    start_year: u32,
    /// Last simulated year
    end_year: u32,
    /// When the run started
    datetime: String,
}

/// The program which produced the results
#[derive(Serialize)]
struct ProgramMetadata {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    is_debug: bool,
    rustc_version: &'static str,
    build_time_utc: &'static str,
    git_commit_hash: String,
}

impl ProgramMetadata {
    fn from_build() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// The machine the run happened on, as reported by [`PlatformInfo`]
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    /// Query the platform. Returns `None` if it cannot be determined.
    fn query() -> Option<Self> {
        let info = match PlatformInfo::new() {
            Ok(info) => info,
            Err(err) => {
                warn!("Could not determine platform info: {err}");
                return None;
            }
        };

        Some(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write `metadata.toml` to the output folder
///
/// # Arguments
///
/// * `output_path` - The output folder
/// * `model_path` - The model directory
/// * `years` - The first and last simulated years
pub fn write_metadata(output_path: &Path, model_path: &Path, years: (u32, u32)) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            model_path,
            start_year: years.0,
            end_year: years.1,
            datetime: Local::now().to_rfc2822(),
        },
        program: ProgramMetadata::from_build(),
        platform: PlatformMetadata::query(),
    };
    fs::write(
        output_path.join(METADATA_FILE_NAME),
        toml::to_string(&metadata)?,
    )?;

    Ok(())
}
