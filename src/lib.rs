//! Myopic, year-by-year capacity expansion of regional power systems.
//!
//! Each simulated year, a linear optimiser chooses how much new capacity to build within the
//! remaining potential. The chosen additions are folded back into the fixed baseline, which then
//! ages through retirements and policy phase-outs before the next year is solved.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod asset;
pub mod cli;
pub mod constraints;
pub mod conversion;
pub mod costs;
pub mod finance;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod phase_out;
pub mod potential;
pub mod region;
pub mod settings;
pub mod simulation;
pub mod snapshot;
pub mod system;
pub mod technology;
pub mod units;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the directory where program configuration files are stored
pub fn get_myopic_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No sensible config dir on this platform, so fall back to the current directory
        return PathBuf::default();
    };
    config_dir.push("myopic");

    config_dir
}
