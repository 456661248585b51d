//! Integration tests for the `run` command.
use float_cmp::assert_approx_eq;
use itertools::Itertools;
use myopic::cli::{RunOpts, handle_run_command};
use myopic::settings::Settings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// Read a CSV output file as a list of column name to value maps
fn read_output(output_dir: &Path, file_name: &str) -> Vec<HashMap<String, String>> {
    csv::Reader::from_path(output_dir.join(file_name))
        .unwrap()
        .into_deserialize()
        .try_collect()
        .unwrap()
}

fn value(row: &HashMap<String, String>, column: &str) -> f64 {
    row[column].parse().unwrap()
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("MYOPIC_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        ..RunOpts::default()
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();

    let summary = read_output(&output_dir, "objective.csv");
    let years: Vec<u32> = summary
        .iter()
        .map(|row| row["year"].parse().unwrap())
        .collect();
    assert_eq!(years, [2025, 2026, 2027, 2028, 2029, 2030]);
    for row in &summary {
        assert!(value(row, "total_addition") >= 0.0);
    }

    // Coal is phased out by 2030
    let coal_2030: f64 = read_output(&output_dir, "assets.csv")
        .iter()
        .filter(|row| row["year"] == "2030" && row["technology"] == "coal")
        .map(|row| value(row, "installed_capacity"))
        .sum();
    assert_approx_eq!(f64, coal_2030, 0.0);

    // Potentials never go negative or over their ceiling
    for row in read_output(&output_dir, "potentials.csv") {
        let remaining = value(&row, "remaining");
        assert!(remaining >= 0.0);
        assert!(remaining <= value(&row, "ceiling") + 1e-9);
    }

    // Existing output is only replaced when asked
    assert!(handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).is_err());
    let opts = RunOpts {
        overwrite: true,
        ..opts
    };
    handle_run_command(&get_model_dir(), &opts, Some(Settings::default())).unwrap();
}
