//! Code for reading snapshots from a CSV file.
use super::*;
use crate::snapshot::{SnapshotID, Snapshots};
use crate::units::Hours;
use serde::Deserialize;
use std::collections::HashSet;

const SNAPSHOTS_FILE_NAME: &str = "snapshots.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct SnapshotRaw {
    id: String,
    weight: Hours,
}

/// Read snapshots from an iterator of raw records, preserving their order
fn read_snapshots_from_iter<I>(iter: I) -> Result<Snapshots>
where
    I: Iterator<Item = SnapshotRaw>,
{
    let mut seen = HashSet::new();
    let mut snapshots = Vec::new();
    for snapshot in iter {
        ensure!(
            snapshot.weight.is_finite() && snapshot.weight > Hours(0.0),
            "Weight of snapshot {} must be a finite number greater than zero",
            snapshot.id
        );
        ensure!(
            seen.insert(snapshot.id.clone()),
            "Duplicate snapshot ID: {}",
            snapshot.id
        );
        snapshots.push((SnapshotID::from(snapshot.id), snapshot.weight));
    }

    Ok(snapshots.into_iter().collect())
}

/// Read snapshots from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_snapshots(model_dir: &Path) -> Result<Snapshots> {
    let file_path = model_dir.join(SNAPSHOTS_FILE_NAME);
    let snapshots_csv = read_csv(&file_path)?;
    read_snapshots_from_iter(snapshots_csv).with_context(|| input_err_msg(&file_path))
}
