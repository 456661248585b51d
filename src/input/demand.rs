//! Code for reading load and availability profiles.
use super::*;
use crate::asset::{AssetDefinitionMap, AssetID};
use crate::id::IDCollection;
use crate::model::{AvailabilityMap, DemandMap};
use crate::region::RegionMap;
use crate::snapshot::Snapshots;
use crate::units::{Capacity, Dimensionless};
use log::warn;
use serde::Deserialize;
use std::collections::HashSet;

const DEMAND_FILE_NAME: &str = "demand.csv";
const AVAILABILITY_FILE_NAME: &str = "availability.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct DemandRaw {
    region: String,
    snapshot: String,
    load: Capacity,
}

#[derive(PartialEq, Debug, Deserialize)]
struct AvailabilityRaw {
    asset_id: String,
    snapshot: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    value: f64,
}

/// Look up the position of a snapshot
fn snapshot_index(snapshots: &Snapshots, snapshot: &str) -> Result<usize> {
    snapshots
        .index_of(snapshot)
        .with_context(|| format!("Unknown snapshot {snapshot}"))
}

/// Read load per region and snapshot from an iterator.
///
/// Regions or snapshots without an entry have zero load.
fn read_demand_from_iter<I>(
    iter: I,
    regions: &RegionMap,
    snapshots: &Snapshots,
) -> Result<DemandMap>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut demand: DemandMap = regions
        .keys()
        .map(|region| (region.clone(), vec![Capacity(0.0); snapshots.len()]))
        .collect();
    let mut seen = HashSet::new();

    for record in iter {
        let region = regions.get_id(&record.region)?;
        let index = snapshot_index(snapshots, &record.snapshot)?;
        ensure!(
            record.load.is_finite() && record.load >= Capacity(0.0),
            "Load for region {region} in snapshot {} must be a finite, non-negative number",
            record.snapshot
        );
        ensure!(
            seen.insert((region.clone(), index)),
            "Duplicate load entry for region {region} in snapshot {}",
            record.snapshot
        );
        demand[&region][index] = record.load;
    }

    for (region, loads) in &demand {
        if loads.iter().all(|load| *load == Capacity(0.0)) {
            warn!("Region {region} has no load");
        }
    }

    Ok(demand)
}

/// Read load profiles from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `regions` - The model's regions
/// * `snapshots` - The model's snapshots
pub fn read_demand(
    model_dir: &Path,
    regions: &RegionMap,
    snapshots: &Snapshots,
) -> Result<DemandMap> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    let demand_csv = read_csv(&file_path)?;
    read_demand_from_iter(demand_csv, regions, snapshots)
        .with_context(|| input_err_msg(&file_path))
}

/// Read availability factors from an iterator.
///
/// Snapshots without an entry are fully available.
fn read_availability_from_iter<I>(
    iter: I,
    assets: &AssetDefinitionMap,
    snapshots: &Snapshots,
) -> Result<AvailabilityMap>
where
    I: Iterator<Item = AvailabilityRaw>,
{
    let mut availability = AvailabilityMap::new();
    let mut seen = HashSet::new();
    for record in iter {
        let asset_id: AssetID = assets.get_id(&record.asset_id)?;
        let index = snapshot_index(snapshots, &record.snapshot)?;
        ensure!(
            seen.insert((asset_id.clone(), index)),
            "Duplicate availability entry for asset {asset_id} in snapshot {}",
            record.snapshot
        );
        availability
            .entry(asset_id)
            .or_insert_with(|| vec![Dimensionless(1.0); snapshots.len()])[index] =
            Dimensionless(record.value);
    }

    Ok(availability)
}

/// Read availability profiles from the model directory, if present.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `assets` - The model's asset definitions
/// * `snapshots` - The model's snapshots
pub fn read_availability(
    model_dir: &Path,
    assets: &AssetDefinitionMap,
    snapshots: &Snapshots,
) -> Result<AvailabilityMap> {
    let file_path = model_dir.join(AVAILABILITY_FILE_NAME);
    let availability_csv = read_csv_optional(&file_path)?;
    read_availability_from_iter(availability_csv, assets, snapshots)
        .with_context(|| input_err_msg(&file_path))
}
