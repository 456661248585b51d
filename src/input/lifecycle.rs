//! Code for reading committed additions, exogenous retirements and potential ceilings.
use super::*;
use crate::asset::{AssetDefinitionMap, AssetID};
use crate::id::IDCollection;
use crate::model::{CommittedAdditionMap, ExogenousRetirement, PotentialCeilingMap};
use crate::region::RegionMap;
use crate::technology::Technology;
use crate::units::Capacity;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::hash_map::Entry;

const COMMITTED_ADDITIONS_FILE_NAME: &str = "committed_additions.csv";
const RETIREMENTS_FILE_NAME: &str = "retirements.csv";
const POTENTIALS_FILE_NAME: &str = "potentials.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct CommittedAdditionRaw {
    asset_id: String,
    capacity: Capacity,
}

#[derive(PartialEq, Debug, Deserialize)]
struct RetirementRaw {
    asset_id: String,
    year: u32,
    capacity: Capacity,
}

#[derive(PartialEq, Debug, Deserialize)]
struct PotentialCeilingRaw {
    technology: Technology,
    region: String,
    ceiling: Capacity,
}

fn read_committed_additions_from_iter<I>(
    iter: I,
    assets: &AssetDefinitionMap,
) -> Result<CommittedAdditionMap>
where
    I: Iterator<Item = CommittedAdditionRaw>,
{
    let mut additions = CommittedAdditionMap::new();
    for record in iter {
        let asset_id: AssetID = assets.get_id(&record.asset_id)?;
        ensure!(
            assets[&asset_id].extendable,
            "Committed additions can only be given for extendable assets (asset {asset_id})"
        );
        ensure!(
            record.capacity.is_finite() && record.capacity >= Capacity(0.0),
            "Committed addition for asset {asset_id} must be a finite, non-negative number"
        );
        let Entry::Vacant(entry) = additions.entry(asset_id.clone()) else {
            bail!("Duplicate committed addition for asset {asset_id}");
        };
        entry.insert(record.capacity);
    }

    Ok(additions)
}

/// Read capacity committed to be built in the start year, if given.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `assets` - The model's asset definitions
pub fn read_committed_additions(
    model_dir: &Path,
    assets: &AssetDefinitionMap,
) -> Result<CommittedAdditionMap> {
    let file_path = model_dir.join(COMMITTED_ADDITIONS_FILE_NAME);
    let additions_csv = read_csv_optional(&file_path)?;
    read_committed_additions_from_iter(additions_csv, assets)
        .with_context(|| input_err_msg(&file_path))
}

fn read_retirements_from_iter<I>(
    iter: I,
    assets: &AssetDefinitionMap,
    start_year: u32,
) -> Result<Vec<ExogenousRetirement>>
where
    I: Iterator<Item = RetirementRaw>,
{
    iter.map(|record| -> Result<_> {
        let asset_id = assets.get_id(&record.asset_id)?;
        ensure!(
            record.year > start_year,
            "Retirement of asset {asset_id} in {} must be after the start year ({start_year})",
            record.year
        );
        ensure!(
            record.capacity.is_finite() && record.capacity > Capacity(0.0),
            "Retired capacity for asset {asset_id} must be a finite number greater than zero"
        );

        Ok(ExogenousRetirement {
            asset_id,
            year: record.year,
            capacity: record.capacity,
        })
    })
    .try_collect()
}

/// Read the exogenous retirement table, if given.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `assets` - The model's asset definitions
/// * `start_year` - The first simulated year
pub fn read_retirements(
    model_dir: &Path,
    assets: &AssetDefinitionMap,
    start_year: u32,
) -> Result<Vec<ExogenousRetirement>> {
    let file_path = model_dir.join(RETIREMENTS_FILE_NAME);
    let retirements_csv = read_csv_optional(&file_path)?;
    read_retirements_from_iter(retirements_csv, assets, start_year)
        .with_context(|| input_err_msg(&file_path))
}

fn read_potential_ceilings_from_iter<I>(
    iter: I,
    regions: &RegionMap,
) -> Result<PotentialCeilingMap>
where
    I: Iterator<Item = PotentialCeilingRaw>,
{
    let mut ceilings = PotentialCeilingMap::new();
    for record in iter {
        let region = regions.get_id(&record.region)?;
        ensure!(
            record.ceiling.is_finite() && record.ceiling >= Capacity(0.0),
            "Potential ceiling for {} in region {region} must be a finite, non-negative number",
            record.technology
        );
        let technology = record.technology;
        let Entry::Vacant(entry) = ceilings.entry((technology, region.clone())) else {
            bail!("Duplicate potential ceiling for {technology} in region {region}");
        };
        entry.insert(record.ceiling);
    }

    Ok(ceilings)
}

/// Read overrides for potential ceilings, if given.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `regions` - The model's regions
pub fn read_potential_ceilings(
    model_dir: &Path,
    regions: &RegionMap,
) -> Result<PotentialCeilingMap> {
    let file_path = model_dir.join(POTENTIALS_FILE_NAME);
    let ceilings_csv = read_csv_optional(&file_path)?;
    read_potential_ceilings_from_iter(ceilings_csv, regions)
        .with_context(|| input_err_msg(&file_path))
}
