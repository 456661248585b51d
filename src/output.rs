//! The module responsible for writing output data to disk.
use crate::asset::{AssetID, AssetLedger, AssetRecord, RetirementQueue};
use crate::conversion::FoldBackReport;
use crate::potential::PotentialTracker;
use crate::region::RegionID;
use crate::simulation::optimisation::OptimisationResult;
use crate::system::SystemModel;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "myopic_results";

/// The output file name for assets
const ASSETS_FILE_NAME: &str = "assets.csv";

/// The output file name for remaining potentials
const POTENTIALS_FILE_NAME: &str = "potentials.csv";

/// The output file name for the yearly summary
const OBJECTIVE_FILE_NAME: &str = "objective.csv";

/// The output file name for the retirement queue
const RETIREMENTS_FILE_NAME: &str = "retirements.csv";

/// The output file name for dispatch
const DISPATCH_FILE_NAME: &str = "debug_dispatch.csv";

/// Get the default output directory for the specified model
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// An existing, non-empty directory is an error unless `allow_overwrite` is set.
///
/// # Returns
///
/// Whether existing output is being overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// A row of the assets CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AssetRow {
    year: u32,
    asset_id: AssetID,
    technology: String,
    role: String,
    region: RegionID,
    installed_capacity: f64,
    headroom: f64,
    optimised: bool,
    addition: f64,
}

impl AssetRow {
    /// Create a new [`AssetRow`] from the state at solve time and the fold-back
    fn new(year: u32, asset: &AssetRecord, report: &FoldBackReport) -> Self {
        let headroom = report.headroom.get(&asset.id).copied();
        Self {
            year,
            asset_id: asset.id.clone(),
            technology: asset.technology.to_string(),
            role: asset.role.to_string(),
            region: asset.region.clone(),
            installed_capacity: asset.installed_capacity().value(),
            headroom: headroom.map_or(0.0, |headroom| headroom.value()),
            optimised: headroom.is_some(),
            addition: report
                .additions
                .get(&asset.id)
                .map_or(0.0, |addition| addition.value()),
        }
    }
}

/// A row of the potentials CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PotentialRow {
    year: u32,
    technology: String,
    region: RegionID,
    remaining: f64,
    ceiling: f64,
}

/// A row of the yearly summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ObjectiveRow {
    year: u32,
    objective: f64,
    total_installed: f64,
    total_addition: f64,
    co2_emissions: f64,
    load_shed: f64,
}

/// A row of the retirements CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RetirementRow {
    year: u32,
    asset_id: AssetID,
    capacity: f64,
}

/// A row of the dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DispatchRow {
    year: u32,
    asset_id: AssetID,
    dispatch: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    dispatch_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            dispatch_writer: csv::Writer::from_path(output_path.join(DISPATCH_FILE_NAME))?,
        })
    }

    /// Write each asset's total dispatch to file
    fn write_dispatch(&mut self, year: u32, result: &OptimisationResult) -> Result<()> {
        for (asset_id, dispatch) in &result.dispatch {
            self.dispatch_writer.serialize(DispatchRow {
                year,
                asset_id: asset_id.clone(),
                dispatch: dispatch.value(),
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.dispatch_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of each year to file
pub struct DataWriter {
    output_path: PathBuf,
    assets_writer: csv::Writer<File>,
    potentials_writer: csv::Writer<File>,
    objective_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| csv::Writer::from_path(output_path.join(file_name));

        let debug_writer = if save_debug_info {
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            output_path: output_path.to_path_buf(),
            assets_writer: new_writer(ASSETS_FILE_NAME)?,
            potentials_writer: new_writer(POTENTIALS_FILE_NAME)?,
            objective_writer: new_writer(OBJECTIVE_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write everything recorded for a simulated year
    pub fn write_year(
        &mut self,
        system: &SystemModel,
        result: &OptimisationResult,
        report: &FoldBackReport,
    ) -> Result<()> {
        let year = system.year;
        self.write_assets(year, &system.assets, report)?;
        self.write_potentials(year, &system.potentials)?;
        self.write_objective(year, &system.assets, result, report)?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_dispatch(year, result)?;
        }

        Ok(())
    }

    /// Write assets to a CSV file
    fn write_assets(
        &mut self,
        year: u32,
        assets: &AssetLedger,
        report: &FoldBackReport,
    ) -> Result<()> {
        for asset in assets.iter() {
            self.assets_writer
                .serialize(AssetRow::new(year, asset, report))?;
        }

        Ok(())
    }

    /// Write remaining potentials to a CSV file
    fn write_potentials(&mut self, year: u32, potentials: &PotentialTracker) -> Result<()> {
        for (technology, region, entry) in potentials.iter() {
            self.potentials_writer.serialize(PotentialRow {
                year,
                technology: technology.to_string(),
                region: region.clone(),
                remaining: entry.remaining.value(),
                ceiling: entry.ceiling.value(),
            })?;
        }

        Ok(())
    }

    /// Write the year's summary to a CSV file
    fn write_objective(
        &mut self,
        year: u32,
        assets: &AssetLedger,
        result: &OptimisationResult,
        report: &FoldBackReport,
    ) -> Result<()> {
        let total_installed = assets
            .iter()
            .map(|asset| asset.installed_capacity().value())
            .sum();
        self.objective_writer.serialize(ObjectiveRow {
            year,
            objective: result.objective.value(),
            total_installed,
            total_addition: report.total_addition.value(),
            co2_emissions: result.emissions.value(),
            load_shed: result.load_shed.value(),
        })?;

        Ok(())
    }

    /// Write the retirement queue as it stands at the end of the run
    pub fn write_retirements(&self, retirements: &RetirementQueue) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.output_path.join(RETIREMENTS_FILE_NAME))?;
        for (year, asset_id, capacity) in retirements.iter() {
            writer.serialize(RetirementRow {
                year,
                asset_id: asset_id.clone(),
                capacity: capacity.value(),
            })?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.assets_writer.flush()?;
        self.potentials_writer.flush()?;
        self.objective_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetRole;
    use crate::fixture::{buildable_asset, region_id};
    use crate::technology::Technology;
    use crate::units::{Capacity, Emissions, Energy, Money};
    use indexmap::indexmap;
    use itertools::{Itertools, assert_equal};
    use rstest::rstest;
    use serde::de::DeserializeOwned;
    use std::iter;
    use tempfile::tempdir;

    fn read_rows<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Vec<T> {
        csv::Reader::from_path(dir.join(file_name))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    fn system_with(asset: AssetRecord) -> SystemModel {
        let mut system = SystemModel::new(2020, false);
        system.potentials.register(
            asset.technology,
            &asset.region,
            Capacity(500.0),
            Capacity(500.0),
        );
        system.assets.upsert(asset);
        system
    }

    #[rstest]
    fn test_write_year(buildable_asset: AssetRecord) {
        let id = buildable_asset.id.clone();
        let system = system_with(buildable_asset);
        let result = OptimisationResult {
            objective: Money(1234.0),
            emissions: Emissions(10.0),
            ..OptimisationResult::default()
        };
        let report = FoldBackReport {
            total_addition: Capacity(40.0),
            headroom: indexmap! {id.clone() => Capacity(100.0)},
            additions: indexmap! {id.clone() => Capacity(40.0)},
            ..FoldBackReport::default()
        };

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_year(&system, &result, &report).unwrap();
            writer.flush().unwrap();
        }

        let expected = AssetRow {
            year: 2020,
            asset_id: id,
            technology: "onwind".into(),
            role: "buildable".into(),
            region: region_id(),
            installed_capacity: 0.0,
            headroom: 100.0,
            optimised: true,
            addition: 40.0,
        };
        assert_equal(
            read_rows::<AssetRow>(dir.path(), ASSETS_FILE_NAME),
            iter::once(expected),
        );

        let expected = PotentialRow {
            year: 2020,
            technology: "onwind".into(),
            region: region_id(),
            remaining: 500.0,
            ceiling: 500.0,
        };
        assert_equal(
            read_rows::<PotentialRow>(dir.path(), POTENTIALS_FILE_NAME),
            iter::once(expected),
        );

        let expected = ObjectiveRow {
            year: 2020,
            objective: 1234.0,
            total_installed: 0.0,
            total_addition: 40.0,
            co2_emissions: 10.0,
            load_shed: 0.0,
        };
        assert_equal(
            read_rows::<ObjectiveRow>(dir.path(), OBJECTIVE_FILE_NAME),
            iter::once(expected),
        );

        // No debug files unless asked for
        assert!(!dir.path().join(DISPATCH_FILE_NAME).exists());
    }

    #[test]
    fn test_write_asset_not_optimised() {
        let asset = AssetRecord::new(
            "R1 coal".into(),
            Technology::Coal,
            AssetRole::Fixed,
            region_id(),
            Capacity(300.0),
            2020,
        );
        let row = AssetRow::new(2021, &asset, &FoldBackReport::default());
        assert_eq!(row.installed_capacity, 300.0);
        assert_eq!(row.role, "fixed");
        assert!(!row.optimised);
        assert_eq!(row.addition, 0.0);
    }

    #[rstest]
    fn test_write_dispatch(buildable_asset: AssetRecord) {
        let id = buildable_asset.id.clone();
        let system = system_with(buildable_asset);
        let result = OptimisationResult {
            dispatch: indexmap! {id.clone() => Energy(42.0)},
            ..OptimisationResult::default()
        };

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer
                .write_year(&system, &result, &FoldBackReport::default())
                .unwrap();
            writer.flush().unwrap();
        }

        let expected = DispatchRow {
            year: 2020,
            asset_id: id,
            dispatch: 42.0,
        };
        assert_equal(
            read_rows::<DispatchRow>(dir.path(), DISPATCH_FILE_NAME),
            iter::once(expected),
        );
    }

    #[test]
    fn test_write_retirements() {
        let mut queue = RetirementQueue::default();
        queue.schedule("b".into(), 2030, Capacity(5.0));
        queue.schedule("a".into(), 2025, Capacity(10.0));

        let dir = tempdir().unwrap();
        DataWriter::create(dir.path(), false)
            .unwrap()
            .write_retirements(&queue)
            .unwrap();

        let records: Vec<RetirementRow> = read_rows(dir.path(), RETIREMENTS_FILE_NAME);
        assert_eq!(
            records,
            [
                RetirementRow {
                    year: 2025,
                    asset_id: "a".into(),
                    capacity: 10.0
                },
                RetirementRow {
                    year: 2030,
                    asset_id: "b".into(),
                    capacity: 5.0
                }
            ]
        );
    }

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_overwrite() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("old.csv"), "x").unwrap();

        assert!(create_output_directory(dir.path(), false).is_err());
        assert!(create_output_directory(dir.path(), true).unwrap());
        assert!(!dir.path().join("old.csv").exists());
    }
}
