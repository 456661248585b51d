//! Functionality for running the simulation year by year.
use crate::constraints::build_constraints;
use crate::conversion::{convert_baseline, fold_back};
use crate::costs::{apply_baseline_costs, update_costs, update_exogenous};
use crate::model::Model;
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::system::SystemModel;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use strum::Display;

pub mod optimisation;
use optimisation::{Optimiser, YearContext};

/// The steps the simulation passes through in each year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    /// Converting the input assets into the start-year system
    #[strum(serialize = "baseline conversion")]
    Baseline,
    /// Removing phased-out and retiring capacity
    #[strum(serialize = "retirement")]
    Retiring,
    /// Updating capital, fuel and CO2 costs
    #[strum(serialize = "re-costing")]
    Recosting,
    /// Running the optimiser
    #[strum(serialize = "optimisation")]
    Solving,
    /// Moving chosen capacity into the fixed baseline
    #[strum(serialize = "fold-back")]
    FoldingBack,
    /// Moving on to the next year
    #[strum(serialize = "advancing")]
    Advancing,
    /// Writing end-of-run output
    #[strum(serialize = "finalizing")]
    Finalizing,
}

fn enter(stage: Stage, year: u32) {
    debug!("{year}: {stage}");
}

/// Run the simulation.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `optimiser` - Chooses capacity additions each year
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. dispatch) to file
///
/// # Returns
///
/// The system as it stands at the end of the final year
pub fn run(
    model: &Model,
    optimiser: &mut impl Optimiser,
    output_path: &Path,
    debug_model: bool,
) -> Result<SystemModel> {
    let parameters = &model.parameters;
    write_metadata(
        output_path,
        &model.model_path,
        (parameters.start_year, parameters.end_year),
    )?;
    let mut writer = DataWriter::create(output_path, debug_model)?;

    let mut years = model.iter_years();
    let Some(start_year) = years.next() else {
        return Ok(SystemModel::new(parameters.start_year, parameters.hydrogen));
    };

    info!("Year: {start_year}");
    enter(Stage::Baseline, start_year);
    let mut system = convert_baseline(model).context("Baseline conversion failed")?;
    apply_baseline_costs(&mut system, model)?;
    solve_year(&mut system, model, optimiser, &mut writer)?;

    for year in years {
        enter(Stage::Advancing, year);
        system.year = year;
        info!("Year: {year}");

        enter(Stage::Retiring, year);
        let phased_out = system.apply_phase_outs(year)?;
        let retired = system.apply_retirements(year)?;
        debug!("Phased out {phased_out} and retired {retired} in {year}");

        enter(Stage::Recosting, year);
        update_costs(&mut system, model, year)?;
        update_exogenous(&mut system, model, year);
        system.refresh_headroom(parameters.regional_potential);

        solve_year(&mut system, model, optimiser, &mut writer)?;
    }

    enter(Stage::Finalizing, system.year);
    writer.write_retirements(system.assets.retirements())?;
    writer.flush()?;

    Ok(system)
}

/// Optimise the current year, fold the result back into the system and record it
fn solve_year(
    system: &mut SystemModel,
    model: &Model,
    optimiser: &mut impl Optimiser,
    writer: &mut DataWriter,
) -> Result<()> {
    let year = system.year;
    enter(Stage::Solving, year);
    let constraints = build_constraints(system, model, year);
    let ctx = YearContext { model, year };
    let result = optimiser
        .optimise(system, &ctx, &constraints)
        .with_context(|| format!("Optimisation failed for year {year}"))?;

    enter(Stage::FoldingBack, year);
    let report = fold_back(system, &result)?;
    if !report.is_conserved() {
        warn!(
            "Fixed capacity changed by {} in {year} but {} was added",
            report.fixed_after - report.fixed_before,
            report.total_addition
        );
    }
    info!(
        "Added {} of capacity in {year} ({} of headroom available)",
        report.total_addition, report.headroom_before
    );

    writer.write_year(system, &result, &report)
}
