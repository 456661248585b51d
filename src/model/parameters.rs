//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::technology::Technology;
use crate::units::{Capacity, Dimensionless, Energy, Hours, MoneyPerCapacity, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

define_unit_param_default!(default_load_growth, Dimensionless, 1.01);
define_unit_param_default!(default_value_of_lost_load, MoneyPerEnergy, 1e5);
define_unit_param_default!(default_discount_rate, Dimensionless, 0.07);
define_unit_param_default!(default_h2_store_hours, Hours, 168.0);
define_unit_param_default!(default_electrolysis_capital_cost, MoneyPerCapacity, 68_000.0);
define_unit_param_default!(default_fuel_cell_capital_cost, MoneyPerCapacity, 135_000.0);
define_unit_param_default!(default_h2_store_capital_cost, MoneyPerCapacity, 2_600.0);

/// A technology whose capacity must be gone by a given year
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
pub struct PhaseOut {
    /// The technology to phase out
    pub technology: Technology,
    /// The year by which no capacity of the technology may remain
    pub year: u32,
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The first simulated year
    pub start_year: u32,
    /// The last simulated year
    pub end_year: u32,
    /// The most capacity any one asset may add in a single year
    pub regional_potential: Capacity,
    /// Factor by which load grows each year
    #[serde(default = "default_load_growth")]
    pub load_growth: Dimensionless,
    /// If set, load in the start year is rescaled so total annual demand equals this value
    #[serde(default)]
    pub base_annual_demand: Option<Energy>,
    /// The cost applied to unserved load
    #[serde(default = "default_value_of_lost_load")]
    pub value_of_lost_load: MoneyPerEnergy,
    /// Discount rate used to annualise investment costs
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Dimensionless,
    /// Whether to add hydrogen production, storage and blending to every region
    #[serde(default)]
    pub hydrogen: bool,
    /// Hours of hydrogen storage per unit of electrolysis capacity
    #[serde(default = "default_h2_store_hours")]
    pub h2_store_hours_electrolysis: Hours,
    /// Hours of hydrogen storage per unit of fuel cell output
    #[serde(default = "default_h2_store_hours")]
    pub h2_store_hours_fuel_cell: Hours,
    /// Annualised capital cost of electrolysers
    #[serde(default = "default_electrolysis_capital_cost")]
    pub electrolysis_capital_cost: MoneyPerCapacity,
    /// Annualised capital cost of fuel cells
    #[serde(default = "default_fuel_cell_capital_cost")]
    pub fuel_cell_capital_cost: MoneyPerCapacity,
    /// Annualised capital cost of hydrogen storage (per MWh)
    #[serde(default = "default_h2_store_capital_cost")]
    pub h2_store_capital_cost: MoneyPerCapacity,
    /// Technologies to phase out linearly
    #[serde(default)]
    pub phase_outs: Vec<PhaseOut>,
}

/// Check that the simulated years are valid
fn check_years(start_year: u32, end_year: u32) -> Result<()> {
    ensure!(
        start_year <= end_year,
        "end_year ({end_year}) must not be before start_year ({start_year})"
    );

    Ok(())
}

/// Check that the `regional_potential` parameter is valid
fn check_regional_potential(value: Capacity) -> Result<()> {
    ensure!(
        value.is_finite() && value > Capacity(0.0),
        "regional_potential must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `load_growth` parameter is valid
fn check_load_growth(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value > Dimensionless(0.0),
        "load_growth must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `base_annual_demand` parameter is valid
fn check_base_annual_demand(value: Option<Energy>) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value > Energy(0.0),
            "base_annual_demand must be a finite number greater than zero"
        );
    }

    Ok(())
}

/// Check that the `value_of_lost_load` parameter is valid
fn check_value_of_lost_load(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.is_finite() && value > MoneyPerEnergy(0.0),
        "value_of_lost_load must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `discount_rate` parameter is valid
fn check_discount_rate(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0),
        "discount_rate must be a finite, non-negative number"
    );

    Ok(())
}

/// Check that a storage sizing ratio is valid
fn check_store_hours(name: &str, value: Hours) -> Result<()> {
    ensure!(
        value.is_finite() && value > Hours(0.0),
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that a capital cost is valid
fn check_capital_cost(name: &str, value: MoneyPerCapacity) -> Result<()> {
    ensure!(
        value.is_finite() && value >= MoneyPerCapacity(0.0),
        "{name} must be a finite, non-negative number"
    );

    Ok(())
}

/// Check that phase-outs are after the start year and name each technology only once
fn check_phase_outs(phase_outs: &[PhaseOut], start_year: u32) -> Result<()> {
    let mut seen = HashSet::new();
    for phase_out in phase_outs {
        ensure!(
            phase_out.year > start_year,
            "Phase-out year {} for {} must be after start_year ({start_year})",
            phase_out.year,
            phase_out.technology
        );
        ensure!(
            seen.insert(phase_out.technology),
            "Technology {} is phased out more than once",
            phase_out.technology
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// The simulated years, in order
    pub fn years(&self) -> impl Iterator<Item = u32> + Clone {
        self.start_year..=self.end_year
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_years(self.start_year, self.end_year)?;
        check_regional_potential(self.regional_potential)?;
        check_load_growth(self.load_growth)?;
        check_base_annual_demand(self.base_annual_demand)?;
        check_value_of_lost_load(self.value_of_lost_load)?;
        check_discount_rate(self.discount_rate)?;
        check_store_hours(
            "h2_store_hours_electrolysis",
            self.h2_store_hours_electrolysis,
        )?;
        check_store_hours("h2_store_hours_fuel_cell", self.h2_store_hours_fuel_cell)?;
        check_capital_cost("electrolysis_capital_cost", self.electrolysis_capital_cost)?;
        check_capital_cost("fuel_cell_capital_cost", self.fuel_cell_capital_cost)?;
        check_capital_cost("h2_store_capital_cost", self.h2_store_capital_cost)?;
        check_phase_outs(&self.phase_outs, self.start_year)?;

        Ok(())
    }
}
