//! Code for reading cost trajectories and emission limits.
use super::*;
use crate::model::{Co2LimitMap, Co2PriceMap, CostFactorMap, FuelPriceMap};
use crate::technology::{Fuel, Technology};
use crate::units::{Dimensionless, Emissions, MoneyPerEmissions, MoneyPerEnergy};
use serde::Deserialize;

const COST_FACTORS_FILE_NAME: &str = "cost_factors.csv";
const FUEL_COSTS_FILE_NAME: &str = "fuel_costs.csv";
const CO2_PRICES_FILE_NAME: &str = "co2_prices.csv";
const CO2_LIMITS_FILE_NAME: &str = "co2_limits.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct CostFactorRaw {
    technology: Technology,
    year: u32,
    factor: Dimensionless,
}

#[derive(PartialEq, Debug, Deserialize)]
struct FuelPriceRaw {
    fuel: Fuel,
    year: u32,
    price: MoneyPerEnergy,
}

#[derive(PartialEq, Debug, Deserialize)]
struct Co2PriceRaw {
    year: u32,
    price: MoneyPerEmissions,
}

#[derive(PartialEq, Debug, Deserialize)]
struct Co2LimitRaw {
    year: u32,
    limit: Emissions,
}

/// Check that a year is one of the simulated years
fn check_year(year: u32, years: &[u32]) -> Result<()> {
    ensure!(years.contains(&year), "{year} is not a simulated year");
    Ok(())
}

fn read_cost_factors_from_iter<I>(iter: I, years: &[u32]) -> Result<CostFactorMap>
where
    I: Iterator<Item = CostFactorRaw>,
{
    let mut factors = CostFactorMap::new();
    for record in iter {
        check_year(record.year, years)?;
        ensure!(
            record.factor.is_finite() && record.factor > Dimensionless(0.0),
            "Cost factor for {} in {} must be a finite number greater than zero",
            record.technology,
            record.year
        );
        ensure!(
            factors
                .insert((record.technology, record.year), record.factor)
                .is_none(),
            "Duplicate cost factor for {} in {}",
            record.technology,
            record.year
        );
    }

    Ok(factors)
}

/// Read capital cost multipliers, if given.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `years` - The simulated years
pub fn read_cost_factors(model_dir: &Path, years: &[u32]) -> Result<CostFactorMap> {
    let file_path = model_dir.join(COST_FACTORS_FILE_NAME);
    let factors_csv = read_csv_optional(&file_path)?;
    read_cost_factors_from_iter(factors_csv, years).with_context(|| input_err_msg(&file_path))
}

fn read_fuel_prices_from_iter<I>(iter: I, years: &[u32]) -> Result<FuelPriceMap>
where
    I: Iterator<Item = FuelPriceRaw>,
{
    let mut prices = FuelPriceMap::new();
    for record in iter {
        ensure!(
            record.price.is_finite(),
            "Price of {} in {} must be a finite number",
            record.fuel,
            record.year
        );
        ensure!(
            prices
                .entry(record.fuel)
                .or_default()
                .insert(record.year, record.price)
                .is_none(),
            "Duplicate price for {} in {}",
            record.fuel,
            record.year
        );
    }

    for (fuel, fuel_prices) in &prices {
        for year in years {
            ensure!(
                fuel_prices.contains_key(year),
                "Missing price for {fuel} in {year}"
            );
        }
    }

    Ok(prices)
}

/// Read fuel price trajectories.
///
/// Every fuel listed must have a price for every simulated year.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `years` - The simulated years
pub fn read_fuel_prices(model_dir: &Path, years: &[u32]) -> Result<FuelPriceMap> {
    let file_path = model_dir.join(FUEL_COSTS_FILE_NAME);
    let prices_csv = read_csv(&file_path)?;
    read_fuel_prices_from_iter(prices_csv, years).with_context(|| input_err_msg(&file_path))
}

fn read_co2_prices_from_iter<I>(iter: I, years: &[u32]) -> Result<Co2PriceMap>
where
    I: Iterator<Item = Co2PriceRaw>,
{
    let mut prices = Co2PriceMap::new();
    for record in iter {
        ensure!(
            record.price.is_finite() && record.price >= MoneyPerEmissions(0.0),
            "CO2 price in {} must be a finite, non-negative number",
            record.year
        );
        ensure!(
            prices.insert(record.year, record.price).is_none(),
            "Duplicate CO2 price for {}",
            record.year
        );
    }

    for year in years {
        ensure!(prices.contains_key(year), "Missing CO2 price for {year}");
    }

    Ok(prices)
}

/// Read the CO2 price trajectory, which must cover every simulated year.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `years` - The simulated years
pub fn read_co2_prices(model_dir: &Path, years: &[u32]) -> Result<Co2PriceMap> {
    let file_path = model_dir.join(CO2_PRICES_FILE_NAME);
    let prices_csv = read_csv(&file_path)?;
    read_co2_prices_from_iter(prices_csv, years).with_context(|| input_err_msg(&file_path))
}

fn read_co2_limits_from_iter<I>(iter: I, years: &[u32]) -> Result<Co2LimitMap>
where
    I: Iterator<Item = Co2LimitRaw>,
{
    let mut limits = Co2LimitMap::new();
    for record in iter {
        check_year(record.year, years)?;
        ensure!(
            record.limit.is_finite() && record.limit >= Emissions(0.0),
            "CO2 limit in {} must be a finite, non-negative number",
            record.year
        );
        ensure!(
            limits.insert(record.year, record.limit).is_none(),
            "Duplicate CO2 limit for {}",
            record.year
        );
    }

    Ok(limits)
}

/// Read CO2 emission ceilings, if given. Years without an entry have no ceiling.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `years` - The simulated years
pub fn read_co2_limits(model_dir: &Path, years: &[u32]) -> Result<Co2LimitMap> {
    let file_path = model_dir.join(CO2_LIMITS_FILE_NAME);
    let limits_csv = read_csv_optional(&file_path)?;
    read_co2_limits_from_iter(limits_csv, years).with_context(|| input_err_msg(&file_path))
}
