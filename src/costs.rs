//! Year-on-year updates to costs, load and the CO2 ceiling.
//!
//! Marginal costs are never recomputed from scratch. Each year only the change in each fuel and
//! CO2 price is applied on top of the previous year's costs.
use crate::model::Model;
use crate::system::SystemModel;
use crate::technology::{Fuel, Technology};
use crate::units::{Dimensionless, Energy, MoneyPerEmissions, MoneyPerEnergy};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace, warn};

/// Mean efficiency of the generators of each fuel, used to express fuel prices per unit of output
fn mean_efficiencies(system: &SystemModel) -> IndexMap<Fuel, Dimensionless> {
    system
        .assets
        .iter()
        .filter_map(|asset| asset.technology.fuel())
        .unique()
        .filter_map(|fuel| Some((fuel, system.mean_efficiency(fuel)?)))
        .collect()
}

/// Look up the price of a fuel which must be given
fn required_fuel_price(model: &Model, fuel: Fuel, year: u32) -> Result<MoneyPerEnergy> {
    model
        .fuel_price(fuel, year)
        .with_context(|| format!("No {fuel} price given for {year}"))
}

/// Apply a change in CO2 price to the marginal cost of every emitting asset.
///
/// Gas is priced at the import, per unit of fuel. Other fuels are priced per unit of output, so the
/// charge is divided by the mean efficiency of that fuel's generators.
fn apply_co2_delta(system: &mut SystemModel, delta: MoneyPerEmissions) {
    let efficiencies = mean_efficiencies(system);
    for asset in system.assets.iter_mut() {
        let Some(fuel) = asset.technology.fuel() else {
            continue;
        };
        let intensity = asset.co2_intensity.unwrap_or_else(|| fuel.co2_intensity());
        if fuel.is_delivered() {
            asset.marginal_cost += delta * intensity;
        } else if let Some(efficiency) = efficiencies.get(&fuel) {
            asset.marginal_cost += (delta * intensity) / *efficiency;
        }
    }
}

/// Apply the start-year fuel and CO2 prices and scale the start-year load.
///
/// Marginal costs from the input data are taken to already include start-year fuel costs, except
/// for imports, whose price is set here.
pub fn apply_baseline_costs(system: &mut SystemModel, model: &Model) -> Result<()> {
    let year = model.parameters.start_year;
    for (fuel, prices) in &model.fuel_prices {
        if let Some(price) = prices.get(&year) {
            system.fuel_prices.insert(*fuel, *price);
        }
    }

    let has_import = |technology| system.assets.iter_technology(technology).next().is_some();
    let (has_gas_import, has_h2_import) =
        (has_import(Technology::GasImport), has_import(Technology::H2Import));
    if has_gas_import {
        let price = required_fuel_price(model, Fuel::Gas, year)?;
        for asset in system.assets.iter_mut() {
            if asset.technology == Technology::GasImport {
                asset.marginal_cost = price;
            }
        }
    }
    if has_h2_import {
        let price = required_fuel_price(model, Fuel::H2, year)?;
        for asset in system.assets.iter_mut() {
            if asset.technology == Technology::H2Import {
                asset.marginal_cost = price;
            }
        }
    }

    let co2_price = model.co2_price(year)?;
    apply_co2_delta(system, co2_price);
    system.co2_price = co2_price;

    apply_baseline_load(system, model);
    system.co2_limit = model.co2_limits.get(&year).copied();

    Ok(())
}

/// Set each region's load multiplier for the start year
fn apply_baseline_load(system: &mut SystemModel, model: &Model) {
    let scale = model
        .parameters
        .base_annual_demand
        .map_or(Dimensionless(1.0), |target| {
            let total: Energy = model
                .demand
                .values()
                .flat_map(|loads| loads.iter().zip(model.snapshots.weights()))
                .map(|(load, weight)| *load * weight)
                .sum();
            if total > Energy(0.0) {
                target / total
            } else {
                warn!("Cannot scale load to base_annual_demand: demand data has no load");
                Dimensionless(1.0)
            }
        });
    debug!("Start-year load scaled by {scale}");

    for region in model.iter_regions() {
        system.load_scale.insert(region.clone(), scale);
    }
}

/// Update capital costs, fuel prices and the CO2 price for a new year
pub fn update_costs(system: &mut SystemModel, model: &Model, year: u32) -> Result<()> {
    for asset in system.assets.iter_mut() {
        if asset.capital_cost.value() > 0.0 {
            asset.capital_cost = asset.capital_cost * model.cost_factor(asset.technology, year);
        }
    }

    let efficiencies = mean_efficiencies(system);
    for (fuel, prices) in &model.fuel_prices {
        let price = *prices
            .get(&year)
            .with_context(|| format!("No {fuel} price given for {year}"))?;
        let previous = system
            .fuel_prices
            .insert(*fuel, price)
            .unwrap_or(MoneyPerEnergy(0.0));
        let delta = price - previous;

        match fuel {
            Fuel::Gas => {
                for asset in system.iter_fuel_burners_mut(Fuel::Gas) {
                    asset.marginal_cost += delta;
                }
            }
            Fuel::H2 => {
                for asset in system.iter_fuel_burners_mut(Fuel::H2) {
                    asset.marginal_cost = price;
                }
            }
            _ => {
                let Some(efficiency) = efficiencies.get(fuel).copied() else {
                    trace!("No generators burn {fuel}; ignoring its price change");
                    continue;
                };
                for asset in system.iter_fuel_burners_mut(*fuel) {
                    asset.marginal_cost += delta / efficiency;
                }
            }
        }
    }

    let co2_price = model.co2_price(year)?;
    apply_co2_delta(system, co2_price - system.co2_price);
    system.co2_price = co2_price;

    Ok(())
}

/// Grow the load and set the CO2 ceiling for a new year
pub fn update_exogenous(system: &mut SystemModel, model: &Model, year: u32) {
    system.scale_load(model.parameters.load_growth);
    system.co2_limit = model.co2_limits.get(&year).copied();
    if let Some(limit) = system.co2_limit {
        debug!("CO2 limit for {year} is {limit}");
    }
}
