//! Fixtures for tests

use crate::asset::{AssetDefinition, AssetDefinitionMap, AssetRecord, AssetRole};
use crate::model::{Model, ModelParameters};
use crate::region::{Region, RegionID, RegionMap};
use crate::snapshot::Snapshots;
use crate::technology::{Fuel, Technology};
use crate::units::{
    Capacity, Dimensionless, Hours, MoneyPerCapacity, MoneyPerEmissions, MoneyPerEnergy,
};
use indexmap::{IndexMap, indexmap};
use rstest::fixture;
use std::collections::HashMap;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        )
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn region_id() -> RegionID {
    "R1".into()
}

#[fixture]
pub fn regions() -> RegionMap {
    ["R1", "R2"]
        .into_iter()
        .map(|id| {
            let region = Region {
                id: id.into(),
                description: format!("Region {id}"),
            };
            (region.id.clone(), region)
        })
        .collect()
}

#[fixture]
pub fn snapshots() -> Snapshots {
    [("day".into(), Hours(12.0)), ("night".into(), Hours(12.0))]
        .into_iter()
        .collect()
}

#[fixture]
pub fn buildable_asset(region_id: RegionID) -> AssetRecord {
    AssetRecord::new(
        "R1 onwind".into(),
        Technology::Onwind,
        AssetRole::Buildable,
        region_id,
        Capacity(0.0),
        2020,
    )
}

/// An asset definition with default costs
pub fn asset_definition(
    id: &str,
    technology: Technology,
    capacity: f64,
    extendable: bool,
) -> AssetDefinition {
    AssetDefinition {
        id: id.into(),
        technology,
        region: "R1".into(),
        region_to: None,
        capacity: Capacity(capacity),
        extendable,
        capital_cost: MoneyPerCapacity(100_000.0),
        marginal_cost: MoneyPerEnergy(0.0),
        efficiency: Dimensionless(1.0),
        max_hours: None,
        co2_intensity: None,
    }
}

#[fixture]
pub fn asset_definitions() -> AssetDefinitionMap {
    let line = AssetDefinition {
        region_to: Some("R2".into()),
        capital_cost: MoneyPerCapacity(500.0),
        ..asset_definition("R1-R2", Technology::Ac, 100.0, true)
    };
    let coal = AssetDefinition {
        marginal_cost: MoneyPerEnergy(30.0),
        efficiency: Dimensionless(0.4),
        ..asset_definition("R1 coal", Technology::Coal, 300.0, false)
    };
    let ccgt = AssetDefinition {
        capital_cost: MoneyPerCapacity(60_000.0),
        ..asset_definition("R1 CCGT", Technology::Ccgt, 122.0, true)
    };
    let battery = AssetDefinition {
        max_hours: Some(6.0),
        efficiency: Dimensionless(0.81),
        ..asset_definition("R1 battery", Technology::Battery, 10.0, true)
    };

    [
        asset_definition("R1 onwind", Technology::Onwind, 500.0, true),
        asset_definition("R1 solar", Technology::Solar, 800.0, true),
        asset_definition("R1 biomass", Technology::Biomass, 40.0, true),
        coal,
        ccgt,
        battery,
        asset_definition("R2 onwind", Technology::Onwind, 300.0, false),
        line,
    ]
    .into_iter()
    .map(|asset| (asset.id.clone(), asset))
    .collect()
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        start_year: 2020,
        end_year: 2023,
        regional_potential: Capacity(1000.0),
        load_growth: Dimensionless(1.01),
        base_annual_demand: None,
        value_of_lost_load: MoneyPerEnergy(1e5),
        discount_rate: Dimensionless(0.07),
        hydrogen: false,
        h2_store_hours_electrolysis: Hours(168.0),
        h2_store_hours_fuel_cell: Hours(168.0),
        electrolysis_capital_cost: MoneyPerCapacity(68_000.0),
        fuel_cell_capital_cost: MoneyPerCapacity(135_000.0),
        h2_store_capital_cost: MoneyPerCapacity(2_600.0),
        phase_outs: Vec::new(),
    }
}

#[fixture]
pub fn model(
    model_parameters: ModelParameters,
    regions: RegionMap,
    asset_definitions: AssetDefinitionMap,
    snapshots: Snapshots,
) -> Model {
    let years: Vec<u32> = model_parameters.years().collect();
    let gas_prices: IndexMap<_, _> = years
        .iter()
        .map(|year| (*year, MoneyPerEnergy(20.0)))
        .collect();
    let coal_prices: IndexMap<_, _> = years
        .iter()
        .map(|year| (*year, MoneyPerEnergy(8.0)))
        .collect();
    let co2_prices: HashMap<_, _> = years
        .iter()
        .map(|year| (*year, MoneyPerEmissions(80.0)))
        .collect();

    Model {
        model_path: PathBuf::from("model"),
        parameters: model_parameters,
        demand: regions
            .keys()
            .map(|region| (region.clone(), vec![Capacity(400.0), Capacity(300.0)]))
            .collect(),
        regions,
        assets: asset_definitions,
        snapshots,
        availability: HashMap::new(),
        committed_additions: HashMap::new(),
        retirements: Vec::new(),
        potential_ceilings: HashMap::new(),
        cost_factors: HashMap::new(),
        fuel_prices: indexmap! { Fuel::Gas => gas_prices, Fuel::Coal => coal_prices },
        co2_prices,
        co2_limits: HashMap::new(),
        aggregate_limits: Vec::new(),
    }
}
