//! The static model definition, as read from a model directory.
use crate::asset::{AssetDefinitionMap, AssetID};
use crate::region::{RegionID, RegionMap};
use crate::snapshot::Snapshots;
use crate::technology::{Fuel, Technology};
use crate::units::{Capacity, Dimensionless, Emissions, MoneyPerEmissions, MoneyPerEnergy};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::*;

/// Load per region, one entry per snapshot
pub type DemandMap = IndexMap<RegionID, Vec<Capacity>>;

/// Availability per asset, one entry per snapshot. Assets without an entry are always available.
pub type AvailabilityMap = HashMap<AssetID, Vec<Dimensionless>>;

/// Capacity committed for extendable assets in the start year
pub type CommittedAdditionMap = HashMap<AssetID, Capacity>;

/// Overrides for the ceiling of remaining potential
pub type PotentialCeilingMap = HashMap<(Technology, RegionID), Capacity>;

/// Capital cost multipliers per technology and year
pub type CostFactorMap = HashMap<(Technology, u32), Dimensionless>;

/// Fuel prices per fuel and year
pub type FuelPriceMap = IndexMap<Fuel, IndexMap<u32, MoneyPerEnergy>>;

/// CO2 price per year
pub type Co2PriceMap = HashMap<u32, MoneyPerEmissions>;

/// CO2 ceiling per year
pub type Co2LimitMap = HashMap<u32, Emissions>;

/// Capacity of an asset retired in a given year, independently of its lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct ExogenousRetirement {
    /// The asset to retire capacity from
    pub asset_id: AssetID,
    /// The year in which the capacity retires
    pub year: u32,
    /// How much capacity retires
    pub capacity: Capacity,
}

/// Bounds on the capacity of a technology added across the whole system
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateLimit {
    /// The technology the limit applies to
    pub technology: Technology,
    /// The years in which the limit applies
    pub years: Vec<u32>,
    /// Lower bound, if any
    pub min: Option<Capacity>,
    /// Upper bound, if any
    pub max: Option<Capacity>,
}

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Regions for the model
    pub regions: RegionMap,
    /// Assets as declared in the input data
    pub assets: AssetDefinitionMap,
    /// Representative time steps of each year
    pub snapshots: Snapshots,
    /// Load profiles in the start year
    pub demand: DemandMap,
    /// Availability profiles of variable generators
    pub availability: AvailabilityMap,
    /// Capacity committed in the start year
    pub committed_additions: CommittedAdditionMap,
    /// Retirements which happen regardless of lifetimes
    pub retirements: Vec<ExogenousRetirement>,
    /// Overrides for potential ceilings
    pub potential_ceilings: PotentialCeilingMap,
    /// Capital cost multipliers
    pub cost_factors: CostFactorMap,
    /// Fuel price trajectories
    pub fuel_prices: FuelPriceMap,
    /// CO2 price trajectory
    pub co2_prices: Co2PriceMap,
    /// CO2 ceilings
    pub co2_limits: Co2LimitMap,
    /// Aggregate capacity limits
    pub aggregate_limits: Vec<AggregateLimit>,
}

impl Model {
    /// Iterate over the model's simulated years
    pub fn iter_years(&self) -> impl Iterator<Item = u32> + Clone {
        self.parameters.years()
    }

    /// Iterate over the model's regions (region IDs)
    pub fn iter_regions(&self) -> impl Iterator<Item = &RegionID> + '_ {
        self.regions.keys()
    }

    /// The price of a fuel in a given year, if one was given
    pub fn fuel_price(&self, fuel: Fuel, year: u32) -> Option<MoneyPerEnergy> {
        self.fuel_prices.get(&fuel)?.get(&year).copied()
    }

    /// The CO2 price in a given year
    pub fn co2_price(&self, year: u32) -> Result<MoneyPerEmissions> {
        self.co2_prices
            .get(&year)
            .copied()
            .with_context(|| format!("No CO2 price given for {year}"))
    }

    /// The capital cost multiplier for a technology in a given year. Defaults to 1.
    pub fn cost_factor(&self, technology: Technology, year: u32) -> Dimensionless {
        self.cost_factors
            .get(&(technology, year))
            .copied()
            .unwrap_or(Dimensionless(1.0))
    }

    /// Availability of an asset in each snapshot
    pub fn availability(&self, asset_id: &AssetID, snapshot: usize) -> Dimensionless {
        self.availability
            .get(asset_id)
            .map_or(Dimensionless(1.0), |values| values[snapshot])
    }

    /// The aggregate limits in force in a given year
    pub fn iter_aggregate_limits(&self, year: u32) -> impl Iterator<Item = &AggregateLimit> {
        self.aggregate_limits
            .iter()
            .filter(move |limit| limit.years.contains(&year))
    }
}
