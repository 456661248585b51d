//! The capacity expansion and dispatch problem solved each year.
//!
//! The [`Optimiser`] trait is the seam between the orchestrator and the solver. The
//! [`HighsOptimiser`] builds a linear programme over one year's snapshots with the HiGHS solver:
//! capacity variables for optimisable assets, dispatch variables for every asset and snapshot, and
//! an energy balance for each bus.
use crate::asset::{AssetID, AssetRecord, AssetRole};
use crate::constraints::LinearConstraint;
use crate::log::LOG_LEVEL_ENV_VAR;
use crate::model::Model;
use crate::region::RegionID;
use crate::system::SystemModel;
use crate::technology::{AssetKind, Carrier, Technology};
use crate::units::{Capacity, Emissions, Energy, Money};
use anyhow::{Result, anyhow, bail};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::debug;
use std::ops::RangeInclusive;

pub mod constraints;
use constraints::BusBalance;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
type Variable = highs::Col;

/// The year being optimised, along with the static model data
pub struct YearContext<'a> {
    /// The model
    pub model: &'a Model,
    /// The year being optimised
    pub year: u32,
}

/// The optimiser's decisions for one year
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptimisationResult {
    /// Chosen capacity of each optimisable asset: the addition for buildable assets and the total
    /// for expandable ones
    pub capacities: IndexMap<AssetID, Capacity>,
    /// State of charge of each storage unit at the end of the year
    pub final_soc: IndexMap<AssetID, Energy>,
    /// Total dispatch of each asset over the year
    pub dispatch: IndexMap<AssetID, Energy>,
    /// System cost, excluding load shedding
    pub objective: Money,
    /// Total CO2 emissions
    pub emissions: Emissions,
    /// Total load which could not be served
    pub load_shed: Energy,
}

/// Chooses capacities for the optimisable assets of a system
pub trait Optimiser {
    /// Solve one year's problem
    ///
    /// # Arguments
    ///
    /// * `system` - The system, with headroom set for this year
    /// * `ctx` - The model and year
    /// * `constraints` - Extra constraints over capacity variables
    fn optimise(
        &mut self,
        system: &SystemModel,
        ctx: &YearContext,
        constraints: &[LinearConstraint],
    ) -> Result<OptimisationResult>;
}

/// What a column of the problem represents
#[derive(Debug, Clone, PartialEq)]
enum ColumnKind {
    /// Capacity of an optimisable asset
    Capacity(AssetID),
    /// Output, flow or discharge of an asset in a snapshot lasting `weight` hours
    Dispatch { asset_id: AssetID, weight: f64 },
    /// Charging of a storage unit
    Charge,
    /// Stored energy of a storage unit or store. `last` marks the final snapshot.
    Level { asset_id: AssetID, last: bool },
    /// Unserved load in a snapshot lasting `weight` hours
    Shed { weight: f64 },
}

/// A column of the problem with its objective coefficient
#[derive(Debug, Clone)]
struct ColumnInfo {
    kind: ColumnKind,
    cost: f64,
    /// Emissions per unit of the column's value
    emissions: f64,
}

/// The capacity available to an asset's dispatch variables
#[derive(Debug, Clone, Copy)]
enum CapacityTerm {
    /// Capacity is fixed for this year
    Fixed(f64),
    /// Capacity is `offset + variable`
    Variable { var: Variable, offset: f64 },
}

/// Builds the problem, keeping track of what each column means
struct ProblemBuilder {
    problem: Problem,
    columns: Vec<ColumnInfo>,
    vars: Vec<Variable>,
    capacity_vars: IndexMap<AssetID, Variable>,
    balance: BusBalance,
}

impl ProblemBuilder {
    fn new(num_snapshots: usize) -> Self {
        Self {
            problem: Problem::default(),
            columns: Vec::new(),
            vars: Vec::new(),
            capacity_vars: IndexMap::new(),
            balance: BusBalance::new(num_snapshots),
        }
    }

    fn add_column(&mut self, info: ColumnInfo, bounds: RangeInclusive<f64>) -> Variable {
        let var = self.problem.add_column(info.cost, bounds);
        self.columns.push(info);
        self.vars.push(var);
        var
    }

    /// Add a column bounded by `lower * capacity <= x <= upper * capacity`
    fn add_bounded_column(
        &mut self,
        info: ColumnInfo,
        capacity: CapacityTerm,
        lower: f64,
        upper: f64,
    ) -> Variable {
        match capacity {
            CapacityTerm::Fixed(capacity) => {
                self.add_column(info, lower * capacity..=upper * capacity)
            }
            CapacityTerm::Variable { var, offset } => {
                let min = if lower < 0.0 { f64::NEG_INFINITY } else { 0.0 };
                let x = self.add_column(info, min..=f64::INFINITY);
                self.problem
                    .add_row(f64::NEG_INFINITY..=upper * offset, [(x, 1.0), (var, -upper)]);
                if lower < 0.0 {
                    self.problem
                        .add_row(lower * offset..=f64::INFINITY, [(x, 1.0), (var, -lower)]);
                }
                x
            }
        }
    }

    /// The capacity of an asset, which is a variable if the asset is optimisable
    fn capacity_term(&self, asset: &AssetRecord) -> CapacityTerm {
        let installed = asset.installed_capacity().value();
        match self.capacity_vars.get(&asset.id) {
            Some(var) if asset.role == AssetRole::Buildable => CapacityTerm::Variable {
                var: *var,
                offset: installed,
            },
            Some(var) => CapacityTerm::Variable {
                var: *var,
                offset: 0.0,
            },
            None => CapacityTerm::Fixed(installed),
        }
    }
}

/// Solves each year's problem with the HiGHS solver
#[derive(Debug, Default)]
pub struct HighsOptimiser;

impl Optimiser for HighsOptimiser {
    fn optimise(
        &mut self,
        system: &SystemModel,
        ctx: &YearContext,
        constraints: &[LinearConstraint],
    ) -> Result<OptimisationResult> {
        let model = ctx.model;
        let mut builder = ProblemBuilder::new(model.snapshots.len());

        add_capacity_variables(&mut builder, system);
        for asset in system.assets.iter() {
            add_dispatch_variables(&mut builder, system, model, asset);
        }
        add_load_shedding(&mut builder, system, model);
        builder.add_balance_rows(system, model);
        if let Some(limit) = system.co2_limit {
            builder.add_co2_limit(limit);
        }
        builder.add_linear_constraints(constraints)?;

        let ProblemBuilder {
            problem, columns, ..
        } = builder;
        debug!(
            "Solving {} problem with {} columns and {} rows",
            ctx.year,
            columns.len(),
            problem.num_rows()
        );

        let mut highs_model = problem.optimise(Sense::Minimise);
        enable_highs_logging(&mut highs_model);
        let solved = highs_model
            .try_solve()
            .map_err(|status| anyhow!("Could not solve: {status:?}"))?;
        match solved.status() {
            HighsModelStatus::Optimal => {}
            status => bail!("Could not solve: {status:?}"),
        }

        let solution = solved.get_solution();
        Ok(collect_result(system, &columns, solution.columns()))
    }
}

/// Enable logging for the HiGHS solver
fn enable_highs_logging(model: &mut highs::Model) {
    // Skip this step if logging is disabled (e.g. when running tests)
    if let Ok(log_level) = std::env::var(LOG_LEVEL_ENV_VAR) {
        if log_level.eq_ignore_ascii_case("off") {
            return;
        }
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

/// Add one capacity column per optimisable asset
fn add_capacity_variables(builder: &mut ProblemBuilder, system: &SystemModel) {
    for asset in system.assets.iter_optimizable() {
        let installed = asset.installed_capacity().value();
        let headroom = asset.headroom().value();
        let bounds = match asset.role {
            AssetRole::Expandable => installed..=installed + headroom,
            _ => 0.0..=headroom,
        };
        let info = ColumnInfo {
            kind: ColumnKind::Capacity(asset.id.clone()),
            cost: asset.capital_cost.value(),
            emissions: 0.0,
        };
        let var = builder.add_column(info, bounds);
        builder.capacity_vars.insert(asset.id.clone(), var);
    }
}

/// Emissions per MWh of a generator's output
fn emission_rate(asset: &AssetRecord) -> f64 {
    let Some(fuel) = asset.technology.fuel() else {
        return 0.0;
    };
    let intensity = asset
        .co2_intensity
        .unwrap_or_else(|| fuel.co2_intensity())
        .value();
    if fuel.is_delivered() {
        intensity
    } else {
        intensity / asset.efficiency.value()
    }
}

/// Add the columns describing how an asset operates in each snapshot
fn add_dispatch_variables(
    builder: &mut ProblemBuilder,
    system: &SystemModel,
    model: &Model,
    asset: &AssetRecord,
) {
    let capacity = builder.capacity_term(asset);
    let weights: Vec<f64> = model.snapshots.weights().map(|w| w.value()).collect();
    let dispatch = |weight: f64, cost: f64, emissions: f64| ColumnInfo {
        kind: ColumnKind::Dispatch {
            asset_id: asset.id.clone(),
            weight,
        },
        cost,
        emissions,
    };
    let marginal_cost = asset.marginal_cost.value();
    let region = &asset.region;

    match asset.kind {
        AssetKind::Generator => {
            // Availability profiles are given for the asset as declared in the input data
            let profile_id = asset.buildable_source_id.as_ref().unwrap_or(&asset.id);
            let carrier = asset.technology.bus_carrier();
            let rate = emission_rate(asset);
            for (t, weight) in weights.iter().copied().enumerate() {
                let availability = model.availability(profile_id, t).value();
                let info = dispatch(weight, marginal_cost * weight, rate * weight);
                let p = builder.add_bounded_column(info, capacity, 0.0, availability);
                builder.balance.add(region, carrier, t, p, 1.0);
            }
        }
        AssetKind::Link => {
            let Some((input, output)) = asset.technology.link_carriers(system.fuel_mix) else {
                return;
            };
            let region_to = asset.region_to.as_ref().unwrap_or(region);
            let efficiency = asset.efficiency.value();
            let reversible = asset.technology == Technology::Dc;
            for (t, weight) in weights.iter().copied().enumerate() {
                let info = dispatch(weight, marginal_cost * weight, 0.0);
                let forward = builder.add_bounded_column(info, capacity, 0.0, 1.0);
                builder.balance.add(region, input, t, forward, -1.0);
                builder.balance.add(region_to, output, t, forward, efficiency);
                if reversible {
                    let info = dispatch(weight, marginal_cost * weight, 0.0);
                    let backward = builder.add_bounded_column(info, capacity, 0.0, 1.0);
                    builder.balance.add(region_to, output, t, backward, -1.0);
                    builder.balance.add(region, input, t, backward, efficiency);
                }
            }
        }
        AssetKind::Line => {
            let Some(region_to) = asset.region_to.as_ref() else {
                return;
            };
            for (t, weight) in weights.iter().copied().enumerate() {
                let info = dispatch(weight, 0.0, 0.0);
                let flow = builder.add_bounded_column(info, capacity, -1.0, 1.0);
                builder.balance.add(region, Carrier::Electricity, t, flow, -1.0);
                builder.balance.add(region_to, Carrier::Electricity, t, flow, 1.0);
            }
        }
        AssetKind::StorageUnit => add_storage_unit(builder, asset, capacity, &weights),
        AssetKind::Store => add_store(builder, asset, capacity, &weights),
    }
}

/// Add discharge, charge and state of charge columns for a storage unit
fn add_storage_unit(
    builder: &mut ProblemBuilder,
    asset: &AssetRecord,
    capacity: CapacityTerm,
    weights: &[f64],
) {
    let carrier = asset.technology.bus_carrier();
    let eta = asset.efficiency.value().sqrt();
    let max_hours = asset.max_hours.unwrap_or(0.0);
    let mut previous_level = None;
    for (t, weight) in weights.iter().copied().enumerate() {
        let discharge = builder.add_bounded_column(
            ColumnInfo {
                kind: ColumnKind::Dispatch {
                    asset_id: asset.id.clone(),
                    weight,
                },
                cost: asset.marginal_cost.value() * weight,
                emissions: 0.0,
            },
            capacity,
            0.0,
            1.0,
        );
        let charge = builder.add_bounded_column(
            ColumnInfo {
                kind: ColumnKind::Charge,
                cost: 0.0,
                emissions: 0.0,
            },
            capacity,
            0.0,
            1.0,
        );
        let level = builder.add_bounded_column(
            ColumnInfo {
                kind: ColumnKind::Level {
                    asset_id: asset.id.clone(),
                    last: t + 1 == weights.len(),
                },
                cost: 0.0,
                emissions: 0.0,
            },
            capacity,
            0.0,
            max_hours,
        );
        builder.balance.add(&asset.region, carrier, t, discharge, 1.0);
        builder.balance.add(&asset.region, carrier, t, charge, -1.0);

        // level[t] = level[t-1] + eta * charge * weight - discharge * weight / eta
        let mut terms = vec![
            (level, 1.0),
            (charge, -eta * weight),
            (discharge, weight / eta),
        ];
        let rhs = match previous_level {
            Some(previous) => {
                terms.push((previous, -1.0));
                0.0
            }
            None => asset.initial_soc.value(),
        };
        builder.problem.add_row(rhs..=rhs, terms);
        previous_level = Some(level);
    }
}

/// Add energy level columns for a store. The store starts and ends the year empty.
fn add_store(
    builder: &mut ProblemBuilder,
    asset: &AssetRecord,
    capacity: CapacityTerm,
    weights: &[f64],
) {
    let carrier = asset.technology.bus_carrier();
    let mut previous_level = None;
    for (t, weight) in weights.iter().copied().enumerate() {
        let last = t + 1 == weights.len();
        let info = ColumnInfo {
            kind: ColumnKind::Level {
                asset_id: asset.id.clone(),
                last,
            },
            cost: 0.0,
            emissions: 0.0,
        };
        let level = if last {
            builder.add_column(info, 0.0..=0.0)
        } else {
            builder.add_bounded_column(info, capacity, 0.0, 1.0)
        };

        // Power injected into the bus is the fall in stored energy over the snapshot
        builder.balance.add(&asset.region, carrier, t, level, -1.0 / weight);
        if let Some(previous) = previous_level {
            builder
                .balance
                .add(&asset.region, carrier, t, previous, 1.0 / weight);
        }
        previous_level = Some(level);
    }
}

/// Allow load to go unserved at the value of lost load
fn add_load_shedding(builder: &mut ProblemBuilder, system: &SystemModel, model: &Model) {
    let value_of_lost_load = model.parameters.value_of_lost_load.value();
    for region in model.iter_regions() {
        for (t, (_, weight)) in model.snapshots.iter().enumerate() {
            let weight = weight.value();
            let load = region_load(system, model, region, t);
            let info = ColumnInfo {
                kind: ColumnKind::Shed { weight },
                cost: value_of_lost_load * weight,
                emissions: 0.0,
            };
            let shed = builder.add_column(info, 0.0..=load);
            builder.balance.add(region, Carrier::Electricity, t, shed, 1.0);
        }
    }
}

/// The load of a region in a snapshot, after scaling
fn region_load(system: &SystemModel, model: &Model, region: &RegionID, snapshot: usize) -> f64 {
    model
        .demand
        .get(region)
        .and_then(|loads| loads.get(snapshot))
        .map_or(0.0, |load| (*load * system.load_scale(region)).value())
}

/// Read the solution back into an [`OptimisationResult`]
fn collect_result(
    system: &SystemModel,
    columns: &[ColumnInfo],
    values: &[f64],
) -> OptimisationResult {
    let mut result = OptimisationResult::default();
    let mut objective = 0.0;
    let mut emissions = 0.0;
    let mut load_shed = 0.0;
    for (info, value) in columns.iter().zip(values.iter().copied()) {
        emissions += info.emissions * value;
        match &info.kind {
            ColumnKind::Shed { weight } => {
                load_shed += weight * value;
                continue;
            }
            ColumnKind::Capacity(asset_id) => {
                result
                    .capacities
                    .insert(asset_id.clone(), Capacity(value));
            }
            ColumnKind::Dispatch { asset_id, weight } => {
                *result
                    .dispatch
                    .entry(asset_id.clone())
                    .or_insert(Energy(0.0)) += Energy(weight * value.abs());
            }
            ColumnKind::Level { asset_id, last } => {
                let is_storage_unit = system
                    .assets
                    .get(asset_id)
                    .is_ok_and(|asset| asset.kind == AssetKind::StorageUnit);
                if *last && is_storage_unit {
                    result.final_soc.insert(asset_id.clone(), Energy(value));
                }
            }
            ColumnKind::Charge => {}
        }
        objective += info.cost * value;
    }

    // Only capital spent on new capacity counts
    for asset in system.assets.iter_optimizable() {
        if asset.role == AssetRole::Expandable {
            objective -= asset.capital_cost.value() * asset.installed_capacity().value();
        }
    }

    result.objective = Money(objective);
    result.emissions = Emissions(emissions);
    result.load_shed = Energy(load_shed);
    result
}
