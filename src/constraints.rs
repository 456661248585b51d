//! Extra linear constraints over the optimiser's capacity variables.
//!
//! A term refers to the capacity variable of an optimisable asset: the addition for buildable
//! assets and the total capacity for expandable ones. Assets which are not optimisable this year
//! are substituted by their installed capacity.
use crate::asset::{AssetID, AssetRecord, AssetRole};
use crate::model::{AggregateLimit, Model};
use crate::region::RegionID;
use crate::system::SystemModel;
use crate::technology::Technology;
use log::{trace, warn};

/// A linear constraint `lower <= sum(coefficient * variable) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Name of the constraint, for debugging
    pub name: String,
    /// The asset whose capacity variable is used, with its coefficient
    pub terms: Vec<(AssetID, f64)>,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
}

impl LinearConstraint {
    /// Build an equality constraint, substituting constants for non-optimisable participants.
    ///
    /// Returns `None` if no participant is optimisable.
    fn equality(name: String, participants: &[(&AssetRecord, f64)], rhs: f64) -> Option<Self> {
        let mut constant = 0.0;
        let mut terms = Vec::new();
        for (asset, coefficient) in participants {
            if asset.is_optimizable() {
                terms.push((asset.id.clone(), *coefficient));
            } else {
                constant += coefficient * asset.installed_capacity().value();
            }
        }

        if terms.is_empty() {
            trace!("Dropping constraint {name}: no participant is optimisable");
            return None;
        }

        Some(Self {
            name,
            terms,
            lower: rhs - constant,
            upper: rhs - constant,
        })
    }
}

/// Build all extra constraints for a year
pub fn build_constraints(system: &SystemModel, model: &Model, year: u32) -> Vec<LinearConstraint> {
    let mut constraints: Vec<_> = model
        .iter_aggregate_limits(year)
        .filter_map(|limit| aggregate_limit_constraint(system, limit, year))
        .collect();
    constraints.extend(potential_pool_constraints(system));

    for region in model.iter_regions() {
        constraints.extend(battery_ratio_constraint(system, region));
        if system.fuel_mix {
            constraints.extend(hydrogen_sizing_constraints(system, model, region));
        }
    }

    constraints
}

/// Bound the capacity of a technology added across the whole system this year
fn aggregate_limit_constraint(
    system: &SystemModel,
    limit: &AggregateLimit,
    year: u32,
) -> Option<LinearConstraint> {
    let technology = limit.technology;
    let mut terms = Vec::new();
    let mut existing = 0.0;
    for asset in system
        .assets
        .iter_technology(technology)
        .filter(|asset| asset.is_optimizable())
    {
        // Gas plant capacity is measured at the fuel input, but limits are on output
        let coefficient = if technology.is_gas_plant() {
            asset.efficiency.value()
        } else {
            1.0
        };
        if asset.role == AssetRole::Expandable {
            existing += coefficient * asset.installed_capacity().value();
        }
        terms.push((asset.id.clone(), coefficient));
    }

    if terms.is_empty() {
        if limit.min.is_some_and(|min| min.value() > 0.0) {
            warn!(
                "Minimum capacity limit for {technology} in {year} ignored: no asset of this \
                technology can be built"
            );
        }
        return None;
    }

    Some(LinearConstraint {
        name: format!("{technology}_limit_{year}"),
        terms,
        lower: limit
            .min
            .map_or(f64::NEG_INFINITY, |min| min.value() + existing),
        upper: limit.max.map_or(f64::INFINITY, |max| max.value() + existing),
    })
}

/// Stop buildable assets sharing a potential pool from building more than it holds between them.
///
/// A pool with a single buildable asset is already bounded by that asset's headroom.
fn potential_pool_constraints(system: &SystemModel) -> Vec<LinearConstraint> {
    system
        .potentials
        .iter()
        .filter_map(|(technology, region, entry)| {
            let terms: Vec<_> = assets_in_region(system, technology, region)
                .into_iter()
                .filter(|asset| asset.role == AssetRole::Buildable && asset.is_optimizable())
                .map(|asset| (asset.id.clone(), 1.0))
                .collect();
            (terms.len() > 1).then(|| LinearConstraint {
                name: format!("{technology}_potential_{region}"),
                terms,
                lower: f64::NEG_INFINITY,
                upper: entry.remaining.value(),
            })
        })
        .collect()
}

/// Collect the assets of a technology in a region
fn assets_in_region<'a>(
    system: &'a SystemModel,
    technology: Technology,
    region: &RegionID,
) -> Vec<&'a AssetRecord> {
    system
        .assets
        .iter_technology(technology)
        .filter(|asset| asset.region == *region)
        .collect()
}

/// Tie battery charging capacity to discharging capacity
fn battery_ratio_constraint(system: &SystemModel, region: &RegionID) -> Option<LinearConstraint> {
    let chargers = assets_in_region(system, Technology::BatteryCharger, region);
    let dischargers = assets_in_region(system, Technology::BatteryDischarger, region);
    if chargers.is_empty() || dischargers.is_empty() {
        return None;
    }

    let participants: Vec<_> = chargers
        .into_iter()
        .map(|charger| (charger, 1.0))
        .chain(
            dischargers
                .into_iter()
                .map(|discharger| (discharger, -discharger.efficiency.value())),
        )
        .collect();
    LinearConstraint::equality(format!("battery_ratio_{region}"), &participants, 0.0)
}

/// Size hydrogen storage by electrolysis and fuel cell capacity
fn hydrogen_sizing_constraints(
    system: &SystemModel,
    model: &Model,
    region: &RegionID,
) -> Vec<LinearConstraint> {
    let stores = assets_in_region(system, Technology::H2Store, region);
    let mut constraints = Vec::new();
    if stores.is_empty() {
        return constraints;
    }

    let parameters = &model.parameters;
    let sizing = [
        (
            "electrolysis",
            Technology::Electrolysis,
            parameters.h2_store_hours_electrolysis.value(),
        ),
        (
            "fuel_cell",
            Technology::FuelCell,
            parameters.h2_store_hours_fuel_cell.value(),
        ),
    ];
    for (name, technology, hours) in sizing {
        let converters = assets_in_region(system, technology, region);
        if converters.is_empty() {
            continue;
        }

        let participants: Vec<_> = stores
            .iter()
            .map(|store| (*store, 1.0))
            .chain(converters.into_iter().map(|converter| {
                let coefficient = if technology == Technology::FuelCell {
                    hours * converter.efficiency.value()
                } else {
                    hours
                };
                (converter, -coefficient)
            }))
            .collect();
        constraints.extend(LinearConstraint::equality(
            format!("h2_{name}_sizing_{region}"),
            &participants,
            0.0,
        ));
    }

    constraints
}
