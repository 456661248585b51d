//! Code for adding rows to the optimisation problem.
use super::{ProblemBuilder, Variable, region_load};
use crate::constraints::LinearConstraint;
use crate::model::Model;
use crate::region::RegionID;
use crate::system::SystemModel;
use crate::technology::Carrier;
use crate::units::Emissions;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::trace;

/// The terms of the energy balance of each bus, per snapshot
pub(super) struct BusBalance {
    num_snapshots: usize,
    terms: IndexMap<(RegionID, Carrier), Vec<Vec<(Variable, f64)>>>,
}

impl BusBalance {
    /// Create an empty balance
    pub(super) fn new(num_snapshots: usize) -> Self {
        Self {
            num_snapshots,
            terms: IndexMap::new(),
        }
    }

    fn bus(&mut self, region: &RegionID, carrier: Carrier) -> &mut Vec<Vec<(Variable, f64)>> {
        let num_snapshots = self.num_snapshots;
        self.terms
            .entry((region.clone(), carrier))
            .or_insert_with(|| vec![Vec::new(); num_snapshots])
    }

    /// Add power flowing into (positive) or out of (negative) a bus in a snapshot
    pub(super) fn add(
        &mut self,
        region: &RegionID,
        carrier: Carrier,
        snapshot: usize,
        var: Variable,
        coefficient: f64,
    ) {
        self.bus(region, carrier)[snapshot].push((var, coefficient));
    }
}

impl ProblemBuilder {
    /// Add the energy balance of every bus in every snapshot.
    ///
    /// Electricity buses must meet the load. All other buses balance to zero.
    pub(super) fn add_balance_rows(&mut self, system: &SystemModel, model: &Model) {
        for region in model.iter_regions() {
            self.balance.bus(region, Carrier::Electricity);
        }

        for ((region, carrier), snapshots) in self.balance.terms.drain(..) {
            for (t, terms) in snapshots.into_iter().enumerate() {
                let rhs = if carrier == Carrier::Electricity {
                    region_load(system, model, &region, t)
                } else {
                    0.0
                };
                self.problem.add_row(rhs..=rhs, terms);
            }
        }
    }

    /// Cap total emissions over the year
    pub(super) fn add_co2_limit(&mut self, limit: Emissions) {
        let terms: Vec<_> = self
            .columns
            .iter()
            .zip(self.vars.iter().copied())
            .filter(|(info, _)| info.emissions != 0.0)
            .map(|(info, var)| (var, info.emissions))
            .collect();
        self.problem
            .add_row(f64::NEG_INFINITY..=limit.value(), terms);
    }

    /// Add constraints over capacity variables
    pub(super) fn add_linear_constraints(&mut self, constraints: &[LinearConstraint]) -> Result<()> {
        for constraint in constraints {
            let mut terms = Vec::with_capacity(constraint.terms.len());
            for (asset_id, coefficient) in &constraint.terms {
                let var = self.capacity_vars.get(asset_id).with_context(|| {
                    format!(
                        "Constraint {} refers to asset {asset_id}, which has no capacity \
                        variable",
                        constraint.name
                    )
                })?;
                terms.push((*var, *coefficient));
            }

            trace!("Adding constraint {}", constraint.name);
            self.problem
                .add_row(constraint.lower..=constraint.upper, terms);
        }

        Ok(())
    }
}
