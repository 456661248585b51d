//! Conversion between asset definitions, the system model and optimiser output.
//!
//! At the start of the horizon each extendable generator or storage unit is split into a
//! buildable asset, which exposes headroom to the optimiser, and a fixed twin holding committed
//! capacity. Gas plants become expandable links fed from a per-region gas bus. After each solve,
//! [`fold_back`] moves the chosen capacity into the fixed baseline for the next year.
use crate::asset::{AssetDefinition, AssetID, AssetLedger, AssetRecord, AssetRole};
use crate::finance::annualised_cost_with_fom;
use crate::model::{Model, ModelParameters};
use crate::phase_out::PhaseOutSchedule;
use crate::region::RegionID;
use crate::simulation::optimisation::OptimisationResult;
use crate::system::SystemModel;
use crate::technology::{
    AssetKind, CCGT_EFFICIENCY, CCGT_VOM, ELECTROLYSIS_EFFICIENCY, FUEL_CELL_EFFICIENCY,
    OCGT_EFFICIENCY, OCGT_VOM, Technology,
};
use crate::units::{Capacity, Dimensionless, Energy, MoneyPerCapacity, MoneyPerEnergy};
use anyhow::{Context, Result};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use log::{debug, trace, warn};

/// Capacity of import generators, which are limited by price rather than capacity
pub const IMPORT_CAPACITY: Capacity = Capacity(1e6);

/// Overnight investment cost, fixed O&M share and lifetime of technologies whose legacy capacity
/// is fully convertible
fn legacy_investment(technology: Technology) -> Option<(MoneyPerCapacity, Dimensionless)> {
    match technology {
        Technology::Biomass => Some((MoneyPerCapacity(2_350_000.0), Dimensionless(0.036))),
        Technology::Ror => Some((MoneyPerCapacity(2_500_000.0), Dimensionless(0.02))),
        _ => None,
    }
}

/// Build the start-year system model from the model's asset definitions.
///
/// This splits extendable assets into buildable and fixed portions, restructures gas plants,
/// adds imports and (optionally) hydrogen infrastructure, seeds the retirement queue, draws up
/// phase-out schedules and computes each asset's initial headroom.
pub fn convert_baseline(model: &Model) -> Result<SystemModel> {
    let parameters = &model.parameters;
    let mut system = SystemModel::new(parameters.start_year, parameters.hydrogen);

    for definition in model.assets.values() {
        let committed = model
            .committed_additions
            .get(&definition.id)
            .copied()
            .unwrap_or(Capacity(0.0));
        convert_asset(&mut system, definition, committed, parameters)
            .with_context(|| format!("Failed to convert asset {}", definition.id))?;
    }

    for region in model.iter_regions() {
        let has_gas_plants = system
            .assets
            .iter()
            .any(|asset| asset.technology.is_gas_plant() && asset.region == *region);
        if has_gas_plants {
            add_import(&mut system, region, Technology::GasImport, parameters.start_year);
        }
        if parameters.hydrogen {
            add_hydrogen_infrastructure(&mut system, region, parameters);
        }
    }

    for retirement in &model.retirements {
        schedule_exogenous_retirement(
            &mut system.assets,
            &retirement.asset_id,
            retirement.year,
            retirement.capacity,
        )?;
    }

    for ((technology, region), ceiling) in &model.potential_ceilings {
        system
            .potentials
            .set_ceiling(*technology, region, *ceiling)?;
    }

    for phase_out in &parameters.phase_outs {
        let schedule = PhaseOutSchedule::initialize(
            &system.assets,
            phase_out.technology,
            parameters.start_year,
            phase_out.year,
        )?;
        system.phase_outs.push(schedule);
    }

    system.refresh_headroom(parameters.regional_potential);
    debug!(
        "Baseline conversion produced {} assets with {} of fixed capacity and {} of headroom",
        system.assets.len(),
        system.assets.total_fixed_capacity(),
        system.assets.total_headroom()
    );

    Ok(system)
}

/// Create a record carrying a definition's static data
fn record_from_definition(
    definition: &AssetDefinition,
    role: AssetRole,
    capacity: Capacity,
    year: u32,
) -> AssetRecord {
    let mut record = AssetRecord::new(
        definition.id.clone(),
        definition.technology,
        role,
        definition.region.clone(),
        capacity,
        year,
    );
    record.region_to.clone_from(&definition.region_to);
    record.capital_cost = definition.capital_cost;
    record.marginal_cost = definition.marginal_cost;
    record.efficiency = definition.efficiency;
    record.max_hours = definition.max_hours;
    record.co2_intensity = definition.co2_intensity;
    record
}

/// Schedule newly added capacity to retire at the end of its technical lifetime
fn schedule_end_of_life(
    ledger: &mut AssetLedger,
    id: &AssetID,
    year: u32,
    amount: Capacity,
) -> Result<()> {
    if amount <= Capacity(0.0) {
        return Ok(());
    }

    let technology = ledger.get(id)?.technology;
    if let Some(lifetime) = technology.lifetime() {
        ledger.schedule_retirement(id, year + lifetime, amount)?;
    }

    Ok(())
}

fn convert_asset(
    system: &mut SystemModel,
    definition: &AssetDefinition,
    committed: Capacity,
    parameters: &ModelParameters,
) -> Result<()> {
    let technology = definition.technology;
    if technology.is_gas_plant() {
        return convert_gas_plant(system, definition, committed, parameters.start_year);
    }

    match (technology.kind(), definition.extendable) {
        (AssetKind::Generator | AssetKind::StorageUnit, true) => {
            split_buildable(system, definition, committed, parameters)
        }
        (_, true) => {
            let id = definition.id.clone();
            system.assets.upsert(record_from_definition(
                definition,
                AssetRole::Expandable,
                definition.capacity + committed,
                parameters.start_year,
            ));
            schedule_end_of_life(&mut system.assets, &id, parameters.start_year, committed)
        }
        (_, false) => {
            system.assets.upsert(record_from_definition(
                definition,
                AssetRole::Fixed,
                definition.capacity,
                parameters.start_year,
            ));
            Ok(())
        }
    }
}

/// Split an extendable generator or storage unit into a buildable asset and its fixed twin
fn split_buildable(
    system: &mut SystemModel,
    definition: &AssetDefinition,
    committed: Capacity,
    parameters: &ModelParameters,
) -> Result<()> {
    let technology = definition.technology;
    let region = &definition.region;
    let start_year = parameters.start_year;
    let mut buildable =
        record_from_definition(definition, AssetRole::Buildable, Capacity(0.0), start_year);

    let (twin_capacity, committed) = if let Some((investment, fom_share)) =
        legacy_investment(technology)
    {
        // Legacy capacity stays in the twin and only becomes headroom once it retires
        if let Some(lifetime) = technology.lifetime() {
            buildable.capital_cost =
                annualised_cost_with_fom(investment, lifetime, parameters.discount_rate, fom_share);
        }
        system
            .potentials
            .register(technology, region, Capacity(0.0), definition.capacity);
        if committed > Capacity(0.0) {
            warn!(
                "Ignoring committed addition for asset {}: {technology} has no headroom in the \
                start year",
                definition.id
            );
        }
        (definition.capacity, Capacity(0.0))
    } else if technology.kind() == AssetKind::StorageUnit {
        (definition.capacity + committed, committed)
    } else {
        let committed_within_potential = committed.min(definition.capacity);
        if committed_within_potential < committed {
            debug!(
                "Committed addition of {committed} for asset {} clamped to its potential {}",
                definition.id, definition.capacity
            );
        }
        system.potentials.register(
            technology,
            region,
            definition.capacity - committed_within_potential,
            definition.capacity,
        );
        (committed_within_potential, committed_within_potential)
    };

    system.assets.upsert(buildable);
    let twin_id = system.assets.ensure_fixed_twin(&definition.id, start_year)?;
    system
        .assets
        .get_mut(&twin_id)?
        .set_installed_capacity(twin_capacity);
    schedule_end_of_life(&mut system.assets, &twin_id, start_year, committed)
}

/// Turn a gas plant into a link from the gas (or fuel-mix) bus, sized at the fuel input
fn convert_gas_plant(
    system: &mut SystemModel,
    definition: &AssetDefinition,
    committed: Capacity,
    start_year: u32,
) -> Result<()> {
    let technology = definition.technology;
    let (efficiency, vom) = if technology == Technology::Ccgt {
        (CCGT_EFFICIENCY, CCGT_VOM)
    } else {
        (OCGT_EFFICIENCY, OCGT_VOM)
    };
    let efficiency = Dimensionless(efficiency);

    let role = if definition.extendable {
        AssetRole::Expandable
    } else {
        AssetRole::Fixed
    };
    let committed = committed / efficiency;
    let mut link = record_from_definition(
        definition,
        role,
        definition.capacity / efficiency + committed,
        start_year,
    );
    link.efficiency = efficiency;
    link.capital_cost = definition.capital_cost * efficiency;
    link.marginal_cost = MoneyPerEnergy(vom) * efficiency;

    if system.fuel_mix && technology == Technology::Ccgt {
        let feed_id = AssetID::from(format!("{} gas input", definition.id));
        let feed = AssetRecord::new(
            feed_id.clone(),
            Technology::GasInput,
            AssetRole::Fixed,
            definition.region.clone(),
            link.installed_capacity(),
            start_year,
        );
        trace!("Adding fuel feed {feed_id} for asset {}", definition.id);
        system.assets.upsert(feed);
        link.fuel_link_id = Some(feed_id);
    }

    let id = link.id.clone();
    system.assets.upsert(link);
    schedule_end_of_life(&mut system.assets, &id, start_year, committed)
}

/// Add an import generator for a region. Its price is set when costs are applied.
fn add_import(system: &mut SystemModel, region: &RegionID, technology: Technology, year: u32) {
    let id = AssetID::from(format!("{region} {technology}"));
    system.assets.upsert(AssetRecord::new(
        id,
        technology,
        AssetRole::Fixed,
        region.clone(),
        IMPORT_CAPACITY,
        year,
    ));
}

/// Add electrolysis, fuel cells, hydrogen storage and fuel blending to a region
fn add_hydrogen_infrastructure(
    system: &mut SystemModel,
    region: &RegionID,
    parameters: &ModelParameters,
) {
    let components = [
        (
            Technology::Electrolysis,
            ELECTROLYSIS_EFFICIENCY,
            parameters.electrolysis_capital_cost,
        ),
        (
            Technology::FuelCell,
            FUEL_CELL_EFFICIENCY,
            parameters.fuel_cell_capital_cost,
        ),
        (Technology::H2Store, 1.0, parameters.h2_store_capital_cost),
        (Technology::H2Input, 1.0, MoneyPerCapacity(0.0)),
    ];
    for (technology, efficiency, capital_cost) in components {
        let mut record = AssetRecord::new(
            format!("{region} {technology}").into(),
            technology,
            AssetRole::Expandable,
            region.clone(),
            Capacity(0.0),
            parameters.start_year,
        );
        record.efficiency = Dimensionless(efficiency);
        record.capital_cost = capital_cost;
        system.assets.upsert(record);
    }

    add_import(system, region, Technology::H2Import, parameters.start_year);
}

/// Schedule an exogenous retirement against the asset which holds the capacity.
///
/// Retirements of extendable generators apply to their fixed twin. Retirements of gas plants are
/// converted to fuel-input units.
fn schedule_exogenous_retirement(
    ledger: &mut AssetLedger,
    asset_id: &AssetID,
    year: u32,
    capacity: Capacity,
) -> Result<()> {
    let asset = ledger.get(asset_id)?;
    let target = match (&asset.role, &asset.fixed_twin_id) {
        (AssetRole::Buildable, Some(twin_id)) => twin_id.clone(),
        _ => asset_id.clone(),
    };
    let capacity = if asset.technology.is_gas_plant() {
        capacity / asset.efficiency
    } else {
        capacity
    };

    ledger.schedule_retirement(&target, year, capacity)
}

/// A summary of one year's fold-back
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoldBackReport {
    /// Capacity added to the fixed baseline
    pub total_addition: Capacity,
    /// Headroom exposed to the optimiser
    pub headroom_before: Capacity,
    /// Headroom the optimiser chose to use, after clamping
    pub headroom_consumed: Capacity,
    /// Fixed capacity before fold-back
    pub fixed_before: Capacity,
    /// Fixed capacity after fold-back
    pub fixed_after: Capacity,
    /// Headroom of each optimisable asset at solve time
    pub headroom: IndexMap<AssetID, Capacity>,
    /// Capacity added for each optimisable asset
    pub additions: IndexMap<AssetID, Capacity>,
}

impl FoldBackReport {
    /// Whether fixed capacity grew by exactly the reported addition
    pub fn is_conserved(&self) -> bool {
        approx_eq!(
            f64,
            self.fixed_after.value(),
            (self.fixed_before + self.total_addition).value(),
            epsilon = 1e-6 * self.fixed_after.value().max(1.0)
        )
    }
}

/// Fold the optimiser's chosen capacities into the fixed baseline.
///
/// # Arguments
///
/// * `system` - The system model, with headroom as exposed to the optimiser
/// * `result` - The optimiser's output for this year
pub fn fold_back(system: &mut SystemModel, result: &OptimisationResult) -> Result<FoldBackReport> {
    let year = system.year;
    let mut report = FoldBackReport {
        headroom_before: system.assets.total_headroom(),
        fixed_before: system.assets.total_fixed_capacity(),
        ..FoldBackReport::default()
    };

    for (id, chosen) in &result.capacities {
        let asset = system.assets.get(id)?;
        if !asset.is_optimizable() {
            trace!("Ignoring capacity chosen for non-optimisable asset {id}");
            continue;
        }

        let role = asset.role;
        report.headroom.insert(id.clone(), asset.headroom());
        let (requested, added) = match role {
            AssetRole::Buildable => fold_back_buildable(system, id, *chosen, year)?,
            AssetRole::Expandable => fold_back_expandable(&mut system.assets, id, *chosen, year)?,
            AssetRole::Fixed => continue,
        };
        report.headroom_consumed += requested;
        report.total_addition += added;
        report.additions.insert(id.clone(), added);
    }

    carry_over_state_of_charge(&mut system.assets, result)?;
    system.sync_fuel_links()?;
    report.fixed_after = system.assets.total_fixed_capacity();

    Ok(report)
}

/// Move a buildable asset's chosen addition into its fixed twin.
///
/// Returns the addition requested (clamped to headroom) and the addition actually made, which is
/// smaller if another asset in the same potential pool used it first.
fn fold_back_buildable(
    system: &mut SystemModel,
    id: &AssetID,
    chosen: Capacity,
    year: u32,
) -> Result<(Capacity, Capacity)> {
    let asset = system.assets.get(id)?;
    let requested = chosen.clamp_non_negative().min(asset.headroom());
    let (technology, region) = (asset.technology, asset.region.clone());
    let added = system.potentials.consume(technology, &region, requested);
    if added <= Capacity(0.0) {
        return Ok((requested, Capacity(0.0)));
    }

    let twin_id = system.assets.ensure_fixed_twin(id, year)?;
    system.assets.get_mut(&twin_id)?.add_capacity(added);
    schedule_end_of_life(&mut system.assets, &twin_id, year, added)?;
    trace!("Added {added} to {twin_id}");

    Ok((requested, added))
}

/// Raise an expandable asset's capacity to the optimiser's choice. Capacity never goes down.
fn fold_back_expandable(
    ledger: &mut AssetLedger,
    id: &AssetID,
    chosen: Capacity,
    year: u32,
) -> Result<(Capacity, Capacity)> {
    let asset = ledger.get_mut(id)?;
    let installed = asset.installed_capacity();
    let chosen = chosen.min(installed + asset.headroom());
    if chosen <= installed {
        return Ok((Capacity(0.0), Capacity(0.0)));
    }

    let delta = chosen - installed;
    asset.set_installed_capacity(chosen);
    schedule_end_of_life(ledger, id, year, delta)?;
    trace!("Expanded {id} by {delta}");

    Ok((delta, delta))
}

/// Set each storage unit's initial state of charge for next year.
///
/// Charge held by a buildable storage unit's new capacity moves to its twin along with the
/// capacity.
fn carry_over_state_of_charge(ledger: &mut AssetLedger, result: &OptimisationResult) -> Result<()> {
    let mut state: IndexMap<AssetID, Energy> = IndexMap::new();
    for (id, soc) in &result.final_soc {
        let asset = ledger.get(id)?;
        let target = match (&asset.role, &asset.fixed_twin_id) {
            (AssetRole::Buildable, Some(twin_id)) => twin_id.clone(),
            _ => id.clone(),
        };
        *state.entry(target).or_insert(Energy(0.0)) += soc.clamp_non_negative();
    }

    for (id, soc) in state {
        let asset = ledger.get_mut(&id)?;
        asset.initial_soc = soc.min(asset.energy_capacity());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::capital_recovery_factor;
    use crate::fixture::{assert_error, model};
    use crate::model::{ExogenousRetirement, PhaseOut};
    use float_cmp::assert_approx_eq;
    use map_macro::hash_map;
    use rstest::rstest;

    fn installed(system: &SystemModel, id: &str) -> Capacity {
        system
            .assets
            .get(&id.into())
            .unwrap()
            .installed_capacity()
    }

    fn headroom(system: &SystemModel, id: &str) -> Capacity {
        system.assets.get(&id.into()).unwrap().headroom()
    }

    fn result_with(capacities: &[(&str, f64)]) -> OptimisationResult {
        OptimisationResult {
            capacities: capacities
                .iter()
                .map(|(id, capacity)| ((*id).into(), Capacity(*capacity)))
                .collect(),
            ..OptimisationResult::default()
        }
    }

    #[rstest]
    fn test_convert_baseline_splits_generators(model: Model) {
        let system = convert_baseline(&model).unwrap();

        let onwind = system.assets.get(&"R1 onwind".into()).unwrap();
        assert_eq!(onwind.role, AssetRole::Buildable);
        assert_eq!(onwind.installed_capacity(), Capacity(0.0));
        assert_eq!(onwind.headroom(), Capacity(500.0));
        assert!(onwind.is_optimizable());
        assert_eq!(onwind.fixed_twin_id, Some("R1 onwind fixed".into()));

        let twin = system.assets.get(&"R1 onwind fixed".into()).unwrap();
        assert_eq!(twin.role, AssetRole::Fixed);
        assert_eq!(twin.buildable_source_id, Some("R1 onwind".into()));
        assert_eq!(twin.installed_capacity(), Capacity(0.0));

        // Non-extendable assets are carried over as they are
        assert_eq!(installed(&system, "R2 onwind"), Capacity(300.0));
        assert_eq!(installed(&system, "R1 coal"), Capacity(300.0));
        assert!(!system.assets.get(&"R1 coal".into()).unwrap().is_optimizable());
    }

    #[rstest]
    fn test_convert_baseline_committed_addition(mut model: Model) {
        model.committed_additions = hash_map! { "R1 onwind".into() => Capacity(200.0) };
        let system = convert_baseline(&model).unwrap();

        assert_eq!(installed(&system, "R1 onwind fixed"), Capacity(200.0));
        assert_eq!(headroom(&system, "R1 onwind"), Capacity(300.0));
        let retirements: Vec<_> = system.assets.retirements().iter().collect();
        assert_eq!(
            retirements,
            [(2045, &"R1 onwind fixed".into(), Capacity(200.0))]
        );
    }

    #[rstest]
    fn test_convert_baseline_committed_addition_exceeds_potential(mut model: Model) {
        model.committed_additions = hash_map! { "R1 onwind".into() => Capacity(900.0) };
        let system = convert_baseline(&model).unwrap();

        assert_eq!(installed(&system, "R1 onwind fixed"), Capacity(500.0));
        assert_eq!(headroom(&system, "R1 onwind"), Capacity(0.0));
    }

    #[rstest]
    fn test_convert_baseline_biomass(model: Model) {
        let system = convert_baseline(&model).unwrap();

        assert_eq!(installed(&system, "R1 biomass fixed"), Capacity(40.0));
        assert_eq!(headroom(&system, "R1 biomass"), Capacity(0.0));
        let entry = system
            .potentials
            .get(Technology::Biomass, &"R1".into())
            .unwrap();
        assert_eq!(entry.remaining, Capacity(0.0));
        assert_eq!(entry.ceiling, Capacity(40.0));

        let expected = (capital_recovery_factor(30, Dimensionless(0.07)).value() + 0.036)
            * 2_350_000.0;
        assert_approx_eq!(
            MoneyPerCapacity,
            system
                .assets
                .get(&"R1 biomass".into())
                .unwrap()
                .capital_cost,
            MoneyPerCapacity(expected)
        );
    }

    #[rstest]
    fn test_convert_baseline_gas_plant(mut model: Model) {
        model.retirements.push(ExogenousRetirement {
            asset_id: "R1 CCGT".into(),
            year: 2022,
            capacity: Capacity(61.0),
        });
        let system = convert_baseline(&model).unwrap();

        let ccgt = system.assets.get(&"R1 CCGT".into()).unwrap();
        assert_eq!(ccgt.role, AssetRole::Expandable);
        assert_approx_eq!(Capacity, ccgt.installed_capacity(), Capacity(200.0));
        assert_approx_eq!(MoneyPerCapacity, ccgt.capital_cost, MoneyPerCapacity(36_600.0));
        assert_approx_eq!(MoneyPerEnergy, ccgt.marginal_cost, MoneyPerEnergy(4.4 * 0.61));
        assert_approx_eq!(Capacity, ccgt.headroom(), Capacity(1000.0 / 0.61));
        assert_eq!(ccgt.fuel_link_id, None);

        // Retirement is converted to fuel-input units
        let (year, id, amount) = system.assets.retirements().iter().next().unwrap();
        assert_eq!((year, id), (2022, &"R1 CCGT".into()));
        assert_approx_eq!(Capacity, amount, Capacity(100.0));

        // Only R1 has gas plants
        assert!(system.assets.contains(&"R1 gas import".into()));
        assert!(!system.assets.contains(&"R2 gas import".into()));
        assert!(!system.assets.get(&"R1 gas import".into()).unwrap().is_optimizable());
    }

    #[rstest]
    fn test_convert_baseline_retirement_of_extendable_generator(mut model: Model) {
        model.committed_additions = hash_map! { "R1 solar".into() => Capacity(100.0) };
        model.retirements.push(ExogenousRetirement {
            asset_id: "R1 solar".into(),
            year: 2021,
            capacity: Capacity(30.0),
        });
        let system = convert_baseline(&model).unwrap();

        let due: Vec<_> = system.assets.retirements().due(2021).collect();
        assert_eq!(due, [(&"R1 solar fixed".into(), Capacity(30.0))]);
    }

    #[rstest]
    fn test_convert_baseline_hydrogen(mut model: Model) {
        model.parameters.hydrogen = true;
        let system = convert_baseline(&model).unwrap();

        for region in ["R1", "R2"] {
            for suffix in ["electrolysis", "fuel cell", "H2", "H2_input"] {
                let asset = system
                    .assets
                    .get(&format!("{region} {suffix}").into())
                    .unwrap();
                assert_eq!(asset.role, AssetRole::Expandable);
                assert_eq!(asset.installed_capacity(), Capacity(0.0));
                assert!(asset.is_optimizable());
            }
            assert!(system.assets.contains(&format!("{region} H2 import").into()));
        }

        let ccgt = system.assets.get(&"R1 CCGT".into()).unwrap();
        assert_eq!(ccgt.fuel_link_id, Some("R1 CCGT gas input".into()));
        let feed = system.assets.get(&"R1 CCGT gas input".into()).unwrap();
        assert_eq!(feed.installed_capacity(), ccgt.installed_capacity());
        assert!(!feed.is_optimizable());
    }

    #[rstest]
    fn test_convert_baseline_phase_out(mut model: Model) {
        model.parameters.phase_outs.push(PhaseOut {
            technology: Technology::Coal,
            year: 2023,
        });
        let system = convert_baseline(&model).unwrap();

        let schedule = &system.phase_outs[0];
        assert_eq!(schedule.total_initial_capacity, Capacity(300.0));
        assert_eq!(schedule.yearly_decrement, Capacity(100.0));
    }

    #[rstest]
    fn test_convert_baseline_ceiling_below_remaining(mut model: Model) {
        model.potential_ceilings = hash_map! {
            (Technology::Onwind, "R1".into()) => Capacity(100.0)
        };
        assert_error!(
            convert_baseline(&model),
            "Potential ceiling 100 for onwind in region R1 is below the remaining potential 500"
        );
    }

    #[rstest]
    fn test_fold_back_buildable(model: Model) {
        let mut system = convert_baseline(&model).unwrap();
        let report = fold_back(&mut system, &result_with(&[("R1 onwind", 200.0)])).unwrap();

        assert_eq!(installed(&system, "R1 onwind fixed"), Capacity(200.0));
        assert_eq!(installed(&system, "R1 onwind"), Capacity(0.0));
        assert_eq!(
            system
                .potentials
                .get(Technology::Onwind, &"R1".into())
                .unwrap()
                .remaining,
            Capacity(300.0)
        );
        let due: Vec<_> = system.assets.retirements().due(2045).collect();
        assert_eq!(due, [(&"R1 onwind fixed".into(), Capacity(200.0))]);

        assert_eq!(report.total_addition, Capacity(200.0));
        assert_eq!(report.additions["R1 onwind"], Capacity(200.0));
        assert_eq!(report.headroom["R1 onwind"], Capacity(500.0));
        assert!(report.is_conserved());

        system.refresh_headroom(model.parameters.regional_potential);
        assert_eq!(headroom(&system, "R1 onwind"), Capacity(300.0));
    }

    #[rstest]
    #[case(-50.0, 0.0)]
    #[case(800.0, 500.0)] // Clamped to headroom
    fn test_fold_back_buildable_clamps(
        model: Model,
        #[case] chosen: f64,
        #[case] expected: f64,
    ) {
        let mut system = convert_baseline(&model).unwrap();
        let report = fold_back(&mut system, &result_with(&[("R1 onwind", chosen)])).unwrap();
        assert_eq!(installed(&system, "R1 onwind fixed"), Capacity(expected));
        assert_eq!(report.total_addition, Capacity(expected));
        assert!(report.total_addition <= report.headroom_before);
    }

    #[rstest]
    fn test_fold_back_shared_pool(mut model: Model) {
        // A second onwind asset in R1 draws on the same potential
        let mut second = model.assets["R1 onwind"].clone();
        second.id = "R1 onwind 2".into();
        second.capacity = Capacity(100.0);
        model.assets.insert(second.id.clone(), second);

        let mut system = convert_baseline(&model).unwrap();
        assert_eq!(headroom(&system, "R1 onwind"), Capacity(600.0));
        assert_eq!(headroom(&system, "R1 onwind 2"), Capacity(600.0));

        // The pool constraint keeps the choices within the shared potential
        let report = fold_back(
            &mut system,
            &result_with(&[("R1 onwind", 400.0), ("R1 onwind 2", 200.0)]),
        )
        .unwrap();

        assert_eq!(installed(&system, "R1 onwind fixed"), Capacity(400.0));
        assert_eq!(installed(&system, "R1 onwind 2 fixed"), Capacity(200.0));
        assert_eq!(report.total_addition, Capacity(600.0));
        assert_eq!(report.headroom_consumed, report.total_addition);
        assert!(report.is_conserved());
        assert_eq!(
            system
                .potentials
                .get(Technology::Onwind, &"R1".into())
                .unwrap()
                .remaining,
            Capacity(0.0)
        );
    }

    #[rstest]
    fn test_fold_back_expandable_never_shrinks(model: Model) {
        let mut system = convert_baseline(&model).unwrap();

        fold_back(&mut system, &result_with(&[("R1-R2", 50.0)])).unwrap();
        assert_eq!(installed(&system, "R1-R2"), Capacity(100.0));

        let report = fold_back(&mut system, &result_with(&[("R1-R2", 160.0)])).unwrap();
        assert_eq!(installed(&system, "R1-R2"), Capacity(160.0));
        assert_eq!(report.additions["R1-R2"], Capacity(60.0));
        let due: Vec<_> = system.assets.retirements().due(2060).collect();
        assert_eq!(due, [(&"R1-R2".into(), Capacity(60.0))]);
    }

    #[rstest]
    fn test_fold_back_keeps_fuel_feed_in_step(mut model: Model) {
        model.parameters.hydrogen = true;
        let mut system = convert_baseline(&model).unwrap();

        fold_back(&mut system, &result_with(&[("R1 CCGT", 300.0)])).unwrap();
        assert_eq!(installed(&system, "R1 CCGT"), Capacity(300.0));
        assert_eq!(installed(&system, "R1 CCGT gas input"), Capacity(300.0));
    }

    #[rstest]
    fn test_fold_back_state_of_charge(mut model: Model) {
        model.committed_additions = hash_map! { "R1 battery".into() => Capacity(5.0) };
        let mut system = convert_baseline(&model).unwrap();
        assert_eq!(installed(&system, "R1 battery fixed"), Capacity(15.0));

        let result = OptimisationResult {
            capacities: [("R1 battery".into(), Capacity(5.0))].into_iter().collect(),
            final_soc: [
                ("R1 battery".into(), Energy(20.0)),
                ("R1 battery fixed".into(), Energy(200.0)),
            ]
            .into_iter()
            .collect(),
            ..OptimisationResult::default()
        };
        fold_back(&mut system, &result).unwrap();

        // 20 MW of storage with 6 hours
        let twin = system.assets.get(&"R1 battery fixed".into()).unwrap();
        assert_eq!(twin.installed_capacity(), Capacity(20.0));
        assert_eq!(twin.initial_soc, Energy(120.0));
    }
}
