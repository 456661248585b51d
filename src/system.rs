//! The mutable state of the simulated power system.
//!
//! A [`SystemModel`] is built once from the static [`Model`](crate::model::Model) by baseline
//! conversion and then threaded by `&mut` reference through every step of the yearly loop.
use crate::asset::{AssetID, AssetLedger, AssetRecord, AssetRole};
use crate::phase_out::PhaseOutSchedule;
use crate::potential::{PotentialTracker, refresh_headroom};
use crate::region::RegionID;
use crate::technology::Fuel;
use crate::units::{Capacity, Dimensionless, Emissions, MoneyPerEmissions, MoneyPerEnergy};
use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, trace};

/// The state of the system in the year being simulated
#[derive(Debug, Clone, PartialEq)]
pub struct SystemModel {
    /// The year being simulated
    pub year: u32,
    /// All assets, with the retirement queue
    pub assets: AssetLedger,
    /// Remaining buildable potential
    pub potentials: PotentialTracker,
    /// Linear phase-outs drawn up at the start of the horizon
    pub phase_outs: Vec<PhaseOutSchedule>,
    /// Multiplier applied to each region's load profile
    pub load_scale: IndexMap<RegionID, Dimensionless>,
    /// The CO2 ceiling for the year, if any
    pub co2_limit: Option<Emissions>,
    /// The CO2 price currently reflected in marginal costs
    pub co2_price: MoneyPerEmissions,
    /// The fuel prices currently reflected in marginal costs
    pub fuel_prices: IndexMap<Fuel, MoneyPerEnergy>,
    /// Whether CCGT plants draw from a blended gas/hydrogen bus
    pub fuel_mix: bool,
}

impl SystemModel {
    /// Create a system with no assets
    pub fn new(year: u32, fuel_mix: bool) -> Self {
        Self {
            year,
            assets: AssetLedger::new(),
            potentials: PotentialTracker::new(),
            phase_outs: Vec::new(),
            load_scale: IndexMap::new(),
            co2_limit: None,
            co2_price: MoneyPerEmissions(0.0),
            fuel_prices: IndexMap::new(),
            fuel_mix,
        }
    }

    /// The load multiplier of a region
    pub fn load_scale(&self, region: &RegionID) -> Dimensionless {
        self.load_scale
            .get(region)
            .copied()
            .unwrap_or(Dimensionless(1.0))
    }

    /// Scale every region's load by `factor`
    pub fn scale_load(&mut self, factor: Dimensionless) {
        for scale in self.load_scale.values_mut() {
            *scale = *scale * factor;
        }
    }

    /// Apply this year's phase-out reductions.
    ///
    /// Returns the capacity removed.
    pub fn apply_phase_outs(&mut self, year: u32) -> Result<Capacity> {
        let mut removed = Capacity(0.0);
        for schedule in &self.phase_outs {
            let removed_for_tech = schedule.apply_year(&mut self.assets, year)?;
            if removed_for_tech > Capacity(0.0) {
                debug!(
                    "Phased out {removed_for_tech} of {} in {year}",
                    schedule.technology
                );
            }
            removed += removed_for_tech;
        }
        self.sync_fuel_links()?;
        self.clamp_state_of_charge();

        Ok(removed)
    }

    /// Apply the retirements scheduled for this year.
    ///
    /// Capacity retired from the fixed twin of a tracked buildable asset is returned to potential.
    ///
    /// Returns the capacity removed.
    pub fn apply_retirements(&mut self, year: u32) -> Result<Capacity> {
        let due: Vec<_> = self
            .assets
            .retirements()
            .due(year)
            .map(|(id, amount)| (id.clone(), amount))
            .collect();

        let mut total_removed = Capacity(0.0);
        for (id, amount) in due {
            let removed = self.assets.retire(&id, amount)?;
            total_removed += removed;
            trace!("Retired {removed} of asset {id} in {year}");

            let asset = self.assets.get_mut(&id)?;
            if asset.installed_capacity() > Capacity(0.0)
                && asset.scheduled_retirement_year.is_some_and(|last| last <= year)
            {
                // A partial retirement: what remains has no retirement year
                asset.scheduled_retirement_year = None;
            }

            if asset.role == AssetRole::Fixed && asset.buildable_source_id.is_some() {
                let (technology, region) = (asset.technology, asset.region.clone());
                let released = self.potentials.release(technology, &region, removed);
                if released > Capacity(0.0) {
                    debug!("Released {released} of {technology} potential in region {region}");
                }
            }
        }
        self.sync_fuel_links()?;
        self.clamp_state_of_charge();

        Ok(total_removed)
    }

    /// Limit each storage unit's initial state of charge to what its capacity can hold
    pub fn clamp_state_of_charge(&mut self) {
        for asset in self.assets.iter_mut() {
            let energy_capacity = asset.energy_capacity();
            if asset.initial_soc > energy_capacity {
                trace!(
                    "Clamping initial state of charge of {} to {energy_capacity}",
                    asset.id
                );
                asset.initial_soc = energy_capacity;
            }
        }
    }

    /// Make each fuel feed link's capacity equal to that of the plant it supplies
    pub fn sync_fuel_links(&mut self) -> Result<()> {
        let links: Vec<(AssetID, Capacity)> = self
            .assets
            .iter()
            .filter_map(|asset| {
                let link_id = asset.fuel_link_id.as_ref()?;
                Some((link_id.clone(), asset.installed_capacity()))
            })
            .collect();

        for (link_id, capacity) in links {
            self.assets.get_mut(&link_id)?.set_installed_capacity(capacity);
        }

        Ok(())
    }

    /// Recompute every asset's headroom from the remaining potential
    pub fn refresh_headroom(&mut self, regional_potential: Capacity) {
        refresh_headroom(&mut self.assets, &mut self.potentials, regional_potential);
    }

    /// Mean efficiency of the non-import generators burning a fuel, if there are any
    pub fn mean_efficiency(&self, fuel: Fuel) -> Option<Dimensionless> {
        let (sum, count) = self
            .assets
            .iter()
            .filter(|asset| asset.technology.fuel() == Some(fuel) && !asset.technology.is_import())
            .fold((0.0, 0.0), |(sum, count), asset| {
                (sum + asset.efficiency.value(), count + 1.0)
            });

        (count > 0.0).then_some(Dimensionless(sum / count))
    }

    /// Iterate over the assets whose marginal cost follows a fuel price
    pub fn iter_fuel_burners_mut(
        &mut self,
        fuel: Fuel,
    ) -> impl Iterator<Item = &mut AssetRecord> {
        self.assets
            .iter_mut()
            .filter(move |asset| asset.technology.fuel() == Some(fuel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::region_id;
    use crate::technology::Technology;
    use crate::units::Energy;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn record(id: &str, technology: Technology, role: AssetRole, capacity: f64) -> AssetRecord {
        AssetRecord::new(id.into(), technology, role, region_id(), Capacity(capacity), 2020)
    }

    #[test]
    fn test_apply_retirements_releases_potential() {
        let mut system = SystemModel::new(2020, false);
        let region = region_id();
        system.assets.upsert(record(
            "R1 biomass",
            Technology::Biomass,
            AssetRole::Buildable,
            0.0,
        ));
        let twin_id = system
            .assets
            .ensure_fixed_twin(&"R1 biomass".into(), 2020)
            .unwrap();
        system
            .assets
            .get_mut(&twin_id)
            .unwrap()
            .set_installed_capacity(Capacity(40.0));
        system
            .potentials
            .register(Technology::Biomass, &region, Capacity(0.0), Capacity(40.0));
        system
            .assets
            .schedule_retirement(&twin_id, 2022, Capacity(25.0))
            .unwrap();

        assert_eq!(system.apply_retirements(2021).unwrap(), Capacity(0.0));
        assert_eq!(system.apply_retirements(2022).unwrap(), Capacity(25.0));
        assert_eq!(
            system.assets.get(&twin_id).unwrap().installed_capacity(),
            Capacity(15.0)
        );
        assert_eq!(
            system
                .potentials
                .get(Technology::Biomass, &region)
                .unwrap()
                .remaining,
            Capacity(25.0)
        );
    }

    #[test]
    fn test_retirement_of_gas_link_reduces_fuel_feed() {
        let mut system = SystemModel::new(2020, true);
        let mut ccgt = record("R1 CCGT", Technology::Ccgt, AssetRole::Expandable, 200.0);
        ccgt.fuel_link_id = Some("R1 CCGT gas input".into());
        system.assets.upsert(ccgt);
        system.assets.upsert(record(
            "R1 CCGT gas input",
            Technology::GasInput,
            AssetRole::Fixed,
            200.0,
        ));
        system
            .assets
            .schedule_retirement(&"R1 CCGT".into(), 2021, Capacity(50.0))
            .unwrap();

        system.apply_retirements(2021).unwrap();
        assert_eq!(
            system
                .assets
                .get(&"R1 CCGT gas input".into())
                .unwrap()
                .installed_capacity(),
            Capacity(150.0)
        );
    }

    fn charged_battery(system: &mut SystemModel) -> AssetID {
        let mut battery = record(
            "R1 battery fixed",
            Technology::Battery,
            AssetRole::Fixed,
            20.0,
        );
        battery.max_hours = Some(6.0);
        battery.initial_soc = Energy(120.0);
        let id = battery.id.clone();
        system.assets.upsert(battery);
        id
    }

    #[rstest]
    #[case(20.0, 0.0)]
    #[case(5.0, 90.0)]
    #[case(0.0, 120.0)]
    fn test_retirement_clamps_state_of_charge(#[case] retired: f64, #[case] expected_soc: f64) {
        let mut system = SystemModel::new(2020, false);
        let id = charged_battery(&mut system);
        system
            .assets
            .schedule_retirement(&id, 2035, Capacity(retired))
            .unwrap();

        system.apply_retirements(2035).unwrap();
        let battery = system.assets.get(&id).unwrap();
        assert_eq!(battery.installed_capacity(), Capacity(20.0 - retired));
        assert_eq!(battery.initial_soc, Energy(expected_soc));
        assert!(battery.initial_soc <= battery.energy_capacity());
    }

    #[test]
    fn test_phase_out_clamps_state_of_charge() {
        let mut system = SystemModel::new(2020, false);
        let id = charged_battery(&mut system);
        system.phase_outs.push(
            PhaseOutSchedule::initialize(&system.assets, Technology::Battery, 2020, 2022).unwrap(),
        );

        system.apply_phase_outs(2021).unwrap();
        let battery = system.assets.get(&id).unwrap();
        assert_eq!(battery.installed_capacity(), Capacity(10.0));
        assert_eq!(battery.initial_soc, Energy(60.0));

        system.apply_phase_outs(2022).unwrap();
        assert_eq!(system.assets.get(&id).unwrap().initial_soc, Energy(0.0));
    }

    #[rstest]
    #[case(30.0, None)]
    #[case(300.0, Some(2021))]
    fn test_partial_retirement_clears_retirement_year(
        #[case] retired: f64,
        #[case] expected_year: Option<u32>,
    ) {
        let mut system = SystemModel::new(2020, false);
        system
            .assets
            .upsert(record("R1 coal", Technology::Coal, AssetRole::Fixed, 300.0));
        let id: AssetID = "R1 coal".into();
        system
            .assets
            .schedule_retirement(&id, 2021, Capacity(retired))
            .unwrap();

        system.apply_retirements(2021).unwrap();
        let coal = system.assets.get(&id).unwrap();
        assert_eq!(coal.installed_capacity(), Capacity(300.0 - retired));
        assert_eq!(coal.scheduled_retirement_year, expected_year);
    }

    #[test]
    fn test_partial_retirement_keeps_later_retirement_year() {
        let mut system = SystemModel::new(2020, false);
        system
            .assets
            .upsert(record("R1 coal", Technology::Coal, AssetRole::Fixed, 300.0));
        let id: AssetID = "R1 coal".into();
        system
            .assets
            .schedule_retirement(&id, 2021, Capacity(30.0))
            .unwrap();
        system
            .assets
            .schedule_retirement(&id, 2030, Capacity(270.0))
            .unwrap();

        system.apply_retirements(2021).unwrap();
        assert_eq!(
            system.assets.get(&id).unwrap().scheduled_retirement_year,
            Some(2030)
        );
        system.apply_retirements(2030).unwrap();
        let coal = system.assets.get(&id).unwrap();
        assert_eq!(coal.installed_capacity(), Capacity(0.0));
        assert_eq!(coal.scheduled_retirement_year, Some(2030));
    }

    #[test]
    fn test_mean_efficiency() {
        let mut system = SystemModel::new(2020, false);
        for (id, efficiency) in [("c1", 0.3), ("c2", 0.4)] {
            let mut coal = record(id, Technology::Coal, AssetRole::Fixed, 100.0);
            coal.efficiency = Dimensionless(efficiency);
            system.assets.upsert(coal);
        }

        assert_approx_eq!(
            Dimensionless,
            system.mean_efficiency(Fuel::Coal).unwrap(),
            Dimensionless(0.35)
        );
        assert_eq!(system.mean_efficiency(Fuel::Oil), None);
    }

    #[test]
    fn test_scale_load() {
        let mut system = SystemModel::new(2020, false);
        system.load_scale.insert("R1".into(), Dimensionless(2.0));
        system.scale_load(Dimensionless(1.5));
        assert_eq!(system.load_scale(&"R1".into()), Dimensionless(3.0));
        assert_eq!(system.load_scale(&"R9".into()), Dimensionless(1.0));
    }
}
