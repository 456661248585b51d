//! Linear phase-out of policy-retired technologies.
//!
//! A schedule is fixed when the horizon starts: the capacity of each affected asset falls by an
//! equal share every year until the target year, when everything of that technology is removed.
use crate::asset::{AssetID, AssetLedger};
use crate::technology::Technology;
use crate::units::Capacity;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::{debug, trace};

/// Below this much capacity (in MW), a phased-out asset is removed entirely
const MIN_VIABLE_CAPACITY: Capacity = Capacity(1.0);

/// The linear decay curve for one technology
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutSchedule {
    /// The technology being phased out
    pub technology: Technology,
    /// The year by which all capacity must be gone
    pub target_year: u32,
    /// Capacity of each affected asset when the schedule was drawn up
    pub initial_capacities: IndexMap<AssetID, Capacity>,
    /// Sum of `initial_capacities`
    pub total_initial_capacity: Capacity,
    /// Capacity removed across all affected assets each year
    pub yearly_decrement: Capacity,
}

impl PhaseOutSchedule {
    /// Draw up a schedule from the current state of the ledger.
    ///
    /// A technology with no capacity yields a schedule which does nothing until the target year.
    pub fn initialize(
        ledger: &AssetLedger,
        technology: Technology,
        start_year: u32,
        target_year: u32,
    ) -> Result<Self> {
        ensure!(
            target_year > start_year,
            "Phase-out year {target_year} for {technology} must be after the start year \
            {start_year}"
        );

        let initial_capacities: IndexMap<_, _> = ledger
            .iter_technology(technology)
            .filter(|asset| asset.installed_capacity() > Capacity(0.0))
            .map(|asset| (asset.id.clone(), asset.installed_capacity()))
            .collect();
        let total_initial_capacity: Capacity = initial_capacities.values().copied().sum();
        let yearly_decrement =
            Capacity(total_initial_capacity.value() / f64::from(target_year - start_year));
        debug!(
            "Phasing out {total_initial_capacity} of {technology} by {target_year} \
            ({yearly_decrement} per year)"
        );

        Ok(Self {
            technology,
            target_year,
            initial_capacities,
            total_initial_capacity,
            yearly_decrement,
        })
    }

    /// Apply one year's reduction to the ledger.
    ///
    /// From the target year onwards every asset of the technology is forced to zero, including
    /// assets added after the schedule was drawn up.
    ///
    /// Returns the capacity removed.
    pub fn apply_year(&self, ledger: &mut AssetLedger, year: u32) -> Result<Capacity> {
        if year >= self.target_year {
            let ids: Vec<_> = ledger
                .iter_technology(self.technology)
                .map(|asset| asset.id.clone())
                .collect();
            let mut removed = Capacity(0.0);
            for id in &ids {
                removed += ledger.retire(id, Capacity(f64::INFINITY))?;
            }
            return Ok(removed);
        }

        if self.total_initial_capacity <= Capacity(0.0) {
            return Ok(Capacity(0.0));
        }

        let mut removed = Capacity(0.0);
        for (id, initial) in &self.initial_capacities {
            let share = *initial / self.total_initial_capacity;
            let asset = ledger.get_mut(id)?;
            let remaining = asset.installed_capacity() - self.yearly_decrement * share;
            if remaining < MIN_VIABLE_CAPACITY {
                trace!("Phase-out leaves {remaining} of asset {id}; removing it entirely");
                removed += asset.reduce_capacity(asset.installed_capacity());
            } else {
                removed += asset.reduce_capacity(asset.installed_capacity() - remaining);
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetRecord, AssetRole};
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    fn coal_asset(id: &str, capacity: f64) -> AssetRecord {
        AssetRecord::new(
            id.into(),
            Technology::Coal,
            AssetRole::Fixed,
            "R1".into(),
            Capacity(capacity),
            2020,
        )
    }

    #[fixture]
    fn coal_ledger() -> AssetLedger {
        let mut ledger = AssetLedger::new();
        for (id, capacity) in [("coal1", 100.0), ("coal2", 200.0), ("coal3", 300.0)] {
            ledger.upsert(coal_asset(id, capacity));
        }
        ledger
    }

    fn capacities(ledger: &AssetLedger) -> Vec<f64> {
        ledger
            .iter_technology(Technology::Coal)
            .map(|asset| asset.installed_capacity().value())
            .collect()
    }

    #[rstest]
    fn test_linear_phase_out(mut coal_ledger: AssetLedger) {
        let schedule =
            PhaseOutSchedule::initialize(&coal_ledger, Technology::Coal, 2020, 2023).unwrap();
        assert_approx_eq!(Capacity, schedule.yearly_decrement, Capacity(200.0));

        let removed = schedule.apply_year(&mut coal_ledger, 2021).unwrap();
        assert_approx_eq!(Capacity, removed, Capacity(200.0), epsilon = 1e-9);
        let after = capacities(&coal_ledger);
        assert_approx_eq!(f64, after[0], 100.0 - 100.0 / 3.0, epsilon = 1e-9);
        assert_approx_eq!(f64, after[1], 200.0 - 200.0 / 3.0, epsilon = 1e-9);
        assert_approx_eq!(f64, after[2], 200.0, epsilon = 1e-9);

        schedule.apply_year(&mut coal_ledger, 2022).unwrap();
        schedule.apply_year(&mut coal_ledger, 2023).unwrap();
        assert_eq!(capacities(&coal_ledger), [0.0, 0.0, 0.0]);

        // Idempotent at the terminal year
        schedule.apply_year(&mut coal_ledger, 2023).unwrap();
        assert_eq!(coal_ledger.total_installed(Technology::Coal), Capacity(0.0));
    }

    #[rstest]
    fn test_terminal_year_includes_later_assets(mut coal_ledger: AssetLedger) {
        let schedule =
            PhaseOutSchedule::initialize(&coal_ledger, Technology::Coal, 2020, 2025).unwrap();
        coal_ledger.upsert(coal_asset("coal4", 50.0));
        schedule.apply_year(&mut coal_ledger, 2025).unwrap();
        assert_eq!(coal_ledger.total_installed(Technology::Coal), Capacity(0.0));
    }

    #[test]
    fn test_sub_unit_remainder_removed() {
        let mut ledger = AssetLedger::new();
        ledger.upsert(coal_asset("coal1", 10.0));
        ledger.upsert(coal_asset("coal2", 990.0));
        let schedule =
            PhaseOutSchedule::initialize(&ledger, Technology::Coal, 2020, 2120).unwrap();

        // coal1 loses 0.1 a year and stays above the floor
        schedule.apply_year(&mut ledger, 2021).unwrap();
        assert_approx_eq!(
            Capacity,
            ledger.get(&"coal1".into()).unwrap().installed_capacity(),
            Capacity(9.9),
            epsilon = 1e-9
        );

        ledger
            .get_mut(&"coal1".into())
            .unwrap()
            .set_installed_capacity(Capacity(1.05));
        schedule.apply_year(&mut ledger, 2022).unwrap();
        assert_eq!(
            ledger.get(&"coal1".into()).unwrap().installed_capacity(),
            Capacity(0.0)
        );
    }

    #[test]
    fn test_no_assets_is_noop() {
        let mut ledger = AssetLedger::new();
        let schedule =
            PhaseOutSchedule::initialize(&ledger, Technology::Lignite, 2020, 2030).unwrap();
        assert_eq!(schedule.yearly_decrement, Capacity(0.0));
        assert_eq!(
            schedule.apply_year(&mut ledger, 2021).unwrap(),
            Capacity(0.0)
        );
        assert_eq!(
            schedule.apply_year(&mut ledger, 2030).unwrap(),
            Capacity(0.0)
        );
    }

    #[rstest]
    #[case(2020)]
    #[case(2019)]
    fn test_target_not_after_start(coal_ledger: AssetLedger, #[case] target_year: u32) {
        assert_error!(
            PhaseOutSchedule::initialize(&coal_ledger, Technology::Coal, 2020, target_year),
            format!("Phase-out year {target_year} for coal must be after the start year 2020")
        );
    }
}
