//! Assets and their lifecycle bookkeeping.
//!
//! The [`AssetLedger`] maps asset IDs to [`AssetRecord`]s and owns the [`RetirementQueue`]. All
//! capacity changes go through the ledger's mutators, which keep capacities and headroom
//! non-negative and keep the optimisable flag in step with headroom.
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::technology::{AssetKind, Technology};
use crate::units::{
    Capacity, Dimensionless, EmissionsPerEnergy, Energy, MoneyPerCapacity, MoneyPerEnergy,
};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::trace;
use serde::Serialize;
use std::collections::BTreeMap;

define_id_type! {AssetID}

/// How the optimiser may change an asset's capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum AssetRole {
    /// Holds committed capacity and is never optimised
    #[strum(serialize = "fixed")]
    #[serde(rename = "fixed")]
    Fixed,
    /// Exposes headroom. Chosen additions are moved into the fixed twin.
    #[strum(serialize = "buildable")]
    #[serde(rename = "buildable")]
    Buildable,
    /// Optimised in place. Capacity only ever folds upward.
    #[strum(serialize = "expandable")]
    #[serde(rename = "expandable")]
    Expandable,
}

/// An asset as declared in the model's `assets.csv`, before baseline conversion
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDefinition {
    /// Unique identifier for the asset
    pub id: AssetID,
    /// The asset's technology
    pub technology: Technology,
    /// The region the asset is attached to
    pub region: RegionID,
    /// The far end of a line or DC link
    pub region_to: Option<RegionID>,
    /// Current capacity. For extendable generators this is the buildable potential.
    pub capacity: Capacity,
    /// Whether the optimiser may build more of this asset
    pub extendable: bool,
    /// Annualised capital cost
    pub capital_cost: MoneyPerCapacity,
    /// Cost per MWh of output
    pub marginal_cost: MoneyPerEnergy,
    /// Conversion efficiency (round-trip for storage units)
    pub efficiency: Dimensionless,
    /// Energy-to-power ratio of storage units
    pub max_hours: Option<f64>,
    /// Emission intensity overriding the fuel default
    pub co2_intensity: Option<EmissionsPerEnergy>,
}

/// Asset definitions keyed by ID, in file order
pub type AssetDefinitionMap = IndexMap<AssetID, AssetDefinition>;

/// The lifecycle record of a single asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    /// Unique identifier, stable across the horizon
    pub id: AssetID,
    /// The technology tag
    pub technology: Technology,
    /// Component type, derived from the technology
    pub kind: AssetKind,
    /// How the optimiser may change this asset
    pub role: AssetRole,
    /// The region the asset is attached to
    pub region: RegionID,
    /// The far end of a line or DC link
    pub region_to: Option<RegionID>,
    installed_capacity: Capacity,
    buildable_headroom: Capacity,
    is_optimizable: bool,
    /// The year the asset was first commissioned
    pub commissioned_year: u32,
    /// The latest year in which a scheduled lot of this asset retires, cleared once that year
    /// passes with capacity left over
    pub scheduled_retirement_year: Option<u32>,
    /// For buildable assets, the fixed twin holding their committed capacity
    pub fixed_twin_id: Option<AssetID>,
    /// For fixed twins, the buildable asset they belong to
    pub buildable_source_id: Option<AssetID>,
    /// For CCGT links, the paired `Gas_input` link whose capacity follows this one
    pub fuel_link_id: Option<AssetID>,
    /// Annualised capital cost
    pub capital_cost: MoneyPerCapacity,
    /// Cost per MWh of output (or input, for links)
    pub marginal_cost: MoneyPerEnergy,
    /// Conversion efficiency
    pub efficiency: Dimensionless,
    /// Energy-to-power ratio (storage units only)
    pub max_hours: Option<f64>,
    /// State of charge at the start of the year (storage units only)
    pub initial_soc: Energy,
    /// Emission intensity overriding the fuel default
    pub co2_intensity: Option<EmissionsPerEnergy>,
}
define_id_getter! {AssetRecord, AssetID}

impl AssetRecord {
    /// Create a new record with no headroom.
    ///
    /// Negative capacities are clamped to zero.
    pub fn new(
        id: AssetID,
        technology: Technology,
        role: AssetRole,
        region: RegionID,
        installed_capacity: Capacity,
        commissioned_year: u32,
    ) -> Self {
        Self {
            id,
            technology,
            kind: technology.kind(),
            role,
            region,
            region_to: None,
            installed_capacity: installed_capacity.clamp_non_negative(),
            buildable_headroom: Capacity(0.0),
            is_optimizable: false,
            commissioned_year,
            scheduled_retirement_year: None,
            fixed_twin_id: None,
            buildable_source_id: None,
            fuel_link_id: None,
            capital_cost: MoneyPerCapacity(0.0),
            marginal_cost: MoneyPerEnergy(0.0),
            efficiency: Dimensionless(1.0),
            max_hours: None,
            initial_soc: Energy(0.0),
            co2_intensity: None,
        }
    }

    /// Capacity currently present in the system
    pub fn installed_capacity(&self) -> Capacity {
        self.installed_capacity
    }

    /// The most the optimiser may add this year
    pub fn headroom(&self) -> Capacity {
        self.buildable_headroom
    }

    /// Whether the optimiser gets a capacity variable for this asset this year
    pub fn is_optimizable(&self) -> bool {
        self.is_optimizable
    }

    /// Overwrite the installed capacity, clamping at zero
    pub fn set_installed_capacity(&mut self, capacity: Capacity) {
        if capacity < Capacity(0.0) {
            trace!("Clamping negative capacity {capacity} of asset {} to 0", self.id);
        }
        self.installed_capacity = capacity.clamp_non_negative();
    }

    /// Increase the installed capacity. Negative amounts are ignored.
    pub fn add_capacity(&mut self, amount: Capacity) {
        self.installed_capacity += amount.clamp_non_negative();
    }

    /// Reduce the installed capacity, flooring at zero.
    ///
    /// Returns the capacity actually removed.
    pub fn reduce_capacity(&mut self, amount: Capacity) -> Capacity {
        let removed = amount.clamp_non_negative().min(self.installed_capacity);
        self.installed_capacity -= removed;
        removed
    }

    /// Set the headroom, clamping at zero, and recompute whether the asset is optimisable
    pub fn set_headroom(&mut self, headroom: Capacity) {
        self.buildable_headroom = headroom.clamp_non_negative();
        self.is_optimizable = self.role != AssetRole::Fixed
            && !self.technology.is_import()
            && !self.technology.is_derived()
            && self.buildable_headroom > Capacity(0.0);
    }

    /// Maximum energy held by a storage unit
    pub fn energy_capacity(&self) -> Energy {
        Energy(self.installed_capacity.value() * self.max_hours.unwrap_or(0.0))
    }
}

/// Capacity due to retire, keyed by year then asset.
///
/// The queue only ever grows. Entries for the same asset and year are summed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RetirementQueue(BTreeMap<u32, IndexMap<AssetID, Capacity>>);

impl RetirementQueue {
    /// Add `amount` of `asset_id` to the retirements due in `year`
    pub fn schedule(&mut self, asset_id: AssetID, year: u32, amount: Capacity) {
        *self
            .0
            .entry(year)
            .or_default()
            .entry(asset_id)
            .or_insert(Capacity(0.0)) += amount.clamp_non_negative();
    }

    /// Retirements due in `year`
    pub fn due(&self, year: u32) -> impl Iterator<Item = (&AssetID, Capacity)> {
        self.0
            .get(&year)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(id, amount)| (id, *amount)))
    }

    /// Every scheduled retirement, ordered by year
    pub fn iter(&self) -> impl Iterator<Item = (u32, &AssetID, Capacity)> {
        self.0.iter().flat_map(|(year, entries)| {
            entries.iter().map(move |(id, amount)| (*year, id, *amount))
        })
    }

    /// Whether nothing has been scheduled
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The set of all assets in the system model
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AssetLedger {
    assets: IndexMap<AssetID, AssetRecord>,
    retirements: RetirementQueue,
}

impl AssetLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an asset
    pub fn get(&self, id: &AssetID) -> Result<&AssetRecord> {
        self.assets
            .get(id)
            .with_context(|| format!("Asset {id} not found in ledger"))
    }

    /// Look up an asset for modification
    pub fn get_mut(&mut self, id: &AssetID) -> Result<&mut AssetRecord> {
        self.assets
            .get_mut(id)
            .with_context(|| format!("Asset {id} not found in ledger"))
    }

    /// Whether the ledger holds an asset with this ID
    pub fn contains(&self, id: &AssetID) -> bool {
        self.assets.contains_key(id)
    }

    /// Insert a record, replacing any existing record with the same ID
    pub fn upsert(&mut self, record: AssetRecord) {
        self.assets.insert(record.id.clone(), record);
    }

    /// Reduce an asset's installed capacity by `amount`, flooring at zero.
    ///
    /// Returns the capacity actually removed.
    pub fn retire(&mut self, id: &AssetID, amount: Capacity) -> Result<Capacity> {
        let asset = self.get_mut(id)?;
        let removed = asset.reduce_capacity(amount);
        if removed < amount {
            trace!(
                "Retirement of {amount} from asset {id} clamped to {removed} (capacity exhausted)"
            );
        }
        Ok(removed)
    }

    /// Schedule `amount` of an asset's capacity to retire in `year`
    pub fn schedule_retirement(&mut self, id: &AssetID, year: u32, amount: Capacity) -> Result<()> {
        let asset = self.get_mut(id)?;
        asset.scheduled_retirement_year = Some(
            asset
                .scheduled_retirement_year
                .map_or(year, |existing| existing.max(year)),
        );
        self.retirements.schedule(id.clone(), year, amount);
        Ok(())
    }

    /// The retirement queue
    pub fn retirements(&self) -> &RetirementQueue {
        &self.retirements
    }

    /// Return the fixed twin of a buildable asset, creating an empty one if it doesn't exist yet
    pub fn ensure_fixed_twin(&mut self, buildable_id: &AssetID, year: u32) -> Result<AssetID> {
        let buildable = self.get(buildable_id)?;
        ensure!(
            buildable.role == AssetRole::Buildable,
            "Asset {buildable_id} is not buildable and cannot have a fixed twin"
        );
        if let Some(twin_id) = &buildable.fixed_twin_id {
            if self.contains(twin_id) {
                return Ok(twin_id.clone());
            }
        }

        let twin_id = AssetID::from(format!("{buildable_id} fixed"));
        let mut twin = AssetRecord {
            id: twin_id.clone(),
            role: AssetRole::Fixed,
            installed_capacity: Capacity(0.0),
            buildable_headroom: Capacity(0.0),
            is_optimizable: false,
            commissioned_year: year,
            scheduled_retirement_year: None,
            fixed_twin_id: None,
            buildable_source_id: Some(buildable_id.clone()),
            fuel_link_id: None,
            capital_cost: MoneyPerCapacity(0.0),
            initial_soc: Energy(0.0),
            ..buildable.clone()
        };
        twin.set_headroom(Capacity(0.0));
        trace!("Creating fixed twin {twin_id} for asset {buildable_id}");
        self.upsert(twin);
        self.get_mut(buildable_id)?.fixed_twin_id = Some(twin_id.clone());

        Ok(twin_id)
    }

    /// Set an asset's headroom, clamping at zero
    pub fn set_headroom(&mut self, id: &AssetID, headroom: Capacity) -> Result<()> {
        self.get_mut(id)?.set_headroom(headroom);
        Ok(())
    }

    /// Iterate over all assets in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.assets.values()
    }

    /// Iterate mutably over all assets
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AssetRecord> {
        self.assets.values_mut()
    }

    /// Iterate over the assets which get a capacity variable this year
    pub fn iter_optimizable(&self) -> impl Iterator<Item = &AssetRecord> {
        self.iter().filter(|asset| asset.is_optimizable())
    }

    /// Iterate over the assets of a technology
    pub fn iter_technology(&self, technology: Technology) -> impl Iterator<Item = &AssetRecord> {
        self.iter().filter(move |asset| asset.technology == technology)
    }

    /// Number of assets in the ledger
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Total installed capacity of a technology
    pub fn total_installed(&self, technology: Technology) -> Capacity {
        self.iter_technology(technology)
            .map(AssetRecord::installed_capacity)
            .sum()
    }

    /// Total headroom across the optimisable assets
    pub fn total_headroom(&self) -> Capacity {
        self.iter_optimizable().map(AssetRecord::headroom).sum()
    }

    /// Total installed capacity, excluding imports and derived assets
    pub fn total_fixed_capacity(&self) -> Capacity {
        self.iter()
            .filter(|asset| !asset.technology.is_import() && !asset.technology.is_derived())
            .map(AssetRecord::installed_capacity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, buildable_asset};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_retire_clamps_at_zero(buildable_asset: AssetRecord) {
        let mut ledger = AssetLedger::new();
        let mut asset = buildable_asset;
        asset.role = AssetRole::Fixed;
        asset.set_installed_capacity(Capacity(50.0));
        let id = asset.id.clone();
        ledger.upsert(asset);

        assert_eq!(ledger.retire(&id, Capacity(30.0)).unwrap(), Capacity(30.0));
        assert_eq!(ledger.retire(&id, Capacity(30.0)).unwrap(), Capacity(20.0));
        assert_eq!(ledger.get(&id).unwrap().installed_capacity(), Capacity(0.0));
    }

    #[test]
    fn test_get_missing() {
        let ledger = AssetLedger::new();
        assert_error!(
            ledger.get(&"nope".into()),
            "Asset nope not found in ledger"
        );
    }

    #[rstest]
    fn test_set_headroom_updates_optimizable(mut buildable_asset: AssetRecord) {
        buildable_asset.set_headroom(Capacity(10.0));
        assert!(buildable_asset.is_optimizable());
        buildable_asset.set_headroom(Capacity(-5.0));
        assert_eq!(buildable_asset.headroom(), Capacity(0.0));
        assert!(!buildable_asset.is_optimizable());
    }

    #[rstest]
    #[case(Technology::GasImport, AssetRole::Expandable)]
    #[case(Technology::GasInput, AssetRole::Expandable)]
    #[case(Technology::Onwind, AssetRole::Fixed)]
    fn test_never_optimizable(#[case] technology: Technology, #[case] role: AssetRole) {
        let mut asset =
            AssetRecord::new("a".into(), technology, role, "R1".into(), Capacity(1.0), 2020);
        asset.set_headroom(Capacity(100.0));
        assert!(!asset.is_optimizable());
    }

    #[test]
    fn test_retirement_queue_is_additive() {
        let mut queue = RetirementQueue::default();
        queue.schedule("a".into(), 2030, Capacity(10.0));
        queue.schedule("a".into(), 2030, Capacity(5.0));
        queue.schedule("b".into(), 2031, Capacity(1.0));

        let due: Vec<_> = queue.due(2030).collect();
        assert_eq!(due.len(), 1);
        assert_approx_eq!(Capacity, due[0].1, Capacity(15.0));
        assert_eq!(queue.due(2029).count(), 0);
        assert_eq!(queue.iter().count(), 2);
    }

    #[rstest]
    fn test_schedule_retirement_tracks_latest_year(buildable_asset: AssetRecord) {
        let id = buildable_asset.id.clone();
        let mut ledger = AssetLedger::new();
        ledger.upsert(buildable_asset);
        ledger.schedule_retirement(&id, 2045, Capacity(1.0)).unwrap();
        ledger.schedule_retirement(&id, 2040, Capacity(1.0)).unwrap();
        assert_eq!(
            ledger.get(&id).unwrap().scheduled_retirement_year,
            Some(2045)
        );
    }

    #[rstest]
    fn test_ensure_fixed_twin(buildable_asset: AssetRecord) {
        let id = buildable_asset.id.clone();
        let mut ledger = AssetLedger::new();
        ledger.upsert(buildable_asset);

        let twin_id = ledger.ensure_fixed_twin(&id, 2025).unwrap();
        let twin = ledger.get(&twin_id).unwrap();
        assert_eq!(twin.role, AssetRole::Fixed);
        assert_eq!(twin.installed_capacity(), Capacity(0.0));
        assert_eq!(twin.commissioned_year, 2025);
        assert_eq!(twin.buildable_source_id.as_ref(), Some(&id));
        assert_eq!(
            ledger.get(&id).unwrap().fixed_twin_id.as_ref(),
            Some(&twin_id)
        );

        // Second call returns the same twin
        assert_eq!(ledger.ensure_fixed_twin(&id, 2026).unwrap(), twin_id);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_ensure_fixed_twin_of_fixed_asset() {
        let mut ledger = AssetLedger::new();
        ledger.upsert(AssetRecord::new(
            "coal1".into(),
            Technology::Coal,
            AssetRole::Fixed,
            "R1".into(),
            Capacity(100.0),
            2020,
        ));
        assert_error!(
            ledger.ensure_fixed_twin(&"coal1".into(), 2020),
            "Asset coal1 is not buildable and cannot have a fixed twin"
        );
    }

    #[rstest]
    fn test_totals(buildable_asset: AssetRecord) {
        let mut ledger = AssetLedger::new();
        let mut buildable = buildable_asset;
        buildable.set_headroom(Capacity(40.0));
        let id = buildable.id.clone();
        ledger.upsert(buildable);
        let twin_id = ledger.ensure_fixed_twin(&id, 2020).unwrap();
        ledger
            .get_mut(&twin_id)
            .unwrap()
            .set_installed_capacity(Capacity(60.0));
        ledger.upsert(AssetRecord::new(
            "import".into(),
            Technology::GasImport,
            AssetRole::Fixed,
            "R1".into(),
            Capacity(1000.0),
            2020,
        ));

        assert_approx_eq!(Capacity, ledger.total_installed(Technology::Onwind), Capacity(60.0));
        assert_approx_eq!(Capacity, ledger.total_headroom(), Capacity(40.0));
        assert_approx_eq!(Capacity, ledger.total_fixed_capacity(), Capacity(60.0));
        assert_eq!(ledger.iter_optimizable().count(), 1);
    }
}
