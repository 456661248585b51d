//! Remaining buildable potential per technology and region.
use crate::asset::{AssetLedger, AssetRecord, AssetRole};
use crate::region::RegionID;
use crate::technology::Technology;
use crate::units::Capacity;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::trace;

/// Below this much remaining potential (in MW), nothing more may be built
const MIN_REMAINING_POTENTIAL: Capacity = Capacity(1.0);

/// Potential left for one technology in one region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialEntry {
    /// What may still be built
    pub remaining: Capacity,
    /// Upper bound on `remaining`, however much capacity is retired
    pub ceiling: Capacity,
}

/// Tracks remaining potential for each (technology, region) pair.
///
/// Pairs that were never registered are untracked: their build-out is limited only by the
/// regional cap.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PotentialTracker(IndexMap<(Technology, RegionID), PotentialEntry>);

impl PotentialTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a pair, or add to its pools if it is already tracked
    pub fn register(
        &mut self,
        technology: Technology,
        region: &RegionID,
        remaining: Capacity,
        ceiling: Capacity,
    ) {
        let entry = self
            .0
            .entry((technology, region.clone()))
            .or_insert(PotentialEntry {
                remaining: Capacity(0.0),
                ceiling: Capacity(0.0),
            });
        entry.remaining += remaining.clamp_non_negative();
        entry.ceiling += ceiling.clamp_non_negative();
        entry.ceiling = entry.ceiling.max(entry.remaining);
    }

    /// Replace the ceiling for a tracked pair
    pub fn set_ceiling(
        &mut self,
        technology: Technology,
        region: &RegionID,
        ceiling: Capacity,
    ) -> Result<()> {
        let entry = self.0.get_mut(&(technology, region.clone()));
        let Some(entry) = entry else {
            // Ceilings for pairs without any buildable asset have nothing to bound
            trace!("Ignoring potential ceiling for untracked pair ({technology}, {region})");
            return Ok(());
        };
        ensure!(
            ceiling >= entry.remaining,
            "Potential ceiling {ceiling} for {technology} in region {region} is below the \
            remaining potential {}",
            entry.remaining
        );
        entry.ceiling = ceiling;
        Ok(())
    }

    /// Look up the entry for a pair
    pub fn get(&self, technology: Technology, region: &RegionID) -> Option<&PotentialEntry> {
        self.0.get(&(technology, region.clone()))
    }

    /// Whether a pair is tracked
    pub fn is_tracked(&self, technology: Technology, region: &RegionID) -> bool {
        self.get(technology, region).is_some()
    }

    /// Take `amount` from the remaining potential of a pair.
    ///
    /// Returns the amount actually consumed, which is less than requested if not enough remains.
    /// Untracked pairs are unlimited.
    pub fn consume(
        &mut self,
        technology: Technology,
        region: &RegionID,
        amount: Capacity,
    ) -> Capacity {
        let amount = amount.clamp_non_negative();
        let Some(entry) = self.0.get_mut(&(technology, region.clone())) else {
            return amount;
        };

        let consumed = amount.min(entry.remaining);
        if consumed < amount {
            trace!(
                "Only {consumed} of requested {amount} potential left for {technology} in {region}"
            );
        }
        entry.remaining -= consumed;
        consumed
    }

    /// Return retired capacity to the potential of a pair, bounded by the ceiling.
    ///
    /// Returns the amount actually released. Nothing is released for untracked pairs.
    pub fn release(
        &mut self,
        technology: Technology,
        region: &RegionID,
        amount: Capacity,
    ) -> Capacity {
        let Some(entry) = self.0.get_mut(&(technology, region.clone())) else {
            return Capacity(0.0);
        };

        let released = amount
            .clamp_non_negative()
            .min(entry.ceiling - entry.remaining)
            .clamp_non_negative();
        entry.remaining += released;
        released
    }

    /// Limit an asset's headroom to the remaining potential of its pair and to `regional_cap`.
    ///
    /// Sub-unit remainders are zeroed, along with the asset's headroom.
    pub fn cap_at(&mut self, asset: &mut AssetRecord, regional_cap: Capacity) {
        let Some(entry) = self.0.get_mut(&(asset.technology, asset.region.clone())) else {
            return;
        };

        if entry.remaining <= MIN_REMAINING_POTENTIAL {
            entry.remaining = Capacity(0.0);
            asset.set_headroom(Capacity(0.0));
        } else {
            asset.set_headroom(entry.remaining.min(regional_cap));
        }
    }

    /// Iterate over all tracked pairs
    pub fn iter(&self) -> impl Iterator<Item = (Technology, &RegionID, &PotentialEntry)> {
        self.0
            .iter()
            .map(|((technology, region), entry)| (*technology, region, entry))
    }
}

/// Recompute the headroom of every asset in the ledger.
///
/// # Arguments
///
/// * `ledger` - The assets to update
/// * `potentials` - Remaining potential for tracked buildable generators
/// * `regional_potential` - The most any one asset may add in a year
pub fn refresh_headroom(
    ledger: &mut AssetLedger,
    potentials: &mut PotentialTracker,
    regional_potential: Capacity,
) {
    for asset in ledger.iter_mut() {
        if asset.technology.is_import() || asset.technology.is_derived() {
            asset.set_headroom(Capacity(0.0));
            continue;
        }

        match asset.role {
            AssetRole::Fixed => asset.set_headroom(Capacity(0.0)),
            AssetRole::Buildable => {
                if potentials.is_tracked(asset.technology, &asset.region) {
                    potentials.cap_at(asset, regional_potential);
                } else {
                    asset.set_headroom(regional_potential);
                }
            }
            AssetRole::Expandable if asset.technology.is_gas_plant() => {
                // Link capacity is measured at the fuel input
                asset.set_headroom(regional_potential / asset.efficiency);
            }
            AssetRole::Expandable => asset.set_headroom(regional_potential),
        }
    }
}
