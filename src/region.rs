//! Grid nodes. Every asset and every load belongs to exactly one region.
use crate::id::{define_id_getter, define_id_type};
use indexmap::IndexMap;
use serde::Deserialize;

define_id_type! {RegionID}

/// All regions of a model, in input file order
pub type RegionMap = IndexMap<RegionID, Region>;

/// A grid node
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Region {
    /// Short name, used as a prefix for the IDs of assets created in the region (e.g. "R1")
    pub id: RegionID,
    /// Human-readable name
    pub description: String,
}
define_id_getter! {Region, RegionID}
