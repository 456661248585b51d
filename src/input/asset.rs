//! Code for reading [`AssetDefinition`]s from a CSV file.
use super::*;
use crate::asset::{AssetDefinition, AssetDefinitionMap, AssetID};
use crate::id::IDCollection;
use crate::region::{RegionID, RegionMap};
use crate::technology::{AssetKind, Technology};
use crate::units::{
    Capacity, Dimensionless, EmissionsPerEnergy, MoneyPerCapacity, MoneyPerEnergy,
};
use log::warn;
use petgraph::graph::UnGraph;
use petgraph::visit::Dfs;
use serde::Deserialize;

const ASSETS_FILE_NAME: &str = "assets.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct AssetRaw {
    id: String,
    technology: Technology,
    region: String,
    region_to: Option<String>,
    capacity: Capacity,
    extendable: bool,
    capital_cost: MoneyPerCapacity,
    marginal_cost: MoneyPerEnergy,
    efficiency: Option<Dimensionless>,
    max_hours: Option<f64>,
    co2_intensity: Option<EmissionsPerEnergy>,
}

/// Read assets CSV file from model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `regions` - The model's regions
///
/// # Returns
///
/// Asset definitions keyed by ID, in file order.
pub fn read_assets(model_dir: &Path, regions: &RegionMap) -> Result<AssetDefinitionMap> {
    let file_path = model_dir.join(ASSETS_FILE_NAME);
    let assets_csv = read_csv(&file_path)?;
    let assets =
        read_assets_from_iter(assets_csv, regions).with_context(|| input_err_msg(&file_path))?;
    check_region_connectivity(&assets, regions);

    Ok(assets)
}

/// Whether assets of this technology are created by the model rather than read in
fn is_generated(technology: Technology) -> bool {
    use Technology::*;
    matches!(
        technology,
        GasImport | H2Import | GasInput | H2Input | Electrolysis | FuelCell | H2Store
    )
}

/// Process assets from an iterator.
///
/// # Arguments
///
/// * `iter` - Iterator of `AssetRaw`s
/// * `regions` - The model's regions
///
/// # Returns
///
/// A map of [`AssetDefinition`]s or an error.
fn read_assets_from_iter<I>(iter: I, regions: &RegionMap) -> Result<AssetDefinitionMap>
where
    I: Iterator<Item = AssetRaw>,
{
    let mut assets = AssetDefinitionMap::new();
    for raw in iter {
        let asset = validate_asset(raw, regions)?;
        ensure!(
            !assets.contains_key(&asset.id),
            "Duplicate asset ID: {}",
            asset.id
        );
        assets.insert(asset.id.clone(), asset);
    }

    Ok(assets)
}

fn validate_asset(raw: AssetRaw, regions: &RegionMap) -> Result<AssetDefinition> {
    let id = AssetID::from(raw.id);
    let technology = raw.technology;
    ensure!(
        !is_generated(technology),
        "Asset {id}: {technology} assets are added by the model and cannot be read in"
    );
    let region = regions.get_id(&raw.region)?;

    let connects_regions =
        technology.kind() == AssetKind::Line || technology == Technology::Dc;
    let region_to = match raw.region_to.filter(|region_to| !region_to.is_empty()) {
        Some(region_to) => {
            ensure!(
                connects_regions,
                "Asset {id}: region_to may only be given for AC lines and DC links"
            );
            Some(regions.get_id(&region_to)?)
        }
        None => {
            ensure!(
                !connects_regions,
                "Asset {id}: region_to is required for {technology} assets"
            );
            None
        }
    };

    ensure!(
        raw.capacity.is_finite() && raw.capacity >= Capacity(0.0),
        "Asset {id}: capacity must be a finite, non-negative number"
    );
    ensure!(
        raw.capital_cost.is_finite() && raw.capital_cost >= MoneyPerCapacity(0.0),
        "Asset {id}: capital_cost must be a finite, non-negative number"
    );
    ensure!(
        raw.marginal_cost.is_finite(),
        "Asset {id}: marginal_cost must be a finite number"
    );

    let efficiency = raw.efficiency.unwrap_or(Dimensionless(1.0));
    ensure!(
        efficiency > Dimensionless(0.0) && efficiency <= Dimensionless(1.0),
        "Asset {id}: efficiency must be in the range (0, 1]"
    );

    let max_hours = if technology.kind() == AssetKind::StorageUnit {
        let max_hours = raw
            .max_hours
            .with_context(|| format!("Asset {id}: max_hours is required for storage units"))?;
        ensure!(
            max_hours.is_finite() && max_hours > 0.0,
            "Asset {id}: max_hours must be a finite number greater than zero"
        );
        Some(max_hours)
    } else {
        None
    };

    Ok(AssetDefinition {
        id,
        technology,
        region,
        region_to,
        capacity: raw.capacity,
        extendable: raw.extendable,
        capital_cost: raw.capital_cost,
        marginal_cost: raw.marginal_cost,
        efficiency,
        max_hours,
        co2_intensity: raw.co2_intensity,
    })
}

/// Warn about regions which lines and DC links don't connect to the rest of the system
fn check_region_connectivity(assets: &AssetDefinitionMap, regions: &RegionMap) {
    if regions.len() < 2 {
        return;
    }

    let mut graph = UnGraph::<&RegionID, ()>::new_undirected();
    let nodes: IndexMap<_, _> = regions
        .keys()
        .map(|region| (region, graph.add_node(region)))
        .collect();
    for asset in assets.values() {
        if let Some(region_to) = &asset.region_to {
            graph.add_edge(nodes[&asset.region], nodes[region_to], ());
        }
    }

    let mut dfs = Dfs::new(&graph, nodes[0]);
    let mut reachable = Vec::new();
    while let Some(node) = dfs.next(&graph) {
        reachable.push(node);
    }
    for (region, node) in &nodes {
        if !reachable.contains(node) {
            warn!("Region {region} is not connected to region {}", graph[nodes[0]]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, regions};
    use rstest::rstest;
    use std::iter;

    fn onwind_raw() -> AssetRaw {
        AssetRaw {
            id: "R1 onwind".into(),
            technology: Technology::Onwind,
            region: "R1".into(),
            region_to: None,
            capacity: Capacity(500.0),
            extendable: true,
            capital_cost: MoneyPerCapacity(100_000.0),
            marginal_cost: MoneyPerEnergy(0.01),
            efficiency: None,
            max_hours: None,
            co2_intensity: None,
        }
    }

    #[rstest]
    fn test_read_assets_from_iter_valid(regions: RegionMap) {
        let assets = read_assets_from_iter(iter::once(onwind_raw()), &regions).unwrap();
        let asset = &assets["R1 onwind"];
        assert_eq!(asset.technology, Technology::Onwind);
        assert_eq!(asset.region, "R1".into());
        assert_eq!(asset.efficiency, Dimensionless(1.0));
        assert!(asset.extendable);
    }

    #[rstest]
    fn test_read_assets_from_iter_line(regions: RegionMap) {
        let line = AssetRaw {
            id: "R1-R2".into(),
            technology: Technology::Ac,
            region_to: Some("R2".into()),
            efficiency: Some(Dimensionless(1.0)),
            ..onwind_raw()
        };
        let assets = read_assets_from_iter(iter::once(line), &regions).unwrap();
        assert_eq!(assets["R1-R2"].region_to, Some("R2".into()));
    }

    #[rstest]
    #[case(AssetRaw { region: "R9".into(), ..onwind_raw() }, "Unknown ID R9 found")]
    #[case(
        AssetRaw { region_to: Some("R2".into()), ..onwind_raw() },
        "Asset R1 onwind: region_to may only be given for AC lines and DC links"
    )]
    #[case(
        AssetRaw { technology: Technology::Dc, ..onwind_raw() },
        "Asset R1 onwind: region_to is required for DC assets"
    )]
    #[case(
        AssetRaw { capacity: Capacity(-1.0), ..onwind_raw() },
        "Asset R1 onwind: capacity must be a finite, non-negative number"
    )]
    #[case(
        AssetRaw { efficiency: Some(Dimensionless(1.5)), ..onwind_raw() },
        "Asset R1 onwind: efficiency must be in the range (0, 1]"
    )]
    #[case(
        AssetRaw { technology: Technology::Battery, ..onwind_raw() },
        "Asset R1 onwind: max_hours is required for storage units"
    )]
    #[case(
        AssetRaw { technology: Technology::GasImport, ..onwind_raw() },
        "Asset R1 onwind: gas import assets are added by the model and cannot be read in"
    )]
    fn test_read_assets_from_iter_invalid(
        #[case] asset: AssetRaw,
        #[case] message: &str,
        regions: RegionMap,
    ) {
        assert_error!(read_assets_from_iter(iter::once(asset), &regions), message);
    }

    #[rstest]
    fn test_read_assets_from_iter_duplicate(regions: RegionMap) {
        assert_error!(
            read_assets_from_iter([onwind_raw(), onwind_raw()].into_iter(), &regions),
            "Duplicate asset ID: R1 onwind"
        );
    }
}
