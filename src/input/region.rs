//! Reading the `regions.csv` file.
use super::*;
use crate::region::RegionMap;

const REGIONS_FILE_NAME: &str = "regions.csv";

/// Read the model's regions.
///
/// Region IDs are used as prefixes of generated asset IDs (`"{region} {technology}"`), so they may
/// not contain whitespace.
pub fn read_regions(model_dir: &Path) -> Result<RegionMap> {
    let file_path = model_dir.join(REGIONS_FILE_NAME);
    let regions = read_csv_id_file(&file_path)?;
    check_region_ids(&regions).with_context(|| input_err_msg(&file_path))?;

    Ok(regions)
}

fn check_region_ids(regions: &RegionMap) -> Result<()> {
    for id in regions.keys() {
        ensure!(
            !id.as_str().contains(char::is_whitespace),
            "Region ID \"{id}\" contains whitespace"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::region::Region;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_regions() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(REGIONS_FILE_NAME),
            "id,description\nN,Northern node\nS,Southern node\n",
        )
        .unwrap();

        let regions = read_regions(dir.path()).unwrap();
        assert_eq!(
            regions.keys().map(ToString::to_string).collect::<Vec<_>>(),
            ["N", "S"]
        );
        assert_eq!(
            regions["S"],
            Region {
                id: "S".into(),
                description: "Southern node".into(),
            }
        );
    }

    #[test]
    fn test_check_region_ids_whitespace() {
        let regions: RegionMap = [(
            "East 1".into(),
            Region {
                id: "East 1".into(),
                description: "East".into(),
            },
        )]
        .into_iter()
        .collect();
        assert_error!(
            check_region_ids(&regions),
            "Region ID \"East 1\" contains whitespace"
        );
    }
}
