//! Code for reading aggregate capacity limits.
use super::*;
use crate::model::AggregateLimit;
use crate::technology::Technology;
use crate::units::Capacity;
use crate::year::{format_years, parse_year_str};
use log::debug;
use serde::Deserialize;

const AGGREGATE_LIMITS_FILE_NAME: &str = "agg_capacity_limits.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct AggregateLimitRaw {
    technology: Technology,
    years: String,
    min: Option<Capacity>,
    max: Option<Capacity>,
}

fn check_bound(value: Option<Capacity>, name: &str, technology: Technology) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value >= Capacity(0.0),
            "{name} capacity limit for {technology} must be a finite, non-negative number"
        );
    }

    Ok(())
}

fn read_aggregate_limits_from_iter<I>(iter: I, years: &[u32]) -> Result<Vec<AggregateLimit>>
where
    I: Iterator<Item = AggregateLimitRaw>,
{
    let mut limits: Vec<AggregateLimit> = Vec::new();
    for record in iter {
        let technology = record.technology;
        ensure!(
            record.min.is_some() || record.max.is_some(),
            "Capacity limit for {technology} must have a min or a max"
        );
        check_bound(record.min, "Minimum", technology)?;
        check_bound(record.max, "Maximum", technology)?;
        if let (Some(min), Some(max)) = (record.min, record.max) {
            ensure!(
                min <= max,
                "Minimum capacity limit for {technology} ({min}) exceeds the maximum ({max})"
            );
        }

        let limit_years = parse_year_str(&record.years, years)?;
        for year in &limit_years {
            ensure!(
                !limits
                    .iter()
                    .any(|limit| limit.technology == technology && limit.years.contains(year)),
                "Multiple capacity limits for {technology} in {year}"
            );
        }

        debug!(
            "Capacity limit for {technology} applies in {}",
            format_years(&limit_years)
        );
        limits.push(AggregateLimit {
            technology,
            years: limit_years,
            min: record.min,
            max: record.max,
        });
    }

    Ok(limits)
}

/// Read aggregate capacity limits per technology, if given.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `years` - The simulated years
pub fn read_aggregate_limits(model_dir: &Path, years: &[u32]) -> Result<Vec<AggregateLimit>> {
    let file_path = model_dir.join(AGGREGATE_LIMITS_FILE_NAME);
    let limits_csv = read_csv_optional(&file_path)?;
    read_aggregate_limits_from_iter(limits_csv, years).with_context(|| input_err_msg(&file_path))
}
