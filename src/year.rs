//! Parsing of year selections in input files.
use crate::input::is_sorted_and_unique;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;

/// Parse a single year, which must be one of `simulated_years`
fn parse_year(s: &str, simulated_years: &[u32]) -> Result<u32> {
    let year = s
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|year| simulated_years.contains(year))
        .with_context(|| format!("Invalid year: {}", s.trim()))?;

    Ok(year)
}

/// Parse a selection of simulated years.
///
/// The selection is `all` (case-insensitive), or a semicolon-separated list in which each entry is
/// either a single year or an inclusive range such as `2025..2028`. Entries must be in order and
/// must not overlap.
pub fn parse_year_str(s: &str, simulated_years: &[u32]) -> Result<Vec<u32>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No years provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(simulated_years.to_vec());
    }

    let mut years = Vec::new();
    for entry in s.split(';') {
        if let Some((first, last)) = entry.split_once("..") {
            let first = parse_year(first, simulated_years)?;
            let last = parse_year(last, simulated_years)?;
            ensure!(first <= last, "Invalid year range: {}", entry.trim());
            years.extend(
                simulated_years
                    .iter()
                    .copied()
                    .filter(|year| (first..=last).contains(year)),
            );
        } else {
            years.push(parse_year(entry, simulated_years)?);
        }
    }

    ensure!(
        is_sorted_and_unique(&years),
        "Years must be in order and unique"
    );

    Ok(years)
}

/// Format years for messages, e.g. `2025, 2026 and 2027`
pub fn format_years(years: &[u32]) -> String {
    match years {
        [] => String::new(),
        [year] => year.to_string(),
        [rest @ .., last] => format!("{} and {last}", rest.iter().join(", ")),
    }
}
