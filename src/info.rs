//! # Grid Information Module
//!
//! Summarizes a dataset the way the extractor sees it: coordinate axes, the
//! detected data variable and the decoded date coverage.

use crate::error::Result;
use crate::grid::{GridSource, NetcdfGrid};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary of one numeric coordinate axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisInfo {
    pub length: usize,
    pub first: f64,
    pub last: f64,
    pub min: f64,
    pub max: f64,
}

impl AxisInfo {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let last = *values.last()?;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some(AxisInfo {
            length: values.len(),
            first,
            last,
            min,
            max,
        })
    }
}

/// Everything `info` reports about a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    pub path: String,
    pub variable: String,
    /// `[time, latitude, longitude]`.
    pub shape: [usize; 3],
    pub latitude: Option<AxisInfo>,
    pub longitude: Option<AxisInfo>,
    pub time_units: String,
    pub calendar: String,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub file_size: Option<u64>,
}

/// Builds the summary for any grid source.
pub fn describe<G: GridSource + ?Sized>(grid: &G, path: &str) -> Result<GridInfo> {
    let axes = grid.axes();
    let dates = axes.time.decode_all()?;
    Ok(GridInfo {
        path: path.to_string(),
        variable: grid.variable_name().to_string(),
        shape: axes.shape(),
        latitude: AxisInfo::from_values(&axes.latitude),
        longitude: AxisInfo::from_values(&axes.longitude),
        time_units: axes.time.units_label().to_string(),
        calendar: axes.time.calendar().to_string(),
        first_date: dates.first().map(|d| d.to_string()),
        last_date: dates.last().map(|d| d.to_string()),
        file_size: None,
    })
}

/// Opens a NetCDF dataset and summarizes it.
pub fn inspect<P: AsRef<Path>>(path: P, variable: Option<&str>) -> Result<GridInfo> {
    let path = path.as_ref();
    let grid = NetcdfGrid::open_with_variable(path, variable)?;
    let mut info = describe(&grid, &path.display().to_string())?;
    info.file_size = std::fs::metadata(path).ok().map(|m| m.len());
    debug!("Inspected {}: {:?}", path.display(), info.shape);
    grid.close()?;
    Ok(info)
}

fn print_axis(name: &str, axis: &Option<AxisInfo>) {
    match axis {
        Some(a) => println!(
            "    {} ({}): {} .. {} (range [{}, {}])",
            name, a.length, a.first, a.last, a.min, a.max
        ),
        None => println!("    {} (0)", name),
    }
}

/// Prints the summary in human-readable format.
pub fn print_grid_info_human(info: &GridInfo) {
    println!("Dataset Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!(
        "  Variable: {} [time={}, latitude={}, longitude={}]",
        info.variable, info.shape[0], info.shape[1], info.shape[2]
    );
    println!("  Axes:");
    print_axis("latitude", &info.latitude);
    print_axis("longitude", &info.longitude);
    println!("    time: {} ({})", info.time_units, info.calendar);
    match (&info.first_date, &info.last_date) {
        (Some(first), Some(last)) => println!("  Dates: {} to {}", first, last),
        _ => println!("  Dates: none"),
    }
}

pub fn print_grid_info_json(info: &GridInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

pub fn print_grid_info_yaml(info: &GridInfo) -> Result<()> {
    println!("{}", serde_yaml::to_string(info)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_info_descending() {
        let info = AxisInfo::from_values(&[52.0, 51.5, 51.0]).unwrap();
        assert_eq!(info.length, 3);
        assert_eq!(info.first, 52.0);
        assert_eq!(info.last, 51.0);
        assert_eq!(info.min, 51.0);
        assert_eq!(info.max, 52.0);
        assert!(AxisInfo::from_values(&[]).is_none());
    }
}
