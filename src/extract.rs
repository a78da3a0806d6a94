//! # Regional Extraction
//!
//! Applies an [`IndexWindow`] to a grid and produces an [`Extraction`]: one row
//! per date, one column per (latitude, longitude) cell.
//!
//! ## Key Components
//!
//! - [`extract`]: resolves the window and pulls the data block plus date labels
//! - [`generate_headers`]: column labels from the resolved coordinate values
//! - [`probe`]: single-cell lookup at an exact date

use crate::error::{Error, Result};
use crate::grid::{GridSource, LATITUDE, LONGITUDE};
use crate::resolve::{DateRange, IndexWindow, Region, nearest_index, resolve_window};
use crate::time::CalendarDate;
use log::debug;
use serde::Serialize;

/// Label of the first column of every artifact.
pub const DATE_HEADER: &str = "Date";

/// Tabular subset of a grid.
///
/// `headers` starts with [`DATE_HEADER`]; every entry of `rows` holds
/// `headers.len() - 1` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub variable: String,
    pub window: IndexWindow,
    pub headers: Vec<String>,
    pub dates: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Extraction {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len().saturating_sub(1)
    }
}

/// Generates the header row for a window: `Date`, then one
/// `"{lat:.1}, {lon:.1}"` label per cell, latitude outer and longitude inner.
pub fn generate_headers(latitudes: &[f64], longitudes: &[f64]) -> Vec<String> {
    let mut headers = Vec::with_capacity(1 + latitudes.len() * longitudes.len());
    headers.push(DATE_HEADER.to_string());
    for lat in latitudes {
        for lon in longitudes {
            headers.push(format!("{:.1}, {:.1}", lat, lon));
        }
    }
    headers
}

/// Reads the data block and date labels covered by `window`.
///
/// Data and dates are taken over the same time range, so their row counts are
/// equal by construction.
pub fn extract_window<G: GridSource + ?Sized>(grid: &G, window: IndexWindow) -> Result<Extraction> {
    let axes = grid.axes();
    let time = window.time.bounds(axes.time.len());
    let variable = grid.variable_name().to_string();

    if time.is_empty() {
        return Err(Error::EmptyResult { variable });
    }

    let headers = generate_headers(
        &axes.latitude[window.lat.clone()],
        &axes.longitude[window.lon.clone()],
    );
    let dates: Vec<String> = axes
        .time
        .decode_range(time.clone())?
        .iter()
        .map(|d| d.to_string())
        .collect();

    let width = window.lat.len() * window.lon.len();
    if width == 0 {
        return Err(Error::ShapeMismatch(format!(
            "window has no spatial cells (lat {:?}, lon {:?})",
            window.lat, window.lon
        )));
    }
    let block = grid.read_block(time.clone(), window.lat.clone(), window.lon.clone())?;
    let rows: Vec<Vec<f64>> = block.chunks(width).map(|row| row.to_vec()).collect();
    debug_assert_eq!(rows.len(), dates.len());

    debug!(
        "Extracted {} rows x {} columns of '{}' (time {:?}, lat {:?}, lon {:?})",
        rows.len(),
        width,
        variable,
        time,
        window.lat,
        window.lon
    );

    if rows.is_empty() {
        return Err(Error::EmptyResult { variable });
    }

    Ok(Extraction {
        variable,
        window,
        headers,
        dates,
        rows,
    })
}

/// Extracts the subset of `grid` covered by `region` and `range`.
///
/// # Errors
///
/// - [`Error::OutOfBounds`] when a corner or date falls outside the grid
/// - [`Error::EmptyResult`] when the window holds no rows
pub fn extract<G: GridSource + ?Sized>(
    grid: &G,
    region: &Region,
    range: &DateRange,
) -> Result<Extraction> {
    let window = resolve_window(grid.axes(), region, range)?;
    extract_window(grid, window)
}

/// A single value looked up by date and coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeValue {
    pub variable: String,
    pub date: String,
    pub time_index: usize,
    pub lat_index: usize,
    pub lon_index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
}

/// Reads the value at `date` (which must be present on the time axis) in the
/// grid cell nearest to (`lat`, `lon`).
pub fn probe<G: GridSource + ?Sized>(
    grid: &G,
    date: CalendarDate,
    lat: f64,
    lon: f64,
) -> Result<ProbeValue> {
    let axes = grid.axes();
    let time_index = axes
        .time
        .decode_all()?
        .iter()
        .position(|d| *d == date)
        .ok_or_else(|| Error::DateNotFound(date.to_string()))?;
    let lat_index = nearest_index(&axes.latitude, lat, LATITUDE)?;
    let lon_index = nearest_index(&axes.longitude, lon, LONGITUDE)?;

    let block = grid.read_block(
        time_index..time_index + 1,
        lat_index..lat_index + 1,
        lon_index..lon_index + 1,
    )?;
    let value = block
        .first()
        .copied()
        .ok_or_else(|| Error::ShapeMismatch("empty single-cell read".to_string()))?;

    Ok(ProbeValue {
        variable: grid.variable_name().to_string(),
        date: date.to_string(),
        time_index,
        lat_index,
        lon_index,
        latitude: axes.latitude[lat_index],
        longitude: axes.longitude[lon_index],
        value,
    })
}
