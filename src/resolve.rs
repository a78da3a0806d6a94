//! # Index Resolution
//!
//! Turns caller-facing coordinates and dates into integer index windows over a
//! grid. Both the extractor and the verifier call [`resolve_window`]; neither
//! keeps the other's result.

use crate::error::{Error, Result};
use crate::grid::{GridAxes, LATITUDE, LONGITUDE, TIME};
use crate::time::{CalendarDate, TimeAxis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Bounding box given by two corners. The corners are not required to be
/// geographically ordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Region {
    pub nw_lat: f64,
    pub nw_lon: f64,
    pub se_lat: f64,
    pub se_lon: f64,
}

impl Region {
    pub fn new(nw_lat: f64, nw_lon: f64, se_lat: f64, se_lon: f64) -> Self {
        Region {
            nw_lat,
            nw_lon,
            se_lat,
            se_lon,
        }
    }

    /// The same box with its corners exchanged.
    pub fn swapped(&self) -> Self {
        Region::new(self.se_lat, self.se_lon, self.nw_lat, self.nw_lon)
    }
}

impl From<[f64; 4]> for Region {
    fn from(c: [f64; 4]) -> Self {
        Region::new(c[0], c[1], c[2], c[3])
    }
}

impl From<Region> for [f64; 4] {
    fn from(r: Region) -> Self {
        [r.nw_lat, r.nw_lon, r.se_lat, r.se_lon]
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NW({}, {}) SE({}, {})",
            self.nw_lat, self.nw_lon, self.se_lat, self.se_lon
        )
    }
}

/// Optional inclusive date bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<CalendarDate>,
    pub end: Option<CalendarDate>,
}

impl DateRange {
    pub fn new(start: Option<CalendarDate>, end: Option<CalendarDate>) -> Self {
        DateRange { start, end }
    }

    /// Parses optional `YYYY-MM-DD` strings.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Ok(DateRange {
            start: start.map(CalendarDate::parse_iso).transpose()?,
            end: end.map(CalendarDate::parse_iso).transpose()?,
        })
    }

    pub fn unbounded() -> Self {
        DateRange::default()
    }
}

/// Time window: inclusive start, exclusive end, `None` meaning "through the
/// last index".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: usize,
    pub end: Option<usize>,
}

impl TimeWindow {
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let end = self.end.unwrap_or(len).min(len);
        self.start.min(end)..end
    }
}

/// Resolved index ranges over the spatial axes and the time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWindow {
    pub lat: Range<usize>,
    pub lon: Range<usize>,
    pub time: TimeWindow,
}

/// Index of the axis value closest to `target`.
///
/// Fails with [`Error::OutOfBounds`] when `target` lies outside the axis range.
/// Ties resolve to the lowest index.
pub fn nearest_index(axis: &[f64], target: f64, axis_name: &str) -> Result<usize> {
    if axis.is_empty() {
        return Err(Error::EmptyAxis(axis_name.to_string()));
    }
    let min = axis.iter().copied().fold(f64::INFINITY, f64::min);
    let max = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(min..=max).contains(&target) {
        return Err(Error::out_of_bounds(axis_name, target, min, max));
    }

    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    Ok(best)
}

/// Resolves the corners of `region` to half-open latitude and longitude
/// ranges that include both corner indices.
pub fn resolve_spatial_window(
    axes: &GridAxes,
    region: &Region,
) -> Result<(Range<usize>, Range<usize>)> {
    let nw_lat = nearest_index(&axes.latitude, region.nw_lat, LATITUDE)?;
    let nw_lon = nearest_index(&axes.longitude, region.nw_lon, LONGITUDE)?;
    let se_lat = nearest_index(&axes.latitude, region.se_lat, LATITUDE)?;
    let se_lon = nearest_index(&axes.longitude, region.se_lon, LONGITUDE)?;

    let lat = nw_lat.min(se_lat)..nw_lat.max(se_lat) + 1;
    let lon = nw_lon.min(se_lon)..nw_lon.max(se_lon) + 1;
    Ok((lat, lon))
}

/// Resolves optional date bounds against the decoded time axis.
pub fn resolve_date_range(time: &TimeAxis, range: &DateRange) -> Result<TimeWindow> {
    if range.start.is_none() && range.end.is_none() {
        return Ok(TimeWindow {
            start: 0,
            end: None,
        });
    }

    let dates = time.decode_all()?;
    let (first, last) = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Error::EmptyAxis(TIME.to_string())),
    };
    let check = |date: CalendarDate| {
        if date < first || date > last {
            Err(Error::out_of_bounds(TIME, date, first, last))
        } else {
            Ok(date)
        }
    };

    let start = match range.start {
        Some(start) => {
            let start = check(start)?;
            dates.iter().position(|d| *d >= start).unwrap_or(dates.len())
        }
        None => 0,
    };
    let end = match range.end {
        Some(end) => {
            let end = check(end)?;
            dates.iter().position(|d| *d > end)
        }
        None => None,
    };

    Ok(TimeWindow { start, end })
}

/// Resolves the complete index window for a region and date range.
pub fn resolve_window(axes: &GridAxes, region: &Region, range: &DateRange) -> Result<IndexWindow> {
    let (lat, lon) = resolve_spatial_window(axes, region)?;
    let time = resolve_date_range(&axes.time, range)?;
    Ok(IndexWindow { lat, lon, time })
}
