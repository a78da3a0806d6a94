//! # ncregion
//!
//! A Rust library for extracting rectangular regional subsets from gridded
//! NetCDF time series into CSV tables, and for verifying those tables against
//! their source grid.
//!
//! ## Features
//!
//! - **Nearest-point resolution**: region corners and dates snap to grid indices, with bounds checks
//! - **Calendar-aware time decoding**: `standard`, `proleptic_gregorian`, `noleap`, `all_leap` and `360_day`
//! - **Deterministic tables**: one row per date, one `"lat, lon"` column per grid cell
//! - **Round-trip verification**: every differing cell is reported, not just the first
//! - **Batch runs**: every dataset x region pair of a configuration file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncregion::{extract, verify, write_extraction_csv, DateRange, NetcdfGrid, Region};
//!
//! let grid = NetcdfGrid::open("pm25_cams_v3.nc")?;
//! let region = Region::new(52.0, -1.0, 51.0, 0.0);
//! let range = DateRange::parse(Some("2020-01-01"), Some("2020-12-31"))?;
//!
//! let extraction = extract(&grid, &region, &range)?;
//! write_extraction_csv(&extraction, "out/pm25_london_v3.csv")?;
//!
//! let result = verify(&grid, "out/pm25_london_v3.csv", &region, &range)?;
//! assert!(result.is_pass());
//! # Ok::<(), ncregion::Error>(())
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "netcdf_dir": "data/netcdf",
//!   "csv_dir": "data/csv",
//!   "city_coords": {
//!     "london": [52.0, -1.0, 51.0, 0.0]
//!   },
//!   "starting_date": "2020-01-01",
//!   "ending_date": "2020-12-31"
//! }
//! ```

pub mod batch;
pub mod cli;
pub mod error;
pub mod extract;
pub mod grid;
pub mod info;
pub mod input;
pub mod log;
pub mod output;
pub mod resolve;
pub mod stations;
pub mod time;
pub mod verify;

#[cfg(test)]
mod cli_tests;

pub use error::{Error, Result};
pub use extract::{Extraction, extract, probe};
pub use grid::{GridSource, MemoryGrid, NetcdfGrid};
pub use output::{read_artifact, write_extraction_csv};
pub use resolve::{DateRange, IndexWindow, Region};
pub use verify::{VerificationResult, verify};
