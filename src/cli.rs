//! # CLI Module
//!
//! Command-line interface for ncregion:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML) with `NCREGION_` environment variables
//! - Command-line values take priority over the configuration file
//! - Subcommands for extraction, verification, batch runs and the utilities

use crate::error::Error;
use crate::input::JobConfig;
use crate::resolve::{DateRange, Region};
use crate::stations::WAQI_BASE_URL;
use crate::time::CalendarDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Regional subset extraction and verification for gridded NetCDF time series
#[derive(Parser, Debug)]
#[command(name = "ncregion")]
#[command(about = "Extract regional time series from NetCDF grids to CSV and verify them")]
#[command(version)]
#[command(long_about = "
ncregion cuts rectangular regions out of latitude x longitude x time NetCDF
grids, writes them as CSV tables (one row per date, one column per grid cell)
and re-derives the same subsets to verify the written tables.

EXAMPLES:
  # Extract one region
  ncregion extract pm25_cams_v3.nc out.csv --region 52.0,-1.0,51.0,0.0 \\
    --start 2020-01-01 --end 2020-12-31

  # Verify it
  ncregion verify pm25_cams_v3.nc out.csv --region 52.0,-1.0,51.0,0.0 \\
    --start 2020-01-01 --end 2020-12-31

  # Every dataset x region from a config file, then verify
  ncregion batch --config regions.yaml

  # Inspect a dataset
  ncregion info pm25_cams_v3.nc --format json

  # Generate a config template
  ncregion template --format yaml > regions.yaml
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NCREGION_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract a region of a dataset to CSV
    #[command(long_about = "
Extract the cells of a dataset that fall inside a bounding box, over an
optional date range, into a CSV table.

The region is given as 'nw_lat,nw_lon,se_lat,se_lon'. Each corner is snapped to
the nearest grid point; corners outside the grid are an error.

EXAMPLES:
  ncregion extract data.nc out.csv --region 52.0,-1.0,51.0,0.0
  ncregion extract data.nc out.csv --region 52.0,-1.0,51.0,0.0 \\
    --start 2020-01-01 --end 2020-01-31 --parquet
")]
    Extract {
        /// Input NetCDF file
        input: PathBuf,

        /// Output CSV file
        output: PathBuf,

        /// Bounding box: nw_lat,nw_lon,se_lat,se_lon
        #[arg(short, long, value_parser = parse_region, allow_hyphen_values = true)]
        region: Region,

        /// First date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date, env = "NCREGION_START")]
        start: Option<CalendarDate>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date, env = "NCREGION_END")]
        end: Option<CalendarDate>,

        /// Data variable name (discovered when omitted)
        #[arg(short = 'n', long, env = "NCREGION_VARIABLE")]
        variable: Option<String>,

        /// Also write a Parquet copy next to the CSV
        #[arg(long)]
        parquet: bool,
    },

    /// Verify a CSV table against its dataset
    #[command(long_about = "
Re-extract a region from its dataset and compare it with a CSV table written
earlier: dates first, then the column layout, then every value within 1e-6.

Exits with a non-zero status when the table does not match.

EXAMPLES:
  ncregion verify data.nc out.csv --region 52.0,-1.0,51.0,0.0
")]
    Verify {
        /// Input NetCDF file
        input: PathBuf,

        /// CSV table to check
        artifact: PathBuf,

        /// Bounding box: nw_lat,nw_lon,se_lat,se_lon
        #[arg(short, long, value_parser = parse_region, allow_hyphen_values = true)]
        region: Region,

        /// First date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date, env = "NCREGION_START")]
        start: Option<CalendarDate>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date, env = "NCREGION_END")]
        end: Option<CalendarDate>,

        /// Data variable name (discovered when omitted)
        #[arg(short = 'n', long, env = "NCREGION_VARIABLE")]
        variable: Option<String>,
    },

    /// Extract and verify every dataset x region named in the config
    #[command(long_about = "
Run the extractor over every (dataset, region) pair of a configuration file,
then verify every written table.

Artifacts are written to <csv_dir>/<variable>/<variable>_<region>_<version>.csv,
where variable and version come from the dataset file name.

EXAMPLES:
  ncregion batch --config regions.json
  ncregion batch --config regions.yaml --verify-only
  ncregion batch --config regions.yaml --csv-dir /tmp/out --skip-verify
")]
    Batch {
        /// Override the dataset directory from the config
        #[arg(long, env = "NCREGION_NETCDF_DIR")]
        netcdf_dir: Option<PathBuf>,

        /// Override the CSV directory from the config
        #[arg(long, env = "NCREGION_CSV_DIR")]
        csv_dir: Option<PathBuf>,

        /// Only extract, skip the verification pass
        #[arg(long, conflicts_with = "verify_only")]
        skip_verify: bool,

        /// Only verify existing tables
        #[arg(long)]
        verify_only: bool,

        /// Also write Parquet copies of every table
        #[arg(long)]
        parquet: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate (defaults to --config)
        config_file: Option<PathBuf>,
    },

    /// Show the axes, variable and date coverage of a dataset
    Info {
        /// NetCDF file path
        file: PathBuf,

        /// Data variable name (discovered when omitted)
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Read the value at one date in the grid cell nearest to a point
    Probe {
        /// NetCDF file path
        file: PathBuf,

        /// Date to read (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: CalendarDate,

        /// Latitude of the point
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the point
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Data variable name (discovered when omitted)
        #[arg(short = 'n', long, env = "NCREGION_VARIABLE")]
        variable: Option<String>,
    },

    /// Convert CSV tables to Parquet
    Convert {
        /// CSV file, or a directory converted recursively
        input: PathBuf,

        /// Output Parquet file (single-file input only)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up air-quality stations for cities through the WAQI API
    Stations {
        /// City to look up (repeatable; defaults to the config's cities)
        #[arg(long = "city")]
        cities: Vec<String>,

        /// WAQI API token
        #[arg(long, env = "NCREGION_WAQI_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Report file (default: the config's output_file, else stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API base URL
        #[arg(long, default_value = WAQI_BASE_URL)]
        base_url: String,
    },

    /// Generate a configuration template
    Template {
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Parse a bounding box from the command line.
/// Format: nw_lat,nw_lon,se_lat,se_lon
pub fn parse_region(s: &str) -> Result<Region, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err("Region must be in format 'nw_lat,nw_lon,se_lat,se_lon'".to_string());
    }
    let mut corners = [0.0; 4];
    for (slot, part) in corners.iter_mut().zip(&parts) {
        let value = part
            .parse::<f64>()
            .map_err(|_| format!("Invalid coordinate '{}' in region", part))?;
        if !value.is_finite() {
            return Err(format!("Coordinate '{}' must be finite", part));
        }
        *slot = value;
    }
    Ok(Region::from(corners))
}

/// Parse a `YYYY-MM-DD` date from the command line.
pub fn parse_date(s: &str) -> Result<CalendarDate, String> {
    CalendarDate::parse_iso(s).map_err(|e| e.to_string())
}

/// Combines command-line dates with the configuration's. A date given on the
/// command line wins over the configured one.
pub fn merge_date_range(
    start: Option<CalendarDate>,
    end: Option<CalendarDate>,
    config: Option<&JobConfig>,
) -> Result<DateRange, Error> {
    let configured = match config {
        Some(config) => config.date_range()?,
        None => DateRange::unbounded(),
    };
    Ok(DateRange::new(
        start.or(configured.start),
        end.or(configured.end),
    ))
}

/// Applies `batch` command overrides on top of a loaded configuration.
pub fn apply_batch_overrides(
    mut config: JobConfig,
    netcdf_dir: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    parquet: bool,
) -> JobConfig {
    if let Some(dir) = netcdf_dir {
        config.netcdf_dir = dir;
    }
    if let Some(dir) = csv_dir {
        config.csv_dir = dir;
    }
    config.parquet |= parquet;
    config
}

/// Renders the configuration template in the requested format.
pub fn render_template(format: ConfigFormat) -> Result<String, Error> {
    let template = JobConfig::template();
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&template)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&template)?,
    })
}
