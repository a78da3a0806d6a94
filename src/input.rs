//! # Input Configuration Module
//!
//! Batch job configuration, loaded from JSON or YAML.
//!
//! ## Configuration Structure
//!
//! - **netcdf_dir**: directory scanned for `*.nc` datasets
//! - **csv_dir**: root directory of the CSV artifacts
//! - **city_coords**: named regions as `[nw_lat, nw_lon, se_lat, se_lon]`
//! - **starting_date** / **ending_date**: optional `YYYY-MM-DD` bounds
//! - **datasets**: explicit dataset file names, overriding the directory scan
//! - **variable**: data variable name, overriding discovery
//! - **parquet**: also write a Parquet copy of each artifact
//! - **cities**, **waqi_token**, **output_file**: station lookup settings
//!
//! ## Example Usage
//!
//! ```rust
//! use ncregion::input::JobConfig;
//!
//! let json = r#"
//! {
//!   "netcdf_dir": "data/netcdf",
//!   "csv_dir": "data/csv",
//!   "city_coords": { "london": [52.0, -1.0, 51.0, 0.0] },
//!   "starting_date": "2020-01-01",
//!   "ending_date": "2020-12-31"
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.city_coords.len(), 1);
//! # Ok::<(), ncregion::error::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::resolve::{DateRange, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of a batch run.
///
/// Regions are kept in a [`BTreeMap`] so batch units run in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub netcdf_dir: PathBuf,
    pub csv_dir: PathBuf,
    #[serde(default)]
    pub city_coords: BTreeMap<String, Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_date: Option<String>,
    /// Dataset file names (relative to `netcdf_dir`) or paths.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default)]
    pub parquet: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waqi_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl JobConfig {
    /// Loads a configuration file. `.yaml` and `.yml` files are parsed as
    /// YAML, anything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingSource {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    /// The configured date bounds, parsed.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(self.starting_date.as_deref(), self.ending_date.as_deref())
    }

    /// Checks that the configuration can drive a batch run.
    pub fn validate(&self) -> Result<()> {
        if self.netcdf_dir.as_os_str().is_empty() {
            return Err(Error::Config("netcdf_dir must be set".to_string()));
        }
        if self.csv_dir.as_os_str().is_empty() {
            return Err(Error::Config("csv_dir must be set".to_string()));
        }
        if self.city_coords.is_empty() {
            return Err(Error::Config(
                "city_coords must name at least one region".to_string(),
            ));
        }
        if let Some((name, _)) = self
            .city_coords
            .iter()
            .find(|(_, r)| <[f64; 4]>::from(**r).iter().any(|c| !c.is_finite()))
        {
            return Err(Error::Config(format!(
                "region '{}' has a non-finite coordinate",
                name
            )));
        }
        let range = self.date_range()?;
        if let (Some(start), Some(end)) = (range.start, range.end)
            && start > end
        {
            return Err(Error::Config(format!(
                "starting_date {} is after ending_date {}",
                start, end
            )));
        }
        Ok(())
    }

    /// A filled-in example configuration, used by the `template` command.
    pub fn template() -> Self {
        let mut city_coords = BTreeMap::new();
        city_coords.insert("london".to_string(), Region::new(52.0, -1.0, 51.0, 0.0));
        city_coords.insert("paris".to_string(), Region::new(49.5, 1.5, 48.0, 3.5));
        JobConfig {
            netcdf_dir: PathBuf::from("data/netcdf"),
            csv_dir: PathBuf::from("data/csv"),
            city_coords,
            starting_date: Some("2020-01-01".to_string()),
            ending_date: Some("2020-12-31".to_string()),
            datasets: Vec::new(),
            variable: None,
            parquet: false,
            cities: vec!["London".to_string(), "Paris".to_string()],
            waqi_token: None,
            output_file: Some(PathBuf::from("stations.txt")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json() {
        let config = JobConfig::from_json(
            r#"{"netcdf_dir": "nc", "csv_dir": "csv", "city_coords": {"a": [1.0, 2.0, 0.0, 3.0]}}"#,
        )
        .unwrap();
        assert_eq!(config.netcdf_dir, PathBuf::from("nc"));
        assert_eq!(config.city_coords["a"], Region::new(1.0, 2.0, 0.0, 3.0));
        assert!(!config.parquet);
        assert_eq!(config.date_range().unwrap(), DateRange::unbounded());
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_with_dates() {
        let yaml = "
netcdf_dir: nc
csv_dir: out
city_coords:
  london: [52.0, -1.0, 51.0, 0.0]
starting_date: '2021-03-01'
ending_date: '2021-03-31'
parquet: true
";
        let config = JobConfig::from_yaml(yaml).unwrap();
        assert!(config.parquet);
        let range = config.date_range().unwrap();
        assert_eq!(range.start.unwrap().to_string(), "2021-03-01");
        assert_eq!(range.end.unwrap().to_string(), "2021-03-31");
    }

    #[test]
    fn test_region_needs_four_values() {
        let result = JobConfig::from_json(
            r#"{"netcdf_dir": "nc", "csv_dir": "csv", "city_coords": {"a": [1.0, 2.0, 3.0]}}"#,
        );
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_validate_rejects_reversed_dates() {
        let mut config = JobConfig::template();
        config.starting_date = Some("2021-01-02".to_string());
        config.ending_date = Some("2021-01-01".to_string());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_missing_regions() {
        let mut config = JobConfig::template();
        config.city_coords.clear();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_date() {
        let mut config = JobConfig::template();
        config.ending_date = Some("2021-13-01".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_template_round_trips_through_yaml() {
        let template = JobConfig::template();
        let yaml = serde_yaml::to_string(&template).unwrap();
        assert_eq!(JobConfig::from_yaml(&yaml).unwrap(), template);
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.yml");
        fs::write(&path, serde_yaml::to_string(&JobConfig::template()).unwrap()).unwrap();
        assert_eq!(JobConfig::from_file(&path).unwrap(), JobConfig::template());

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            JobConfig::from_file(&missing),
            Err(Error::MissingSource { .. })
        ));
    }
}
