//! # Batch Orchestration
//!
//! Fans the extractor and the verifier out over every (dataset, region) pair
//! named by a [`JobConfig`].
//!
//! Dataset identity comes from the file name: for `pm25_reanalysis_v2.nc` the
//! variable is `pm25` (token before the first `_`) and the version is `v2`
//! (token after the last `_`). Artifacts land in
//! `<csv_dir>/<variable>/<variable>_<region>_<version>.csv`.
//!
//! A unit that fails is recorded in the [`BatchReport`] and the batch moves on.

use crate::error::{Error, Result};
use crate::extract::extract;
use crate::grid::NetcdfGrid;
use crate::input::JobConfig;
use crate::output::{convert_csv_to_parquet, parquet_path_for, write_extraction_csv};
use crate::resolve::{DateRange, Region};
use crate::verify::{VerificationResult, verify};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Variable and version tokens parsed from a dataset file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetIdentity {
    pub variable: String,
    pub version: String,
}

impl DatasetIdentity {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Config(format!("cannot derive a dataset name from {}", path.display()))
            })?;
        let variable = stem.split('_').next().unwrap_or(stem);
        let version = stem.rsplit('_').next().unwrap_or(stem);
        Ok(DatasetIdentity {
            variable: variable.to_string(),
            version: version.to_string(),
        })
    }
}

/// Location of the artifact for one unit of work.
pub fn artifact_path(csv_dir: &Path, identity: &DatasetIdentity, region: &str) -> PathBuf {
    csv_dir.join(&identity.variable).join(format!(
        "{}_{}_{}.csv",
        identity.variable, region, identity.version
    ))
}

/// Datasets named by the configuration: the explicit `datasets` list when
/// present (relative entries resolved against `netcdf_dir`), otherwise every
/// `*.nc` file in `netcdf_dir`, sorted by name.
pub fn discover_datasets(config: &JobConfig) -> Result<Vec<PathBuf>> {
    if !config.datasets.is_empty() {
        return Ok(config
            .datasets
            .iter()
            .map(|d| {
                let p = PathBuf::from(d);
                if p.is_absolute() {
                    p
                } else {
                    config.netcdf_dir.join(p)
                }
            })
            .collect());
    }

    if !config.netcdf_dir.is_dir() {
        return Err(Error::MissingSource {
            path: config.netcdf_dir.clone(),
        });
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(&config.netcdf_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "nc") {
            found.push(path);
        }
    }
    found.sort();
    debug!(
        "Found {} datasets in {}",
        found.len(),
        config.netcdf_dir.display()
    );
    Ok(found)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    Written {
        rows: usize,
        columns: usize,
        parquet: Option<PathBuf>,
    },
    Verified {
        rows: usize,
        columns: usize,
    },
    Mismatch {
        result: VerificationResult,
    },
    /// The dataset (or, when verifying, the artifact) does not exist.
    Skipped {
        missing: PathBuf,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub dataset: PathBuf,
    pub region: String,
    pub artifact: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

/// Collected outcomes of a batch pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub units: Vec<UnitReport>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Written { .. } | UnitOutcome::Verified { .. }))
    }

    pub fn mismatched(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Mismatch { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed { .. }))
    }

    /// True when any unit failed or did not verify.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.mismatched() > 0
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.units.extend(other.units);
    }

    pub fn print_summary(&self) {
        println!("\nBatch Summary:");
        println!("  Units: {}", self.units.len());
        println!("  Succeeded: {}", self.succeeded());
        println!("  Mismatched: {}", self.mismatched());
        println!("  Skipped: {}", self.skipped());
        println!("  Failed: {}", self.failed());
        for unit in &self.units {
            match &unit.outcome {
                UnitOutcome::Mismatch { result } => {
                    println!("    {} [{}]: {}", unit.dataset.display(), unit.region, result)
                }
                UnitOutcome::Failed { error } => {
                    println!("    {} [{}]: {}", unit.dataset.display(), unit.region, error)
                }
                UnitOutcome::Skipped { missing } => println!(
                    "    {} [{}]: missing {}",
                    unit.dataset.display(),
                    unit.region,
                    missing.display()
                ),
                _ => {}
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub show_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Extract,
    Verify,
}

impl Pass {
    fn label(&self) -> &'static str {
        match self {
            Pass::Extract => "extracting",
            Pass::Verify => "verifying",
        }
    }
}

/// Runs extractor and serializer over every unit of work.
pub fn run_extraction(config: &JobConfig, options: BatchOptions) -> Result<BatchReport> {
    run_pass(config, options, Pass::Extract)
}

/// Runs the verifier over every unit of work.
pub fn run_verification(config: &JobConfig, options: BatchOptions) -> Result<BatchReport> {
    run_pass(config, options, Pass::Verify)
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}

fn run_pass(config: &JobConfig, options: BatchOptions, pass: Pass) -> Result<BatchReport> {
    let range = config.date_range()?;
    let datasets = discover_datasets(config)?;
    let total = datasets.len() * config.city_coords.len();
    info!(
        "{} {} units ({} datasets x {} regions)",
        pass.label(),
        total,
        datasets.len(),
        config.city_coords.len()
    );

    let pb = progress_bar(total, options.show_progress);
    let mut report = BatchReport::default();

    for dataset in &datasets {
        let identity = DatasetIdentity::from_path(dataset);
        for (region_name, region) in &config.city_coords {
            pb.set_message(format!("{} {}", region_name, dataset.display()));
            let unit = match &identity {
                Ok(identity) => {
                    let artifact = artifact_path(&config.csv_dir, identity, region_name);
                    let outcome = run_unit(config, dataset, &artifact, region, &range, pass);
                    UnitReport {
                        dataset: dataset.clone(),
                        region: region_name.clone(),
                        artifact: Some(artifact),
                        outcome,
                    }
                }
                Err(e) => UnitReport {
                    dataset: dataset.clone(),
                    region: region_name.clone(),
                    artifact: None,
                    outcome: UnitOutcome::Failed {
                        error: e.to_string(),
                    },
                },
            };
            log_unit(&unit);
            report.units.push(unit);
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    Ok(report)
}

fn run_unit(
    config: &JobConfig,
    dataset: &Path,
    artifact: &Path,
    region: &Region,
    range: &DateRange,
    pass: Pass,
) -> UnitOutcome {
    if !dataset.exists() {
        return UnitOutcome::Skipped {
            missing: dataset.to_path_buf(),
        };
    }
    if pass == Pass::Verify && !artifact.exists() {
        return UnitOutcome::Skipped {
            missing: artifact.to_path_buf(),
        };
    }

    let result = match pass {
        Pass::Extract => extract_unit(config, dataset, artifact, region, range),
        Pass::Verify => verify_unit(config, dataset, artifact, region, range),
    };
    match result {
        Ok(outcome) => outcome,
        Err(Error::MissingSource { path }) => UnitOutcome::Skipped { missing: path },
        Err(e) => UnitOutcome::Failed {
            error: e.to_string(),
        },
    }
}

fn extract_unit(
    config: &JobConfig,
    dataset: &Path,
    artifact: &Path,
    region: &Region,
    range: &DateRange,
) -> Result<UnitOutcome> {
    let grid = NetcdfGrid::open_with_variable(dataset, config.variable.as_deref())?;
    let extraction = extract(&grid, region, range)?;
    write_extraction_csv(&extraction, artifact)?;
    grid.close()?;

    let parquet = if config.parquet {
        let target = parquet_path_for(artifact);
        convert_csv_to_parquet(artifact, &target)?;
        Some(target)
    } else {
        None
    };

    Ok(UnitOutcome::Written {
        rows: extraction.row_count(),
        columns: extraction.column_count(),
        parquet,
    })
}

fn verify_unit(
    config: &JobConfig,
    dataset: &Path,
    artifact: &Path,
    region: &Region,
    range: &DateRange,
) -> Result<UnitOutcome> {
    let grid = NetcdfGrid::open_with_variable(dataset, config.variable.as_deref())?;
    let result = verify(&grid, artifact, region, range)?;
    grid.close()?;
    Ok(match result {
        VerificationResult::Pass { rows, columns } => UnitOutcome::Verified { rows, columns },
        other => UnitOutcome::Mismatch { result: other },
    })
}

fn log_unit(unit: &UnitReport) {
    let target = unit
        .artifact
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match &unit.outcome {
        UnitOutcome::Written { rows, columns, .. } => {
            info!("Wrote {} ({} rows, {} columns)", target, rows, columns)
        }
        UnitOutcome::Verified { rows, columns } => {
            info!("Verified {} ({} rows, {} columns)", target, rows, columns)
        }
        UnitOutcome::Mismatch { result } => warn!("Verification failed for {}: {}", target, result),
        UnitOutcome::Skipped { missing } => warn!(
            "Skipping {} [{}]: {} not found",
            unit.dataset.display(),
            unit.region,
            missing.display()
        ),
        UnitOutcome::Failed { error: e } => {
            error!("Failed {} [{}]: {}", unit.dataset.display(), unit.region, e)
        }
    }
}
