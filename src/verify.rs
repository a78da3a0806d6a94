//! # Round-trip Verification
//!
//! Re-derives an extraction from the grid and compares it with a CSV artifact
//! written earlier. Nothing from the extraction run is reused: the window is
//! resolved again from the region and date range.
//!
//! Checks run in order and the first structural failure short-circuits:
//!
//! 1. date labels, position by position
//! 2. column count and header labels
//! 3. every cell, within [`VALUE_TOLERANCE`]

use crate::error::Result;
use crate::extract::{Extraction, extract};
use crate::grid::GridSource;
use crate::output::{TabularArtifact, read_artifact};
use crate::resolve::{DateRange, Region};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Largest absolute difference accepted between an artifact value and the
/// grid value it was written from.
pub const VALUE_TOLERANCE: f64 = 1e-6;

/// A single cell that differs between artifact and grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellMismatch {
    pub row: usize,
    /// Value column index, `Date` excluded.
    pub column: usize,
    pub date: String,
    pub header: String,
    pub artifact: f64,
    pub grid: f64,
}

/// Outcome of comparing an artifact against its grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    Pass {
        rows: usize,
        columns: usize,
    },
    /// First position where the date sequences diverge. `None` marks a
    /// position that one side does not have.
    DateMismatch {
        row: usize,
        artifact: Option<String>,
        grid: Option<String>,
    },
    /// Column layout disagrees.
    ColumnMismatch {
        artifact: Vec<String>,
        grid: Vec<String>,
    },
    ValueMismatch {
        mismatches: Vec<CellMismatch>,
    },
}

impl VerificationResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, VerificationResult::Pass { .. })
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Pass { rows, columns } => {
                write!(f, "pass ({} rows, {} columns)", rows, columns)
            }
            VerificationResult::DateMismatch {
                row,
                artifact,
                grid,
            } => write!(
                f,
                "date mismatch at row {}: artifact {} vs grid {}",
                row,
                artifact.as_deref().unwrap_or("<missing>"),
                grid.as_deref().unwrap_or("<missing>")
            ),
            VerificationResult::ColumnMismatch { artifact, grid } => write!(
                f,
                "column mismatch: artifact has {} columns, grid has {}",
                artifact.len(),
                grid.len()
            ),
            VerificationResult::ValueMismatch { mismatches } => {
                write!(f, "{} value mismatch(es)", mismatches.len())
            }
        }
    }
}

fn values_match(artifact: f64, grid: f64) -> bool {
    if artifact.is_nan() || grid.is_nan() {
        return artifact.is_nan() && grid.is_nan();
    }
    (artifact - grid).abs() <= VALUE_TOLERANCE
}

/// Compares a loaded artifact against a freshly derived extraction.
pub fn compare(artifact: &TabularArtifact, expected: &Extraction) -> VerificationResult {
    let date_count = artifact.dates.len().max(expected.dates.len());
    for row in 0..date_count {
        let (a, g) = (artifact.dates.get(row), expected.dates.get(row));
        if a != g {
            return VerificationResult::DateMismatch {
                row,
                artifact: a.cloned(),
                grid: g.cloned(),
            };
        }
    }

    if artifact.headers != expected.headers {
        return VerificationResult::ColumnMismatch {
            artifact: artifact.headers.clone(),
            grid: expected.headers.clone(),
        };
    }

    let mut mismatches = Vec::new();
    for (row, (a_row, g_row)) in artifact.rows.iter().zip(&expected.rows).enumerate() {
        for (column, (&a, &g)) in a_row.iter().zip(g_row).enumerate() {
            if !values_match(a, g) {
                mismatches.push(CellMismatch {
                    row,
                    column,
                    date: expected.dates[row].clone(),
                    header: expected.headers[column + 1].clone(),
                    artifact: a,
                    grid: g,
                });
            }
        }
    }

    if mismatches.is_empty() {
        VerificationResult::Pass {
            rows: expected.row_count(),
            columns: expected.column_count(),
        }
    } else {
        VerificationResult::ValueMismatch { mismatches }
    }
}

/// Verifies the artifact at `artifact_path` against `grid` for the given
/// region and date range.
///
/// # Errors
///
/// Resolution errors from the grid side propagate unchanged, as does a missing
/// or unreadable artifact. Content differences are returned as a
/// non-passing [`VerificationResult`].
pub fn verify<G: GridSource + ?Sized, P: AsRef<Path>>(
    grid: &G,
    artifact_path: P,
    region: &Region,
    range: &DateRange,
) -> Result<VerificationResult> {
    let artifact_path = artifact_path.as_ref();
    let expected = extract(grid, region, range)?;
    let artifact = read_artifact(artifact_path)?;
    debug!(
        "Verifying {} ({} rows) against {} grid rows",
        artifact_path.display(),
        artifact.rows.len(),
        expected.row_count()
    );

    let result = compare(&artifact, &expected);
    match &result {
        VerificationResult::Pass { .. } => {
            info!("Verification passed for {}", artifact_path.display())
        }
        VerificationResult::ValueMismatch { mismatches } => {
            for m in mismatches {
                warn!(
                    "Mismatch at row {} ({}), column '{}': artifact {} vs grid {}",
                    m.row, m.date, m.header, m.artifact, m.grid
                );
            }
        }
        other => warn!("{}: {}", artifact_path.display(), other),
    }
    Ok(result)
}
