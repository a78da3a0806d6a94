//! # Tabular Output Module
//!
//! Serializes [`Extraction`]s to CSV artifacts, loads artifacts back for
//! verification, and re-encodes CSV artifacts as Parquet.
//!
//! ## Artifact layout
//!
//! - first column `Date`, values `YYYY-MM-DD`
//! - one column per grid cell, headed `"{lat:.1}, {lon:.1}"`
//! - one row per time step; missing values are empty fields

use crate::error::{Error, Result};
use crate::extract::{DATE_HEADER, Extraction};
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Contents of a CSV artifact as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularArtifact {
    /// All column labels, `Date` included.
    pub headers: Vec<String>,
    pub dates: Vec<String>,
    /// Row-major values; missing fields are `NaN`.
    pub rows: Vec<Vec<f64>>,
}

/// Builds the DataFrame written for an extraction.
pub fn extraction_to_dataframe(extraction: &Extraction) -> Result<DataFrame> {
    let width = extraction.column_count();
    if extraction.headers.first().map(String::as_str) != Some(DATE_HEADER) {
        return Err(Error::ShapeMismatch(format!(
            "first header must be '{}'",
            DATE_HEADER
        )));
    }
    if extraction.dates.len() != extraction.rows.len() {
        return Err(Error::ShapeMismatch(format!(
            "{} dates for {} rows",
            extraction.dates.len(),
            extraction.rows.len()
        )));
    }
    if let Some((i, row)) = extraction
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != width)
    {
        return Err(Error::ShapeMismatch(format!(
            "row {} has {} values, headers describe {} columns",
            i,
            row.len(),
            width
        )));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = extraction.headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(Error::ShapeMismatch(format!(
            "duplicate column header '{}'; grid spacing is finer than the header precision",
            dup
        )));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(width + 1);
    columns.push(Series::new(DATE_HEADER.into(), extraction.dates.clone()).into());
    for (j, header) in extraction.headers[1..].iter().enumerate() {
        let values: Vec<Option<f64>> = extraction
            .rows
            .iter()
            .map(|row| Some(row[j]).filter(|v| !v.is_nan()))
            .collect();
        columns.push(Series::new(header.as_str().into(), values).into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Writes an extraction to `destination` as CSV, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] when row widths disagree with the headers,
/// or when two columns share a header.
pub fn write_extraction_csv<P: AsRef<Path>>(extraction: &Extraction, destination: P) -> Result<()> {
    let destination = destination.as_ref();
    let mut df = extraction_to_dataframe(extraction)?;

    debug!("Writing DataFrame to CSV file: {}", destination.display());
    debug!("DataFrame shape: {:?}", df.shape());

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(destination)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!(
        "Data saved to {} ({} rows, {} columns)",
        destination.display(),
        extraction.row_count(),
        extraction.column_count()
    );
    Ok(())
}

fn open_existing(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(Error::MissingSource {
            path: path.to_path_buf(),
        });
    }
    Ok(File::open(path)?)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(open_existing(path)?)
        .finish()?;
    Ok(df)
}

/// Reads every cell as text, header line included, so repeated column labels
/// survive loading.
fn read_csv_cells(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(open_existing(path)?)
        .finish()?;
    Ok(df)
}

/// Loads a CSV artifact: the `Date` column as strings, every other column as
/// numbers. Header labels are kept exactly as written, duplicates included.
pub fn read_artifact<P: AsRef<Path>>(path: P) -> Result<TabularArtifact> {
    let path = path.as_ref();
    let cells = read_csv_cells(path)?;
    debug!("Loaded artifact {} with shape {:?}", path.display(), cells.shape());

    let height = cells.height();
    let mut headers = Vec::with_capacity(cells.width());
    for column in cells.get_columns() {
        let label = column.as_materialized_series().str()?.get(0);
        headers.push(label.unwrap_or_default().to_string());
    }
    if height == 0 || headers.first().map(String::as_str) != Some(DATE_HEADER) {
        return Err(Error::ShapeMismatch(format!(
            "{} does not start with a '{}' column",
            path.display(),
            DATE_HEADER
        )));
    }

    let body = |column: &Column| column.as_materialized_series().slice(1, height - 1);
    let columns = cells.get_columns();
    let dates: Vec<String> = body(&columns[0])
        .str()?
        .into_iter()
        .map(|d| d.unwrap_or_default().to_string())
        .collect();

    let mut values: Vec<Vec<f64>> = Vec::with_capacity(columns.len() - 1);
    for column in &columns[1..] {
        let series = body(column).cast(&DataType::Float64)?;
        values.push(
            series
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect(),
        );
    }

    let rows = (0..dates.len())
        .map(|i| values.iter().map(|col| col[i]).collect())
        .collect();

    Ok(TabularArtifact {
        headers,
        dates,
        rows,
    })
}

/// Re-encodes a CSV artifact as Parquet with identical logical content.
pub fn convert_csv_to_parquet<P: AsRef<Path>, Q: AsRef<Path>>(csv: P, parquet: Q) -> Result<()> {
    let (csv, parquet) = (csv.as_ref(), parquet.as_ref());
    let mut df = read_csv(csv)?;
    let file = File::create(parquet)?;
    ParquetWriter::new(file).finish(&mut df)?;
    info!(
        "CSV data has been converted to Parquet and saved as {}",
        parquet.display()
    );
    Ok(())
}

/// Parquet path written next to a CSV artifact.
pub fn parquet_path_for(csv: &Path) -> PathBuf {
    csv.with_extension("parquet")
}

/// Converts every `.csv` file under `directory` to a sibling `.parquet` file.
/// Returns the Parquet paths written.
pub fn convert_directory<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for entry in WalkDir::new(directory.as_ref()).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            let target = parquet_path_for(path);
            convert_csv_to_parquet(path, &target)?;
            written.push(target);
        }
    }
    Ok(written)
}
