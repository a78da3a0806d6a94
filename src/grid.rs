//! # Grid Sources
//!
//! A grid is a read-only data source exposing three named coordinate axes
//! (`latitude`, `longitude`, `time`) and exactly one scalar variable indexed
//! `[time, latitude, longitude]`.
//!
//! - [`GridSource`]: the trait the resolvers, extractor and verifier work against
//! - [`NetcdfGrid`]: a NetCDF file opened read-only
//! - [`MemoryGrid`]: an in-memory grid, used for synthetic data and tests

use crate::error::{Error, Result};
use crate::time::TimeAxis;
use log::debug;
use netcdf::types::{FloatType, IntType, NcVariableType};
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const TIME: &str = "time";

const COORDINATE_NAMES: [&str; 3] = [LATITUDE, LONGITUDE, TIME];

/// Coordinate axes of a grid.
#[derive(Debug, Clone)]
pub struct GridAxes {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub time: TimeAxis,
}

impl GridAxes {
    pub fn shape(&self) -> [usize; 3] {
        [self.time.len(), self.latitude.len(), self.longitude.len()]
    }
}

/// Read access to a single-variable lat/lon/time grid.
pub trait GridSource {
    fn axes(&self) -> &GridAxes;

    fn variable_name(&self) -> &str;

    /// Reads the `[time, lat, lon]` block in row-major order (time outermost,
    /// longitude innermost). Missing cells are `NaN`.
    fn read_block(
        &self,
        time: Range<usize>,
        lat: Range<usize>,
        lon: Range<usize>,
    ) -> Result<Vec<f64>>;
}

/// Picks the data variable among `names`: the single name that is not a
/// coordinate axis.
pub fn detect_variable<I, S>(names: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let candidates: Vec<String> = names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .filter(|n| !COORDINATE_NAMES.contains(&n.as_str()))
        .collect();

    match candidates.len() {
        0 => Err(Error::MissingVariable("<any non-coordinate variable>".to_string())),
        1 => Ok(candidates.into_iter().next().unwrap_or_default()),
        _ => Err(Error::AmbiguousVariable { candidates }),
    }
}

/// In-memory grid backed by a dense row-major `[time, lat, lon]` buffer.
#[derive(Debug, Clone)]
pub struct MemoryGrid {
    axes: GridAxes,
    variable: String,
    values: Vec<f64>,
}

impl MemoryGrid {
    pub fn new(axes: GridAxes, variable: &str, values: Vec<f64>) -> Result<Self> {
        let [nt, nlat, nlon] = axes.shape();
        if values.len() != nt * nlat * nlon {
            return Err(Error::ShapeMismatch(format!(
                "{} values for a {}x{}x{} grid",
                values.len(),
                nt,
                nlat,
                nlon
            )));
        }
        Ok(MemoryGrid {
            axes,
            variable: variable.to_string(),
            values,
        })
    }
}

impl GridSource for MemoryGrid {
    fn axes(&self) -> &GridAxes {
        &self.axes
    }

    fn variable_name(&self) -> &str {
        &self.variable
    }

    fn read_block(
        &self,
        time: Range<usize>,
        lat: Range<usize>,
        lon: Range<usize>,
    ) -> Result<Vec<f64>> {
        let [nt, nlat, nlon] = self.axes.shape();
        if time.end > nt || lat.end > nlat || lon.end > nlon {
            return Err(Error::ShapeMismatch(format!(
                "block {:?}x{:?}x{:?} exceeds grid {}x{}x{}",
                time, lat, lon, nt, nlat, nlon
            )));
        }
        let mut block = Vec::with_capacity(time.len() * lat.len() * lon.len());
        for t in time {
            for i in lat.clone() {
                let row = (t * nlat + i) * nlon;
                block.extend_from_slice(&self.values[row + lon.start..row + lon.end]);
            }
        }
        Ok(block)
    }
}

/// Unpacking parameters applied to raw variable values.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    scale_factor: f64,
    add_offset: f64,
    fill_value: Option<f64>,
    missing_value: Option<f64>,
}

impl Packing {
    fn unpack(&self, raw: f64) -> f64 {
        if self.fill_value == Some(raw) || self.missing_value == Some(raw) {
            return f64::NAN;
        }
        raw * self.scale_factor + self.add_offset
    }
}

/// The netCDF library's fill value for a variable type, used when the
/// variable declares no `_FillValue`. Byte types have no default fill.
fn default_fill_value(vartype: &NcVariableType) -> Option<f64> {
    match vartype {
        NcVariableType::Float(FloatType::F64) => Some(9.969_209_968_386_869e36),
        NcVariableType::Float(FloatType::F32) => Some(9.969_209_968_386_869e36_f32 as f64),
        NcVariableType::Int(IntType::I16) => Some(-32_767.0),
        NcVariableType::Int(IntType::U16) => Some(65_535.0),
        NcVariableType::Int(IntType::I32) => Some(-2_147_483_647.0),
        NcVariableType::Int(IntType::U32) => Some(4_294_967_295.0),
        NcVariableType::Int(IntType::I64) => Some(-9_223_372_036_854_775_806_i64 as f64),
        NcVariableType::Int(IntType::U64) => Some(18_446_744_073_709_551_614_u64 as f64),
        _ => None,
    }
}

/// A NetCDF dataset opened read-only. Coordinate axes are loaded eagerly;
/// variable data is read on demand.
pub struct NetcdfGrid {
    path: PathBuf,
    file: netcdf::File,
    axes: GridAxes,
    variable: String,
    packing: Packing,
}

impl NetcdfGrid {
    /// Opens a dataset and discovers its data variable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_variable(path, None)
    }

    /// Opens a dataset. When `variable` is given, discovery is skipped and
    /// that variable is used.
    pub fn open_with_variable<P: AsRef<Path>>(path: P, variable: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingSource {
                path: path.to_path_buf(),
            });
        }

        debug!("Opening NetCDF file: {}", path.display());
        let file = netcdf::open(path)?;

        let latitude = read_axis(&file, LATITUDE)?;
        let longitude = read_axis(&file, LONGITUDE)?;
        let time_var = file
            .variable(TIME)
            .ok_or_else(|| Error::MissingVariable(TIME.to_string()))?;
        let units = string_attribute(&time_var, "units").ok_or_else(|| Error::MissingAttribute {
            variable: TIME.to_string(),
            attribute: "units".to_string(),
        })?;
        let calendar = string_attribute(&time_var, "calendar");
        let time_values = time_var.get_values::<f64, _>(..)?;
        let time = TimeAxis::new(time_values, &units, calendar.as_deref())?;

        let axes = GridAxes {
            latitude,
            longitude,
            time,
        };

        let variable = match variable {
            Some(name) => name.to_string(),
            None => detect_variable(file.variables().map(|v| v.name()))?,
        };
        let var = file
            .variable(&variable)
            .ok_or_else(|| Error::MissingVariable(variable.clone()))?;

        let dim_names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        if dim_names != [TIME, LATITUDE, LONGITUDE] {
            return Err(Error::ShapeMismatch(format!(
                "variable '{}' has dimensions {:?}, expected [{}, {}, {}]",
                variable, dim_names, TIME, LATITUDE, LONGITUDE
            )));
        }
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if dims != axes.shape() {
            return Err(Error::ShapeMismatch(format!(
                "variable '{}' has shape {:?}, axes imply {:?}",
                variable,
                dims,
                axes.shape()
            )));
        }

        let packing = Packing {
            scale_factor: numeric_attribute(&var, "scale_factor").unwrap_or(1.0),
            add_offset: numeric_attribute(&var, "add_offset").unwrap_or(0.0),
            fill_value: numeric_attribute(&var, "_FillValue")
                .or_else(|| default_fill_value(&var.vartype())),
            missing_value: numeric_attribute(&var, "missing_value"),
        };
        debug!(
            "Detected variable '{}' with shape {:?} ({:?})",
            variable, dims, packing
        );

        Ok(NetcdfGrid {
            path: path.to_path_buf(),
            file,
            axes,
            variable,
            packing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

impl GridSource for NetcdfGrid {
    fn axes(&self) -> &GridAxes {
        &self.axes
    }

    fn variable_name(&self) -> &str {
        &self.variable
    }

    fn read_block(
        &self,
        time: Range<usize>,
        lat: Range<usize>,
        lon: Range<usize>,
    ) -> Result<Vec<f64>> {
        let var = self
            .file
            .variable(&self.variable)
            .ok_or_else(|| Error::MissingVariable(self.variable.clone()))?;
        let raw = var.get_values::<f64, _>((time, lat, lon))?;
        Ok(raw.into_iter().map(|v| self.packing.unpack(v)).collect())
    }
}

fn read_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| Error::MissingVariable(name.to_string()))?;
    let values = var.get_values::<f64, _>(..)?;
    if values.is_empty() {
        return Err(Error::EmptyAxis(name.to_string()));
    }
    Ok(values)
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Strs(v) => v.into_iter().next(),
        _ => None,
    }
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    use netcdf::AttributeValue as A;
    match var.attribute(name)?.value().ok()? {
        A::Double(v) => Some(v),
        A::Float(v) => Some(v as f64),
        A::Int(v) => Some(v as f64),
        A::Uint(v) => Some(v as f64),
        A::Short(v) => Some(v as f64),
        A::Ushort(v) => Some(v as f64),
        A::Schar(v) => Some(v as f64),
        A::Uchar(v) => Some(v as f64),
        A::Longlong(v) => Some(v as f64),
        A::Ulonglong(v) => Some(v as f64),
        A::Doubles(v) => v.first().copied(),
        A::Floats(v) => v.first().map(|&x| x as f64),
        A::Ints(v) => v.first().map(|&x| x as f64),
        A::Shorts(v) => v.first().map(|&x| x as f64),
        _ => None,
    }
}
