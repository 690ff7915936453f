//! In-memory time × y × x rasters and the store interface that supplies them.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{GridError, GridResult};
use crate::time::decode_cf_times;

/// A scalar or text attribute read from a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Text(String),
    Number(f64),
}

impl Attribute {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Attribute::Text(s) => Some(s),
            Attribute::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Attribute::Number(v) => Some(*v),
            Attribute::Text(_) => None,
        }
    }
}

/// An open gridded dataset.
///
/// Dropping the handle closes the underlying file.
pub trait RasterDataset {
    /// Path the dataset was opened from.
    fn path(&self) -> &Path;

    fn has_variable(&self, name: &str) -> bool;

    /// Dimension lengths of a variable, slowest-varying first.
    fn dimensions(&self, variable: &str) -> GridResult<Vec<usize>>;

    /// All values of a variable, flattened in row-major order.
    fn read_f32(&self, variable: &str) -> GridResult<Vec<f32>>;

    fn read_f64(&self, variable: &str) -> GridResult<Vec<f64>>;

    /// Look up an attribute; `Ok(None)` when it is absent.
    fn attribute(&self, variable: &str, name: &str) -> GridResult<Option<Attribute>>;
}

/// Opens datasets from local files.
pub trait RasterStore {
    fn open(&self, path: &Path) -> GridResult<Box<dyn RasterDataset>>;
}

/// Everything needed to build a [`Raster`].
#[derive(Debug, Clone)]
pub struct RasterParts {
    pub variable: String,
    /// Values in (time, y, x) row-major order.
    pub data: Vec<f32>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub times: Vec<DateTime<Utc>>,
    pub fill_value: f64,
    pub srs: Option<String>,
    pub units: Option<String>,
}

/// A 3-D (time, y, x) grid with its coordinates.
///
/// Shape invariants are checked once in [`Raster::new`]: the data length is
/// `times × y × x` and both coordinate vectors are strictly monotonic.
#[derive(Debug, Clone)]
pub struct Raster {
    variable: String,
    data: Vec<f32>,
    x: Vec<f64>,
    y: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    fill_value: f64,
    srs: Option<String>,
    units: Option<String>,
}

impl Raster {
    pub fn new(parts: RasterParts) -> GridResult<Self> {
        let expected = parts.times.len() * parts.y.len() * parts.x.len();
        if parts.data.len() != expected {
            return Err(GridError::ShapeMismatch {
                what: parts.variable,
                expected: vec![parts.times.len(), parts.y.len(), parts.x.len()],
                actual: vec![parts.data.len()],
            });
        }
        if parts.x.is_empty() || parts.y.is_empty() {
            return Err(GridError::MissingData(format!(
                "{} has an empty spatial dimension",
                parts.variable
            )));
        }
        check_monotonic("x", &parts.x)?;
        check_monotonic("y", &parts.y)?;

        Ok(Self {
            variable: parts.variable,
            data: parts.data,
            x: parts.x,
            y: parts.y,
            times: parts.times,
            fill_value: parts.fill_value,
            srs: parts.srs,
            units: parts.units,
        })
    }

    /// Read a (time, y, x) variable with its `x`, `y` and `time` coordinates.
    ///
    /// Packed values (`scale_factor`/`add_offset`) are unpacked; fill cells
    /// keep the fill value. The source SRS is the `proj4_params` attribute of
    /// the variable named by the data variable's `grid_mapping` attribute.
    pub fn load(dataset: &dyn RasterDataset, variable: &str) -> GridResult<Self> {
        let dims = dataset.dimensions(variable)?;
        if dims.len() != 3 {
            return Err(GridError::ShapeMismatch {
                what: format!("{} dimensions", variable),
                expected: vec![3],
                actual: vec![dims.len()],
            });
        }

        let fill_value = fill_value(dataset, variable)?;
        let mut data = dataset.read_f32(variable)?;
        unpack(dataset, variable, &mut data, fill_value)?;

        let x = dataset.read_f64("x")?;
        let y = dataset.read_f64("y")?;
        let times = read_times(dataset)?;
        let units = text_attribute(dataset, variable, "units")?;

        let srs = match text_attribute(dataset, variable, "grid_mapping")? {
            Some(mapping) => text_attribute(dataset, &mapping, "proj4_params")?,
            None => None,
        };

        Self::new(RasterParts {
            variable: variable.to_string(),
            data,
            x,
            y,
            times,
            fill_value,
            srs,
            units,
        })
    }

    /// Short variable name, e.g. `QPE`.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// (time, y, x) lengths.
    pub fn shape(&self) -> [usize; 3] {
        [self.times.len(), self.y.len(), self.x.len()]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// One (y, x) layer.
    pub fn layer(&self, t: usize) -> Option<&[f32]> {
        let size = self.y.len() * self.x.len();
        self.data.get(t * size..(t + 1) * size)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    pub fn srs(&self) -> Option<&str> {
        self.srs.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }
}

fn check_monotonic(name: &str, values: &[f64]) -> GridResult<()> {
    let ascending = values.windows(2).all(|w| w[0] < w[1]);
    let descending = values.windows(2).all(|w| w[0] > w[1]);
    if ascending || descending {
        Ok(())
    } else {
        Err(GridError::NonMonotonic(name.to_string()))
    }
}

/// `_FillValue`, falling back to `missing_value`.
pub fn fill_value(dataset: &dyn RasterDataset, variable: &str) -> GridResult<f64> {
    for name in ["_FillValue", "missing_value"] {
        if let Some(v) = dataset.attribute(variable, name)?.and_then(|a| a.as_number()) {
            return Ok(v);
        }
    }
    Err(GridError::MissingData(format!("_FillValue on {}", variable)))
}

pub fn text_attribute(
    dataset: &dyn RasterDataset,
    variable: &str,
    name: &str,
) -> GridResult<Option<String>> {
    Ok(dataset
        .attribute(variable, name)?
        .and_then(|a| a.as_text().map(str::to_string)))
}

/// Apply `scale_factor`/`add_offset` in place. Cells equal to `fill_value`
/// are left alone.
pub fn unpack(
    dataset: &dyn RasterDataset,
    variable: &str,
    data: &mut [f32],
    fill_value: f64,
) -> GridResult<()> {
    let scale = dataset
        .attribute(variable, "scale_factor")?
        .and_then(|a| a.as_number());
    let offset = dataset
        .attribute(variable, "add_offset")?
        .and_then(|a| a.as_number());
    if scale.is_none() && offset.is_none() {
        return Ok(());
    }

    let scale = scale.unwrap_or(1.0);
    let offset = offset.unwrap_or(0.0);
    let fill = fill_value as f32;
    for v in data.iter_mut().filter(|v| **v != fill) {
        *v = (*v as f64 * scale + offset) as f32;
    }
    Ok(())
}

fn read_times(dataset: &dyn RasterDataset) -> GridResult<Vec<DateTime<Utc>>> {
    let values = dataset.read_f64("time")?;
    let units = text_attribute(dataset, "time", "units")?
        .ok_or_else(|| GridError::MissingData("units attribute on time".to_string()))?;
    decode_cf_times(&values, &units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parts(nt: usize, ny: usize, nx: usize) -> RasterParts {
        RasterParts {
            variable: "QPE".to_string(),
            data: (0..nt * ny * nx).map(|v| v as f32).collect(),
            x: (0..nx).map(|i| i as f64 * 2000.0).collect(),
            y: (0..ny).map(|j| j as f64 * 2000.0).collect(),
            times: (0..nt)
                .map(|t| Utc.with_ymd_and_hms(2020, 4, 21, 6 * t as u32, 0, 0).unwrap())
                .collect(),
            fill_value: -9999.0,
            srs: None,
            units: Some("in".to_string()),
        }
    }

    #[test]
    fn test_new_valid() {
        let raster = Raster::new(parts(2, 3, 4)).unwrap();
        assert_eq!(raster.shape(), [2, 3, 4]);
        assert_eq!(raster.layer(1).unwrap()[0], 12.0);
        assert!(raster.layer(2).is_none());
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let mut p = parts(2, 3, 4);
        p.data.pop();
        assert!(matches!(Raster::new(p), Err(GridError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_new_rejects_non_monotonic() {
        let mut p = parts(1, 3, 4);
        p.x = vec![0.0, 2.0, 1.0, 3.0];
        assert!(matches!(Raster::new(p), Err(GridError::NonMonotonic(_))));
    }

    #[test]
    fn test_descending_y_allowed() {
        let mut p = parts(1, 3, 2);
        p.y.reverse();
        assert!(Raster::new(p).is_ok());
    }
}
