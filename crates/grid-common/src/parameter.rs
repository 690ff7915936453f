//! RFC variable classification and the DSS tags derived from it.

use std::fmt;

use crate::error::{GridError, GridResult};

/// Units written for every temperature grid, whatever the source metadata says.
pub const TEMPERATURE_UNITS: &str = "DEG F";

/// Physical quantity carried by an RFC grid.
///
/// RFC variable short names are `Q` + quantity letter + product letter:
/// `QPE`/`QPF` are precipitation, `QTE`/`QTF` are temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Precipitation,
    Temperature,
}

impl Parameter {
    /// Classify a variable by the quantity letter of its short name.
    pub fn from_variable(name: &str) -> GridResult<Self> {
        match name.chars().nth(1).map(|c| c.to_ascii_uppercase()) {
            Some('P') => Ok(Parameter::Precipitation),
            Some('T') => Ok(Parameter::Temperature),
            _ => Err(GridError::UnknownParameter(name.to_string())),
        }
    }

    /// DSS C-part name.
    pub fn dss_name(&self) -> &'static str {
        match self {
            Parameter::Precipitation => "PRECIP",
            Parameter::Temperature => "TEMPERATURE",
        }
    }

    /// How values of this parameter relate to time.
    pub fn data_kind(&self) -> DataKind {
        match self {
            Parameter::Precipitation => DataKind::PeriodCumulative,
            Parameter::Temperature => DataKind::Instantaneous,
        }
    }

    /// Units passed to the DSS importer.
    ///
    /// Temperature is always [`TEMPERATURE_UNITS`]; precipitation keeps the
    /// source variable's `units` attribute.
    pub fn dss_units(&self, source_units: Option<&str>) -> GridResult<String> {
        match self {
            Parameter::Temperature => Ok(TEMPERATURE_UNITS.to_string()),
            Parameter::Precipitation => source_units
                .map(str::to_string)
                .ok_or_else(|| GridError::MissingData("units attribute".to_string())),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dss_name())
    }
}

/// DSS data type: accumulated over a window, or a point-in-time reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    PeriodCumulative,
    Instantaneous,
}

impl DataKind {
    pub fn dss_tag(&self) -> &'static str {
        match self {
            DataKind::PeriodCumulative => "PER-CUM",
            DataKind::Instantaneous => "INST-VAL",
        }
    }

    pub fn is_instantaneous(&self) -> bool {
        matches!(self, DataKind::Instantaneous)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dss_tag())
    }
}
