//! ESRI ASCII grid output.
//!
//! ```text
//! ncols         4
//! nrows         3
//! xllcorner     -1938000.00000
//! yllcorner     2784000.00000
//! cellsize      2000.00000
//! NODATA_value  -9999.00000
//! 0.10000 0.00000 ...
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Header fields of an ASCII grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiGridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: f64,
}

impl AsciiGridHeader {
    /// Parse the six header lines at the start of `text`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields = std::collections::HashMap::new();
        for line in text.lines().take(6) {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => {
                    fields.insert(key.to_ascii_lowercase(), value.to_string());
                }
                _ => return Err(header_error(format!("bad header line '{}'", line))),
            }
        }

        let get = |key: &str| {
            fields
                .get(key)
                .ok_or_else(|| header_error(format!("missing {}", key)))
        };
        let count = |key: &str| -> Result<usize> {
            get(key)?
                .parse()
                .map_err(|_| header_error(format!("invalid {}", key)))
        };
        let number = |key: &str| -> Result<f64> {
            get(key)?
                .parse()
                .map_err(|_| header_error(format!("invalid {}", key)))
        };

        Ok(Self {
            ncols: count("ncols")?,
            nrows: count("nrows")?,
            xllcorner: number("xllcorner")?,
            yllcorner: number("yllcorner")?,
            cellsize: number("cellsize")?,
            nodata: number("nodata_value")?,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "ncols         {}", self.ncols)?;
        writeln!(out, "nrows         {}", self.nrows)?;
        writeln!(out, "xllcorner     {:.5}", self.xllcorner)?;
        writeln!(out, "yllcorner     {:.5}", self.yllcorner)?;
        writeln!(out, "cellsize      {:.5}", self.cellsize)?;
        writeln!(out, "NODATA_value  {:.5}", self.nodata)
    }
}

fn header_error(reason: String) -> PipelineError {
    PipelineError::SerializationPrecondition(reason)
}

/// Write `values` (row-major, `header.nrows × header.ncols`) as ASCII grid
/// text.
pub fn write_ascii<W: Write>(out: &mut W, header: &AsciiGridHeader, values: &[f32]) -> Result<()> {
    let expected = header.nrows * header.ncols;
    if values.len() != expected || header.ncols == 0 {
        return Err(PipelineError::SerializationPrecondition(format!(
            "header declares {} x {} cells, got {} values",
            header.nrows,
            header.ncols,
            values.len()
        )));
    }

    let io_err = |e: std::io::Error| PipelineError::io("<ascii grid>", e);
    header.write_to(out).map_err(io_err)?;
    for row in values.chunks(header.ncols) {
        let mut first = true;
        for v in row {
            if !first {
                out.write_all(b" ").map_err(io_err)?;
            }
            write!(out, "{:.5}", v).map_err(io_err)?;
            first = false;
        }
        out.write_all(b"\n").map_err(io_err)?;
    }
    Ok(())
}

/// Write an ASCII grid file, replacing any previous one.
pub fn write_ascii_grid(path: &Path, header: &AsciiGridHeader, values: &[f32]) -> Result<()> {
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_ascii(&mut writer, header, values).map_err(|e| match e {
        PipelineError::Io { source, .. } => PipelineError::io(path, source),
        other => other,
    })?;
    writer.flush().map_err(|e| PipelineError::io(path, e))
}
