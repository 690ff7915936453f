//! Common test fixtures for rfc-grids tests.

/// Watershed boxes as (xmin, ymin, xmax, ymax) in Albers meters.
pub mod bbox {
    pub const KOOTENAI: (f64, f64, f64, f64) = (-1604000.0, 2910000.0, -1350000.0, 3298000.0);

    pub const WILLAMETTE: (f64, f64, f64, f64) = (-2174000.0, 2548000.0, -1988000.0, 2850000.0);

    pub const YAKIMA: (f64, f64, f64, f64) = (-1938000.0, 2784000.0, -1776000.0, 2986000.0);

    /// Invalid box (xmin > xmax)
    pub const INVERTED_X: (f64, f64, f64, f64) = (-1350000.0, 2910000.0, -1604000.0, 3298000.0);
}

/// Projection strings seen in RFC files.
pub mod srs {
    /// `proj4_params` of the NWRFC polar stereographic grids.
    pub const NWRFC_STEREO: &str =
        "+proj=stere +lat_0=90 +lat_ts=60 +lon_0=-105 +k=1 +x_0=0 +y_0=0 +a=6371200 +b=6371200 +units=m +no_defs";
}

/// A small Albers grid covering the Columbia basin boxes above.
pub mod grid {
    /// Lower-left cell coordinate, x.
    pub const X0: f64 = -2200000.0;
    /// Lower-left cell coordinate, y.
    pub const Y0: f64 = 2100000.0;
    pub const CELL_SIZE: f64 = 2000.0;
    pub const NX: usize = 600;
    pub const NY: usize = 720;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_grid_covers_boxes() {
        let max_x = grid::X0 + (grid::NX - 1) as f64 * grid::CELL_SIZE;
        let max_y = grid::Y0 + (grid::NY - 1) as f64 * grid::CELL_SIZE;
        for (x0, y0, x1, y1) in [bbox::KOOTENAI, bbox::WILLAMETTE, bbox::YAKIMA] {
            assert!(x0 >= grid::X0 && x1 <= max_x);
            assert!(y0 >= grid::Y0 && y1 <= max_y);
        }
    }
}
