//! Synthetic raster data with values that encode their own position.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Creates a (time, y, x) cube in row-major order.
///
/// Each cell value is `t * 1_000_000 + col * 1000 + row`, so any cell that
/// ends up somewhere after clipping or restacking can be traced back.
///
/// ```
/// use test_utils::create_test_cube;
///
/// let cube = create_test_cube(2, 3, 4);
/// assert_eq!(cube.len(), 24);
/// assert_eq!(cube[1], 1000.0);       // t=0, row=0, col=1
/// assert_eq!(cube[4], 1.0);          // t=0, row=1, col=0
/// assert_eq!(cube[12], 1_000_000.0); // t=1, row=0, col=0
/// ```
pub fn create_test_cube(nt: usize, ny: usize, nx: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * ny * nx);
    for t in 0..nt {
        for row in 0..ny {
            for col in 0..nx {
                data.push(cell_value(t, row, col));
            }
        }
    }
    data
}

/// Value stored by [`create_test_cube`] at (t, row, col).
pub fn cell_value(t: usize, row: usize, col: usize) -> f32 {
    (t * 1_000_000 + col * 1000 + row) as f32
}

/// Evenly spaced coordinate values starting at `start`.
///
/// A negative `step` yields descending coordinates (north-up y axes).
pub fn regular_coords(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// `n` timestamps six hours apart, starting at (year, month, day, hour) UTC.
pub fn six_hourly_times(start: (i32, u32, u32, u32), n: usize) -> Vec<DateTime<Utc>> {
    let (y, m, d, h) = start;
    let first = Utc
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid start time {:?}", start));
    (0..n)
        .map(|i| first + Duration::hours(6 * i as i64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_cube_layout() {
        let cube = create_test_cube(3, 2, 5);
        assert_eq!(cube.len(), 30);
        // t=2, row=1, col=4
        assert_eq!(cube[2 * 10 + 1 * 5 + 4], cell_value(2, 1, 4));
    }

    #[test]
    fn test_regular_coords_descending() {
        let y = regular_coords(10.0, -2.0, 4);
        assert_eq!(y, vec![10.0, 8.0, 6.0, 4.0]);
    }

    #[test]
    fn test_six_hourly_times() {
        let times = six_hourly_times((2020, 4, 21, 18), 4);
        let hours: Vec<u32> = times.iter().map(|t| t.hour()).collect();
        assert_eq!(hours, vec![18, 0, 6, 12]);
    }
}
