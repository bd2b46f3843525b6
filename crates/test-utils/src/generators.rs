//! Test data generators for creating synthetic ocean-like grids.
//!
//! These generators create predictable, verifiable value patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read correctly by
/// checking that grid[row * n_lon + col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);  // 5 rows * 10 cols
/// assert_eq!(grid[0], 0.0);    // col=0, row=0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(n_lon: usize, n_lat: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(n_lon * n_lat);
    for row in 0..n_lat {
        for col in 0..n_lon {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Creates a grid with SST-like values in degrees Celsius.
///
/// Values run from warm (~29 °C) at the first row to cold (~ -1 °C)
/// at the last, a crude pole-ward gradient that stays inside a
/// plausible oceanic range.
pub fn create_sst_grid(n_lon: usize, n_lat: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(n_lon * n_lat);
    for row in 0..n_lat {
        let frac = if n_lat > 1 {
            row as f64 / (n_lat - 1) as f64
        } else {
            0.0
        };
        for col in 0..n_lon {
            let ripple = (col as f64 * 0.37).sin() * 0.5;
            data.push(29.0 - 30.0 * frac + ripple);
        }
    }
    data
}

/// Creates a grid filled entirely with the given fill sentinel.
pub fn create_filled_grid(cells: usize, fill_value: f64) -> Vec<f64> {
    vec![fill_value; cells]
}

/// Creates a land mask with land along the first `land_rows` rows.
pub fn create_coastal_mask(n_lon: usize, n_lat: usize, land_rows: usize) -> Vec<bool> {
    let mut mask = Vec::with_capacity(n_lon * n_lat);
    for row in 0..n_lat {
        for _ in 0..n_lon {
            mask.push(row < land_rows);
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pattern() {
        let grid = create_test_grid(4, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[5], 1001.0); // row=1, col=1
        assert_eq!(grid[11], 3002.0); // row=2, col=3
    }

    #[test]
    fn test_sst_grid_in_plausible_range() {
        let grid = create_sst_grid(8, 8);
        for value in &grid {
            assert!(*value >= -2.0 && *value <= 35.0, "value {}", value);
        }
    }

    #[test]
    fn test_coastal_mask() {
        let mask = create_coastal_mask(3, 3, 1);
        assert!(mask[0] && mask[2]);
        assert!(!mask[3] && !mask[8]);
    }
}
