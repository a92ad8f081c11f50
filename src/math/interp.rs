//! Sub-pixel sampling of grids.

use nalgebra::DMatrix;

/// Sample `grid` at fractional `(x, y) = (col, row)` using bilinear
/// interpolation. Coordinates outside the grid are clamped to the border so
/// the result is continuous everywhere.
#[inline]
pub fn bilinear_clamped(grid: &DMatrix<f64>, x: f64, y: f64) -> f64 {
    let (rows, cols) = grid.shape();
    if rows == 0 || cols == 0 {
        return 0.0;
    }
    let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, (cols - 1) as f64) };
    let y = if y.is_nan() { 0.0 } else { y.clamp(0.0, (rows - 1) as f64) };

    let x0 = (x.floor() as usize).min(cols.saturating_sub(2));
    let y0 = (y.floor() as usize).min(rows.saturating_sub(2));
    let x1 = (x0 + 1).min(cols - 1);
    let y1 = (y0 + 1).min(rows - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = grid[(y0, x0)];
    let p10 = grid[(y0, x1)];
    let p01 = grid[(y1, x0)];
    let p11 = grid[(y1, x1)];

    let top = p00 + (p10 - p00) * fx;
    let bottom = p01 + (p11 - p01) * fx;
    top + (bottom - top) * fy
}
