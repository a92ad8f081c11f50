//! Gaussian smoothing and Gaussian-derivative filters.
//!
//! Kernels are sampled Gaussians truncated at `round(4σ)` and normalized to
//! unit sum; the first-order kernel is the analytic derivative of that
//! normalized kernel. Boundaries use half-sample reflection
//! (`d c b a | a b c d | d c b a`).
//!
//! Derivatives are per sample (index units): filtering the ramp `v[i] = a·i`
//! with order 1 yields `a` away from the borders.

use nalgebra::DMatrix;

/// Truncation of the Gaussian support, in sigmas.
const TRUNCATE: f64 = 4.0;

/// Convolution weights `g[j]` for offsets `j = -r..=r`, stored at `j + r`.
///
/// `sigma <= 0` degenerates to the identity (order 0) or a central
/// difference (order 1).
pub fn gaussian_kernel(sigma: f64, order: u8) -> Vec<f64> {
    if !(sigma > 0.0) {
        return match order {
            0 => vec![1.0],
            _ => vec![0.5, 0.0, -0.5],
        };
    }
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let var = sigma * sigma;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|j| (-0.5 * (j * j) as f64 / var).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    if order >= 1 {
        for (w, j) in weights.iter_mut().zip(-radius..=radius) {
            *w *= -(j as f64) / var;
        }
    }
    weights
}

/// Map an out-of-range index into `0..n` by half-sample reflection.
#[inline]
fn reflect_index(i: i64, n: usize) -> usize {
    let n = n as i64;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n { m as usize } else { (period - 1 - m) as usize }
}

/// Convolve `input` with `kernel` (centered), writing into `out`.
pub fn convolve1d_into(input: &[f64], kernel: &[f64], out: &mut [f64]) {
    let n = input.len();
    if n == 0 {
        return;
    }
    let radius = (kernel.len() / 2) as i64;
    for (i, o) in out.iter_mut().enumerate().take(n) {
        let mut acc = 0.0;
        for (k, &w) in kernel.iter().enumerate() {
            let j = k as i64 - radius;
            acc += w * input[reflect_index(i as i64 - j, n)];
        }
        *o = acc;
    }
}

/// 1D Gaussian filter of the given derivative order.
pub fn gaussian_filter1d(input: &[f64], sigma: f64, order: u8) -> Vec<f64> {
    let kernel = gaussian_kernel(sigma, order);
    let mut out = vec![0.0; input.len()];
    convolve1d_into(input, &kernel, &mut out);
    out
}

/// Separable 2D Gaussian filter.
///
/// `order_x` applies along columns' direction (the x axis, i.e. within each
/// row) and `order_y` along rows (the y axis).
pub fn gaussian_filter2d(data: &DMatrix<f64>, sigma: f64, order_x: u8, order_y: u8) -> DMatrix<f64> {
    let (rows, cols) = data.shape();
    let kx = gaussian_kernel(sigma, order_x);
    let ky = gaussian_kernel(sigma, order_y);

    let mut tmp = DMatrix::<f64>::zeros(rows, cols);
    let mut line_in = vec![0.0; cols];
    let mut line_out = vec![0.0; cols];
    for r in 0..rows {
        for c in 0..cols {
            line_in[c] = data[(r, c)];
        }
        convolve1d_into(&line_in, &kx, &mut line_out);
        for c in 0..cols {
            tmp[(r, c)] = line_out[c];
        }
    }

    // Columns are contiguous in nalgebra's column-major storage.
    let mut out = DMatrix::<f64>::zeros(rows, cols);
    let mut col_out = vec![0.0; rows];
    for c in 0..cols {
        let col_in: Vec<f64> = tmp.column(c).iter().copied().collect();
        convolve1d_into(&col_in, &ky, &mut col_out);
        for r in 0..rows {
            out[(r, c)] = col_out[r];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_kernel_has_unit_sum() {
        let k = gaussian_kernel(0.93, 0);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn smoothing_preserves_constants() {
        let out = gaussian_filter1d(&[3.0; 12], 5.0, 0);
        assert!(out.iter().all(|v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn derivative_of_ramp_is_slope_in_the_interior() {
        let ramp: Vec<f64> = (0..200).map(|i| 0.5 * i as f64).collect();
        let d = gaussian_filter1d(&ramp, 5.0, 1);
        for v in &d[30..170] {
            assert!((v - 0.5).abs() < 2e-3, "derivative {v}");
        }
    }

    #[test]
    fn reflection_handles_short_signals() {
        // Radius 20 on a 4-sample input wraps several times.
        let out = gaussian_filter1d(&[1.0, 2.0, 3.0, 4.0], 5.0, 0);
        assert!(out.iter().all(|v| v.is_finite() && *v > 1.0 && *v < 4.0));
    }

    #[test]
    fn filter2d_derivative_follows_axis() {
        // Plane increasing along x only.
        let data = DMatrix::from_fn(20, 30, |_, c| 2.0 * c as f64);
        let dx = gaussian_filter2d(&data, 1.0, 1, 0);
        let dy = gaussian_filter2d(&data, 1.0, 0, 1);
        assert!((dx[(10, 15)] - 2.0).abs() < 1e-2);
        assert!(dy[(10, 15)].abs() < 1e-9);
    }
}
