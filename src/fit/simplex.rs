//! Deterministic Nelder–Mead simplex minimizer.
//!
//! Both pipelines minimize costs that are cheap to evaluate but have no
//! convenient derivatives (the anticrossing cost is built from distances to
//! line segments). The minimizer follows the classic formulation:
//!
//! - reflection 1, expansion 2, contraction ½, shrink ½
//! - initial simplex: each coordinate of the start perturbed by 5 %
//!   (or by a small absolute step if it is zero)
//! - stop once both the simplex extent and the spread of its costs fall
//!   below the tolerances, or when a budget is exhausted
//!
//! No randomness is involved, so identical inputs give identical outputs.
//! Running out of budget is not an error; the best vertex is returned.

use crate::domain::SimplexConfig;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Outcome of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    pub iterations: usize,
    /// `true` when the tolerance test stopped the search (not a budget).
    pub converged: bool,
}

/// Cost function wrapper that counts calls and maps NaN to +∞.
struct Objective<F> {
    f: F,
    evaluations: usize,
}

impl<F: FnMut(&[f64]) -> f64> Objective<F> {
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let v = (self.f)(x);
        if v.is_nan() { f64::INFINITY } else { v }
    }
}

/// Minimize `f` starting from `x0`.
pub fn minimize<F>(f: F, x0: &[f64], config: &SimplexConfig) -> SimplexResult
where
    F: FnMut(&[f64]) -> f64,
{
    let n = x0.len();
    let mut objective = Objective { f, evaluations: 0 };

    if n == 0 {
        let value = objective.eval(x0);
        return SimplexResult {
            x: Vec::new(),
            value,
            evaluations: objective.evaluations,
            iterations: 0,
            converged: true,
        };
    }

    let max_iterations = config.max_iterations.unwrap_or(200 * n);
    let max_evaluations = config.max_evaluations.unwrap_or(200 * n);

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for k in 0..n {
        let mut vertex = x0.to_vec();
        vertex[k] = if vertex[k] != 0.0 {
            (1.0 + config.initial_step_rel) * vertex[k]
        } else {
            config.initial_step_zero
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective.eval(v)).collect();
    sort_simplex(&mut simplex, &mut values);

    let mut iterations = 1usize;
    let mut converged = false;
    let mut centroid = vec![0.0; n];

    while objective.evaluations < max_evaluations && iterations < max_iterations {
        if within_tolerance(&simplex, &values, config) {
            converged = true;
            break;
        }

        // Centroid of all vertices but the worst.
        centroid.iter_mut().for_each(|c| *c = 0.0);
        for vertex in &simplex[..n] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v;
            }
        }
        centroid.iter_mut().for_each(|c| *c /= n as f64);

        let worst = simplex[n].clone();
        let reflected = blend(&centroid, &worst, REFLECT);
        let f_reflected = objective.eval(&reflected);

        if f_reflected < values[0] {
            let expanded = blend(&centroid, &worst, REFLECT * EXPAND);
            let f_expanded = objective.eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
        } else if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
        } else {
            let mut shrink = false;
            if f_reflected < values[n] {
                // Outside contraction.
                let contracted = blend(&centroid, &worst, CONTRACT * REFLECT);
                let f_contracted = objective.eval(&contracted);
                if f_contracted <= f_reflected {
                    simplex[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    shrink = true;
                }
            } else {
                // Inside contraction.
                let contracted = blend(&centroid, &worst, -CONTRACT);
                let f_contracted = objective.eval(&contracted);
                if f_contracted < values[n] {
                    simplex[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].clone();
                for j in 1..=n {
                    for (v, b) in simplex[j].iter_mut().zip(&best) {
                        *v = b + SHRINK * (*v - b);
                    }
                    values[j] = objective.eval(&simplex[j]);
                }
            }
        }

        sort_simplex(&mut simplex, &mut values);
        iterations += 1;
    }

    SimplexResult {
        x: simplex.swap_remove(0),
        value: values[0],
        evaluations: objective.evaluations,
        iterations,
        converged,
    }
}

/// `centroid + t · (centroid - worst)`.
fn blend(centroid: &[f64], worst: &[f64], t: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + t * (c - w))
        .collect()
}

/// Stable sort of vertices by cost, best first.
fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn within_tolerance(simplex: &[Vec<f64>], values: &[f64], config: &SimplexConfig) -> bool {
    let best = &simplex[0];
    let x_spread = simplex[1..]
        .iter()
        .flat_map(|v| v.iter().zip(best).map(|(a, b)| (a - b).abs()))
        .fold(0.0f64, f64::max);
    let f_spread = values[1..]
        .iter()
        .map(|v| (v - values[0]).abs())
        .fold(0.0f64, f64::max);
    x_spread <= config.x_tol && f_spread <= config.f_tol
}
