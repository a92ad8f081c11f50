//! Plain-text fit summaries.
//!
//! Formatting lives here so the fitting code stays free of presentation
//! concerns and output changes stay localized.

use crate::domain::{AnticrossingFit, PolarizationFit, ProcessedImage};

/// Multi-line summary of a polarization fit.
pub fn format_polarization_fit(fit: &PolarizationFit) -> String {
    let mut out = String::new();
    out.push_str("=== Polarization line fit ===\n");
    out.push_str(&format!(
        "Status: {} after {} evaluations in {} pass(es)\n",
        status(fit.converged),
        fit.evaluations,
        fit.passes.len()
    ));
    out.push_str(&format!(
        "Quality: n={} SSE={:.6e} RMSE={:.6e} max|r|={:.6e}\n",
        fit.quality.n, fit.quality.sse, fit.quality.rmse, fit.quality.max_abs_residual
    ));

    out.push('\n');
    out.push_str(&format!("{:<18} {:>14} {:>14}\n", "parameter", "fitted", "guess"));
    out.push_str(&format!("{:-<18} {:-<14} {:-<14}\n", "", "", ""));
    let names = [
        "tunnel_coupling",
        "detuning_offset",
        "sensor_offset",
        "slope_left",
        "slope_right",
        "sensitivity",
    ];
    for ((name, fitted), guess) in names
        .iter()
        .zip(fit.fitted.to_array())
        .zip(fit.guess.to_array())
    {
        out.push_str(&format!("{name:<18} {fitted:>14.6} {guess:>14.6}\n"));
    }
    out
}

/// Multi-line summary of an anticrossing fit.
///
/// When `image` is given the center is also reported in scan coordinates.
pub fn format_anticrossing_fit(fit: &AnticrossingFit, image: Option<&ProcessedImage>) -> String {
    let p = &fit.parameters;
    let mut out = String::new();
    out.push_str("=== Anticrossing fit ===\n");
    out.push_str(&format!("Cost: {:.6}\n", fit.cost));
    for (i, pass) in fit.passes.iter().enumerate() {
        out.push_str(&format!(
            "Pass {}: cost={:.6} evals={} iters={} {}\n",
            i + 1,
            pass.cost,
            pass.evaluations,
            pass.iterations,
            status(pass.converged)
        ));
    }

    out.push('\n');
    out.push_str(&format!("- center     : ({:.4}, {:.4})\n", p.center_x, p.center_y));
    if let Some(image) = image {
        let [x, y] = image.to_scan_coordinates(p.center_x, p.center_y);
        out.push_str(&format!("- center scan: ({x:.4}, {y:.4})\n"));
    }
    out.push_str(&format!("- arm length : {:.4}\n", p.arm_length));
    out.push_str(&format!("- angles     : {}\n", fmt_vec(&p.angles)));
    out.push_str(&format!(
        "- pol. angle : {:.4}\n",
        p.polarization_angle_or_default()
    ));
    out
}

fn status(converged: bool) -> &'static str {
    if converged { "converged" } else { "budget exhausted" }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}
