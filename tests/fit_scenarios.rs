use qdot_fit::data::{synthetic_anticrossing_scan, synthetic_polarization_trace};
use qdot_fit::domain::{
    AnticrossingFitConfig, AnticrossingGuess, AnticrossingParameters, DerivativeMode, PolarizationFitConfig,
    PolarizationParameters, Scan2D, ScanExtent,
};
use qdot_fit::error::ErrorKind;
use qdot_fit::fit::anticrossing::fit_anticrossing;
use qdot_fit::fit::polarization::{fit, fit_polarization};
use qdot_fit::report::{format_anticrossing_fit, format_polarization_fit};

use nalgebra::DMatrix;

// ============================================================================
// Helpers
// ============================================================================

fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
        .collect()
}

fn polarization_truth() -> PolarizationParameters {
    PolarizationParameters {
        tunnel_coupling: 0.3,
        detuning_offset: 0.0,
        sensor_offset: 0.0,
        slope_left: 0.01,
        slope_right: 0.01,
        sensitivity: 2.0,
    }
}

fn anticrossing_truth() -> AnticrossingParameters {
    AnticrossingParameters::new(10.0, 10.0, 3.0, AnticrossingGuess::DEFAULT_ANGLES)
}

/// Scan config: raw pixels are 0.5 wide in x and 0.25 in y, no derivative.
fn pipeline_config() -> AnticrossingFitConfig {
    let mut cfg = AnticrossingFitConfig::default();
    cfg.preprocess.derivative = DerivativeMode::None;
    cfg.preprocess.target_step = 0.25;
    cfg.initial = AnticrossingGuess {
        center: Some([10.5, 9.6]),
        arm_length: Some(3.3),
        angles: Some([1.3, 3.4, 4.2, 0.5]),
        polarization_angle: None,
    };
    cfg
}

fn assert_geometry_recovered(p: &AnticrossingParameters) {
    assert!((p.center_x - 10.0).abs() < 0.1, "{p:?}");
    assert!((p.center_y - 10.0).abs() < 0.1, "{p:?}");
    // Smoothing widens the ridges and pulls the triple points inward, so the
    // segment comes out a little short on preprocessed scans.
    assert!((p.arm_length - 3.0).abs() < 0.5, "{p:?}");
    for (got, want) in p.angles.iter().zip(AnticrossingGuess::DEFAULT_ANGLES) {
        assert!((got - want).abs() < 0.05, "{p:?}");
    }
}

// ============================================================================
// Polarization line
// ============================================================================

#[test]
fn polarization_tunnel_coupling_is_recovered() {
    let trace = synthetic_polarization_trace(linspace(-10.0, 10.0, 201), &polarization_truth(), 0.001, 0.0, 0)
        .unwrap();
    let (fitted, guess) = fit(&trace, 0.001, None).unwrap();

    assert!((fitted.tunnel_coupling - 0.3).abs() < 0.003, "{fitted:?}");
    assert!(fitted.detuning_offset.abs() < 0.01, "{fitted:?}");
    // 1% of the step height.
    assert!(fitted.sensor_offset.abs() < 0.02, "{fitted:?}");
    assert!((fitted.slope_left - 0.01).abs() < 1e-4, "{fitted:?}");
    assert!((fitted.slope_right - 0.01).abs() < 1e-4, "{fitted:?}");
    assert!((fitted.sensitivity - 2.0).abs() < 0.02, "{fitted:?}");
    assert!((guess.tunnel_coupling - 4.2 / 80.0).abs() < 1e-12);
}

#[test]
fn polarization_round_trip_with_asymmetric_slopes() {
    let truth = PolarizationParameters {
        tunnel_coupling: 0.5,
        detuning_offset: 1.0,
        sensor_offset: 0.3,
        slope_left: 0.02,
        slope_right: -0.01,
        sensitivity: 1.5,
    };
    let trace = synthetic_polarization_trace(linspace(-10.0, 10.0, 201), &truth, 0.001, 0.0, 0).unwrap();
    let result = fit_polarization(&trace, &PolarizationFitConfig::default()).unwrap();
    let p = result.fitted;

    assert!((p.tunnel_coupling - 0.5).abs() < 0.025, "{p:?}");
    assert!((p.detuning_offset - 1.0).abs() < 0.01, "{p:?}");
    assert!((p.sensor_offset - 0.3).abs() < 0.003, "{p:?}");
    assert!((p.slope_left - 0.02).abs() < 2e-4, "{p:?}");
    assert!((p.slope_right + 0.01).abs() < 1e-4, "{p:?}");
    assert!((p.sensitivity - 1.5).abs() < 0.015, "{p:?}");
    assert!(result.quality.rmse < 1e-3);
}

#[test]
fn polarization_fit_tolerates_sensor_noise() {
    let trace = synthetic_polarization_trace(linspace(-10.0, 10.0, 201), &polarization_truth(), 0.001, 0.005, 42)
        .unwrap();
    let result = fit_polarization(&trace, &PolarizationFitConfig::default()).unwrap();

    assert!((result.fitted.tunnel_coupling - 0.3).abs() < 0.05, "{:?}", result.fitted);
    assert!((result.fitted.sensitivity - 2.0).abs() < 0.1, "{:?}", result.fitted);
    // Residual should be at the noise level.
    assert!(result.quality.rmse < 0.02, "{:?}", result.quality);

    let text = format_polarization_fit(&result);
    assert!(text.contains("tunnel_coupling"));
}

// ============================================================================
// Anticrossing pipeline
// ============================================================================

#[test]
fn anticrossing_pipeline_recovers_center_and_angles() {
    let scan = synthetic_anticrossing_scan(
        &anticrossing_truth(),
        (81, 41),
        ScanExtent::new(0.0, 20.0, 0.0, 20.0),
        0.02,
        0.0,
        0,
    )
    .unwrap();
    let mut cfg = pipeline_config();
    cfg.diagnostics = true;

    let (result, diagnostics) = fit_anticrossing(&scan, &cfg).unwrap();
    assert_eq!(result.passes.len(), 2);
    assert_geometry_recovered(&result.parameters);
    assert_eq!(
        result.parameters.polarization_angle,
        Some(std::f64::consts::FRAC_PI_4)
    );

    let diagnostics = diagnostics.unwrap();
    assert_eq!(diagnostics.patch.shape(), (31, 31));
    assert_eq!(diagnostics.residual.shape(), (31, 31));
    assert_eq!(diagnostics.image.data.shape(), (81, 81));
    assert!((diagnostics.cost - result.cost).abs() < 1e-9);
}

#[test]
fn anticrossing_pipeline_reports_scan_coordinates() {
    let scan = synthetic_anticrossing_scan(
        &anticrossing_truth(),
        (81, 41),
        ScanExtent::new(100.0, 120.0, 50.0, 70.0),
        0.02,
        0.0,
        0,
    )
    .unwrap();
    let cfg = pipeline_config();

    let (result, diagnostics) = fit_anticrossing(&scan, &cfg).unwrap();
    assert!(diagnostics.is_none());
    assert_geometry_recovered(&result.parameters);

    let text = format_anticrossing_fit(&result, None);
    assert!(text.contains("Pass 2"));
}

#[test]
fn anticrossing_pipeline_is_deterministic() {
    let scan = synthetic_anticrossing_scan(
        &anticrossing_truth(),
        (81, 41),
        ScanExtent::new(0.0, 20.0, 0.0, 20.0),
        0.02,
        0.001,
        3,
    )
    .unwrap();
    let mut cfg = pipeline_config();
    cfg.simplex.max_evaluations = Some(400);

    let (a, _) = fit_anticrossing(&scan, &cfg).unwrap();
    let (b, _) = fit_anticrossing(&scan, &cfg).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn flat_scan_is_degenerate() {
    let scan = Scan2D::new(DMatrix::zeros(20, 20), ScanExtent::new(0.0, 5.0, 0.0, 5.0));
    let err = fit_anticrossing(&scan, &AnticrossingFitConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateInput);
}

#[test]
fn inverted_extent_is_degenerate() {
    let scan = Scan2D::new(DMatrix::from_element(20, 20, 1.0), ScanExtent::new(5.0, 0.0, 0.0, 5.0));
    let err = fit_anticrossing(&scan, &AnticrossingFitConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateInput);
}

#[test]
fn short_trace_is_a_shape_mismatch() {
    let trace = synthetic_polarization_trace(linspace(0.0, 1.0, 5), &polarization_truth(), 0.001, 0.0, 0).unwrap();
    let err = fit_polarization(&trace, &PolarizationFitConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}
