use std::sync::atomic::{AtomicUsize, Ordering};
use voxmetric::{
    compute_metrics, EmpiricalMutualInformation, ExactMi, FnExactMi, MetricConfig, Mode, Patch,
    Shape3, VolumeView, VoxMetricError, VoxMetricResult,
};

/// Relative tolerance between histogram MI and exact MI on smooth data.
const MI_RELATIVE_TOLERANCE: f32 = 0.15;

fn ramp(shape: Shape3) -> Vec<f32> {
    let mut data = Vec::with_capacity(shape.checked_len().unwrap());
    for x in 0..shape.nx {
        for y in 0..shape.ny {
            for z in 0..shape.nz {
                data.push((x + y + z) as f32);
            }
        }
    }
    data
}

struct MissingBackend {
    calls: AtomicUsize,
}

impl ExactMi for MissingBackend {
    fn name(&self) -> &str {
        "missing"
    }

    fn check_available(&self) -> VoxMetricResult<()> {
        Err(VoxMetricError::DependencyUnavailable {
            dependency: "missing".to_string(),
            hint: "install it".to_string(),
        })
    }

    fn evaluate(&self, _a: Patch<'_>, _b: Patch<'_>) -> VoxMetricResult<f32> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(0.0)
    }
}

#[test]
fn approximate_matches_exact_on_affine_ramp() {
    let shape = Shape3::new(8, 8, 8);
    let a = ramp(shape);
    let b: Vec<f32> = a.iter().map(|&v| 2.0 * v + 3.0).collect();
    let mask = vec![true; a.len()];
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vb = VolumeView::from_slice(&b, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();

    let approx_cfg = MetricConfig {
        radius: 1,
        bins: 32,
        ..MetricConfig::default()
    };
    let hybrid_cfg = MetricConfig {
        mode: Mode::Hybrid,
        ..approx_cfg.clone()
    };
    let backend = EmpiricalMutualInformation;

    let approx = compute_metrics(va, vb, vm, &approx_cfg, None).unwrap();
    let exact = compute_metrics(va, vb, vm, &hybrid_cfg, Some(&backend)).unwrap();

    for (&mi_a, &mi_e) in approx.mi.data().iter().zip(exact.mi.data()) {
        assert!(mi_e > 0.0);
        let rel = (mi_a - mi_e).abs() / mi_e;
        assert!(rel < MI_RELATIVE_TOLERANCE, "approx {mi_a} exact {mi_e}");
    }
    assert_eq!(approx.mse.data(), exact.mse.data());
    assert_eq!(approx.corr.data(), exact.corr.data());
}

#[test]
fn hybrid_calls_backend_once_per_masked_voxel() {
    let shape = Shape3::new(5, 4, 3);
    let a = ramp(shape);
    let mask: Vec<bool> = (0..a.len()).map(|idx| idx % 2 == 0).collect();
    let expected_calls = mask.iter().filter(|&&m| m).count();
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();

    let calls = AtomicUsize::new(0);
    let backend = FnExactMi::new("counting", |pa: Patch<'_>, pb: Patch<'_>| {
        calls.fetch_add(1, Ordering::Relaxed);
        assert_eq!(pa.extent(), pb.extent());
        Ok(pa.len() as f32)
    });
    let cfg = MetricConfig {
        radius: 1,
        mode: Mode::Hybrid,
        ..MetricConfig::default()
    };

    let maps = compute_metrics(va, va, vm, &cfg, Some(&backend)).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), expected_calls);
    assert_eq!(maps.stats.evaluated, expected_calls);
    // Corner voxel (0, 0, 0) has a 2x2x2 window.
    assert_eq!(maps.mi.data()[0], 8.0);
}

#[test]
fn unavailable_backend_fails_before_any_voxel() {
    let shape = Shape3::new(3, 3, 3);
    let a = ramp(shape);
    let mask = vec![true; a.len()];
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();
    let backend = MissingBackend {
        calls: AtomicUsize::new(0),
    };

    for mode in [Mode::Hybrid, Mode::Exact] {
        let cfg = MetricConfig {
            radius: 1,
            mode,
            ..MetricConfig::default()
        };
        let err = compute_metrics(va, va, vm, &cfg, Some(&backend)).unwrap_err();
        assert!(matches!(err, VoxMetricError::DependencyUnavailable { .. }));
    }
    assert_eq!(backend.calls.load(Ordering::Relaxed), 0);

    // Approximate mode never consults the backend.
    let cfg = MetricConfig {
        radius: 1,
        ..MetricConfig::default()
    };
    assert!(compute_metrics(va, va, vm, &cfg, Some(&backend)).is_ok());
}

#[test]
fn backend_error_aborts_the_call() {
    let shape = Shape3::new(4, 4, 4);
    let a = ramp(shape);
    let mask = vec![true; a.len()];
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();

    let backend = FnExactMi::new("flaky", |pa: Patch<'_>, _pb: Patch<'_>| {
        if pa.len() == 27 {
            Err(VoxMetricError::ExactMi {
                reason: "interior window rejected".to_string(),
            })
        } else {
            Ok(0.5)
        }
    });
    let cfg = MetricConfig {
        radius: 1,
        mode: Mode::Exact,
        ..MetricConfig::default()
    };
    let err = compute_metrics(va, va, vm, &cfg, Some(&backend)).unwrap_err();
    assert_eq!(
        err,
        VoxMetricError::ExactMi {
            reason: "interior window rejected".to_string()
        }
    );
}

#[test]
fn nan_from_backend_is_an_error() {
    let shape = Shape3::new(2, 2, 2);
    let a = ramp(shape);
    let mask = vec![true; a.len()];
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();
    let backend = FnExactMi::new("nan", |_a: Patch<'_>, _b: Patch<'_>| Ok(f32::NAN));
    let cfg = MetricConfig {
        radius: 1,
        mode: Mode::Hybrid,
        ..MetricConfig::default()
    };
    assert!(matches!(
        compute_metrics(va, va, vm, &cfg, Some(&backend)),
        Err(VoxMetricError::ExactMi { .. })
    ));
}
