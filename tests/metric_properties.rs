use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxmetric::lowlevel::{IntensityRange, JointHistogram, JointRange};
use voxmetric::{compute_metrics, MetricConfig, Shape3, VolumeView, Window};

fn random_volume(shape: Shape3, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..shape.checked_len().unwrap())
        .map(|_| rng.random_range(0.0f32..100.0))
        .collect()
}

fn sparse_mask(shape: Shape3) -> Vec<bool> {
    let mut mask = Vec::with_capacity(shape.checked_len().unwrap());
    for x in 0..shape.nx {
        for y in 0..shape.ny {
            for z in 0..shape.nz {
                mask.push((x + 2 * y + 3 * z) % 4 != 0);
            }
        }
    }
    mask
}

#[test]
fn metrics_are_symmetric() {
    let shape = Shape3::new(7, 6, 5);
    let a = random_volume(shape, 1);
    let b = random_volume(shape, 2);
    let mask = sparse_mask(shape);
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vb = VolumeView::from_slice(&b, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();
    let cfg = MetricConfig {
        radius: 1,
        bins: 16,
        ..MetricConfig::default()
    };

    let ab = compute_metrics(va, vb, vm, &cfg, None).unwrap();
    let ba = compute_metrics(vb, va, vm, &cfg, None).unwrap();

    for (idx, &inside) in mask.iter().enumerate() {
        if !inside {
            continue;
        }
        assert_eq!(ab.mse.data()[idx], ba.mse.data()[idx]);
        assert_eq!(ab.corr.data()[idx], ba.corr.data()[idx]);
        assert_eq!(ab.mi.data()[idx], ba.mi.data()[idx]);
    }
    assert_eq!(ab.stats, ba.stats);
}

#[test]
fn self_comparison_is_identity() {
    let shape = Shape3::new(6, 6, 6);
    let a = random_volume(shape, 7);
    let mask = vec![true; a.len()];
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();
    let cfg = MetricConfig {
        radius: 1,
        bins: 24,
        ..MetricConfig::default()
    };

    let maps = compute_metrics(va, va, vm, &cfg, None).unwrap();
    assert_eq!(maps.stats.evaluated, a.len());
    assert_eq!(maps.stats.degenerate.corr, 0);

    let range = JointRange::shared(IntensityRange::of_volume(va));
    let mut hist = JointHistogram::new(cfg.bins).unwrap();
    let mut patch = Vec::new();
    for x in 0..shape.nx {
        for y in 0..shape.ny {
            for z in 0..shape.nz {
                let idx = shape.index(x, y, z);
                assert_eq!(maps.mse.data()[idx], 0.0);
                assert!((maps.corr.data()[idx] - 1.0).abs() < 1e-6);

                let mi = maps.mi.data()[idx];
                assert!(mi >= 0.0);
                Window::around(x, y, z, cfg.radius, shape).gather(va, &mut patch);
                hist.mutual_information(&patch, &patch, range).unwrap();
                // Self pairs only occupy the diagonal, so occupied joint
                // cells equal occupied intensity bins.
                let bound = (hist.occupied_cells() as f32).ln();
                assert!(mi <= bound + 1e-5, "mi {mi} above ln(bins) {bound}");
            }
        }
    }
}

#[test]
fn constant_patches_flag_correlation() {
    let shape = Shape3::new(4, 4, 4);
    let mut a = random_volume(shape, 3);
    // Constant first plane pair: windows centered at x = 0 with radius 1
    // read planes 0 and 1 only.
    for v in a.iter_mut().take(2 * shape.plane_len()) {
        *v = 5.0;
    }
    let mut mask = vec![false; a.len()];
    for m in mask.iter_mut().take(shape.plane_len()) {
        *m = true;
    }
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();
    let cfg = MetricConfig {
        radius: 1,
        ..MetricConfig::default()
    };

    let maps = compute_metrics(va, va, vm, &cfg, None).unwrap();
    assert_eq!(maps.stats.evaluated, shape.plane_len());
    assert_eq!(maps.stats.degenerate.corr, shape.plane_len());
    assert!(maps.corr.data()[..shape.plane_len()].iter().all(|v| v.is_nan()));
    assert!(maps.mse.data()[..shape.plane_len()].iter().all(|&v| v == 0.0));
}

#[test]
fn metric_value_ranges_hold() {
    let shape = Shape3::new(8, 5, 6);
    let a = random_volume(shape, 11);
    let b: Vec<f32> = a
        .iter()
        .zip(random_volume(shape, 12))
        .map(|(&x, n)| 0.5 * x + 0.2 * n)
        .collect();
    let mask = sparse_mask(shape);
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vb = VolumeView::from_slice(&b, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();

    let maps = compute_metrics(va, vb, vm, &MetricConfig::default(), None).unwrap();
    for (idx, &inside) in mask.iter().enumerate() {
        if inside {
            assert!(maps.mse.data()[idx] >= 0.0);
            let r = maps.corr.data()[idx];
            assert!((-1.0..=1.0).contains(&r));
            assert!(maps.mi.data()[idx] >= 0.0);
        } else {
            assert!(maps.mse.data()[idx].is_nan());
            assert!(maps.corr.data()[idx].is_nan());
            assert!(maps.mi.data()[idx].is_nan());
        }
    }
}
