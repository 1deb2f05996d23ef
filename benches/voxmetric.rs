use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use voxmetric::{
    compute_metrics, EmpiricalMutualInformation, KernelStrategy, MetricConfig, Mode, Shape3,
    VolumeView,
};

fn make_volume(shape: Shape3, salt: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(shape.checked_len().unwrap());
    for x in 0..shape.nx {
        for y in 0..shape.ny {
            for z in 0..shape.nz {
                let value = ((x * 13) ^ (y * 7) ^ (z * 5) ^ (x * y * salt)) & 0xFF;
                data.push(value as f32);
            }
        }
    }
    data
}

fn make_mask(shape: Shape3) -> Vec<bool> {
    // Centered ellipsoid, roughly the fraction of a head volume inside a brain mask.
    let (cx, cy, cz) = (
        shape.nx as f32 / 2.0,
        shape.ny as f32 / 2.0,
        shape.nz as f32 / 2.0,
    );
    let mut mask = Vec::with_capacity(shape.checked_len().unwrap());
    for x in 0..shape.nx {
        for y in 0..shape.ny {
            for z in 0..shape.nz {
                let dx = (x as f32 - cx) / cx;
                let dy = (y as f32 - cy) / cy;
                let dz = (z as f32 - cz) / cz;
                mask.push(dx * dx + dy * dy + dz * dz <= 1.0);
            }
        }
    }
    mask
}

fn bench_metrics(c: &mut Criterion) {
    let shape = Shape3::new(48, 48, 48);
    let a = make_volume(shape, 3);
    let b = make_volume(shape, 11);
    let mask = make_mask(shape);
    let va = VolumeView::from_slice(&a, shape).unwrap();
    let vb = VolumeView::from_slice(&b, shape).unwrap();
    let vm = VolumeView::from_slice(&mask, shape).unwrap();

    let approx = MetricConfig {
        radius: 2,
        threads: Some(1),
        ..MetricConfig::default()
    };
    c.bench_function("approximate_r2_sequential", |bench| {
        bench.iter(|| black_box(compute_metrics(va, vb, vm, &approx, None).unwrap()));
    });

    if cfg!(feature = "simd") {
        let simd = MetricConfig {
            strategy: KernelStrategy::Simd,
            ..approx.clone()
        };
        c.bench_function("approximate_r2_sequential_simd", |bench| {
            bench.iter(|| black_box(compute_metrics(va, vb, vm, &simd, None).unwrap()));
        });
    }

    if cfg!(feature = "rayon") {
        let parallel = MetricConfig {
            threads: None,
            ..approx.clone()
        };
        // The first call builds the rayon pool; keep it out of the samples.
        black_box(compute_metrics(va, vb, vm, &parallel, None).unwrap());
        c.bench_function("approximate_r2_parallel", |bench| {
            bench.iter(|| black_box(compute_metrics(va, vb, vm, &parallel, None).unwrap()));
        });
    }

    let small = Shape3::new(16, 16, 16);
    let sa = make_volume(small, 3);
    let sb = make_volume(small, 11);
    let smask = make_mask(small);
    let sva = VolumeView::from_slice(&sa, small).unwrap();
    let svb = VolumeView::from_slice(&sb, small).unwrap();
    let svm = VolumeView::from_slice(&smask, small).unwrap();
    let hybrid = MetricConfig {
        radius: 2,
        mode: Mode::Hybrid,
        threads: Some(1),
        ..MetricConfig::default()
    };
    let backend = EmpiricalMutualInformation;
    c.bench_function("hybrid_empirical_r2_16cube", |bench| {
        bench.iter(|| {
            black_box(compute_metrics(sva, svb, svm, &hybrid, Some(&backend)).unwrap())
        });
    });
}

criterion_group!(benches, bench_metrics);
criterion_main!(benches);
