//! Python bindings for the voxmetric windowed similarity library.
//!
//! This module exposes `compute_metrics` over numpy arrays via PyO3. The
//! kernel runs with the GIL released; Python exact-MI backends re-acquire
//! it per voxel.

use numpy::ndarray::Array3;
use numpy::{
    IntoPyArray, PyArray1, PyArray3, PyArrayMethods, PyReadonlyArray1, PyReadonlyArray3,
    PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyImportError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyString};

use voxmetric::{
    compute_metrics as rust_compute_metrics, EmpiricalMutualInformation, ExactMi,
    KernelStrategy, MetricConfig, Mode, OwnedVolume, Patch, VolumeView, VoxMetricError,
    VoxMetricResult,
};

/// Convert a VoxMetricError to a Python exception.
fn to_py_err(err: VoxMetricError) -> PyErr {
    match err {
        VoxMetricError::DependencyUnavailable { .. } => PyImportError::new_err(err.to_string()),
        VoxMetricError::ShapeMismatch { .. }
        | VoxMetricError::NonFiniteVoxel { .. }
        | VoxMetricError::InvalidConfiguration { .. }
        | VoxMetricError::InvalidDimensions { .. }
        | VoxMetricError::BufferTooSmall { .. }
        | VoxMetricError::InvalidPatch { .. } => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn patch_array<'py>(py: Python<'py>, patch: &Patch<'_>) -> PyResult<Bound<'py, PyArray3<f32>>> {
    PyArray1::from_slice(py, patch.values()).reshape(patch.extent())
}

enum PyBackend {
    /// `f(patch_a, patch_b) -> float`, called with 3D float32 arrays.
    Callable(Py<PyAny>),
    /// ANTsPy Mattes mutual information.
    Ants,
}

/// Exact-MI backend implemented in Python.
struct PyExactMi {
    name: String,
    backend: PyBackend,
}

impl PyExactMi {
    fn evaluate_py(&self, py: Python<'_>, a: &Patch<'_>, b: &Patch<'_>) -> PyResult<f64> {
        let arr_a = patch_array(py, a)?;
        let arr_b = patch_array(py, b)?;
        match &self.backend {
            PyBackend::Callable(func) => func.bind(py).call1((arr_a, arr_b))?.extract::<f64>(),
            PyBackend::Ants => {
                let ants = py.import("ants")?;
                let fixed = ants.call_method1("from_numpy", (arr_a,))?;
                let moving = ants.call_method1("from_numpy", (arr_b,))?;
                let kwargs = PyDict::new(py);
                kwargs.set_item("metric_type", "MattesMutualInformation")?;
                let value: f64 = ants
                    .call_method("image_similarity", (fixed, moving), Some(&kwargs))?
                    .extract()?;
                // ANTs reports MI as a cost to minimize.
                Ok(-value)
            }
        }
    }
}

impl ExactMi for PyExactMi {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_available(&self) -> VoxMetricResult<()> {
        match &self.backend {
            PyBackend::Callable(_) => Ok(()),
            PyBackend::Ants => Python::attach(|py| {
                py.import("ants")
                    .map(|_| ())
                    .map_err(|err| VoxMetricError::DependencyUnavailable {
                        dependency: "ants".to_string(),
                        hint: format!("install ANTsPy (pip install antspyx): {err}"),
                    })
            }),
        }
    }

    fn evaluate(&self, a: Patch<'_>, b: Patch<'_>) -> VoxMetricResult<f32> {
        Python::attach(|py| self.evaluate_py(py, &a, &b))
            .map(|v| v as f32)
            .map_err(|err| VoxMetricError::ExactMi {
                reason: format!("{}: {err}", self.name),
            })
    }
}

enum ExactChoice {
    Empirical,
    Python(PyExactMi),
}

impl ExactChoice {
    fn parse(obj: &Bound<'_, PyAny>) -> PyResult<Self> {
        if let Ok(name) = obj.cast::<PyString>() {
            return match name.to_str()?.to_lowercase().as_str() {
                "ants" => Ok(ExactChoice::Python(PyExactMi {
                    name: "ants".to_string(),
                    backend: PyBackend::Ants,
                })),
                "empirical" => Ok(ExactChoice::Empirical),
                _ => Err(PyValueError::new_err(
                    "exact_mi must be 'ants', 'empirical' or a callable",
                )),
            };
        }
        if !obj.is_callable() {
            return Err(PyTypeError::new_err(
                "exact_mi must be 'ants', 'empirical' or a callable",
            ));
        }
        let name = obj
            .getattr("__name__")
            .and_then(|n| n.extract::<String>())
            .unwrap_or_else(|_| "callable".to_string());
        Ok(ExactChoice::Python(PyExactMi {
            name,
            backend: PyBackend::Callable(obj.clone().unbind()),
        }))
    }

    fn as_dyn(&self) -> &dyn ExactMi {
        match self {
            ExactChoice::Empirical => &EmpiricalMutualInformation,
            ExactChoice::Python(backend) => backend,
        }
    }
}

fn parse_mode(mode: &str) -> PyResult<Mode> {
    match mode.to_lowercase().as_str() {
        "approximate" => Ok(Mode::Approximate),
        "hybrid" => Ok(Mode::Hybrid),
        "exact" => Ok(Mode::Exact),
        _ => Err(PyValueError::new_err(
            "mode must be 'approximate', 'hybrid' or 'exact'",
        )),
    }
}

fn parse_strategy(strategy: &str) -> PyResult<KernelStrategy> {
    match strategy.to_lowercase().as_str() {
        "scalar" => Ok(KernelStrategy::Scalar),
        "simd" => Ok(KernelStrategy::Simd),
        _ => Err(PyValueError::new_err("strategy must be 'scalar' or 'simd'")),
    }
}

fn shape_of<T: numpy::Element>(array: &PyReadonlyArray3<'_, T>) -> [usize; 3] {
    let shape = array.shape();
    [shape[0], shape[1], shape[2]]
}

fn into_pyarray<'py>(
    py: Python<'py>,
    volume: OwnedVolume<f32>,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let shape = volume.shape();
    let array = Array3::from_shape_vec((shape.nx, shape.ny, shape.nz), volume.into_vec())
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    Ok(array.into_pyarray(py))
}

type MetricArrays<'py> = (
    Bound<'py, PyArray3<f32>>,
    Bound<'py, PyArray3<f32>>,
    Bound<'py, PyArray3<f32>>,
    Bound<'py, PyDict>,
);

/// Compute voxel-wise MSE, correlation and mutual information maps.
///
/// Args:
///     volume_a: 3D float32 numpy array (C-contiguous)
///     volume_b: 3D float32 numpy array with the same shape
///     mask: 3D bool numpy array with the same shape
///     radius: Window radius; windows have side 2 * radius + 1
///     mode: "approximate", "hybrid" or "exact" (default: "approximate")
///     bins: Histogram bins per axis for approximate MI (default: 32)
///     threads: Worker threads (default: None, all cores)
///     strategy: "scalar" or "simd" for MSE/CORR (default: "scalar")
///     exact_mi: "ants", "empirical" or a callable f(a, b) -> float
///         taking two 3D float32 patches; required in hybrid and exact modes
///     min_variance: Variance at or below which a patch counts as constant
///         (default: 0.0)
///
/// Returns:
///     Tuple (mse, corr, mi, stats); maps hold NaN outside the mask and
///     stats is a dict with evaluated, degenerate_corr and degenerate_mi.
#[pyfunction]
#[pyo3(signature = (
    volume_a,
    volume_b,
    mask,
    radius,
    mode = "approximate",
    bins = 32,
    threads = None,
    strategy = "scalar",
    exact_mi = None,
    min_variance = 0.0
))]
#[allow(clippy::too_many_arguments)]
fn compute_metrics<'py>(
    py: Python<'py>,
    volume_a: PyReadonlyArray3<'py, f32>,
    volume_b: PyReadonlyArray3<'py, f32>,
    mask: PyReadonlyArray3<'py, bool>,
    radius: usize,
    mode: &str,
    bins: usize,
    threads: Option<usize>,
    strategy: &str,
    exact_mi: Option<Bound<'py, PyAny>>,
    min_variance: f64,
) -> PyResult<MetricArrays<'py>> {
    let cfg = MetricConfig {
        radius,
        mode: parse_mode(mode)?,
        bins,
        strategy: parse_strategy(strategy)?,
        threads,
        min_variance,
    };
    let exact = exact_mi.as_ref().map(ExactChoice::parse).transpose()?;

    let view_a =
        VolumeView::from_slice(volume_a.as_slice()?, shape_of(&volume_a)).map_err(to_py_err)?;
    let view_b =
        VolumeView::from_slice(volume_b.as_slice()?, shape_of(&volume_b)).map_err(to_py_err)?;
    let view_mask = VolumeView::from_slice(mask.as_slice()?, shape_of(&mask)).map_err(to_py_err)?;

    let backend = exact.as_ref().map(ExactChoice::as_dyn);
    let maps = py
        .detach(|| rust_compute_metrics(view_a, view_b, view_mask, &cfg, backend))
        .map_err(to_py_err)?;

    let (mse, corr, mi, stats) = maps.into_parts();
    let stats_dict = PyDict::new(py);
    stats_dict.set_item("evaluated", stats.evaluated)?;
    stats_dict.set_item("degenerate_corr", stats.degenerate.corr)?;
    stats_dict.set_item("degenerate_mi", stats.degenerate.mi)?;
    Ok((
        into_pyarray(py, mse)?,
        into_pyarray(py, corr)?,
        into_pyarray(py, mi)?,
        stats_dict,
    ))
}

/// Plug-in mutual information (nats) of two equally sized samples.
///
/// Every distinct value is its own symbol; no binning is applied.
#[pyfunction]
fn empirical_mutual_information(
    a: PyReadonlyArray1<'_, f32>,
    b: PyReadonlyArray1<'_, f32>,
) -> PyResult<f64> {
    let a = a.as_slice()?;
    let b = b.as_slice()?;
    if a.is_empty() || a.len() != b.len() {
        return Err(PyValueError::new_err(
            "samples must be non-empty and of equal length",
        ));
    }
    Ok(EmpiricalMutualInformation::mutual_information(a, b))
}

/// Python module for voxmetric.
#[pymodule]
fn _voxmetric(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compute_metrics, m)?)?;
    m.add_function(wrap_pyfunction!(empirical_mutual_information, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
