//! Python bindings for cspad-metrology via PyO3.
//!
//! Exposes the metrology reader and 2x1 reconstruction as the
//! `cspad_metrology` module.

mod basis_grid;

use numpy::ndarray;
use numpy::{PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

use cspad_metrology::twobyone::TwoByOne;
use cspad_metrology::{
    build_twobyone_frames, check_orthogonality, read_metrology_file, BuilderConfig,
    MetrologyError, QuadrantCorners, TracingSink, Vector3,
};

use crate::basis_grid::{grid_to_py, PyGridTuple};

fn to_py_err(e: MetrologyError) -> PyErr {
    match e {
        MetrologyError::Format { .. } => pyo3::exceptions::PyIOError::new_err(e.to_string()),
        MetrologyError::InvalidArgument(_) => {
            pyo3::exceptions::PyValueError::new_err(e.to_string())
        }
        MetrologyError::InternalInvariant { .. } => {
            pyo3::exceptions::PyRuntimeError::new_err(e.to_string())
        }
    }
}

/// Read a CSPAD metrology file.
///
/// Args:
///     path: Path to the flat text survey (index, x, y, z per row, mm).
///
/// Returns:
///     list of four (32, 3) float arrays, one per quadrant, in scan order.
///
/// Raises:
///     IOError: if the file cannot be read or is not 128 rows x 3 coordinates.
#[pyfunction]
fn read_metrology<'py>(py: Python<'py>, path: &str) -> PyResult<Vec<Bound<'py, PyArray2<f64>>>> {
    let survey = read_metrology_file(path).map_err(|e| match e.downcast::<MetrologyError>() {
        Ok(me) => to_py_err(me),
        Err(e) => pyo3::exceptions::PyIOError::new_err(format!("{:#}", e)),
    })?;

    Ok(survey
        .quadrants()
        .iter()
        .map(|quad| {
            let rows = quad.to_rows();
            let arr = ndarray::Array2::from_shape_fn((rows.len(), 3), |(i, j)| rows[i][j]);
            PyArray2::from_owned_array(py, arr)
        })
        .collect())
}

/// Convert one 2x1 of a quadrant metrology into two basis grids.
///
/// Args:
///     quad_metrology: (32, 3) array of measured corners for one quadrant (mm).
///     quad_index: Quadrant index, used to label QC warnings.
///     two_by_one_index: Index of the 2x1 within the quadrant (0...7).
///     verbose: Log a warning when the orthogonality QC fails. Default False.
///     tol: QC tolerance in degrees. Default 0.148.
///
/// Returns:
///     ((p, s, f, shape), (p, s, f, shape)), one tuple per ASIC. p, s and f
///     are (3,) arrays; shape is (185, 194).
///
/// Raises:
///     ValueError: if the array is not (32, 3) or the index is out of range.
#[pyfunction]
#[pyo3(signature = (quad_metrology, quad_index, two_by_one_index, verbose = false, tol = 0.148))]
fn twobyone_to_bg<'py>(
    py: Python<'py>,
    quad_metrology: PyReadonlyArray2<'_, f64>,
    quad_index: usize,
    two_by_one_index: i64,
    verbose: bool,
    tol: f64,
) -> PyResult<(PyGridTuple<'py>, PyGridTuple<'py>)> {
    let arr = quad_metrology.as_array();
    let (rows, cols) = arr.dim();
    let data: Vec<f64> = arr.iter().copied().collect();
    let corners = QuadrantCorners::from_flat(&data, rows, cols).map_err(to_py_err)?;
    let two_by_one = TwoByOne::try_from(two_by_one_index).map_err(to_py_err)?;

    let config = BuilderConfig {
        qc_tolerance_deg: tol,
        verbose,
        ..Default::default()
    };
    let (a, b) = build_twobyone_frames(&corners, quad_index, two_by_one.index(), &config)
        .map_err(to_py_err)?;
    Ok((grid_to_py(py, &a), grid_to_py(py, &b)))
}

/// Check that two basis vectors are orthogonal to within `tol` degrees.
///
/// Args:
///     v, w: 3-vectors.
///     two_by_one_index: 2x1 index, used to label the warning.
///     tol: Tolerance in degrees. Default 0.148.
///     verbose: Log a warning on failure. Default False.
///
/// Returns:
///     True if the QC passed.
#[pyfunction]
#[pyo3(signature = (v, w, two_by_one_index, tol = 0.148, verbose = false))]
fn qc_angle(v: [f64; 3], w: [f64; 3], two_by_one_index: usize, tol: f64, verbose: bool) -> bool {
    check_orthogonality(
        &Vector3::from(v),
        &Vector3::from(w),
        None,
        two_by_one_index,
        tol,
        &TracingSink::new(verbose),
    )
    .passed()
}

// ═══════════════════════════════════════════════════════════════════════════
// Module definition
// ═══════════════════════════════════════════════════════════════════════════

/// cspad_metrology: CSPAD optical metrology to basis grids
#[pymodule]
#[pyo3(name = "cspad_metrology")]
fn cspad_metrology_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(read_metrology, m)?)?;
    m.add_function(wrap_pyfunction!(twobyone_to_bg, m)?)?;
    m.add_function(wrap_pyfunction!(qc_angle, m)?)?;
    Ok(())
}
