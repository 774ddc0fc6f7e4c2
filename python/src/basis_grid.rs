use numpy::PyArray1;
use pyo3::prelude::*;

use cspad_metrology::{BasisGrid, Vector3};

/// `(p, s, f, shape)` as handed to Python: three (3,) arrays and the shape.
pub(crate) type PyGridTuple<'py> = (
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    (usize, usize),
);

fn to_numpy<'py>(py: Python<'py>, v: &Vector3) -> Bound<'py, PyArray1<f64>> {
    PyArray1::from_slice(py, v.as_slice())
}

/// Convert a basis grid into the tuple layout geometry assemblers unpack.
pub(crate) fn grid_to_py<'py>(py: Python<'py>, grid: &BasisGrid) -> PyGridTuple<'py> {
    let (p, s, f, shape) = grid.to_tuple();
    (to_numpy(py, &p), to_numpy(py, &s), to_numpy(py, &f), shape)
}
