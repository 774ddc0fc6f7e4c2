//! # cspad-metrology
//!
//! Turn an optical metrology survey of a CSPAD detector into calibrated
//! per-ASIC **basis grids** (`p`, `s`, `f`, shape) usable for mapping pixel
//! indices to lab-frame positions.
//!
//! The LCLS detector group measures the four corners of every 2x1 sensor with
//! an optical probe. Those hand-measured points are noisy and sit slightly
//! outside the silicon, so turning them into pixel geometry takes some care:
//!
//! 1. **Read** the survey: 128 points, 32 per quadrant, in scan order
//! 2. **Select** the four corners of a 2x1 using the scan sequence
//! 3. **Derive** slow/fast step vectors (averaged parallel edges, scaled to the
//!    pixel pitch) and the origins of both ASICs, according to the 2x1's
//!    symmetry class
//! 4. **Check** orthogonality against a single-pixel angular tolerance
//! 5. **Correct** `s` and `f` to be exactly perpendicular by splitting the
//!    angular error between them
//!
//! Quadrant placement and the CXI axis convention are applied downstream.
//!
//! ## Example
//!
//! ```no_run
//! use cspad_metrology::{read_metrology_file, build_twobyone_frames, BuilderConfig};
//!
//! let survey = read_metrology_file("data/cspad_metrology.txt").unwrap();
//! let config = BuilderConfig { verbose: true, ..Default::default() };
//!
//! for (q, quad) in survey.quadrants().iter().enumerate() {
//!     for two_by_one in 0..8 {
//!         let (asic0, asic1) = build_twobyone_frames(quad, q, two_by_one, &config).unwrap();
//!         println!("q{} 2x1 {}: p0={:?} p1={:?}", q, two_by_one, asic0.p, asic1.p);
//!     }
//! }
//! ```

pub mod basis_grid;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod metrology;
pub mod qc;
pub mod twobyone;

pub use basis_grid::BasisGrid;
pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, TracingSink};
pub use error::MetrologyError;
pub use metrology::{parse_metrology, read_metrology_file, QuadrantCorners, Survey};
pub use qc::{check_orthogonality, QcOutcome, DEFAULT_ANGLE_TOLERANCE_DEG};
pub use twobyone::{
    build_twobyone_frames, quadrant_basis_grids, reconstruct_twobyone, BuilderConfig,
    SymmetryClass, TwoByOne, TwoByOneReconstruction,
};

// Commonly used types.
// Survey coordinates are millimetres with sub-micron resolution, so
// everything is 64-bit.
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
