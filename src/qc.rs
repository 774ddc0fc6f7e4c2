//! Quality control of the measured basis vectors.
//!
//! The longest side of a 2x1 is 388 pixels. To reach single-pixel accuracy
//! across that side, the angle between the slow and fast edges must be
//! within about `atan(1/388)` of 90 degrees, i.e. roughly 0.0026 rad or
//! 0.148 degrees. That is the default tolerance.
//!
//! The check is advisory: it reports through a [`DiagnosticSink`] and never
//! alters the vectors. The caller enforces orthogonality afterwards.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::geometry::ASIC_COLS;
use crate::Vector3;

/// Default orthogonality tolerance in degrees.
pub const DEFAULT_ANGLE_TOLERANCE_DEG: f64 = 0.148;

/// Angular tolerance (degrees) giving one pixel of error across the full
/// 388-pixel length of a 2x1.
pub fn single_pixel_angle_tolerance_deg() -> f64 {
    (1.0 / (2 * ASIC_COLS) as f64).atan().to_degrees()
}

/// Signed deviation from perpendicular, in degrees.
///
/// Uses `asin` of the normalised dot product, which tracks `90° - angle`
/// closely only near orthogonality. Kept for compatibility with existing
/// metrology QC reports.
pub fn orthogonality_deviation_deg(v: &Vector3, w: &Vector3) -> f64 {
    (v.dot(w) / (v.norm() * w.norm())).asin().to_degrees()
}

/// Result of an orthogonality check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcOutcome {
    pub deviation_deg: f64,
    pub tolerance_deg: f64,
}

impl QcOutcome {
    /// `true` when `|deviation| <= tolerance`.
    pub fn passed(&self) -> bool {
        self.deviation_deg.abs() <= self.tolerance_deg
    }
}

/// Check that `v` and `w` are perpendicular to within `tolerance_deg`.
///
/// On failure an [`Diagnostic::OrthogonalityFailed`] is sent to `sink`.
/// A NaN deviation (degenerate vectors) counts as a failure.
pub fn check_orthogonality(
    v: &Vector3,
    w: &Vector3,
    quad: Option<usize>,
    two_by_one: usize,
    tolerance_deg: f64,
    sink: &dyn DiagnosticSink,
) -> QcOutcome {
    let outcome = QcOutcome {
        deviation_deg: orthogonality_deviation_deg(v, w),
        tolerance_deg,
    };
    if !outcome.passed() {
        sink.report(&Diagnostic::OrthogonalityFailed {
            quad,
            two_by_one,
            deviation_deg: outcome.deviation_deg,
            tolerance_deg,
        });
    }
    outcome
}
