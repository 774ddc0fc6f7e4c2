//! Physical constants of the CSPAD sensor and the small vector helpers the
//! metrology reconstruction is built on.
//!
//! All lengths here are in **millimetres**, the unit of the optical survey.
//!
//! # Layout of a 2x1
//!
//! ```text
//!   +----------------------+--+----------------------+   ^
//!   |        ASIC 0        |  |        ASIC 1        |   | 185 px (slow)
//!   +----------------------+--+----------------------+   v
//!   <------ 194 px ------->  gap <------ 194 px ----->     (fast)
//! ```

use nalgebra::{Rotation3, Unit};

use crate::{Matrix3, Vector3};

/// Pixel pitch in mm.
pub const PIXEL_SIZE_MM: f64 = 0.10992;

/// Physical gap between the two ASICs of a 2x1, in mm (about 2.5 pixels).
pub const ASIC_GAP_MM: f64 = 0.27480;

/// Rows (slow scan) of a single ASIC.
pub const ASIC_ROWS: usize = 185;

/// Columns (fast scan) of a single ASIC.
pub const ASIC_COLS: usize = 194;

/// Pixel grid shape of every ASIC, `(slow, fast)`.
pub const ASIC_SHAPE: (usize, usize) = (ASIC_ROWS, ASIC_COLS);

/// Millimetres per metre; survey points are in mm, origins are reported in m.
pub const MM_PER_M: f64 = 1000.0;

/// Length of the long (fast-scan) side of a 2x1 in mm: two ASICs plus the gap.
pub fn twobyone_long_side_mm() -> f64 {
    2.0 * ASIC_COLS as f64 * PIXEL_SIZE_MM + ASIC_GAP_MM
}

/// Length of the short (slow-scan) side of a 2x1 in mm.
pub fn twobyone_short_side_mm() -> f64 {
    ASIC_ROWS as f64 * PIXEL_SIZE_MM
}

/// Length of the diagonal of a 2x1 in mm.
pub fn twobyone_diagonal_mm() -> f64 {
    let fl = twobyone_long_side_mm();
    let sl = twobyone_short_side_mm();
    (fl * fl + sl * sl).sqrt()
}

/// Normalise a vector to unit length.
///
/// A zero vector yields NaN components, which the orthogonality check
/// downstream turns into an error rather than silently producing a frame.
pub fn unit(v: &Vector3) -> Vector3 {
    v / v.norm()
}

/// Euler-Rodrigues rotation matrix about `axis` by `angle` radians.
///
/// Positive angles turn **clockwise** when viewed from the tip of `axis`
/// looking back at the origin. This is the convention of the survey tooling:
/// rotating the slow vector by `+rot` and the fast vector by `-rot` about
/// `s × f` opens or closes the angle between them by `2·rot`.
///
/// `axis` need not be normalised. A zero axis produces NaNs.
pub fn er_rotation_matrix(axis: &Vector3, angle: f64) -> Matrix3 {
    let axis = Unit::new_unchecked(unit(axis));
    Rotation3::from_axis_angle(&axis, -angle).into_inner()
}

/// Angle between two vectors in radians, in `[0, π]`.
pub fn angle_between(v: &Vector3, w: &Vector3) -> f64 {
    let cos = v.dot(w) / (v.norm() * w.norm());
    cos.clamp(-1.0, 1.0).acos()
}
