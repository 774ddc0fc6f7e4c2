//! Basis grid: the calibrated geometry of a single ASIC.
//!
//! A basis grid places a regular pixel grid in the lab frame with three
//! vectors and a shape:
//!
//! - `p`: position of the first pixel in memory (metres)
//! - `s`: step to the next pixel along the slow-scan axis (rows)
//! - `f`: step to the next pixel along the fast-scan axis (columns)
//!
//! # Coordinate conventions
//!
//! The frame is the metrology frame: no CXI axis swap and no quadrant
//! placement has been applied. `s` and `f` carry the pixel pitch in the
//! survey's length units, exactly as they come out of the reconstruction.
//!
//! ```text
//! pixel (i, j) → p + i·s + j·f
//! ```

use crate::geometry::ASIC_SHAPE;
use crate::Vector3;

/// Calibrated frame of one ASIC.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisGrid {
    /// Position of pixel `(0, 0)`.
    pub p: Vector3,
    /// Per-pixel step along the slow-scan axis.
    pub s: Vector3,
    /// Per-pixel step along the fast-scan axis.
    pub f: Vector3,
    /// Grid shape, `(slow, fast)`.
    pub shape: (usize, usize),
}

impl BasisGrid {
    /// Create an ASIC-shaped grid (185 x 194).
    pub fn new(p: Vector3, s: Vector3, f: Vector3) -> Self {
        Self {
            p,
            s,
            f,
            shape: ASIC_SHAPE,
        }
    }

    /// Number of pixels in the grid.
    pub fn num_pixels(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    /// Lab position of the (possibly fractional) pixel index `(slow, fast)`.
    pub fn pixel_position(&self, slow: f64, fast: f64) -> Vector3 {
        self.p + slow * self.s + fast * self.f
    }

    /// Lab positions of the four corner pixels, in the order
    /// `(0, 0)`, `(0, last)`, `(last, last)`, `(last, 0)`.
    pub fn corners(&self) -> [Vector3; 4] {
        let ns = self.shape.0.saturating_sub(1) as f64;
        let nf = self.shape.1.saturating_sub(1) as f64;
        [
            self.pixel_position(0.0, 0.0),
            self.pixel_position(0.0, nf),
            self.pixel_position(ns, nf),
            self.pixel_position(ns, 0.0),
        ]
    }

    /// Unit normal of the grid plane, `s × f` normalised.
    pub fn normal(&self) -> Vector3 {
        self.s.cross(&self.f).normalize()
    }

    /// The grid as a plain `(p, s, f, shape)` tuple, the layout geometry
    /// assemblers consume.
    pub fn to_tuple(&self) -> (Vector3, Vector3, Vector3, (usize, usize)) {
        (self.p, self.s, self.f, self.shape)
    }

    /// Pixel positions of the whole grid, row-major (slow index outermost).
    pub fn pixel_positions(&self) -> Vec<Vector3> {
        let (ns, nf) = self.shape;
        let mut out = Vec::with_capacity(ns * nf);
        for i in 0..ns {
            let row = self.p + i as f64 * self.s;
            for j in 0..nf {
                out.push(row + j as f64 * self.f);
            }
        }
        out
    }
}
