//! Reconstruction of ASIC basis grids from the measured corners of a 2x1.
//!
//! A 2x1 is two ASICs bonded side by side on one sensor. The survey measures
//! the four corners of the sensor rectangle; from those we derive:
//!
//! 1. slow (`s`) and fast (`f`) per-pixel step vectors, each the average of
//!    two parallel edges scaled to the pixel pitch,
//! 2. the origin of the first ASIC, found by walking in from a reference
//!    corner along the measured diagonal, and the origin of the second ASIC
//!    one ASIC width plus the gap further along `f`,
//! 3. an orthogonality QC on the raw `s`/`f`, followed by a symmetric
//!    rotation that makes them exactly perpendicular.
//!
//! Which measured corner plays which role depends on how the 2x1 sits on the
//! quadrant. There are three symmetry classes, see [`SymmetryClass`].
//!
//! Corners are in millimetres. Origins are reported in metres; `s` and `f`
//! keep the pitch in millimetres.

use std::f64::consts::FRAC_PI_2;

use tracing::debug;

use crate::basis_grid::BasisGrid;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{MetrologyError, Result};
use crate::geometry::{
    angle_between, er_rotation_matrix, twobyone_diagonal_mm, unit, ASIC_COLS, ASIC_GAP_MM,
    MM_PER_M, PIXEL_SIZE_MM,
};
use crate::metrology::{QuadrantCorners, Survey, CORNERS_PER_TWOBYONE, TWOBYONES_PER_QUAD};
use crate::qc::{check_orthogonality, QcOutcome, DEFAULT_ANGLE_TOLERANCE_DEG};
use crate::Vector3;

/// Order in which the 2x1s of a quadrant are optically scanned, and hence
/// the order their corners appear in the survey.
pub const SCAN_SEQUENCE: [usize; TWOBYONES_PER_QUAD] = [1, 0, 3, 2, 4, 5, 7, 6];

/// `s · f` magnitude above which the corrected vectors are rejected.
pub const ORTHOGONALITY_EPSILON: f64 = 1e-10;

// ── 2x1 index ───────────────────────────────────────────────────────────────

/// Validated index (0..=7) of a 2x1 within its quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TwoByOne {
    index: usize,
    scan_position: usize,
}

impl TwoByOne {
    /// All 2x1s of a quadrant in index order.
    pub fn all() -> impl Iterator<Item = TwoByOne> {
        (0..TWOBYONES_PER_QUAD).filter_map(|i| TwoByOne::try_from(i).ok())
    }

    pub fn index(self) -> usize {
        self.index
    }

    /// Position of this 2x1 in [`SCAN_SEQUENCE`].
    pub fn scan_position(self) -> usize {
        self.scan_position
    }

    /// First survey row of this 2x1's four corners within its quadrant.
    pub fn first_row(self) -> usize {
        self.scan_position * CORNERS_PER_TWOBYONE
    }

    pub fn symmetry_class(self) -> SymmetryClass {
        SYMMETRY_CLASSES[self.index]
    }
}

impl TryFrom<usize> for TwoByOne {
    type Error = MetrologyError;

    fn try_from(index: usize) -> Result<Self> {
        SCAN_SEQUENCE
            .iter()
            .position(|&i| i == index)
            .map(|scan_position| TwoByOne {
                index,
                scan_position,
            })
            .ok_or_else(|| {
                MetrologyError::InvalidArgument(format!(
                    "two_by_one_index must be in 0...{}, got {}",
                    TWOBYONES_PER_QUAD - 1,
                    index
                ))
            })
    }
}

impl TryFrom<i64> for TwoByOne {
    type Error = MetrologyError;

    fn try_from(index: i64) -> Result<Self> {
        let index = usize::try_from(index).map_err(|_| {
            MetrologyError::InvalidArgument(format!(
                "two_by_one_index must be in 0...{}, got {}",
                TWOBYONES_PER_QUAD - 1,
                index
            ))
        })?;
        TwoByOne::try_from(index)
    }
}

// ── Symmetry classes ────────────────────────────────────────────────────────

/// Difference of two measured corners, `corner[head] - corner[tail]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub head: usize,
    pub tail: usize,
}

impl Edge {
    const fn new(head: usize, tail: usize) -> Self {
        Self { head, tail }
    }

    pub fn vector(&self, corners: &[Vector3; CORNERS_PER_TWOBYONE]) -> Vector3 {
        corners[self.head] - corners[self.tail]
    }
}

/// Geometric role of each of the four measured corners of a 2x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerRoles {
    /// Two edges parallel to the slow-scan axis.
    pub slow: [Edge; 2],
    /// Two edges parallel to the fast-scan axis.
    pub fast: [Edge; 2],
    /// Diagonal from the reference corner to the opposite corner.
    pub diagonal: Edge,
    /// Measured corner nearest the first pixel of the first ASIC.
    pub reference: usize,
}

/// Orientation class of a 2x1 on its quadrant.
///
/// The class fixes which measured corner is nearest the first ASIC's first
/// pixel; the variants are named after that corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryClass {
    /// 2x1s 0 and 1.
    OriginAtCorner1,
    /// 2x1s 2, 3, 6 and 7.
    OriginAtCorner2,
    /// 2x1s 4 and 5.
    OriginAtCorner3,
}

const SYMMETRY_CLASSES: [SymmetryClass; TWOBYONES_PER_QUAD] = [
    SymmetryClass::OriginAtCorner1,
    SymmetryClass::OriginAtCorner1,
    SymmetryClass::OriginAtCorner2,
    SymmetryClass::OriginAtCorner2,
    SymmetryClass::OriginAtCorner3,
    SymmetryClass::OriginAtCorner3,
    SymmetryClass::OriginAtCorner2,
    SymmetryClass::OriginAtCorner2,
];

impl SymmetryClass {
    pub const fn corner_roles(self) -> CornerRoles {
        match self {
            SymmetryClass::OriginAtCorner1 => CornerRoles {
                slow: [Edge::new(0, 1), Edge::new(3, 2)],
                fast: [Edge::new(2, 1), Edge::new(3, 0)],
                diagonal: Edge::new(3, 1),
                reference: 1,
            },
            SymmetryClass::OriginAtCorner2 => CornerRoles {
                slow: [Edge::new(1, 2), Edge::new(0, 3)],
                fast: [Edge::new(3, 2), Edge::new(0, 1)],
                diagonal: Edge::new(0, 2),
                reference: 2,
            },
            SymmetryClass::OriginAtCorner3 => CornerRoles {
                slow: [Edge::new(2, 3), Edge::new(1, 0)],
                fast: [Edge::new(0, 3), Edge::new(1, 2)],
                diagonal: Edge::new(1, 3),
                reference: 3,
            },
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters controlling the reconstruction.
#[derive(Debug, Clone, Copy)]
pub struct BuilderConfig {
    /// Orthogonality QC tolerance in degrees. Default 0.148.
    pub qc_tolerance_deg: f64,
    /// Vector normalisation used for the basis and diagonal directions.
    /// Default [`geometry::unit`](crate::geometry::unit).
    pub normalize: fn(&Vector3) -> Vector3,
    /// Emit QC warnings through `tracing` when the default sink is used.
    /// Default false.
    pub verbose: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            qc_tolerance_deg: DEFAULT_ANGLE_TOLERANCE_DEG,
            normalize: unit,
            verbose: false,
        }
    }
}

// ── Reconstruction ──────────────────────────────────────────────────────────

/// Full result of reconstructing one 2x1, including intermediates.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoByOneReconstruction {
    pub two_by_one: TwoByOne,
    /// Slow vector before the orthogonality correction.
    pub raw_s: Vector3,
    /// Fast vector before the orthogonality correction.
    pub raw_f: Vector3,
    /// Mean of the four measured corners (m).
    pub center: Vector3,
    /// Distance walked along the diagonal from the reference corner.
    pub offset: f64,
    /// Rotation applied to each vector by the correction (rad).
    pub correction_rad: f64,
    pub qc: QcOutcome,
    /// Basis grids of the first and second ASIC.
    pub asics: [BasisGrid; 2],
}

impl TwoByOneReconstruction {
    pub fn into_pair(self) -> (BasisGrid, BasisGrid) {
        let [a, b] = self.asics;
        (a, b)
    }
}

/// Reconstruct one 2x1, reporting QC failures to `sink`.
///
/// `quad_index` is only used to label diagnostics.
pub fn reconstruct_twobyone(
    corners: &QuadrantCorners,
    quad_index: usize,
    two_by_one_index: usize,
    config: &BuilderConfig,
    sink: &dyn DiagnosticSink,
) -> Result<TwoByOneReconstruction> {
    let two_by_one = TwoByOne::try_from(two_by_one_index)?;
    let xyz = corners.corner_block(two_by_one.first_row()).ok_or_else(|| {
        MetrologyError::InvalidArgument(format!(
            "quad metrology has no corners for 2x1 {}",
            two_by_one_index
        ))
    })?;
    let roles = two_by_one.symmetry_class().corner_roles();
    let normalize = config.normalize;

    let along = |edges: [Edge; 2]| {
        PIXEL_SIZE_MM * normalize(&(edges[0].vector(&xyz) + edges[1].vector(&xyz)))
    };
    let s = along(roles.slow);
    let f = along(roles.fast);

    let diagonal = roles.diagonal.vector(&xyz) / MM_PER_M;
    let r = xyz[roles.reference] / MM_PER_M;
    let center = xyz.iter().fold(Vector3::zeros(), |acc, c| acc + c) / (4.0 * MM_PER_M);

    // Measured points sit outside the chip; walk in along the diagonal.
    let offset = (diagonal.norm() - twobyone_diagonal_mm()) / 2.0;
    let p0 = r + offset * normalize(&diagonal);
    let p1 = p0 + ASIC_COLS as f64 * f + ASIC_GAP_MM * normalize(&f);

    let qc = check_orthogonality(
        &s,
        &f,
        Some(quad_index),
        two_by_one_index,
        config.qc_tolerance_deg,
        sink,
    );

    // Split the angular error evenly between s and f.
    let axis = s.cross(&f);
    let theta = angle_between(&s, &f);
    let rot = (FRAC_PI_2 - theta) / 2.0;
    let s_corr = er_rotation_matrix(&axis, rot) * s;
    let f_corr = er_rotation_matrix(&axis, -rot) * f;

    let dot = s_corr.dot(&f_corr);
    if !(dot.abs() < ORTHOGONALITY_EPSILON) {
        return Err(MetrologyError::InternalInvariant {
            two_by_one: two_by_one_index,
            dot,
        });
    }

    debug!(
        "quad {} 2x1 {}: offset {:.6}, qc deviation {:.4} deg, correction {:.3e} rad",
        quad_index, two_by_one_index, offset, qc.deviation_deg, rot
    );

    Ok(TwoByOneReconstruction {
        two_by_one,
        raw_s: s,
        raw_f: f,
        center,
        offset,
        correction_rad: rot,
        qc,
        asics: [
            BasisGrid::new(p0, s_corr, f_corr),
            BasisGrid::new(p1, s_corr, f_corr),
        ],
    })
}

/// Convert one 2x1 of a quadrant survey into two ASIC basis grids.
///
/// QC failures are logged through `tracing` when `config.verbose` is set.
pub fn build_twobyone_frames(
    corners: &QuadrantCorners,
    quad_index: usize,
    two_by_one_index: usize,
    config: &BuilderConfig,
) -> Result<(BasisGrid, BasisGrid)> {
    let sink = TracingSink::new(config.verbose);
    reconstruct_twobyone(corners, quad_index, two_by_one_index, config, &sink)
        .map(TwoByOneReconstruction::into_pair)
}

/// Basis grids of all 16 ASICs of a quadrant, in 2x1 order
/// (first ASIC, then second, for each 2x1).
pub fn quadrant_basis_grids(
    corners: &QuadrantCorners,
    quad_index: usize,
    config: &BuilderConfig,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<BasisGrid>> {
    let mut grids = Vec::with_capacity(2 * TWOBYONES_PER_QUAD);
    for two_by_one in TwoByOne::all() {
        let rec = reconstruct_twobyone(corners, quad_index, two_by_one.index(), config, sink)?;
        grids.extend(rec.asics);
    }
    Ok(grids)
}

impl Survey {
    /// Basis grids for every quadrant, see [`quadrant_basis_grids`].
    pub fn basis_grids(
        &self,
        config: &BuilderConfig,
        sink: &dyn DiagnosticSink,
    ) -> Result<Vec<Vec<BasisGrid>>> {
        self.quadrants()
            .iter()
            .enumerate()
            .map(|(q, corners)| quadrant_basis_grids(corners, q, config, sink))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Diagnostic, NullSink};
    use crate::geometry::{twobyone_long_side_mm, twobyone_short_side_mm};
    use std::cell::RefCell;

    /// Quadrant with every 2x1 an axis-aligned nominal rectangle whose
    /// first-pixel corner is at `origin` (mm), laid out per symmetry class.
    fn nominal_quad(origin: Vector3) -> QuadrantCorners {
        let fl = twobyone_long_side_mm();
        let sl = twobyone_short_side_mm();
        let mut points = [Vector3::zeros(); 32];
        for tbo in TwoByOne::all() {
            let corners = rectangle_corners(tbo.symmetry_class(), origin, sl, fl);
            let row = tbo.first_row();
            points[row..row + 4].copy_from_slice(&corners);
        }
        QuadrantCorners::new(points)
    }

    /// Corners of a rectangle with slow side along +y and fast side along
    /// +x, placed so that `origin` is the reference corner of `class`.
    fn rectangle_corners(class: SymmetryClass, origin: Vector3, sl: f64, fl: f64) -> [Vector3; 4] {
        let o = origin;
        let sy = Vector3::new(0.0, sl, 0.0);
        let fx = Vector3::new(fl, 0.0, 0.0);
        match class {
            // 0 = o+s, 1 = o, 2 = o+f, 3 = o+s+f
            SymmetryClass::OriginAtCorner1 => [o + sy, o, o + fx, o + sy + fx],
            // 2 = o, 1 = o+s, 3 = o+f, 0 = o+s+f
            SymmetryClass::OriginAtCorner2 => [o + sy + fx, o + sy, o, o + fx],
            // 3 = o, 2 = o+s, 0 = o+f, 1 = o+s+f
            SymmetryClass::OriginAtCorner3 => [o + fx, o + sy + fx, o + sy, o],
        }
    }

    #[test]
    fn test_scan_sequence_lookup() {
        let rows: Vec<usize> = TwoByOne::all().map(|t| t.first_row()).collect();
        assert_eq!(rows, vec![4, 0, 12, 8, 16, 20, 28, 24]);
    }

    #[test]
    fn test_symmetry_class_table() {
        use SymmetryClass::*;
        let classes: Vec<SymmetryClass> = TwoByOne::all().map(|t| t.symmetry_class()).collect();
        assert_eq!(
            classes,
            vec![
                OriginAtCorner1,
                OriginAtCorner1,
                OriginAtCorner2,
                OriginAtCorner2,
                OriginAtCorner3,
                OriginAtCorner3,
                OriginAtCorner2,
                OriginAtCorner2
            ]
        );
    }

    #[test]
    fn test_each_class_recovers_axes() {
        // For a nominal rectangle every class should find s = +y, f = +x,
        // with the reference corner at the origin.
        for class in [
            SymmetryClass::OriginAtCorner1,
            SymmetryClass::OriginAtCorner2,
            SymmetryClass::OriginAtCorner3,
        ] {
            let c = rectangle_corners(class, Vector3::new(1.0, 2.0, 3.0), 20.0, 40.0);
            let roles = class.corner_roles();
            let s = roles.slow[0].vector(&c) + roles.slow[1].vector(&c);
            let f = roles.fast[0].vector(&c) + roles.fast[1].vector(&c);
            assert!((s - Vector3::new(0.0, 40.0, 0.0)).norm() < 1e-12, "{:?}: s={:?}", class, s);
            assert!((f - Vector3::new(80.0, 0.0, 0.0)).norm() < 1e-12, "{:?}: f={:?}", class, f);
            assert_eq!(c[roles.reference], Vector3::new(1.0, 2.0, 3.0));
            let d = roles.diagonal.vector(&c);
            assert!((d - Vector3::new(40.0, 20.0, 0.0)).norm() < 1e-12, "{:?}: d={:?}", class, d);
        }
    }

    #[test]
    fn test_invalid_index() {
        let quad = nominal_quad(Vector3::zeros());
        for idx in [8usize, 9, 100, usize::MAX] {
            let err = build_twobyone_frames(&quad, 0, idx, &BuilderConfig::default()).unwrap_err();
            assert!(matches!(err, MetrologyError::InvalidArgument(_)), "{:?}", err);
        }
        for idx in [-1i64, -8, 8, 100] {
            assert!(matches!(
                TwoByOne::try_from(idx),
                Err(MetrologyError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_nominal_twobyone_zero() {
        let origin_mm = Vector3::new(10.0, 20.0, 5.0);
        let quad = nominal_quad(origin_mm);
        let rec = reconstruct_twobyone(&quad, 0, 0, &BuilderConfig::default(), &NullSink)
            .expect("nominal 2x1 reconstructs");

        let s = Vector3::new(0.0, PIXEL_SIZE_MM, 0.0);
        let f = Vector3::new(PIXEL_SIZE_MM, 0.0, 0.0);
        let h = twobyone_diagonal_mm();
        let diag_dir = Vector3::new(twobyone_long_side_mm(), twobyone_short_side_mm(), 0.0) / h;
        let p0 = origin_mm / 1000.0 + (h / 1000.0 - h) / 2.0 * diag_dir;
        let p1 = p0 + 194.0 * f + ASIC_GAP_MM * Vector3::new(1.0, 0.0, 0.0);

        let close = |a: &Vector3, b: &Vector3| (a - b).norm() <= 1e-6 * b.norm().max(1e-12);
        let [a0, a1] = &rec.asics;
        assert!(close(&a0.s, &s), "s = {:?}", a0.s);
        assert!(close(&a0.f, &f), "f = {:?}", a0.f);
        assert!(close(&a0.p, &p0), "p0 = {:?}, expected {:?}", a0.p, p0);
        assert!(close(&a1.p, &p1), "p1 = {:?}, expected {:?}", a1.p, p1);
        assert!(rec.qc.passed());
        assert!(rec.qc.deviation_deg.abs() < 1e-12);
        assert!(rec.correction_rad.abs() < 1e-12);
        assert!((rec.center - (origin_mm + 0.5 * Vector3::new(42.92376, 20.3352, 0.0)) / 1000.0).norm() < 1e-12);
    }

    #[test]
    fn test_skewed_corners_are_made_orthogonal() {
        // Shear the fast edge by ~0.5 degrees: QC must fail but the
        // output is still exactly orthogonal.
        let mut points = *nominal_quad(Vector3::zeros()).points();
        let shear = 0.5_f64.to_radians().tan();
        for p in points.iter_mut() {
            p.y += shear * p.x;
        }
        let quad = QuadrantCorners::new(points);

        let seen = RefCell::new(Vec::new());
        let sink = |d: &Diagnostic| seen.borrow_mut().push(d.clone());
        let rec = reconstruct_twobyone(&quad, 2, 3, &BuilderConfig::default(), &sink).unwrap();
        assert!(!rec.qc.passed());
        assert_eq!(seen.borrow().len(), 1);
        assert!(matches!(
            seen.borrow()[0],
            Diagnostic::OrthogonalityFailed { quad: Some(2), two_by_one: 3, .. }
        ));

        let [a0, a1] = &rec.asics;
        assert!(a0.s.dot(&a0.f).abs() < ORTHOGONALITY_EPSILON);
        assert!((a0.s.norm() - PIXEL_SIZE_MM).abs() < 1e-12);
        assert!((a0.f.norm() - PIXEL_SIZE_MM).abs() < 1e-12);
        assert_eq!(a0.s, a1.s);
        assert_eq!(a0.f, a1.f);

        // The correction bisects the error: both vectors move by the same amount.
        let ds = angle_between(&rec.raw_s, &a0.s);
        let df = angle_between(&rec.raw_f, &a0.f);
        assert!((ds - df).abs() < 1e-9, "ds={} df={}", ds, df);
        assert!((ds - rec.correction_rad.abs()).abs() < 1e-9);
    }

    #[test]
    fn test_custom_normalizer_is_used() {
        fn double_unit(v: &Vector3) -> Vector3 {
            2.0 * v / v.norm()
        }
        let quad = nominal_quad(Vector3::zeros());
        let config = BuilderConfig {
            normalize: double_unit,
            ..Default::default()
        };
        let (a0, _) = build_twobyone_frames(&quad, 0, 0, &config).unwrap();
        assert!((a0.s.norm() - 2.0 * PIXEL_SIZE_MM).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_corners_error() {
        let quad = QuadrantCorners::new([Vector3::new(1.0, 1.0, 1.0); 32]);
        let err = build_twobyone_frames(&quad, 0, 0, &BuilderConfig::default()).unwrap_err();
        assert!(matches!(err, MetrologyError::InternalInvariant { two_by_one: 0, .. }), "{:?}", err);
    }

    #[test]
    fn test_quadrant_and_survey_grids() {
        let quad = nominal_quad(Vector3::new(5.0, 5.0, 0.0));
        let grids = quadrant_basis_grids(&quad, 1, &BuilderConfig::default(), &NullSink).unwrap();
        assert_eq!(grids.len(), 16);
        let (a0, a1) = build_twobyone_frames(&quad, 1, 3, &BuilderConfig::default()).unwrap();
        assert_eq!(grids[6], a0);
        assert_eq!(grids[7], a1);

        let survey = Survey::new([quad.clone(), quad.clone(), quad.clone(), quad]);
        let all = survey.basis_grids(&BuilderConfig::default(), &NullSink).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|q| q.len() == 16));
        assert_eq!(all[2][6], grids[6]);
    }
}
