//! Reading CSPAD optical metrology files.
//!
//! The detector group's survey is a flat text table, one measured point per
//! row, quadrant after quadrant:
//!
//! ```text
//! # quad 0
//! 1   x1 y1 z1
//! 2   x2 y2 z2
//! ...
//! # quad 1
//! 1   x1 y1 z1
//! ...
//! ```
//!
//! The first column is a point index and is discarded. The remaining three
//! columns are millimetre coordinates. Each quadrant contributes 32 points
//! (8 2x1s × 4 corners) in the order they were scanned, for 128 rows in total.
//! Blank lines and `#` comments are skipped; any other row must have exactly
//! four columns, the last three numeric.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::error::{MetrologyError, Result};
use crate::Vector3;

/// Number of quadrants in a CSPAD.
pub const NUM_QUADS: usize = 4;

/// Number of 2x1s in a quadrant.
pub const TWOBYONES_PER_QUAD: usize = 8;

/// Corners measured per 2x1.
pub const CORNERS_PER_TWOBYONE: usize = 4;

/// Measured points per quadrant.
pub const POINTS_PER_QUAD: usize = TWOBYONES_PER_QUAD * CORNERS_PER_TWOBYONE;

/// Measured points in a complete survey.
pub const POINTS_PER_SURVEY: usize = NUM_QUADS * POINTS_PER_QUAD;

/// The 32 measured corner positions of one quadrant, in scan order (mm).
#[derive(Debug, Clone, PartialEq)]
pub struct QuadrantCorners {
    points: [Vector3; POINTS_PER_QUAD],
}

impl QuadrantCorners {
    /// Build from exactly 32 points.
    pub fn new(points: [Vector3; POINTS_PER_QUAD]) -> Self {
        Self { points }
    }

    /// Build from an arbitrary list of `[x, y, z]` rows.
    ///
    /// Fails with [`MetrologyError::InvalidArgument`] unless there are
    /// exactly 32 rows.
    pub fn from_rows(rows: &[[f64; 3]]) -> Result<Self> {
        if rows.len() != POINTS_PER_QUAD {
            return Err(MetrologyError::InvalidArgument(format!(
                "invalid quad metrology, must be shape ({}, 3), got: ({}, 3)",
                POINTS_PER_QUAD,
                rows.len()
            )));
        }
        let mut points = [Vector3::zeros(); POINTS_PER_QUAD];
        for (p, r) in points.iter_mut().zip(rows) {
            *p = Vector3::new(r[0], r[1], r[2]);
        }
        Ok(Self { points })
    }

    /// Build from a flat row-major buffer of `rows × cols` values.
    ///
    /// Used by bindings that receive `(N, M)` arrays; anything other than
    /// `(32, 3)` is rejected.
    pub fn from_flat(data: &[f64], rows: usize, cols: usize) -> Result<Self> {
        if rows != POINTS_PER_QUAD || cols != 3 || data.len() != rows * cols {
            return Err(MetrologyError::InvalidArgument(format!(
                "invalid quad metrology, must be shape ({}, 3), got: ({}, {})",
                POINTS_PER_QUAD, rows, cols
            )));
        }
        let rows: Vec<[f64; 3]> = data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Self::from_rows(&rows)
    }

    /// All 32 points in scan order.
    pub fn points(&self) -> &[Vector3; POINTS_PER_QUAD] {
        &self.points
    }

    /// The four consecutive points starting at `row`.
    ///
    /// Returns `None` if fewer than four rows remain.
    pub fn corner_block(&self, row: usize) -> Option<[Vector3; CORNERS_PER_TWOBYONE]> {
        let block = self.points.get(row..row + CORNERS_PER_TWOBYONE)?;
        Some([block[0], block[1], block[2], block[3]])
    }

    /// Points as `[x, y, z]` rows.
    pub fn to_rows(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| [p.x, p.y, p.z]).collect()
    }
}

/// A complete CSPAD optical survey: four quadrants of corner measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Survey {
    quads: [QuadrantCorners; NUM_QUADS],
}

impl Survey {
    pub fn new(quads: [QuadrantCorners; NUM_QUADS]) -> Self {
        Self { quads }
    }

    /// All quadrants in file order.
    pub fn quadrants(&self) -> &[QuadrantCorners; NUM_QUADS] {
        &self.quads
    }

    /// Corner measurements of quadrant `quad`.
    pub fn quadrant(&self, quad: usize) -> Result<&QuadrantCorners> {
        self.quads.get(quad).ok_or_else(|| {
            MetrologyError::InvalidArgument(format!(
                "quad index must be in 0..{}, got {}",
                NUM_QUADS, quad
            ))
        })
    }
}

/// Parse a single data row into its three coordinates.
///
/// The leading index column is not interpreted. On failure returns the number
/// of coordinate columns found, so the caller can report the row's shape.
fn parse_row(line: &str) -> std::result::Result<[f64; 3], usize> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(fields.len().saturating_sub(1));
    }
    let mut xyz = [0.0; 3];
    for (v, field) in xyz.iter_mut().zip(&fields[1..]) {
        *v = match field.parse() {
            Ok(x) => x,
            Err(_) => return Err(3),
        };
    }
    Ok(xyz)
}

/// Parse a metrology table held in memory.
///
/// `source` identifies the table (usually the file path) in error messages.
pub fn parse_metrology(data: &str, source: &str) -> Result<Survey> {
    let mut rows: Vec<[f64; 3]> = Vec::with_capacity(POINTS_PER_SURVEY);
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = parse_row(line).map_err(|cols| MetrologyError::Format {
            file: source.to_string(),
            line: Some(lineno + 1),
            rows: rows.len(),
            cols,
            expected_rows: POINTS_PER_SURVEY,
        })?;
        rows.push(row);
    }

    if rows.len() != POINTS_PER_SURVEY {
        return Err(MetrologyError::Format {
            file: source.to_string(),
            line: None,
            rows: rows.len(),
            cols: 3,
            expected_rows: POINTS_PER_SURVEY,
        });
    }

    let quad = |q: usize| {
        QuadrantCorners::from_rows(&rows[q * POINTS_PER_QUAD..(q + 1) * POINTS_PER_QUAD])
    };
    Ok(Survey::new([quad(0)?, quad(1)?, quad(2)?, quad(3)?]))
}

/// Read a metrology file from disk.
///
/// I/O errors carry the path as context; a malformed table surfaces as a
/// [`MetrologyError::Format`] that can be recovered with
/// `err.downcast_ref::<MetrologyError>()`.
pub fn read_metrology_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Survey> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metrology file {}", path.display()))?;
    let survey = parse_metrology(&data, &path.display().to_string())?;
    info!(
        "Loaded metrology from {}: {} quads x {} points",
        path.display(),
        NUM_QUADS,
        POINTS_PER_QUAD
    );
    Ok(survey)
}
