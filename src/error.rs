//! Error type for metrology parsing and 2x1 reconstruction.

use thiserror::Error;

/// Errors raised while reading a survey or reconstructing a 2x1.
///
/// Orthogonality QC failures are *not* errors; they are reported through a
/// [`DiagnosticSink`](crate::diagnostics::DiagnosticSink) and the
/// reconstruction proceeds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetrologyError {
    /// The survey table does not have the expected 128 x 3 coordinate shape.
    ///
    /// When a single row is malformed, `line` is its 1-based line number,
    /// `cols` the coordinate columns it held and `rows` the data rows read
    /// before it. Otherwise `rows` x `cols` is the shape of the whole table.
    #[error(
        "metrology file appears to be in the wrong format: could not understand file format of: {file} \
         (expected {expected_rows} rows x 3 coordinate columns, {})",
        shape_detail(.line, .rows, .cols)
    )]
    Format {
        /// Identifier of the offending file (usually its path).
        file: String,
        line: Option<usize>,
        rows: usize,
        cols: usize,
        expected_rows: usize,
    },

    /// A caller-supplied argument is out of range or mis-shaped.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The orthogonality correction failed to produce perpendicular vectors.
    ///
    /// Indicates degenerate input (e.g. coincident corners producing NaNs)
    /// rather than a recoverable measurement problem.
    #[error("s/f vectors of 2x1 {two_by_one} not orthogonal after correction (s.f = {dot:e})")]
    InternalInvariant { two_by_one: usize, dot: f64 },
}

fn shape_detail(line: &Option<usize>, rows: &usize, cols: &usize) -> String {
    match line {
        Some(line) => format!("line {} has {} coordinate columns", line, cols),
        None => format!("got {} rows x {} columns", rows, cols),
    }
}

pub type Result<T> = std::result::Result<T, MetrologyError>;
