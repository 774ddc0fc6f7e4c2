//! Structured diagnostics emitted during reconstruction.
//!
//! The reconstruction never prints. Anything worth telling the user (today
//! only orthogonality QC failures) is delivered as a [`Diagnostic`] to a
//! caller-supplied [`DiagnosticSink`]. Three sinks are provided:
//!
//! - [`TracingSink`] forwards to `tracing::warn!`, gated by a verbosity flag
//! - [`NullSink`] drops everything
//! - any closure `Fn(&Diagnostic)`, handy for collecting events in tests

use tracing::warn;

/// A non-fatal event raised while reconstructing a 2x1.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The measured slow/fast vectors deviate from perpendicular by more
    /// than the QC tolerance. Orthogonality is enforced regardless.
    OrthogonalityFailed {
        /// Quadrant index, when known.
        quad: Option<usize>,
        two_by_one: usize,
        /// Signed deviation from 90 degrees, in degrees.
        deviation_deg: f64,
        tolerance_deg: f64,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::OrthogonalityFailed {
                quad,
                two_by_one,
                deviation_deg,
                tolerance_deg,
            } => {
                match quad {
                    Some(q) => write!(
                        f,
                        "metrology quality control failed for quad {} 2x1 {}",
                        q, two_by_one
                    )?,
                    None => write!(f, "metrology quality control failed for 2x1 {}", two_by_one)?,
                }
                write!(
                    f,
                    ": s/f vectors are not orthogonal, enforcing orthogonality \
                     (angle: {:.6} deg, tol: {:.6} deg)",
                    deviation_deg, tolerance_deg
                )
            }
        }
    }
}

/// Receiver for [`Diagnostic`] events.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic),
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Forwards diagnostics to the `tracing` subscriber as warnings.
///
/// Nothing is emitted unless `verbose` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    pub verbose: bool,
}

impl TracingSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        if self.verbose {
            warn!("{}", diagnostic);
        }
    }
}

/// Discards every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: &Diagnostic) {}
}
