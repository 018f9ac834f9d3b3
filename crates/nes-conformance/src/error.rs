//! Harness error taxonomy.
//!
//! Everything here is fatal to exactly one run. The orchestrator converts
//! each into a per-case outcome and moves on; nothing aborts the suite.

use std::path::PathBuf;

use thiserror::Error;

use crate::compare::TraceMismatch;
use crate::interface::CoreError;

/// Errors surfaced by a single conformance run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The emulator core's own instruction step failed. Never retried;
    /// the core's diagnosis is reported verbatim.
    #[error("core execution failed: {0}")]
    CoreExecution(#[from] CoreError),

    /// A golden-trace line is missing a required field or carries an
    /// unparsable one.
    #[error("malformed trace record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line in the trace file.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A sentinel run hit its safety step ceiling without reaching
    /// either sentinel address.
    #[error("no sentinel reached within {ceiling} steps")]
    UnexpectedTermination {
        /// The ceiling that was enforced.
        ceiling: u64,
    },

    /// The observed CPU state diverged from the golden trace.
    #[error("{0}")]
    TraceMismatch(Box<TraceMismatch>),

    /// A reference image could not be read or decoded. Distinct from a
    /// pixel mismatch, which is a comparison result, not an error.
    #[error("failed to load reference image {path:?}: {reason}")]
    ReferenceImage {
        /// The offending file.
        path: PathBuf,
        /// I/O or decode diagnosis.
        reason: String,
    },
}
