//! Per-step comparison of golden expectations against live CPU state.

use std::fmt;

use crate::snapshot::CpuSnapshot;
use crate::trace::ExpectationRecord;

/// Which side of the expectation diverged.
///
/// Register and cycle divergence are reported separately: a wrong cycle
/// count with correct registers points at timing, not at instruction
/// semantics, and the diagnostic has to say which one it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchKind {
    /// One or more register fields differ.
    Register {
        /// Names of the diverging fields, in tuple order.
        fields: Vec<&'static str>,
    },
    /// Registers match but the cumulative cycle count does not.
    Cycle,
}

/// A divergence between a golden record and the observed snapshot.
///
/// Carries both full tuples so the failing line can be diagnosed without
/// re-running anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMismatch {
    /// 1-based golden-trace line of the divergence.
    pub line: usize,
    /// What diverged.
    pub kind: MismatchKind,
    /// The expected state, straight from the golden trace.
    pub expected: ExpectationRecord,
    /// The observed state.
    pub actual: CpuSnapshot,
}

impl fmt::Display for TraceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match &self.kind {
            MismatchKind::Register { fields } => format!("register fields: {}", fields.join(", ")),
            MismatchKind::Cycle => "cycle count".to_string(),
        };
        let expected = CpuSnapshot {
            pc: self.expected.pc,
            a: self.expected.a,
            x: self.expected.x,
            y: self.expected.y,
            p: self.expected.p,
            s: self.expected.s,
            cycles: self.expected.cycles,
        };
        write!(
            f,
            "golden trace diverged at line {} ({what})\n  expected {expected}\n  actual   {}",
            self.line, self.actual
        )
    }
}

/// Names of the register-tuple fields that differ, in tuple order.
///
/// The full tuple is program counter, accumulator, X, Y, status, stack
/// pointer. Cycle counts are judged separately by the caller.
#[must_use]
pub fn diverging_fields(expected: &ExpectationRecord, actual: &CpuSnapshot) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if expected.pc != actual.pc {
        fields.push("pc");
    }
    if expected.a != actual.a {
        fields.push("a");
    }
    if expected.x != actual.x {
        fields.push("x");
    }
    if expected.y != actual.y {
        fields.push("y");
    }
    if expected.p != actual.p {
        fields.push("p");
    }
    if expected.s != actual.s {
        fields.push("s");
    }
    fields
}

/// True if the full register tuple matches.
#[must_use]
pub fn registers_match(expected: &ExpectationRecord, actual: &CpuSnapshot) -> bool {
    diverging_fields(expected, actual).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Status;

    fn record() -> ExpectationRecord {
        ExpectationRecord {
            pc: 0xC000,
            a: 0x00,
            x: 0x00,
            y: 0x00,
            p: Status(0x24),
            s: 0xFD,
            cycles: 7,
        }
    }

    fn snapshot() -> CpuSnapshot {
        CpuSnapshot {
            pc: 0xC000,
            a: 0x00,
            x: 0x00,
            y: 0x00,
            p: Status(0x24),
            s: 0xFD,
            cycles: 7,
        }
    }

    #[test]
    fn identical_tuples_match() {
        assert!(registers_match(&record(), &snapshot()));
        assert!(diverging_fields(&record(), &snapshot()).is_empty());
    }

    #[test]
    fn each_register_field_is_named() {
        let mut actual = snapshot();
        actual.a = 0x01;
        actual.s = 0xFC;
        assert_eq!(diverging_fields(&record(), &actual), vec!["a", "s"]);
    }

    #[test]
    fn cycle_difference_is_not_a_register_divergence() {
        let mut actual = snapshot();
        actual.cycles = 10;
        assert!(registers_match(&record(), &actual));
    }

    #[test]
    fn display_carries_both_tuples() {
        let mut actual = snapshot();
        actual.p = Status(0x26);
        let mismatch = TraceMismatch {
            line: 42,
            kind: MismatchKind::Register {
                fields: diverging_fields(&record(), &actual),
            },
            expected: record(),
            actual,
        };
        let text = mismatch.to_string();
        assert!(text.contains("line 42"));
        assert!(text.contains("register fields: p"));
        assert!(text.contains("P:$24"));
        assert!(text.contains("P:$26"));
    }
}
