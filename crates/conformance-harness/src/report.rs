//! Suite aggregation and the machine-readable report.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use nes_conformance::TestOutcome;
use serde::Serialize;
use sha1::{Digest, Sha1};

/// Per-case verdict, as it appears in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pass,
    Fail,
    Error,
}

/// One case line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    /// Case name.
    pub name: String,
    /// Verdict.
    pub status: CaseStatus,
    /// Diagnostic for fail and error cases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CaseReport {
    /// Fold an outcome into its report line.
    #[must_use]
    pub fn new(name: String, outcome: &TestOutcome) -> Self {
        let (status, detail) = match outcome {
            TestOutcome::Pass => (CaseStatus::Pass, None),
            TestOutcome::Fail(reason) => (CaseStatus::Fail, Some(reason.clone())),
            TestOutcome::Error(reason) => (CaseStatus::Error, Some(reason.clone())),
        };
        Self {
            name,
            status,
            detail,
        }
    }
}

/// The whole suite, aggregated.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// ROM the suite belongs to.
    pub rom: String,
    /// SHA-1 of the ROM file, for identification.
    pub rom_sha1: String,
    /// Cycle budget requested on the command line.
    pub cycles: u64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// Case lines, in enumeration order.
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// Aggregate per-case outcomes.
    #[must_use]
    pub fn new(rom: String, rom_sha1: String, cycles: u64, outcomes: Vec<(String, TestOutcome)>) -> Self {
        let cases: Vec<CaseReport> = outcomes
            .into_iter()
            .map(|(name, outcome)| CaseReport::new(name, &outcome))
            .collect();
        let count = |status: CaseStatus| cases.iter().filter(|c| c.status == status).count();
        Self {
            rom,
            rom_sha1,
            cycles,
            total: cases.len(),
            passed: count(CaseStatus::Pass),
            failed: count(CaseStatus::Fail),
            errored: count(CaseStatus::Error),
            cases,
        }
    }

    /// True when every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Hex SHA-1 digest of a ROM file's bytes.
#[must_use]
pub fn rom_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
