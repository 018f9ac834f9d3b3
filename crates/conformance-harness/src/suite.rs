//! Test-case enumeration and the orchestrator.
//!
//! Each case owns a freshly constructed core, driver, and frame oracle,
//! so cases share nothing and run in parallel. Every per-case error is
//! converted into that case's outcome; one broken case never takes the
//! suite down with it.

use std::fs;
use std::path::{Path, PathBuf};

use nes_conformance::{
    Driver, EmulatorCore, HarnessError, ReferenceImage, RunConfig, StatusByte, Termination,
    TestOutcome, TraceConfig, compare_frames, parse_trace, run_budget, run_trace, run_until,
};
use rayon::prelude::*;

/// A core built for exactly one case.
pub type BoxedCore = Box<dyn EmulatorCore + Send>;

/// One enumerated test case.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Name used for console tagging and the report.
    pub name: String,
    /// Which driver/comparator pairing judges it.
    pub kind: TestKind,
}

/// The oracle a case is judged by.
#[derive(Debug, Clone)]
pub enum TestKind {
    /// Lockstep verification against a golden execution trace.
    Trace {
        /// Path of the golden log.
        log: PathBuf,
    },
    /// Run until a pass or fail sentinel address is reached.
    Sentinels {
        /// Pass sentinel.
        pass: u16,
        /// Fail sentinel.
        fail: u16,
    },
    /// Run a cycle budget, then judge a memory status byte.
    Memory {
        /// Cycle budget.
        budget: u64,
        /// The byte that decides the verdict.
        status: StatusByte,
    },
    /// Run the reference's encoded cycle budget, then compare the
    /// captured frame against it pixel for pixel.
    Frame {
        /// Path of the reference image.
        reference: PathBuf,
    },
}

/// Configuration shared by every case in a suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuiteConfig {
    /// Golden-trace strictness.
    pub trace: TraceConfig,
    /// Run bounds.
    pub run: RunConfig,
}

/// Run every case, in parallel, against cores from `make_core`.
///
/// Outcomes come back in case order. A factory failure is that case's
/// error; the rest of the suite is unaffected.
pub fn run_suite<F>(
    cases: &[TestCase],
    make_core: F,
    config: SuiteConfig,
) -> Vec<(String, TestOutcome)>
where
    F: Fn(&TestCase) -> Result<BoxedCore, HarnessError> + Sync,
{
    cases
        .par_iter()
        .map(|case| (case.name.clone(), run_case(case, &make_core, config)))
        .collect()
}

fn run_case<F>(case: &TestCase, make_core: &F, config: SuiteConfig) -> TestOutcome
where
    F: Fn(&TestCase) -> Result<BoxedCore, HarnessError> + Sync,
{
    let mut core = match make_core(case) {
        Ok(core) => core,
        Err(err) => return outcome_from_error(err),
    };
    let mut driver = Driver::new();

    let result = match &case.kind {
        TestKind::Trace { log } => run_trace_case(core.as_mut(), &mut driver, log, config),
        TestKind::Sentinels { pass, fail } => run_until(
            core.as_mut(),
            &mut driver,
            Termination::Sentinels {
                pass: *pass,
                fail: *fail,
            },
            config.run,
        ),
        TestKind::Memory { budget, status } => run_until(
            core.as_mut(),
            &mut driver,
            Termination::CycleBudget {
                cycles: *budget,
                status: *status,
            },
            config.run,
        ),
        TestKind::Frame { reference } => {
            run_frame_case(core.as_mut(), &mut driver, reference, config)
        }
    };

    match result {
        Ok(outcome) => outcome,
        Err(err) => outcome_from_error(err),
    }
}

fn run_trace_case(
    core: &mut dyn EmulatorCore,
    driver: &mut Driver,
    log: &Path,
    config: SuiteConfig,
) -> Result<TestOutcome, HarnessError> {
    let text = match fs::read_to_string(log) {
        Ok(text) => text,
        Err(e) => {
            return Ok(TestOutcome::Error(format!(
                "cannot read golden log {}: {e}",
                log.display()
            )));
        }
    };
    let records = parse_trace(&text)?;
    run_trace(core, driver, &records, config.trace)?;
    Ok(TestOutcome::Pass)
}

fn run_frame_case(
    core: &mut dyn EmulatorCore,
    driver: &mut Driver,
    reference: &Path,
    config: SuiteConfig,
) -> Result<TestOutcome, HarnessError> {
    let reference = ReferenceImage::load(reference)?;
    run_budget(core, driver, reference.cycles, config.run)?;

    let verdict = compare_frames(&reference.frame, driver.capture());
    if verdict.is_match() {
        Ok(TestOutcome::Pass)
    } else {
        Ok(TestOutcome::Fail(verdict.describe()))
    }
}

/// Fold a harness error into a per-case outcome.
///
/// Oracle divergence is a failed test; everything else means the case
/// could not be judged at all.
fn outcome_from_error(err: HarnessError) -> TestOutcome {
    match err {
        HarnessError::TraceMismatch(_) => TestOutcome::Fail(err.to_string()),
        other => TestOutcome::Error(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nes_conformance::scripted::ScriptedCore;
    use nes_conformance::{CoreError, CpuSnapshot, Status};

    fn boundary(pc: u16, cycles: u64) -> CpuSnapshot {
        CpuSnapshot {
            pc,
            a: 0,
            x: 0,
            y: 0,
            p: Status(0x24),
            s: 0xFD,
            cycles,
        }
    }

    /// Factory serving a purpose-built scripted core per case kind.
    fn scripted_factory(case: &TestCase) -> Result<BoxedCore, HarnessError> {
        match &case.kind {
            TestKind::Sentinels { pass, .. } => {
                let mut core = ScriptedCore::new(boundary(0x8000, 0));
                core.push_step(boundary(*pass, 4));
                Ok(Box::new(core))
            }
            TestKind::Memory { status, .. } => {
                let mut core = ScriptedCore::new(boundary(0x8000, 0));
                core.poke(status.address, status.success);
                Ok(Box::new(core))
            }
            _ => Err(HarnessError::CoreExecution(CoreError::new(
                "no scripted core for this kind",
            ))),
        }
    }

    fn status_6000() -> StatusByte {
        StatusByte {
            address: 0x6000,
            success: 0x00,
        }
    }

    #[test]
    fn suite_runs_every_case_and_keeps_order() {
        let cases = vec![
            TestCase {
                name: "sentinel".into(),
                kind: TestKind::Sentinels {
                    pass: 0x815A,
                    fail: 0x8165,
                },
            },
            TestCase {
                name: "memory".into(),
                kind: TestKind::Memory {
                    budget: 20,
                    status: status_6000(),
                },
            },
            TestCase {
                name: "broken".into(),
                kind: TestKind::Trace {
                    log: PathBuf::from("/nonexistent.log"),
                },
            },
        ];

        let results = run_suite(&cases, scripted_factory, SuiteConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "sentinel");
        assert!(results[0].1.is_pass());
        assert!(results[1].1.is_pass());
        // The factory refuses the trace case; the suite carries on and
        // reports it as an error.
        assert!(matches!(results[2].1, TestOutcome::Error(_)));
    }

    #[test]
    fn memory_case_failure_carries_the_observed_byte() {
        let cases = vec![TestCase {
            name: "memory".into(),
            kind: TestKind::Memory {
                budget: 20,
                status: status_6000(),
            },
        }];

        // Factory plants a failing status byte.
        let factory = |_case: &TestCase| -> Result<BoxedCore, HarnessError> {
            let mut core = ScriptedCore::new(boundary(0x8000, 0));
            core.poke(0x6000, 0x33);
            Ok(Box::new(core))
        };

        let results = run_suite(&cases, factory, SuiteConfig::default());
        match &results[0].1 {
            TestOutcome::Fail(reason) => assert!(reason.contains("$33")),
            other => panic!("wrong outcome: {other:?}"),
        }
    }

    #[test]
    fn stuck_sentinel_case_is_an_error_not_a_hang() {
        let cases = vec![TestCase {
            name: "stuck".into(),
            kind: TestKind::Sentinels {
                pass: 0x815A,
                fail: 0x8165,
            },
        }];

        // A core that never reaches either sentinel.
        let factory = |_case: &TestCase| -> Result<BoxedCore, HarnessError> {
            Ok(Box::new(ScriptedCore::new(boundary(0x8000, 0))))
        };

        let config = SuiteConfig {
            run: RunConfig { step_ceiling: 50 },
            ..Default::default()
        };
        let results = run_suite(&cases, factory, config);
        match &results[0].1 {
            TestOutcome::Error(reason) => assert!(reason.contains("50 steps")),
            other => panic!("wrong outcome: {other:?}"),
        }
    }

    #[test]
    fn trace_divergence_maps_to_fail() {
        let mismatch = HarnessError::TraceMismatch(Box::new(nes_conformance::TraceMismatch {
            line: 1,
            kind: nes_conformance::MismatchKind::Cycle,
            expected: nes_conformance::ExpectationRecord {
                pc: 0xC000,
                a: 0,
                x: 0,
                y: 0,
                p: Status(0x24),
                s: 0xFD,
                cycles: 7,
            },
            actual: boundary(0xC000, 9),
        }));
        assert!(matches!(outcome_from_error(mismatch), TestOutcome::Fail(_)));

        let stuck = HarnessError::UnexpectedTermination { ceiling: 5 };
        assert!(matches!(outcome_from_error(stuck), TestOutcome::Error(_)));
    }
}
