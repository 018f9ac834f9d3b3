//! Run loops: lockstep golden-trace verification and sentinel- or
//! budget-terminated runs.
//!
//! Every loop here is bounded. Sentinel runs carry a safety step ceiling
//! because a broken core may never reach either sentinel; budget runs
//! keep the same ceiling because a core that reports zero-cycle steps
//! would otherwise spin forever without consuming its budget.

use crate::compare::{self, MismatchKind, TraceMismatch};
use crate::driver::Driver;
use crate::error::HarnessError;
use crate::interface::EmulatorCore;
use crate::trace::ExpectationRecord;

/// Safety ceiling on driven steps for a single run.
pub const DEFAULT_STEP_CEILING: u64 = 5_000_000;

/// Knobs for sentinel and budget runs.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Maximum driven steps before the run is declared stuck.
    pub step_ceiling: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_ceiling: DEFAULT_STEP_CEILING,
        }
    }
}

/// Knobs for golden-trace runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceConfig {
    /// Treat a cycle-count divergence as a hard mismatch. Off by
    /// default: the counter is informational in most golden logs, and a
    /// divergence is only logged.
    pub enforce_cycles: bool,
}

/// The designated memory byte a budget run is judged by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusByte {
    /// Address to peek once the budget is exhausted.
    pub address: u16,
    /// The byte value that means success.
    pub success: u8,
}

/// How a run terminates. Exactly one mode is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop when the program counter reaches one of two sentinel
    /// addresses planted by the test program.
    Sentinels {
        /// Reaching this address is a pass.
        pass: u16,
        /// Reaching this address is a fail.
        fail: u16,
    },
    /// Stop once the cumulative cycle counter reaches a budget, then
    /// judge the run by a status byte.
    CycleBudget {
        /// Cycle budget.
        cycles: u64,
        /// The byte that decides pass or fail afterwards.
        status: StatusByte,
    },
}

/// Verdict of one test case. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The case passed.
    Pass,
    /// The case ran to completion and failed its check.
    Fail(String),
    /// The case could not be judged.
    Error(String),
}

impl TestOutcome {
    /// True for [`TestOutcome::Pass`].
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Summary of a completed golden-trace run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceReport {
    /// Records verified (equals the number of driven steps).
    pub records: usize,
    /// The core's cycle counter after the final step.
    pub final_cycles: u64,
}

/// Summary of a completed budget run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Driven steps.
    pub steps: u64,
    /// The core's cycle counter at termination.
    pub cycles: u64,
}

/// Replay a core against a golden trace in lockstep.
///
/// The comparator runs exactly once per driven step, against the state
/// *before* that step executes — golden logs record the boundary state
/// ahead of each instruction. The run halts on the first divergence; no
/// further steps execute.
///
/// # Errors
///
/// [`HarnessError::TraceMismatch`] on the first diverging line, or any
/// error the driver surfaces.
pub fn run_trace<C: EmulatorCore + ?Sized>(
    core: &mut C,
    driver: &mut Driver,
    records: &[ExpectationRecord],
    config: TraceConfig,
) -> Result<TraceReport, HarnessError> {
    for (index, expected) in records.iter().enumerate() {
        let actual = core.snapshot();
        let line = index + 1;

        let fields = compare::diverging_fields(expected, &actual);
        if !fields.is_empty() {
            return Err(HarnessError::TraceMismatch(Box::new(TraceMismatch {
                line,
                kind: MismatchKind::Register { fields },
                expected: *expected,
                actual,
            })));
        }

        if expected.cycles != actual.cycles {
            if config.enforce_cycles {
                return Err(HarnessError::TraceMismatch(Box::new(TraceMismatch {
                    line,
                    kind: MismatchKind::Cycle,
                    expected: *expected,
                    actual,
                })));
            }
            log::warn!(
                "line {line}: cycle counter diverged (expected {}, actual {}), not enforced",
                expected.cycles,
                actual.cycles
            );
        }

        driver.step(core)?;
    }

    let report = TraceReport {
        records: records.len(),
        final_cycles: core.snapshot().cycles,
    };
    log::info!(
        "trace run complete: {} records verified, {} cycles",
        report.records,
        report.final_cycles
    );
    Ok(report)
}

/// Drive until the cumulative cycle counter reaches `budget`.
///
/// The boundary check runs before each step, so the run stops at the
/// first instruction boundary at or past the budget.
///
/// # Errors
///
/// [`HarnessError::UnexpectedTermination`] if the step ceiling is hit
/// first, or any error the driver surfaces.
pub fn run_budget<C: EmulatorCore + ?Sized>(
    core: &mut C,
    driver: &mut Driver,
    budget: u64,
    config: RunConfig,
) -> Result<RunStats, HarnessError> {
    let mut steps = 0u64;
    while core.snapshot().cycles < budget {
        if steps >= config.step_ceiling {
            return Err(HarnessError::UnexpectedTermination {
                ceiling: config.step_ceiling,
            });
        }
        driver.step(core)?;
        steps += 1;
    }
    Ok(RunStats {
        steps,
        cycles: core.snapshot().cycles,
    })
}

/// Drive until the active termination condition fires.
///
/// Sentinel mode yields pass or fail according to which address the
/// program counter reaches (checked at every instruction boundary,
/// including the initial one). Budget mode exhausts the cycle budget and
/// then judges the designated status byte. Exactly one outcome comes
/// back per run.
///
/// # Errors
///
/// [`HarnessError::UnexpectedTermination`] if neither sentinel is
/// reached within the step ceiling, or any error the driver surfaces.
pub fn run_until<C: EmulatorCore + ?Sized>(
    core: &mut C,
    driver: &mut Driver,
    termination: Termination,
    config: RunConfig,
) -> Result<TestOutcome, HarnessError> {
    match termination {
        Termination::Sentinels { pass, fail } => {
            for _ in 0..config.step_ceiling {
                let pc = core.snapshot().pc;
                if pc == pass {
                    return Ok(TestOutcome::Pass);
                }
                if pc == fail {
                    return Ok(TestOutcome::Fail(format!(
                        "program reached fail sentinel ${fail:04X}"
                    )));
                }
                driver.step(core)?;
            }
            Err(HarnessError::UnexpectedTermination {
                ceiling: config.step_ceiling,
            })
        }
        Termination::CycleBudget { cycles, status } => {
            let stats = run_budget(core, driver, cycles, config)?;
            log::info!(
                "budget run complete: {} steps, {} cycles",
                stats.steps,
                stats.cycles
            );
            let byte = core.peek(status.address);
            if byte == status.success {
                Ok(TestOutcome::Pass)
            } else {
                Ok(TestOutcome::Fail(format!(
                    "status byte ${:04X} = ${byte:02X}, expected ${:02X}",
                    status.address, status.success
                )))
            }
        }
    }
}
