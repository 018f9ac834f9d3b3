//! Conformance oracles for cycle-accurate NES-family emulator cores.
//!
//! The emulator under test sits behind the narrow [`EmulatorCore`]
//! capability interface: step one instruction, snapshot the registers,
//! peek a byte, take an NMI, and expose its picture and audio units. The
//! harness drives it in lockstep (three picture dots per CPU cycle, an
//! audio clock at half the CPU rate) and verifies it against three
//! independent oracles:
//!
//! - a per-instruction golden execution trace ([`parse_trace`],
//!   [`run_trace`]),
//! - sentinel-address or cycle-budget termination with a memory
//!   assertion ([`run_until`]),
//! - pixel-exact comparison of the captured frame against a reference
//!   image ([`compare_frames`], [`ReferenceImage`]).
//!
//! Replaying a golden trace against a scripted core that embodies it:
//!
//! ```
//! use nes_conformance::{Driver, ScriptedCore, TraceConfig, parse_trace, run_trace};
//!
//! // The register block sits at a fixed column in golden logs.
//! let log = format!(
//!     "{:<48}A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7",
//!     "C000  4C F5 C5  JMP $C5F5",
//! );
//! let records = parse_trace(&log)?;
//! let mut core = ScriptedCore::from_trace(&records);
//! let mut driver = Driver::new();
//! let report = run_trace(&mut core, &mut driver, &records, TraceConfig::default())?;
//! assert_eq!(report.records, 1);
//! # Ok::<(), nes_conformance::HarnessError>(())
//! ```

mod compare;
mod driver;
mod error;
mod frame;
mod image;
mod interface;
mod runner;
pub mod scripted;
mod snapshot;
mod trace;

pub use compare::{MismatchKind, TraceMismatch, diverging_fields, registers_match};
pub use driver::{
    AUDIO_CLOCKS_PER_CPU_CYCLE, CLOCKS_PER_SAMPLE, DOTS_PER_CPU_CYCLE, Driver, StepReport,
};
pub use error::HarnessError;
pub use frame::{FB_HEIGHT, FB_WIDTH, FrameBuffer, FrameOracle};
pub use image::{FrameComparison, ReferenceImage, compare_frames, decode_reference_name};
pub use interface::{AudioUnit, CoreError, EmulatorCore, VideoSignals, VideoUnit};
pub use runner::{
    DEFAULT_STEP_CEILING, RunConfig, RunStats, StatusByte, Termination, TestOutcome, TraceConfig,
    TraceReport, run_budget, run_trace, run_until,
};
pub use scripted::ScriptedCore;
pub use snapshot::{CpuSnapshot, Status, flags};
pub use trace::{ExpectationRecord, REGISTER_COLUMN, parse_trace};
