//! Capability interface onto the emulator under test.
//!
//! The harness never touches a core's internals. Everything it needs is
//! expressed here: one-instruction stepping, a register snapshot, a
//! side-effect-free byte read, an NMI line, and the two clocked
//! collaborators (picture unit, audio unit). Any emulator that can wear
//! this interface can be driven by the harness, and deterministic stubs
//! can stand in for one in tests.

use crate::frame::FrameBuffer;
use crate::snapshot::CpuSnapshot;

/// Error raised by the core's own instruction step.
///
/// Opaque to the harness: the core formats its own diagnosis and the
/// harness reports it verbatim without retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CoreError(String);

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Signals reported by the picture unit for one advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoSignals {
    /// The advance crossed into the vertical blanking interval.
    pub entered_vblank: bool,
    /// A full frame finished rendering during the advance.
    pub frame_drawn: bool,
}

/// The picture unit collaborator.
pub trait VideoUnit {
    /// Advance the picture clock by `dots` ticks.
    ///
    /// Must be called every driven step, even when the harness discards
    /// the signals — the unit's internal clock has to stay in lockstep
    /// with the CPU clock for interrupt timing to hold.
    fn advance(&mut self, dots: u64) -> VideoSignals;

    /// The live framebuffer being drawn into. May be mid-frame; only the
    /// frame oracle's stable copy is safe for comparison.
    fn live_frame(&self) -> &FrameBuffer;
}

/// The audio unit collaborator.
pub trait AudioUnit {
    /// Advance the sample clock by `clocks` units.
    fn advance(&mut self, clocks: f64);
}

/// A cycle-accurate emulator core under test.
pub trait EmulatorCore {
    /// Execute exactly one instruction. Returns the CPU cycles the core
    /// claims to have consumed; the driver cross-checks this against the
    /// snapshot's cycle counter.
    fn step(&mut self) -> Result<u64, CoreError>;

    /// Observable CPU state at the current instruction boundary.
    fn snapshot(&self) -> CpuSnapshot;

    /// Read one byte of the address space without side effects.
    fn peek(&self, address: u16) -> u8;

    /// Raise a non-maskable interrupt.
    fn nmi(&mut self);

    /// The picture unit.
    fn video(&mut self) -> &mut dyn VideoUnit;

    /// The audio unit.
    fn audio(&mut self) -> &mut dyn AudioUnit;
}
