//! Lockstep execution driver.
//!
//! One driven step is one emulated instruction, atomically: the CPU
//! steps, then the picture and audio units are advanced by amounts
//! derived from the cycles that instruction consumed. The ratios mirror
//! the target hardware's clock tree (three picture dots per CPU cycle,
//! an audio clock at half the CPU rate sampled every 100 clock units)
//! and are not configurable.
//!
//! The collaborators advance every step even when their output is
//! unused, because their internal clocks gate interrupt timing: when the
//! picture unit reports that an advance crossed into vertical blanking,
//! the driver raises a non-maskable interrupt on the core before the
//! next instruction runs.

use crate::error::HarnessError;
use crate::frame::{FrameBuffer, FrameOracle};
use crate::interface::{CoreError, EmulatorCore};

/// Picture clock dots per CPU cycle.
pub const DOTS_PER_CPU_CYCLE: u64 = 3;

/// Audio clock units per CPU cycle (the audio clock runs at half rate).
pub const AUDIO_CLOCKS_PER_CPU_CYCLE: f64 = 0.5;

/// Audio clock units per emitted sample.
pub const CLOCKS_PER_SAMPLE: f64 = 100.0;

/// What one driven step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// CPU cycles the instruction consumed, measured from the snapshot
    /// cycle counter.
    pub cycles: u64,
    /// A non-maskable interrupt was raised after this step.
    pub nmi: bool,
    /// The picture unit completed a frame during this step.
    pub frame_drawn: bool,
}

/// Advances an emulator core one instruction at a time, keeping the
/// picture and audio clocks in lockstep and publishing completed frames.
#[derive(Debug, Default)]
pub struct Driver {
    frame: FrameOracle,
    sample_clock: f64,
    samples_emitted: u64,
}

impl Driver {
    /// A fresh driver with an empty (zeroed) stable frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the core through exactly one instruction.
    ///
    /// # Errors
    ///
    /// [`HarnessError::CoreExecution`] if the core's step fails or its
    /// cycle counter runs backwards. The driver never retries; callers
    /// abort the run and report the error verbatim.
    pub fn step<C: EmulatorCore + ?Sized>(
        &mut self,
        core: &mut C,
    ) -> Result<StepReport, HarnessError> {
        let before = core.snapshot().cycles;
        let claimed = core.step()?;
        let after = core.snapshot().cycles;

        let cycles = after.checked_sub(before).ok_or_else(|| {
            CoreError::new(format!(
                "cycle counter ran backwards: {before} then {after}"
            ))
        })?;
        if claimed != cycles {
            log::warn!("core claimed {claimed} cycles but its counter advanced by {cycles}");
        }

        // Derived advances, every step: the collaborators' clocks must
        // track the CPU clock even when nobody reads their output.
        let signals = core.video().advance(cycles * DOTS_PER_CPU_CYCLE);

        let clocks = cycles as f64 * AUDIO_CLOCKS_PER_CPU_CYCLE;
        core.audio().advance(clocks);
        self.sample_clock += clocks;
        while self.sample_clock >= CLOCKS_PER_SAMPLE {
            self.sample_clock -= CLOCKS_PER_SAMPLE;
            self.samples_emitted += 1;
        }

        if signals.frame_drawn {
            self.frame.promote(core.video().live_frame());
        }

        if signals.entered_vblank {
            log::debug!("vblank crossed at cycle {after}, raising NMI");
            core.nmi();
        }

        log::trace!(
            "step: {cycles} cycles, pc ${:04X}{}{}",
            core.snapshot().pc,
            if signals.entered_vblank { ", nmi" } else { "" },
            if signals.frame_drawn { ", frame" } else { "" },
        );

        Ok(StepReport {
            cycles,
            nmi: signals.entered_vblank,
            frame_drawn: signals.frame_drawn,
        })
    }

    /// The most recently completed frame (zeroed before the first one).
    #[must_use]
    pub fn capture(&self) -> &FrameBuffer {
        self.frame.capture()
    }

    /// Audio samples emitted so far at the fixed 100-clock baseline.
    #[must_use]
    pub fn samples_emitted(&self) -> u64 {
        self.samples_emitted
    }
}
