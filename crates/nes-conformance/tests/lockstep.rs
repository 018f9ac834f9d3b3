//! Lockstep golden-trace verification, end to end: parse a log, build a
//! scripted core that embodies it, and drive the pair through the real
//! driver and comparator.

use nes_conformance::scripted::ScriptedCore;
use nes_conformance::{
    Driver, EmulatorCore, ExpectationRecord, HarnessError, MismatchKind, Status, TraceConfig,
    parse_trace, run_trace,
};

/// Render one golden-log line with the register block at column 48.
fn golden_line(pc: u16, a: u8, x: u8, y: u8, p: u8, s: u8, cyc: u64) -> String {
    format!(
        "{:<48}A:{a:02X} X:{x:02X} Y:{y:02X} P:{p:02X} SP:{s:02X} CYC:{cyc}",
        format!("{pc:04X}  EA        NOP")
    )
}

/// A short, well-formed golden log.
fn golden_log() -> String {
    [
        golden_line(0xC000, 0x00, 0x00, 0x00, 0x24, 0xFD, 7),
        golden_line(0xC5F5, 0x00, 0x00, 0x00, 0x24, 0xFD, 10),
        golden_line(0xC5F7, 0x00, 0x02, 0x00, 0x24, 0xFD, 12),
        golden_line(0xC5F9, 0x40, 0x02, 0x00, 0x24, 0xFD, 14),
    ]
    .join("\n")
}

#[test]
fn trace_satisfies_its_own_replay() {
    let records = parse_trace(&golden_log()).expect("log parses");
    let mut core = ScriptedCore::from_trace(&records);
    let mut driver = Driver::new();

    let report = run_trace(&mut core, &mut driver, &records, TraceConfig::default())
        .expect("a trace must satisfy its own replay");
    assert_eq!(report.records, 4);
    assert_eq!(report.final_cycles, core.snapshot().cycles);
}

#[test]
fn first_divergence_halts_the_run() {
    let records = parse_trace(&golden_log()).expect("log parses");

    // The core diverges at the third boundary: wrong X.
    let mut wrong = records.clone();
    wrong[2].x = 0x03;
    let mut core = ScriptedCore::from_trace(&wrong);
    let mut driver = Driver::new();

    let err = run_trace(&mut core, &mut driver, &records, TraceConfig::default())
        .expect_err("divergence must be reported");
    let mismatch = match err {
        HarnessError::TraceMismatch(mismatch) => mismatch,
        other => panic!("wrong error: {other}"),
    };
    assert_eq!(mismatch.line, 3);
    assert_eq!(
        mismatch.kind,
        MismatchKind::Register { fields: vec!["x"] }
    );
    assert_eq!(mismatch.expected, records[2]);
    assert_eq!(mismatch.actual.x, 0x03);

    // No further steps ran: the core still rests at the diverging
    // boundary (two steps consumed, none after).
    assert_eq!(core.snapshot().pc, 0xC5F7);
    assert_eq!(core.snapshot().cycles, 12);
}

#[test]
fn cycle_divergence_is_informational_by_default() {
    let records = parse_trace(&golden_log()).expect("log parses");

    // Same register tuples, shifted cycle counter.
    let mut shifted = records.clone();
    for record in &mut shifted {
        record.cycles += 5;
    }
    let mut core = ScriptedCore::from_trace(&shifted);
    let mut driver = Driver::new();

    run_trace(&mut core, &mut driver, &records, TraceConfig::default())
        .expect("cycle drift alone must not fail a default run");
}

#[test]
fn cycle_divergence_fails_a_strict_run() {
    let records = parse_trace(&golden_log()).expect("log parses");

    let mut shifted = records.clone();
    for record in &mut shifted {
        record.cycles += 5;
    }
    let mut core = ScriptedCore::from_trace(&shifted);
    let mut driver = Driver::new();

    let config = TraceConfig {
        enforce_cycles: true,
    };
    let err = run_trace(&mut core, &mut driver, &records, config)
        .expect_err("strict mode must enforce cycles");
    let mismatch = match err {
        HarnessError::TraceMismatch(mismatch) => mismatch,
        other => panic!("wrong error: {other}"),
    };
    assert_eq!(mismatch.line, 1);
    assert_eq!(mismatch.kind, MismatchKind::Cycle);
}

#[test]
fn core_failure_aborts_with_its_own_diagnosis() {
    let records = parse_trace(&golden_log()).expect("log parses");
    let mut core = ScriptedCore::from_trace(&records);
    core.fail_on_step(1);
    let mut driver = Driver::new();

    let err = run_trace(&mut core, &mut driver, &records, TraceConfig::default())
        .expect_err("the fault must surface");
    match err {
        HarnessError::CoreExecution(inner) => {
            assert!(inner.to_string().contains("scripted fault at step 1"));
        }
        other => panic!("wrong error: {other}"),
    }
}

#[test]
fn nestest_boundary_line_parses_and_replays() {
    // The canonical first line of the nestest log.
    let log = format!(
        "{:<48}A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7",
        "C000  4C F5 C5  JMP $C5F5"
    );
    let records = parse_trace(&log).expect("parses");
    assert_eq!(
        records[0],
        ExpectationRecord {
            pc: 0xC000,
            a: 0,
            x: 0,
            y: 0,
            p: Status(0x24),
            s: 0xFD,
            cycles: 7,
        }
    );

    let mut core = ScriptedCore::from_trace(&records);
    let mut driver = Driver::new();
    run_trace(&mut core, &mut driver, &records, TraceConfig::default())
        .expect("single-record replay passes");
}
