//! Conformance suite harness.
//!
//! Validates the assets a conformance run depends on, before any real
//! emulator gets involved: golden trace logs must parse and survive
//! self-replay through the lockstep driver, reference images must
//! decode and round-trip the capture path, and the reference matching
//! the requested ROM/cycle pairing must exist. Real cores plug into the
//! same suite through the `nes-conformance` library API.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use nes_conformance::scripted::ScriptedCore;
use nes_conformance::{
    CpuSnapshot, HarnessError, ReferenceImage, RunConfig, Status, TestOutcome, TraceConfig,
    decode_reference_name,
};

mod report;
mod suite;

use report::SuiteReport;
use suite::{BoxedCore, SuiteConfig, TestCase, TestKind};

struct CliArgs {
    rom: PathBuf,
    cycles: u64,
    traces: Vec<PathBuf>,
    refs_dir: PathBuf,
    report_path: Option<PathBuf>,
    strict_cycles: bool,
}

fn usage() {
    eprintln!("Usage: conformance-harness [OPTIONS] <rom> <cycles>");
    eprintln!();
    eprintln!("Validates the conformance assets for one ROM and cycle budget.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --trace <file>     Golden trace log to verify by self-replay (repeatable)");
    eprintln!("  --refs <dir>       Reference image directory [default: references]");
    eprintln!("  --report <file>    Write a JSON report");
    eprintln!("  --strict-cycles    Enforce golden-trace cycle counts");
    eprintln!("  -h, --help         Show this help");
}

/// Parse the command line. `None` means a diagnostic was printed and
/// the caller should return early.
fn parse_args(args: &[String]) -> Option<CliArgs> {
    let mut traces = Vec::new();
    let mut refs_dir = PathBuf::from("references");
    let mut report_path = None;
    let mut strict_cycles = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--trace" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("--trace needs a file argument");
                    usage();
                    return None;
                };
                traces.push(PathBuf::from(value));
            }
            "--refs" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("--refs needs a directory argument");
                    usage();
                    return None;
                };
                refs_dir = PathBuf::from(value);
            }
            "--report" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("--report needs a file argument");
                    usage();
                    return None;
                };
                report_path = Some(PathBuf::from(value));
            }
            "--strict-cycles" => strict_cycles = true,
            "-h" | "--help" => {
                usage();
                return None;
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {other}");
                usage();
                return None;
            }
            other => positional.push(other),
        }
        i += 1;
    }

    let [rom, cycles] = positional.as_slice() else {
        eprintln!("Expected exactly two arguments: a ROM path and a cycle count");
        usage();
        return None;
    };

    let rom = PathBuf::from(*rom);
    if !rom.is_file() {
        eprintln!("ROM file not found: {}", rom.display());
        return None;
    }

    let cycles = match cycles.parse::<u64>() {
        Ok(n) if n > 0 => n,
        Ok(_) => {
            eprintln!("Cycle count must be positive");
            return None;
        }
        Err(_) => {
            eprintln!("Invalid cycle count: {cycles:?}");
            return None;
        }
    };

    Some(CliArgs {
        rom,
        cycles,
        traces,
        refs_dir,
        report_path,
        strict_cycles,
    })
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cli) = parse_args(&args) else {
        return;
    };

    let rom_bytes = match fs::read(&cli.rom) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Cannot read ROM {}: {e}", cli.rom.display());
            return;
        }
    };
    let rom_stem = cli
        .rom
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut cases: Vec<TestCase> = Vec::new();
    for trace in &cli.traces {
        let name = trace
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("trace")
            .to_string();
        cases.push(TestCase {
            name: format!("trace:{name}"),
            kind: TestKind::Trace { log: trace.clone() },
        });
    }
    cases.extend(scan_references(&cli.refs_dir));

    let config = SuiteConfig {
        trace: TraceConfig {
            enforce_cycles: cli.strict_cycles,
        },
        run: RunConfig::default(),
    };
    let mut outcomes = suite::run_suite(&cases, replay_factory, config);

    // The pairing the command line asked for must be satisfiable.
    outcomes.push((
        "required-reference".to_string(),
        required_reference_outcome(&cli.refs_dir, &rom_stem, cli.cycles),
    ));

    for (name, outcome) in &outcomes {
        match outcome {
            TestOutcome::Pass => println!("[PASS] {name}"),
            TestOutcome::Fail(reason) => println!("[FAIL] {name} - {reason}"),
            TestOutcome::Error(reason) => println!("[ERROR] {name} - {reason}"),
        }
    }

    let report = SuiteReport::new(
        cli.rom.display().to_string(),
        report::rom_digest(&rom_bytes),
        cli.cycles,
        outcomes,
    );

    println!();
    println!(
        "Summary: {} passed, {} failed, {} errored",
        report.passed, report.failed, report.errored
    );

    if let Some(path) = &cli.report_path {
        if let Err(e) = report.write(path) {
            eprintln!("Cannot write report {}: {e}", path.display());
            process::exit(1);
        }
    }

    if !report.all_passed() {
        process::exit(1);
    }
}

/// Enumerate reference-image cases under `dir`.
///
/// Files whose names don't match `<rom>-<cycles>.<ext>` are not
/// references and are skipped without complaint.
fn scan_references(dir: &Path) -> Vec<TestCase> {
    let Ok(entries) = fs::read_dir(dir) else {
        log::info!("no reference directory at {}", dir.display());
        return Vec::new();
    };

    let mut cases: Vec<TestCase> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if decode_reference_name(&path).is_none() {
            log::debug!("skipping non-reference file {}", path.display());
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("reference")
            .to_string();
        cases.push(TestCase {
            name: format!("ref:{name}"),
            kind: TestKind::Frame { reference: path },
        });
    }
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    cases
}

/// Is the `<rom>-<cycles>` reference the command line asked for present?
fn required_reference_outcome(dir: &Path, rom_stem: &str, cycles: u64) -> TestOutcome {
    let Ok(entries) = fs::read_dir(dir) else {
        return TestOutcome::Fail(format!(
            "no reference directory at {} for {rom_stem}-{cycles}",
            dir.display()
        ));
    };
    let found = entries.flatten().any(|entry| {
        decode_reference_name(&entry.path())
            .is_some_and(|(rom, budget)| rom == rom_stem && budget == cycles)
    });
    if found {
        TestOutcome::Pass
    } else {
        TestOutcome::Fail(format!(
            "no reference named {rom_stem}-{cycles}.<ext> under {}",
            dir.display()
        ))
    }
}

/// Build the scripted stand-in core for a self-check case.
///
/// Trace cases replay their own golden log; frame cases replay the
/// reference through the capture path by painting it into the live
/// buffer (a reference with the wrong geometry then fails the
/// comparison, which is the point of the check).
fn replay_factory(case: &TestCase) -> Result<BoxedCore, HarnessError> {
    match &case.kind {
        TestKind::Trace { log } => {
            let text = fs::read_to_string(log).map_err(|e| {
                HarnessError::CoreExecution(nes_conformance::CoreError::new(format!(
                    "cannot read golden log {}: {e}",
                    log.display()
                )))
            })?;
            let records = nes_conformance::parse_trace(&text)?;
            if records.is_empty() {
                return Err(HarnessError::CoreExecution(nes_conformance::CoreError::new(
                    format!("golden log {} is empty", log.display()),
                )));
            }
            Ok(Box::new(ScriptedCore::from_trace(&records)))
        }
        TestKind::Frame { reference } => {
            let reference = ReferenceImage::load(reference)?;
            let mut core = ScriptedCore::new(initial_boundary());
            let live = core.video.live_mut();
            if reference.frame.width() == live.width()
                && reference.frame.height() == live.height()
            {
                live.as_rgba_mut().copy_from_slice(reference.frame.as_rgba());
            }
            Ok(Box::new(core))
        }
        TestKind::Sentinels { .. } | TestKind::Memory { .. } => Err(HarnessError::CoreExecution(
            nes_conformance::CoreError::new("no emulator core linked for this case kind"),
        )),
    }
}

fn initial_boundary() -> CpuSnapshot {
    CpuSnapshot {
        pc: 0x8000,
        a: 0,
        x: 0,
        y: 0,
        p: Status(0x24),
        s: 0xFD,
        cycles: 0,
    }
}
