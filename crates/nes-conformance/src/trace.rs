//! Golden execution trace records and their line-oriented parser.
//!
//! A golden trace holds one record per executed instruction, in
//! execution order. The layout is the established log format for this
//! machine family: the program counter as four hex characters at column
//! zero, disassembly text the parser ignores, then a labeled register
//! block at a fixed column:
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5          A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7
//! ```
//!
//! The `PPU` dot/scanline block is informational and skipped; everything
//! else in the register block is required.

use crate::error::HarnessError;
use crate::snapshot::Status;

/// Column at which the labeled register block begins.
pub const REGISTER_COLUMN: usize = 48;

/// One parsed golden-trace line: the expected CPU state at an
/// instruction boundary, before that instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectationRecord {
    /// Expected program counter.
    pub pc: u16,
    /// Expected accumulator.
    pub a: u8,
    /// Expected X index register.
    pub x: u8,
    /// Expected Y index register.
    pub y: u8,
    /// Expected processor status.
    pub p: Status,
    /// Expected stack pointer.
    pub s: u8,
    /// Expected cumulative cycle count (decimal in the log).
    pub cycles: u64,
}

/// Parse a whole golden trace into records, preserving line order.
///
/// Order is significant: record N is the expected state before the Nth
/// driven step. Records are never reordered or deduplicated.
///
/// # Errors
///
/// Returns [`HarnessError::MalformedRecord`] naming the 1-based line on
/// the first line with a missing or unparsable required field.
pub fn parse_trace(text: &str) -> Result<Vec<ExpectationRecord>, HarnessError> {
    text.lines()
        .enumerate()
        .map(|(index, line)| parse_record(line).map_err(|reason| HarnessError::MalformedRecord {
            line: index + 1,
            reason,
        }))
        .collect()
}

fn parse_record(line: &str) -> Result<ExpectationRecord, String> {
    let pc_field = line
        .get(..4)
        .ok_or_else(|| "truncated record, no program counter field".to_string())?;
    let pc = u16::from_str_radix(pc_field, 16)
        .map_err(|_| format!("bad program counter field {pc_field:?}"))?;

    let block = line
        .get(REGISTER_COLUMN..)
        .filter(|block| !block.trim().is_empty())
        .ok_or_else(|| format!("register block missing at column {REGISTER_COLUMN}"))?;

    let mut a = None;
    let mut x = None;
    let mut y = None;
    let mut p = None;
    let mut s = None;
    let mut cycles = None;

    for token in block.split_ascii_whitespace() {
        let Some((label, value)) = token.split_once(':') else {
            continue;
        };
        match label {
            "A" => a = Some(parse_hex_byte(label, value)?),
            "X" => x = Some(parse_hex_byte(label, value)?),
            "Y" => y = Some(parse_hex_byte(label, value)?),
            "P" => p = Some(parse_hex_byte(label, value)?),
            "SP" => s = Some(parse_hex_byte(label, value)?),
            "CYC" => {
                cycles = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("bad CYC field {value:?}"))?,
                );
            }
            // Unknown labels (PPU dot/scanline block, bank annotations)
            // are informational.
            _ => {}
        }
    }

    let require = |name: &str, field: Option<u8>| {
        field.ok_or_else(|| format!("missing {name} field"))
    };

    Ok(ExpectationRecord {
        pc,
        a: require("A", a)?,
        x: require("X", x)?,
        y: require("Y", y)?,
        p: Status(require("P", p)?),
        s: require("SP", s)?,
        cycles: cycles.ok_or_else(|| "missing CYC field".to_string())?,
    })
}

fn parse_hex_byte(label: &str, value: &str) -> Result<u8, String> {
    u8::from_str_radix(value, 16).map_err(|_| format!("bad {label} field {value:?}"))
}
