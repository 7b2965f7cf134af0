//! Decoded instructions
//!
//! Decoding folds every `EXTENDED_ARG` chain into the instruction that
//! follows it, so an [`Instruction`] always carries its full operand and the
//! offset of the first byte of its chain. Jump targets are resolved to
//! absolute offsets at decode time.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::error::{BytecodeError, Result};
use crate::opcode::Opcode;

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Offset of the first byte of the prefix chain (or the opcode itself)
    pub offset: u32,
    /// Opcode
    pub opcode: Opcode,
    /// Full operand; `None` when the opcode ignores its operand byte
    pub operand: Option<u32>,
    /// Number of `EXTENDED_ARG` prefixes folded into the operand
    pub prefixes: u8,
    /// Operand is a forward distance
    pub is_jump_relative: bool,
    /// Operand is an absolute offset
    pub is_jump_absolute: bool,
    /// Resolved jump target offset
    pub jump_target: Option<u32>,
    /// Source line starting at this instruction
    pub source_line: Option<u32>,
}

impl Instruction {
    /// Offset of the opcode byte itself, after the prefix chain
    #[inline]
    pub fn opcode_at(&self) -> u32 {
        self.offset + 2 * u32::from(self.prefixes)
    }

    /// Is this a branch of either kind
    #[inline]
    pub fn is_jump(&self) -> bool {
        self.is_jump_relative || self.is_jump_absolute
    }
}

/// Decode raw wordcode, attaching line markers from a packed position table
pub fn decode(code: &[u8], firstlineno: u32, lnotab: &[u8]) -> Result<Vec<Instruction>> {
    let lines: FxHashMap<u32, u32> = line_starts(firstlineno, lnotab).into_iter().collect();
    let cells: Vec<u32> = code.iter().map(|&b| u32::from(b)).collect();
    decode_cells(&cells, &lines)
}

/// Decode a buffer of cells.
///
/// Cells are bytes that may temporarily hold values above 255 in operand
/// slots; such a cell contributes its full value at its position in the
/// chain. `lines` maps instruction offsets to source lines.
pub fn decode_cells(cells: &[u32], lines: &FxHashMap<u32, u32>) -> Result<Vec<Instruction>> {
    if cells.len() % 2 != 0 {
        return Err(BytecodeError::UnexpectedEnd);
    }

    let mut instructions = Vec::with_capacity(cells.len() / 2);
    let mut ext: u32 = 0;
    let mut chain_start: Option<u32> = None;
    let mut prefixes: u8 = 0;

    for (index, word) in cells.chunks_exact(2).enumerate() {
        let at = (index * 2) as u32;
        let opcode = u8::try_from(word[0])
            .ok()
            .and_then(Opcode::from_byte)
            .ok_or(BytecodeError::InvalidOpcode {
                opcode: word[0] as u8,
                offset: at as usize,
            })?;
        let value = ext
            .checked_mul(256)
            .and_then(|high| high.checked_add(word[1]))
            .ok_or(BytecodeError::OperandOverflow {
                offset: chain_start.unwrap_or(at),
            })?;

        if opcode == Opcode::ExtendedArg {
            chain_start.get_or_insert(at);
            prefixes = prefixes.saturating_add(1);
            ext = value;
            continue;
        }

        let offset = chain_start.take().unwrap_or(at);
        let operand = opcode.has_argument().then_some(value);
        let jump_target = match operand {
            Some(arg) if opcode.is_jump_relative() => Some(
                (at + 2)
                    .checked_add(arg)
                    .ok_or(BytecodeError::InvalidJumpTarget {
                        offset,
                        target: u32::MAX,
                    })?,
            ),
            Some(arg) if opcode.is_jump_absolute() => Some(arg),
            _ => None,
        };

        instructions.push(Instruction {
            offset,
            opcode,
            operand,
            prefixes,
            is_jump_relative: opcode.is_jump_relative(),
            is_jump_absolute: opcode.is_jump_absolute(),
            jump_target,
            source_line: lines.get(&offset).or_else(|| lines.get(&at)).copied(),
        });

        ext = 0;
        prefixes = 0;
    }

    validate_targets(&instructions)?;
    Ok(instructions)
}

fn validate_targets(instructions: &[Instruction]) -> Result<()> {
    let mut starts: Vec<u32> = instructions.iter().map(|i| i.offset).collect();
    starts.sort_unstable();

    for instr in instructions {
        if let Some(target) = instr.jump_target
            && starts.binary_search(&target).is_err()
        {
            return Err(BytecodeError::InvalidJumpTarget {
                offset: instr.offset,
                target,
            });
        }
    }
    Ok(())
}

/// Decode a packed position table into `(offset, line)` pairs.
///
/// The table is a sequence of `(offset delta, line delta)` byte pairs, the
/// line delta being signed. A pair is only reported once the offset moves,
/// so consecutive line steps at the same offset collapse into one entry.
pub fn line_starts(firstlineno: u32, lnotab: &[u8]) -> Vec<(u32, u32)> {
    let mut starts = Vec::new();
    let mut last_line: Option<i64> = None;
    let mut line = i64::from(firstlineno);
    let mut addr: u32 = 0;

    for pair in lnotab.chunks_exact(2) {
        let (addr_incr, line_incr) = (pair[0], pair[1] as i8);
        if addr_incr != 0 {
            if last_line != Some(line) {
                push_line(&mut starts, addr, line);
                last_line = Some(line);
            }
            addr += u32::from(addr_incr);
        }
        line += i64::from(line_incr);
    }
    if last_line != Some(line) {
        push_line(&mut starts, addr, line);
    }
    starts
}

fn push_line(starts: &mut Vec<(u32, u32)>, addr: u32, line: i64) {
    if let Ok(line) = u32::try_from(line) {
        starts.push((addr, line));
    }
}

/// Render a listing of decoded instructions
pub fn disassemble(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for instr in instructions {
        let line = instr
            .source_line
            .map(|l| l.to_string())
            .unwrap_or_default();
        let _ = write!(out, "{line:>5} {:>6} {:<24}", instr.offset, instr.opcode.name());
        if let Some(arg) = instr.operand {
            let _ = write!(out, " {arg}");
        }
        if let Some(target) = instr.jump_target {
            let _ = write!(out, " (to {target})");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{EXTENDED_ARG, NOP};

    const LOAD_CONST: u8 = 100;
    const RETURN_VALUE: u8 = 83;
    const JUMP_FORWARD: u8 = 110;
    const JUMP_ABSOLUTE: u8 = 113;

    #[test]
    fn test_decode_folds_extended_arg() {
        let code = [EXTENDED_ARG, 0x01, LOAD_CONST, 0x02, RETURN_VALUE, 0];
        let instrs = decode(&code, 1, &[]).unwrap();

        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].offset, 0);
        assert_eq!(instrs[0].opcode, Opcode::LoadConst);
        assert_eq!(instrs[0].operand, Some(0x102));
        assert_eq!(instrs[0].prefixes, 1);
        assert_eq!(instrs[0].opcode_at(), 2);
        assert_eq!(instrs[1].offset, 4);
        assert_eq!(instrs[1].operand, None);
    }

    #[test]
    fn test_decode_jumps() {
        let code = [JUMP_FORWARD, 2, NOP, 0, JUMP_ABSOLUTE, 0, RETURN_VALUE, 0];
        let instrs = decode(&code, 1, &[]).unwrap();

        assert!(instrs[0].is_jump_relative);
        assert_eq!(instrs[0].jump_target, Some(4));
        assert!(instrs[2].is_jump_absolute);
        assert_eq!(instrs[2].jump_target, Some(0));
        assert!(!instrs[1].is_jump());
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(
            decode(&[LOAD_CONST], 1, &[]),
            Err(BytecodeError::UnexpectedEnd)
        ));
        assert!(matches!(
            decode(&[0xC8, 0], 1, &[]),
            Err(BytecodeError::InvalidOpcode { opcode: 0xC8, offset: 0 })
        ));
        assert!(matches!(
            decode(&[JUMP_ABSOLUTE, 3, RETURN_VALUE, 0], 1, &[]),
            Err(BytecodeError::InvalidJumpTarget { offset: 0, target: 3 })
        ));
    }

    #[test]
    fn test_decode_rejects_overlong_chain() {
        let mut code = Vec::new();
        for _ in 0..9 {
            code.extend_from_slice(&[EXTENDED_ARG, 0xFF]);
        }
        code.extend_from_slice(&[LOAD_CONST, 0xFF]);
        assert!(matches!(
            decode(&code, 1, &[]),
            Err(BytecodeError::OperandOverflow { offset: 0 })
        ));

        // four prefixes already carry more than 32 bits
        let code = [EXTENDED_ARG, 1, EXTENDED_ARG, 0, EXTENDED_ARG, 0, EXTENDED_ARG, 0, LOAD_CONST, 0];
        assert!(matches!(
            decode(&code, 1, &[]),
            Err(BytecodeError::OperandOverflow { offset: 0 })
        ));
    }

    #[test]
    fn test_decode_rejects_relative_jump_past_u32() {
        let code = [
            EXTENDED_ARG, 0xFF, EXTENDED_ARG, 0xFF, EXTENDED_ARG, 0xFF, JUMP_FORWARD, 0xFF,
        ];
        assert!(matches!(
            decode(&code, 1, &[]),
            Err(BytecodeError::InvalidJumpTarget { offset: 0, target: u32::MAX })
        ));
    }

    #[test]
    fn test_decode_drops_dangling_prefix() {
        let instrs = decode(&[RETURN_VALUE, 0, EXTENDED_ARG, 0], 1, &[]).unwrap();
        assert_eq!(instrs.len(), 1);
    }

    #[test]
    fn test_decode_wide_cells() {
        let lines = FxHashMap::default();
        let instrs = decode_cells(&[u32::from(JUMP_ABSOLUTE), 0x104, 0x09, 0], &lines);
        // 0x104 is not an instruction boundary here
        assert!(instrs.is_err());

        let instrs = decode_cells(&[u32::from(LOAD_CONST), 0x1FF, 0x09, 0], &lines).unwrap();
        assert_eq!(instrs[0].operand, Some(0x1FF));
    }

    #[test]
    fn test_line_starts() {
        // offset 0 -> line 1, offset 4 -> line 2, offset 10 -> line 5
        let lnotab = [4, 1, 6, 3];
        assert_eq!(line_starts(1, &lnotab), vec![(0, 1), (4, 2), (10, 5)]);

        // negative delta
        let lnotab = [2, 3, 2, 0xFE];
        assert_eq!(line_starts(10, &lnotab), vec![(0, 10), (2, 13), (4, 11)]);
    }

    #[test]
    fn test_decode_attaches_lines() {
        let code = [LOAD_CONST, 0, RETURN_VALUE, 0];
        let instrs = decode(&code, 3, &[2, 1]).unwrap();
        assert_eq!(instrs[0].source_line, Some(3));
        assert_eq!(instrs[1].source_line, Some(4));
    }

    #[test]
    fn test_disassemble() {
        let instrs = decode(&[LOAD_CONST, 7, RETURN_VALUE, 0], 1, &[]).unwrap();
        let listing = disassemble(&instrs);
        assert!(listing.contains("LOAD_CONST"));
        assert!(listing.contains(" 7"));
        assert_eq!(listing.lines().count(), 2);
    }
}
