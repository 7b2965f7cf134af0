//! Jump fixup
//!
//! After a layout round every instruction has moved. Jump operands are
//! rewritten to point at the new start of their target's range: the low byte
//! goes into the jump's own operand slot and higher bytes walk back through
//! the prefix chain the round synthesized. Whatever does not fit stays as a
//! wide value in the topmost slot; the next round plans a longer chain from
//! it.

use rustc_hash::FxHashMap;
use textcode_bytecode::{
    BytecodeError, ByteClass, EXTENDED_ARG, Instruction, classify, is_unrestricted_lead,
};
use tracing::{trace, warn};

use crate::error::{TranscodeError, TranscodeResult};
use crate::transcoder::Placement;

/// Largest alignment pad requested in front of a jump target
pub const MAX_ALIGNMENT_PAD: u32 = 256;

/// Outcome of fixing the jumps of one pass
#[derive(Debug, Default)]
pub struct FixupReport {
    /// Jumps whose value did not fit the prefix chain
    pub exhausted: usize,
    /// Further `NOP` padding wanted before a jump target, keyed by the
    /// target's offset in the input
    pub pads: FxHashMap<u32, u32>,
    /// Operand written for each jump, keyed by its index in the input
    pub values: FxHashMap<usize, u32>,
}

/// Rewrite every jump operand in `cells` for the layout in `placements`.
///
/// `placements` is parallel to `input`; `index` maps an input offset to its
/// position in `input`.
pub fn fix_jumps(
    input: &[Instruction],
    index: &FxHashMap<u32, usize>,
    placements: &[Placement],
    cells: &mut [u32],
) -> TranscodeResult<FixupReport> {
    let mut report = FixupReport::default();

    for (jump, (instr, here)) in input.iter().zip(placements).enumerate() {
        let Some(target) = instr.jump_target else {
            continue;
        };
        let Some(&target_index) = index.get(&target) else {
            return Err(BytecodeError::InvalidJumpTarget {
                offset: instr.offset,
                target,
            }
            .into());
        };
        let landing = placements[target_index].start;

        let value = if instr.is_jump_relative {
            let distance = i64::from(landing) - i64::from(here.opcode_at + 2);
            u32::try_from(distance).map_err(|_| TranscodeError::BackwardRelativeJump {
                offset: here.opcode_at,
                distance,
            })?
        } else {
            landing
        };

        trace!(at = here.opcode_at, target = landing, value, "jump");

        if !write_operand(cells, here, value)? {
            warn!(
                at = here.opcode_at,
                value,
                prefixes = here.prefixes,
                "jump value exceeds its prefix chain, widening next pass"
            );
            report.exhausted += 1;
        }

        let opcode = instr.opcode.to_byte();
        if !operand_encodable(opcode, value)
            && let Some(pad) = alignment_pad(opcode, value)
        {
            let entry = report.pads.entry(target).or_default();
            *entry = (*entry).max(pad);
        }
        report.values.insert(jump, value);
    }

    Ok(report)
}

/// Spread `value` over the operand slot and the prefix chain of `at`.
///
/// Returns `false` when the chain was too short and the topmost slot was
/// left holding a wide value.
fn write_operand(cells: &mut [u32], at: &Placement, value: u32) -> TranscodeResult<bool> {
    let opcode_at = at.opcode_at as usize;
    let mut slot = opcode_at + 1;
    cells[slot] = value & 0xFF;
    let mut rest = value >> 8;

    for depth in 1..=usize::from(at.prefixes) {
        let prefix = opcode_at - 2 * depth;
        if cells[prefix] != u32::from(EXTENDED_ARG) {
            return Err(TranscodeError::BrokenPrefixChain {
                offset: at.opcode_at,
                at: prefix as u32,
            });
        }
        slot = prefix + 1;
        cells[slot] = rest & 0xFF;
        rest >>= 8;
    }

    if rest == 0 {
        return Ok(true);
    }
    cells[slot] += rest << 8;
    Ok(false)
}

/// Can `value` sit in the operand of `opcode` without breaking the text.
///
/// The low byte must be ASCII, a lead any continuation may follow, or a
/// continuation right behind a continuation opcode. For values that need a
/// prefix the byte under the prefix must also leave the opcode reachable,
/// since nothing may be inserted inside a chain.
pub fn operand_encodable(opcode: u8, value: u32) -> bool {
    let low = (value & 0xFF) as u8;
    let wide = value > 0xFF;
    let continuation_opcode = classify(opcode).is_continuation();

    let low_ok = match classify(low) {
        ByteClass::Ascii => true,
        ByteClass::Continuation => continuation_opcode && !wide,
        ByteClass::Lead2 | ByteClass::Lead3 | ByteClass::Lead4 => is_unrestricted_lead(low),
        ByteClass::Invalid => false,
    };
    if !low_ok || !wide {
        return low_ok;
    }

    let high = ((value >> 8) & 0xFF) as u8;
    match classify(high) {
        ByteClass::Ascii => !continuation_opcode,
        ByteClass::Continuation => true,
        ByteClass::Lead2 => continuation_opcode && is_unrestricted_lead(high),
        _ => false,
    }
}

/// Smallest even pad that makes `value` encodable for `opcode`
pub fn alignment_pad(opcode: u8, value: u32) -> Option<u32> {
    (2..=MAX_ALIGNMENT_PAD)
        .step_by(2)
        .find(|&pad| value.checked_add(pad).is_some_and(|v| operand_encodable(opcode, v)))
}
