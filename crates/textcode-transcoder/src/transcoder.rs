//! UTF-8 transcoder for wordcode
//!
//! A pass walks the instructions as a flat work-list of steps: operands
//! wider than a byte are split into synthesized `EXTENDED_ARG` prefix steps
//! ahead of their instruction, and alignment pads requested by the jump
//! fixup become `NOP` steps ahead of a jump target. Each step runs through a
//! small state machine that tracks how many continuation bytes the output
//! still owes:
//!
//! - a continuation opcode with no open sequence gets a lead byte in front
//!   of it, either in a free operand slot or in a fresh `NOP`
//! - a sequence that the next byte cannot continue is closed with
//!   `EXTENDED_ARG` words whose stray extension is soaked up by a `NOP`
//!
//! After laying out the steps the jumps are fixed up for the new positions.
//! A jump whose operand changed, or whose target needs alignment padding, is
//! planned again with the new operand and padding until the layout stops
//! moving, so the state machine always sees the bytes that end up in the
//! output. If the settled pass is still invalid its output is decoded and
//! run again, up to [`Options::max_passes`] times.

use rustc_hash::FxHashMap;
use textcode_bytecode::{
    ByteClass, CodeValue, EXTENDED_ARG, FILLER, HAVE_ARGUMENT, Instruction, NOP, Value, classify,
    decode_cells, disassemble, is_valid_text, is_valid_u32, next_valid_u32, prev_valid_u32,
};
use tracing::{debug, info, trace, warn};

use crate::error::{TranscodeError, TranscodeResult};
use crate::fixup::{FixupReport, fix_jumps};
use crate::lnotab::LineTableEncoder;
use crate::options::Options;

/// Lead opening a sequence that covers only the opcode
pub const LEAD_OPCODE: u8 = 0xC3;
/// Lead opening a sequence that covers the opcode and its operand
pub const LEAD_OPERAND: u8 = 0xE1;
/// Lead that also covers the opcode of the following step
pub const LEAD_NEXT: u8 = 0xF1;

/// Layout rounds within one pass
const MAX_ROUNDS: usize = 16;

/// Where one input instruction landed in the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    /// First cell of the instruction's range; jumps land here
    pub start: u32,
    /// Cell holding the instruction's own opcode
    pub opcode_at: u32,
    /// Synthesized `EXTENDED_ARG` words directly before the opcode
    pub prefixes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Pad,
    Prefix(usize),
    Instruction(usize),
}

/// One word the state machine has to emit
#[derive(Debug, Clone, Copy)]
struct Step {
    opcode: u8,
    operand: Option<u8>,
    kind: StepKind,
}

impl Step {
    fn owner(&self) -> Option<usize> {
        match self.kind {
            StepKind::Pad => None,
            StepKind::Prefix(index) | StepKind::Instruction(index) => Some(index),
        }
    }

    fn opcode_class(&self) -> ByteClass {
        classify(self.opcode)
    }

    fn operand_class(&self) -> ByteClass {
        self.operand.map_or(ByteClass::Ascii, classify)
    }

    fn takes_argument(&self) -> bool {
        self.opcode >= HAVE_ARGUMENT
    }
}

/// Jump operands and target padding a pass is laid out with
#[derive(Debug, Default, Clone)]
pub struct Layout {
    /// Operand planned for a jump, by index in the input
    pub operands: FxHashMap<usize, u32>,
    /// Bytes of `NOP` padding before a range start, by offset in the input
    pub pads: FxHashMap<u32, u32>,
}

impl Layout {
    fn operand(&self, input: &[Instruction], index: usize) -> Option<u32> {
        self.operands.get(&index).copied().or(input[index].operand)
    }

    /// Take in what the fixup found; returns whether anything moved.
    ///
    /// A jump whose target asks for alignment is planned with the padded
    /// value. A jump that came out shorter than planned keeps its planned
    /// operand and its target is padded up to it, so operands only grow.
    fn update(&mut self, input: &[Instruction], report: &FixupReport) -> bool {
        let mut moved = false;

        for (&target, &pad) in &report.pads {
            *self.pads.entry(target).or_default() += pad;
            moved = true;
        }

        for (&jump, &value) in &report.values {
            let Some(target) = input[jump].jump_target else {
                continue;
            };
            let value = value.saturating_add(report.pads.get(&target).copied().unwrap_or(0));
            let planned = self.operand(input, jump);
            if planned == Some(value) {
                continue;
            }
            moved = true;
            match self.operands.get(&jump).copied() {
                Some(planned) if planned > value => {
                    *self.pads.entry(target).or_default() += planned - value;
                }
                _ => {
                    self.operands.insert(jump, value);
                }
            }
        }

        moved
    }
}

/// Flatten instructions into steps
fn plan(input: &[Instruction], layout: &Layout) -> Vec<Step> {
    let mut steps = Vec::with_capacity(input.len() + input.len() / 4);

    for (index, instr) in input.iter().enumerate() {
        let pad = layout.pads.get(&instr.offset).copied().unwrap_or(0);
        for _ in 0..pad / 2 {
            steps.push(Step {
                opcode: NOP,
                operand: None,
                kind: StepKind::Pad,
            });
        }

        let opcode = instr.opcode.to_byte();
        let Some(value) = layout.operand(input, index) else {
            steps.push(Step {
                opcode,
                operand: None,
                kind: StepKind::Instruction(index),
            });
            continue;
        };

        let bytes = value.to_be_bytes();
        let skip = bytes[..3].iter().take_while(|&&b| b == 0).count();
        for &high in &bytes[skip..3] {
            steps.push(Step {
                opcode: EXTENDED_ARG,
                operand: Some(high),
                kind: StepKind::Prefix(index),
            });
        }
        steps.push(Step {
            opcode,
            operand: Some(bytes[3]),
            kind: StepKind::Instruction(index),
        });
    }

    steps
}

/// Output of a single pass
#[derive(Debug)]
pub struct PassOutput {
    /// Rewritten words; operand cells may exceed 255 after jump fixup
    pub cells: Vec<u32>,
    /// Placement of every input instruction
    pub placements: Vec<Placement>,
    /// Insertions that had to be skipped inside a prefix chain
    pub risks: usize,
}

/// State machine of one pass
#[derive(Debug)]
pub struct TranscodeState {
    state: ByteClass,
    pending: bool,
    in_chain: bool,
    cells: Vec<u32>,
    placements: Vec<Placement>,
    risks: usize,
}

impl TranscodeState {
    fn new(instructions: usize) -> Self {
        Self {
            state: ByteClass::Ascii,
            pending: false,
            in_chain: false,
            cells: Vec::with_capacity(instructions * 3),
            placements: vec![Placement::default(); instructions],
            risks: 0,
        }
    }

    /// Lay out `input` once
    pub fn run(input: &[Instruction], layout: &Layout) -> PassOutput {
        let steps = plan(input, layout);
        let mut this = Self::new(input.len());
        let mut current = None;

        for (k, step) in steps.iter().enumerate() {
            if let Some(index) = step.owner()
                && current != Some(index)
            {
                this.placements[index].start = this.len();
                current = Some(index);
            }
            this.step(step, steps.get(k + 1));
        }

        this.finish()
    }

    fn len(&self) -> u32 {
        self.cells.len() as u32
    }

    fn step(&mut self, step: &Step, next: Option<&Step>) {
        let opcode_class = step.opcode_class();
        let operand_class = step.operand_class();

        trace!(
            opcode = step.opcode,
            operand = ?step.operand,
            state = ?self.state,
            "step"
        );

        let need_close = (self.state.is_lead() && !opcode_class.is_continuation())
            || (self.state.is_lead3_or_wider() && !operand_class.is_continuation())
            || (self.state.is_lead2() && operand_class.is_continuation());

        let mut absorb = false;
        if need_close {
            if self.in_chain {
                self.risk("close");
            } else {
                absorb = self.close();
            }
        }

        if opcode_class.is_continuation() && self.state < ByteClass::Lead2 {
            if self.in_chain {
                self.risk("lead");
            } else {
                let lead = choose_lead(operand_class, next);
                if self.pending {
                    self.fill_pending(lead);
                } else {
                    self.emit(NOP, lead);
                    absorb = false;
                }
                self.state = classify(lead);
            }
        }

        if absorb && step.takes_argument() {
            self.emit(NOP, FILLER);
        }
        self.fill_pending(FILLER);

        match step.kind {
            StepKind::Instruction(index) => self.placements[index].opcode_at = self.len(),
            StepKind::Prefix(index) => self.placements[index].prefixes += 1,
            StepKind::Pad => {}
        }

        self.cells.push(u32::from(step.opcode));
        match step.operand {
            Some(operand) => self.cells.push(u32::from(operand)),
            None => {
                self.cells.push(0);
                self.pending = true;
            }
        }

        self.state = match step.operand {
            None | Some(0) => ByteClass::Ascii,
            Some(operand) if classify(operand).is_lead() => classify(operand),
            _ if self.state.is_lead() => self.state.consume(),
            _ => self.state,
        };
        self.in_chain = matches!(step.kind, StepKind::Prefix(_));
    }

    /// Append closers for the open sequence; returns whether the stray
    /// extension they leave behind needs an absorber
    fn close(&mut self) -> bool {
        match self.state {
            ByteClass::Lead2 => {
                self.emit(EXTENDED_ARG, 0);
                self.state = ByteClass::Ascii;
                false
            }
            ByteClass::Lead3 => {
                self.emit(EXTENDED_ARG, 0x80);
                self.state = ByteClass::Continuation;
                true
            }
            ByteClass::Lead4 => {
                self.emit(EXTENDED_ARG, 0x80);
                self.emit(EXTENDED_ARG, 0);
                self.state = ByteClass::Ascii;
                true
            }
            _ => false,
        }
    }

    fn emit(&mut self, opcode: u8, operand: u8) {
        self.fill_pending(FILLER);
        self.cells.push(u32::from(opcode));
        self.cells.push(u32::from(operand));
    }

    fn fill_pending(&mut self, byte: u8) {
        if !self.pending {
            return;
        }
        if let Some(last) = self.cells.last_mut() {
            *last = u32::from(byte);
        }
        self.pending = false;
    }

    fn risk(&mut self, what: &str) {
        warn!(
            at = self.len(),
            what, "insertion inside an EXTENDED_ARG chain skipped"
        );
        self.risks += 1;
        self.fill_pending(FILLER);
    }

    fn finish(mut self) -> PassOutput {
        self.fill_pending(FILLER);
        self.close();
        PassOutput {
            cells: self.cells,
            placements: self.placements,
            risks: self.risks,
        }
    }
}

fn choose_lead(operand_class: ByteClass, next: Option<&Step>) -> u8 {
    if !operand_class.is_continuation() {
        return LEAD_OPCODE;
    }
    let next_fits = next.is_some_and(|n| {
        n.opcode_class().is_continuation() && !n.operand_class().is_continuation()
    });
    if next_fits { LEAD_NEXT } else { LEAD_OPERAND }
}

fn is_valid_cells(cells: &[u32]) -> bool {
    let mut bytes = Vec::with_capacity(cells.len());
    for &cell in cells {
        match u8::try_from(cell) {
            Ok(byte) => bytes.push(byte),
            Err(_) => return false,
        }
    }
    is_valid_text(&bytes)
}

/// Lay out one pass, planning again until the jumps stop moving
fn relax(input: &[Instruction]) -> TranscodeResult<(PassOutput, FixupReport)> {
    let index: FxHashMap<u32, usize> = input
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.offset, i))
        .collect();
    let mut layout = Layout::default();
    let mut round = 1;

    loop {
        let mut out = TranscodeState::run(input, &layout);
        let report = fix_jumps(input, &index, &out.placements, &mut out.cells)?;
        let moved = layout.update(input, &report);

        trace!(
            round,
            moved,
            exhausted = report.exhausted,
            pads = report.pads.len(),
            "layout round"
        );

        if !moved || round == MAX_ROUNDS {
            return Ok((out, report));
        }
        round += 1;
    }
}

/// Rewrite one code value so its wordcode is valid UTF-8.
///
/// Nested code values in the constant table are left untouched; see
/// [`transcode_tree`].
pub fn transcode(code: &CodeValue, options: &Options) -> TranscodeResult<CodeValue> {
    let name = code.display_name();
    let mut input = code.instructions()?;
    let mut pass = 1;

    loop {
        let (out, report) = relax(&input)?;
        let valid = is_valid_cells(&out.cells);

        debug!(
            name,
            pass,
            len = out.cells.len(),
            valid,
            exhausted = report.exhausted,
            risks = out.risks,
            "pass done"
        );

        if valid {
            let result = finalize(code, &input, out, options)?;
            report_result(code, &result, pass, options);
            return Ok(result);
        }

        if pass >= options.max_passes {
            if !options.force {
                return Err(TranscodeError::validity(name, pass));
            }
            warn!(name, passes = pass, "output is not valid UTF-8, writing it anyway");
            let result = finalize(code, &input, out, options)?;
            report_result(code, &result, pass, options);
            return Ok(result);
        }

        let lines: FxHashMap<u32, u32> = input
            .iter()
            .zip(&out.placements)
            .filter_map(|(instr, at)| instr.source_line.map(|line| (at.start, line)))
            .collect();
        input = decode_cells(&out.cells, &lines)?;
        pass += 1;
    }
}

/// Rewrite a code value and every code value nested in its constants
pub fn transcode_tree(code: &CodeValue, options: &Options) -> TranscodeResult<CodeValue> {
    let mut result = transcode(code, options)?;
    for value in &mut result.consts {
        transcode_nested(value, options)?;
    }
    Ok(result)
}

fn transcode_nested(value: &mut Value, options: &Options) -> TranscodeResult<()> {
    match value {
        Value::Code(code) => **code = transcode_tree(code, options)?,
        Value::Tuple(items) => {
            for item in items {
                transcode_nested(item, options)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn finalize(
    code: &CodeValue,
    input: &[Instruction],
    out: PassOutput,
    options: &Options,
) -> TranscodeResult<CodeValue> {
    let wide = out.cells.iter().filter(|&&cell| cell > 0xFF).count();
    if wide > 0 {
        warn!(wide, "truncating wide operands to their low byte");
    }
    let mut bytes: Vec<u8> = out.cells.iter().map(|&cell| cell as u8).collect();

    while !is_valid_u32(bytes.len() as u32) {
        bytes.extend_from_slice(&[NOP, FILLER]);
    }

    let firstlineno = prev_valid_u32(code.firstlineno);
    if firstlineno != code.firstlineno {
        debug!(from = code.firstlineno, to = firstlineno, "first line lowered");
    }

    let lnotab = if options.line_table {
        let mut encoder = LineTableEncoder::new(firstlineno);
        for (instr, at) in input.iter().zip(&out.placements) {
            if let Some(line) = instr.source_line {
                encoder.add(at.start, line);
            }
        }
        encoder.finish()
    } else {
        Vec::new()
    };

    let stacksize = match next_valid_u32(code.stacksize) {
        Some(stacksize) => stacksize,
        None if options.force => {
            warn!(stacksize = code.stacksize, "no valid stack size above, keeping it");
            code.stacksize
        }
        None => {
            return Err(TranscodeError::InvalidWrite {
                what: "stacksize",
                bytes: code.stacksize.to_le_bytes().to_vec(),
            });
        }
    };

    Ok(CodeValue {
        stacksize,
        code: bytes,
        firstlineno,
        lnotab,
        ..code.clone()
    })
}

fn report_result(before: &CodeValue, after: &CodeValue, passes: u32, options: &Options) {
    info!(
        name = before.display_name(),
        passes,
        from = before.code.len(),
        to = after.code.len(),
        "transcoded"
    );
    if options.verbosity >= 2 {
        match after.instructions() {
            Ok(instrs) => debug!("{}\n{}", after.display_name(), disassemble(&instrs)),
            Err(err) => debug!(%err, "result does not disassemble"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textcode_bytecode::{Opcode, decode};

    const LOAD_CONST: u8 = 100;
    const RETURN_VALUE: u8 = 83;
    const CALL_FUNCTION: u8 = 131;
    const JUMP_ABSOLUTE: u8 = 113;
    const JUMP_FORWARD: u8 = 110;

    fn pass(code: &[u8]) -> PassOutput {
        let input = decode(code, 1, &[]).unwrap();
        TranscodeState::run(&input, &Layout::default())
    }

    fn bytes(cells: &[u32]) -> Vec<u8> {
        cells.iter().map(|&c| u8::try_from(c).unwrap()).collect()
    }

    #[test]
    fn test_ascii_stream_untouched() {
        let out = pass(&[LOAD_CONST, 1, RETURN_VALUE, 0]);
        assert_eq!(bytes(&out.cells), vec![LOAD_CONST, 1, RETURN_VALUE, FILLER]);
        assert_eq!(out.placements[1].start, 2);
    }

    #[test]
    fn test_lead_before_continuation_opcode_then_close() {
        // CALL_FUNCTION 0xC5: lead C3 in front, operand opens a two byte
        // sequence that the ascii opcode after it cannot continue
        let out = pass(&[CALL_FUNCTION, 0xC5, RETURN_VALUE, 0]);
        assert_eq!(
            bytes(&out.cells),
            vec![NOP, LEAD_OPCODE, CALL_FUNCTION, 0xC5, EXTENDED_ARG, 0, RETURN_VALUE, FILLER]
        );
        assert_eq!(out.placements[0], Placement { start: 0, opcode_at: 2, prefixes: 0 });
        assert_eq!(out.placements[1], Placement { start: 4, opcode_at: 6, prefixes: 0 });
        assert!(is_valid_text(&bytes(&out.cells)));
    }

    #[test]
    fn test_lead_reuses_free_slot() {
        let out = pass(&[RETURN_VALUE, 0, CALL_FUNCTION, 1]);
        assert_eq!(bytes(&out.cells), vec![RETURN_VALUE, LEAD_OPCODE, CALL_FUNCTION, 1]);
    }

    #[test]
    fn test_lead_covers_continuation_operand() {
        let out = pass(&[CALL_FUNCTION, 0x85, RETURN_VALUE, 0]);
        assert_eq!(
            bytes(&out.cells),
            vec![NOP, LEAD_OPERAND, CALL_FUNCTION, 0x85, RETURN_VALUE, FILLER]
        );
    }

    #[test]
    fn test_four_byte_lead_spans_next_opcode() {
        let out = pass(&[CALL_FUNCTION, 0x85, CALL_FUNCTION, 1]);
        assert_eq!(
            bytes(&out.cells),
            vec![NOP, LEAD_NEXT, CALL_FUNCTION, 0x85, CALL_FUNCTION, 1]
        );
    }

    #[test]
    fn test_three_byte_operand_closed_with_absorber() {
        // LOAD_CONST 0xE5 opens a three byte sequence, LOAD_CONST 1 cannot
        // continue it
        let out = pass(&[LOAD_CONST, 0xE5, LOAD_CONST, 1]);
        assert_eq!(
            bytes(&out.cells),
            vec![LOAD_CONST, 0xE5, EXTENDED_ARG, 0x80, NOP, FILLER, LOAD_CONST, 1]
        );
        let again = decode(&bytes(&out.cells), 1, &[]).unwrap();
        let ops: Vec<_> = again.iter().map(|i| (i.opcode, i.operand)).collect();
        assert_eq!(
            ops,
            vec![
                (Opcode::LoadConst, Some(0xE5)),
                (Opcode::Nop, None),
                (Opcode::LoadConst, Some(1)),
            ]
        );
    }

    #[test]
    fn test_wide_operand_gets_prefix() {
        let input = vec![Instruction {
            offset: 0,
            opcode: Opcode::LoadConst,
            operand: Some(0x0102),
            prefixes: 0,
            is_jump_relative: false,
            is_jump_absolute: false,
            jump_target: None,
            source_line: None,
        }];
        let out = TranscodeState::run(&input, &Layout::default());
        assert_eq!(
            bytes(&out.cells),
            vec![NOP, LEAD_OPCODE, EXTENDED_ARG, 0x01, LOAD_CONST, 0x02]
        );
        assert_eq!(out.placements[0], Placement { start: 0, opcode_at: 4, prefixes: 1 });
    }

    #[test]
    fn test_pads_go_before_target_start() {
        let input = decode(&[LOAD_CONST, 0, RETURN_VALUE, 0], 1, &[]).unwrap();
        let layout = Layout {
            pads: FxHashMap::from_iter([(2, 4)]),
            ..Layout::default()
        };
        let out = TranscodeState::run(&input, &layout);
        assert_eq!(
            bytes(&out.cells),
            vec![LOAD_CONST, 0, NOP, FILLER, NOP, FILLER, RETURN_VALUE, FILLER]
        );
        assert_eq!(out.placements[1].start, 6);
    }

    #[test]
    fn test_transcode_pads_jump_target() {
        // JUMP_ABSOLUTE to offset 128 would need a continuation operand
        let mut code = vec![JUMP_ABSOLUTE, 128];
        for _ in 0..63 {
            code.extend_from_slice(&[LOAD_CONST, 0]);
        }
        code.extend_from_slice(&[RETURN_VALUE, 0]);
        let value = CodeValue::builder().name("f").code(code).build();

        let result = transcode(&value, &Options::default()).unwrap();
        assert!(is_valid_text(&result.code));

        let instrs = result.instructions().unwrap();
        let jump = &instrs[0];
        let target = jump.jump_target.unwrap();
        let landed = instrs.iter().find(|i| i.offset == target).unwrap();
        assert_eq!(landed.opcode, Opcode::ReturnValue);
    }

    #[test]
    fn test_jump_widened_past_one_byte() {
        // every CALL_FUNCTION after the first needs a lead in front of it,
        // which pushes the target far beyond what one operand byte holds
        let mut code = vec![JUMP_FORWARD, 200];
        for _ in 0..100 {
            code.extend_from_slice(&[CALL_FUNCTION, 1]);
        }
        code.extend_from_slice(&[RETURN_VALUE, 0]);

        let input = decode(&code, 1, &[]).unwrap();
        let index: FxHashMap<u32, usize> = input
            .iter()
            .enumerate()
            .map(|(i, instr)| (instr.offset, i))
            .collect();
        let mut out = TranscodeState::run(&input, &Layout::default());
        let report = fix_jumps(&input, &index, &out.placements, &mut out.cells).unwrap();
        assert_eq!(report.exhausted, 1);
        assert_eq!(out.cells[1], 398);

        let value = CodeValue::builder().name("f").code(code).build();
        let result = transcode(&value, &Options::default()).unwrap();
        assert!(is_valid_text(&result.code));

        let instrs = result.instructions().unwrap();
        let jump = instrs
            .iter()
            .find(|i| i.opcode == Opcode::JumpForward)
            .unwrap();
        assert_eq!(jump.prefixes, 1);
        let target = jump.jump_target.unwrap();
        let landed = instrs.iter().find(|i| i.offset == target).unwrap();
        assert_eq!(landed.opcode, Opcode::ReturnValue);
    }

    #[test]
    fn test_insertion_inside_prefix_chain_is_skipped() {
        // EXTENDED_ARG 1; CALL_FUNCTION 5: the call needs a lead, but one
        // between the prefix and the call would change its operand
        let code = [EXTENDED_ARG, 1, CALL_FUNCTION, 5, RETURN_VALUE, 0];
        let out = pass(&code);
        assert_eq!(out.risks, 1);
        assert_eq!(
            bytes(&out.cells),
            vec![NOP, LEAD_OPCODE, EXTENDED_ARG, 1, CALL_FUNCTION, 5, RETURN_VALUE, FILLER]
        );

        let value = CodeValue::builder().name("f").code(code.to_vec()).build();
        let err = transcode(&value, &Options::default()).unwrap_err();
        assert!(matches!(err, TranscodeError::ValidityFailure { passes: 4, .. }));

        let forced = transcode(&value, &Options::default().force(true)).unwrap();
        let instrs = forced.instructions().unwrap();
        let call = instrs
            .iter()
            .find(|i| i.opcode == Opcode::CallFunction)
            .unwrap();
        assert_eq!(call.operand, Some(261));
    }

    #[test]
    fn test_stacksize_without_valid_successor() {
        let value = CodeValue::builder()
            .name("f")
            .stacksize(0xF800_0000)
            .word(LOAD_CONST, 0)
            .word(RETURN_VALUE, 0)
            .build();
        let err = transcode(&value, &Options::default()).unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidWrite { what: "stacksize", .. }));

        let forced = transcode(&value, &Options::default().force(true)).unwrap();
        assert_eq!(forced.stacksize, 0xF800_0000);
    }

    #[test]
    fn test_transcode_adjusts_fields() {
        let value = CodeValue::builder()
            .name("f")
            .stacksize(0x80)
            .firstlineno(200)
            .word(LOAD_CONST, 0)
            .word(RETURN_VALUE, 0)
            .lnotab(vec![2, 1])
            .build();

        let result = transcode(&value, &Options::default()).unwrap();
        assert_eq!(result.stacksize, 0x100);
        assert_eq!(result.firstlineno, 127);
        assert!(is_valid_text(&result.lnotab));
        let lines = textcode_bytecode::line_starts(result.firstlineno, &result.lnotab);
        assert_eq!(lines, vec![(0, 200), (2, 201)]);

        let bare = transcode(&value, &Options::default().line_table(false)).unwrap();
        assert!(bare.lnotab.is_empty());
    }

    #[test]
    fn test_transcode_rejects_unencodable_operand() {
        let value = CodeValue::builder()
            .name("f")
            .word(LOAD_CONST, 0x85)
            .word(RETURN_VALUE, 0)
            .build();

        let err = transcode(&value, &Options::default()).unwrap_err();
        assert!(matches!(err, TranscodeError::ValidityFailure { passes: 4, .. }));

        let forced = transcode(&value, &Options::default().force(true)).unwrap();
        assert_eq!(&forced.code[..2], &[LOAD_CONST, 0x85]);
    }

    #[test]
    fn test_transcode_tree_reaches_nested_code() {
        let inner = CodeValue::builder()
            .name("inner")
            .word(CALL_FUNCTION, 0)
            .word(RETURN_VALUE, 0)
            .build();
        let outer = CodeValue::builder()
            .name("outer")
            .constant(Value::Tuple(vec![Value::from(inner.clone())]))
            .constant(inner)
            .word(LOAD_CONST, 0)
            .word(RETURN_VALUE, 0)
            .build();

        let result = transcode_tree(&outer, &Options::default()).unwrap();
        let nested = result.nested_code().next().unwrap();
        assert!(is_valid_text(&nested.code));
        match &result.consts[0] {
            Value::Tuple(items) => assert!(is_valid_text(&items[0].as_code().unwrap().code)),
            other => panic!("unexpected constant {other:?}"),
        }
    }
}
