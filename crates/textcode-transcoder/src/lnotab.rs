//! Position table encoder
//!
//! Emits `(offset delta, line delta)` byte pairs. Both deltas are capped at
//! 127 per pair so every byte of the table stays ASCII; larger steps are
//! split across several pairs. Lines that move backwards are dropped, which
//! leaves the table incomplete but never invalid.

const MAX_STEP: u32 = 127;

/// Incremental position table builder
#[derive(Debug, Clone)]
pub struct LineTableEncoder {
    last_offset: u32,
    last_line: u32,
    table: Vec<u8>,
}

impl LineTableEncoder {
    /// Start a table whose first line is `firstlineno`
    pub fn new(firstlineno: u32) -> Self {
        Self {
            last_offset: 0,
            last_line: firstlineno,
            table: Vec::new(),
        }
    }

    /// Record that `line` starts at byte `offset`
    pub fn add(&mut self, offset: u32, line: u32) {
        if line <= self.last_line || offset < self.last_offset {
            return;
        }

        let mut offset_delta = offset - self.last_offset;
        let mut line_delta = line - self.last_line;

        while offset_delta > MAX_STEP {
            self.push(MAX_STEP, 0);
            offset_delta -= MAX_STEP;
        }
        while line_delta > MAX_STEP {
            self.push(offset_delta, MAX_STEP);
            offset_delta = 0;
            line_delta -= MAX_STEP;
        }
        self.push(offset_delta, line_delta);

        self.last_offset = offset;
        self.last_line = line;
    }

    fn push(&mut self, offset_delta: u32, line_delta: u32) {
        self.table.push(offset_delta as u8);
        self.table.push(line_delta as u8);
    }

    /// Finish and return the packed table
    pub fn finish(self) -> Vec<u8> {
        self.table
    }
}
