//! Knobs shared by the transcoder and the serializer

use textcode_bytecode::DEFAULT_MAGIC;

/// Pass budget of the transcoder's retry loop
pub const DEFAULT_MAX_PASSES: u32 = 4;

/// Transcoding and serialization options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Emit output even when it cannot be made valid text
    pub force: bool,
    /// Rebuild the position table instead of writing an empty one
    pub line_table: bool,
    /// Diagnostic detail; 2 and up logs a disassembly of each result
    pub verbosity: u8,
    /// Passes before giving up
    pub max_passes: u32,
    /// First four bytes of the container
    pub magic: [u8; 4],
}

impl Default for Options {
    fn default() -> Self {
        Self {
            force: false,
            line_table: true,
            verbosity: 0,
            max_passes: DEFAULT_MAX_PASSES,
            magic: DEFAULT_MAGIC,
        }
    }
}

impl Options {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the force override
    pub fn force(mut self, value: bool) -> Self {
        self.force = value;
        self
    }

    /// Toggle the position table
    pub fn line_table(mut self, value: bool) -> Self {
        self.line_table = value;
        self
    }

    /// Set verbosity
    pub fn verbosity(mut self, level: u8) -> Self {
        self.verbosity = level;
        self
    }

    /// Set the pass budget (at least one pass always runs)
    pub fn max_passes(mut self, passes: u32) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Set the container magic
    pub fn magic(mut self, magic: [u8; 4]) -> Self {
        self.magic = magic;
        self
    }
}
