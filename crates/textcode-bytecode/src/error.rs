//! Bytecode errors

use thiserror::Error;

/// Errors that can occur while decoding or loading bytecode
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Opcode byte outside the known instruction set
    #[error("Invalid opcode 0x{opcode:02x} at offset {offset}")]
    InvalidOpcode {
        /// Raw opcode byte
        opcode: u8,
        /// Offset of the opcode in the stream
        offset: usize,
    },

    /// Unexpected end of bytecode
    #[error("Unexpected end of bytecode")]
    UnexpectedEnd,

    /// A jump lands somewhere that is not the start of an instruction
    #[error("Jump at offset {offset} targets {target}, which is not an instruction boundary")]
    InvalidJumpTarget {
        /// Offset of the jump instruction
        offset: u32,
        /// Computed target offset
        target: u32,
    },

    /// Accumulated prefix chain does not fit in 32 bits
    #[error("Operand overflow in instruction at offset {offset}")]
    OperandOverflow {
        /// Offset of the instruction's prefix chain
        offset: u32,
    },

    /// Malformed JSON code value
    #[error("Invalid code value: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading a code value
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
