//! Transcoding errors

use textcode_bytecode::BytecodeError;
use thiserror::Error;

/// Errors raised while transcoding or serializing
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The input wordcode could not be decoded
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),

    /// Still not valid text after the last pass
    #[error("Could not make `{name}` valid UTF-8 within {passes} passes")]
    ValidityFailure {
        /// Name of the code value
        name: String,
        /// Passes attempted
        passes: u32,
    },

    /// Jump fixup expected an operand-extension prefix that is not there
    #[error("Jump at offset {offset} expects an EXTENDED_ARG prefix at {at}")]
    BrokenPrefixChain {
        /// Offset of the jump opcode
        offset: u32,
        /// Offset where the prefix should be
        at: u32,
    },

    /// A relative jump would have to go backwards
    #[error("Relative jump at offset {offset} resolves to negative distance {distance}")]
    BackwardRelativeJump {
        /// Offset of the jump opcode
        offset: u32,
        /// Computed distance
        distance: i64,
    },

    /// A guarded write would emit bytes that are not valid text
    #[error("Refusing to write {what} as {bytes:02x?}: not valid UTF-8")]
    InvalidWrite {
        /// Which field was being written
        what: &'static str,
        /// The offending bytes
        bytes: Vec<u8>,
    },

    /// IO error while writing the container
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// Create a validity failure
    pub fn validity(name: impl Into<String>, passes: u32) -> Self {
        Self::ValidityFailure {
            name: name.into(),
            passes,
        }
    }
}

/// Result type for transcoding
pub type TranscodeResult<T> = Result<T, TranscodeError>;
