//! # textcode bytecode
//!
//! Data model shared by the transcoder and the serializer: the UTF-8 byte
//! classifier, the wordcode opcode table, decoded instructions and the code
//! values a front-end compiler hands over.
//!
//! ## Design Principles
//!
//! - **Byte-level**: every decision downstream is made on raw byte classes
//! - **Owned**: code values own their constants; nothing is shared
//! - **Serializable**: code values round-trip through JSON for front-ends

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod charclass;
pub mod code;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod value;

pub use charclass::{
    ByteClass, classify, is_unrestricted_lead, is_valid_text, is_valid_u32, next_valid_u32,
    prev_valid_u32,
};
pub use code::{CodeBuilder, CodeValue};
pub use error::{BytecodeError, Result};
pub use instruction::{Instruction, decode, decode_cells, disassemble, line_starts};
pub use opcode::{EXTENDED_ARG, HAVE_ARGUMENT, NOP, Opcode};
pub use value::Value;

/// Magic number of the 3.8 wordcode format (`3413` little-endian, then `\r\n`)
pub const DEFAULT_MAGIC: [u8; 4] = *b"U\r\r\n";

/// Size of the container header: magic plus reserved zero bytes
pub const CONTAINER_HEADER_LEN: usize = 16;

/// Filler written into operand slots nobody claimed
pub const FILLER: u8 = b'S';
