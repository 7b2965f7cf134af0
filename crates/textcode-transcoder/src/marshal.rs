//! Constrained serializer
//!
//! Writes values in the marshal tag grammar without references: every
//! value is written in full each time it appears. Guarded writes check that
//! the bytes they are about to commit are valid text on their own and fail
//! with [`TranscodeError::InvalidWrite`] otherwise, unless forced.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use textcode_bytecode::{CONTAINER_HEADER_LEN, CodeValue, Value, is_valid_text};
use tracing::debug;

use crate::error::{TranscodeError, TranscodeResult};
use crate::options::Options;
use crate::transcoder::transcode;

/// Marshal type tags
pub mod tag {
    /// `None`
    pub const NONE: u8 = b'N';
    /// `True`
    pub const TRUE: u8 = b'T';
    /// `False`
    pub const FALSE: u8 = b'F';
    /// `StopIteration`
    pub const STOP_ITERATION: u8 = b'S';
    /// `...`
    pub const ELLIPSIS: u8 = b'.';
    /// 32-bit integer
    pub const INT: u8 = b'i';
    /// Binary float
    pub const FLOAT: u8 = b'g';
    /// Short ASCII string, one byte length
    pub const SHORT_ASCII: u8 = b'z';
    /// ASCII string, four byte length
    pub const ASCII: u8 = b'a';
    /// UTF-8 string
    pub const UNICODE: u8 = b'u';
    /// Byte string
    pub const BYTES: u8 = b's';
    /// Small tuple, one byte count
    pub const SMALL_TUPLE: u8 = b')';
    /// Tuple, four byte count
    pub const TUPLE: u8 = b'(';
    /// Code value
    pub const CODE: u8 = b'c';
}

const SHORT_STRING_LIMIT: usize = 128;
const SMALL_TUPLE_LIMIT: usize = 256;

/// Reference-free value writer
#[derive(Debug)]
pub struct Marshaller<'a> {
    buf: Vec<u8>,
    options: &'a Options,
}

impl<'a> Marshaller<'a> {
    /// Create a writer with an empty buffer
    pub fn new(options: &'a Options) -> Self {
        Self {
            buf: Vec::new(),
            options,
        }
    }

    /// Take the written bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    fn guarded(&mut self, what: &'static str, bytes: &[u8]) -> TranscodeResult<()> {
        if !self.options.force && !is_valid_text(bytes) {
            return Err(TranscodeError::InvalidWrite {
                what,
                bytes: bytes.to_vec(),
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn u8(&mut self, what: &'static str, value: u8) -> TranscodeResult<()> {
        self.guarded(what, &[value])
    }

    fn u32(&mut self, what: &'static str, value: u32) -> TranscodeResult<()> {
        self.guarded(what, &value.to_le_bytes())
    }

    fn len(&mut self, what: &'static str, len: usize) -> TranscodeResult<()> {
        let len = u32::try_from(len).map_err(|_| TranscodeError::InvalidWrite {
            what,
            bytes: (len as u64).to_le_bytes().to_vec(),
        })?;
        self.u32(what, len)
    }

    /// Write any value
    pub fn dump(&mut self, value: &Value) -> TranscodeResult<()> {
        match value {
            Value::None => self.tag(tag::NONE),
            Value::True => self.tag(tag::TRUE),
            Value::False => self.tag(tag::FALSE),
            Value::StopIteration => self.tag(tag::STOP_ITERATION),
            Value::Ellipsis => self.tag(tag::ELLIPSIS),
            Value::Int(i) => {
                self.tag(tag::INT);
                self.guarded("int", &i.to_le_bytes())?;
            }
            Value::Float(f) => {
                self.tag(tag::FLOAT);
                self.guarded("float", &f.to_le_bytes())?;
            }
            Value::Str(s) => self.dump_str(s)?,
            Value::Bytes(b) => self.dump_bytes("bytes", b)?,
            Value::Tuple(items) => {
                self.dump_tuple_header(items.len())?;
                for item in items {
                    self.dump(item)?;
                }
            }
            Value::Code(code) => self.dump_code(code)?,
        }
        Ok(())
    }

    fn dump_str(&mut self, s: &str) -> TranscodeResult<()> {
        if s.is_ascii() && s.len() < SHORT_STRING_LIMIT {
            self.tag(tag::SHORT_ASCII);
            self.u8("string length", s.len() as u8)?;
        } else {
            self.tag(if s.is_ascii() { tag::ASCII } else { tag::UNICODE });
            self.len("string length", s.len())?;
        }
        self.guarded("string", s.as_bytes())
    }

    fn dump_bytes(&mut self, what: &'static str, b: &[u8]) -> TranscodeResult<()> {
        self.tag(tag::BYTES);
        self.len("bytes length", b.len())?;
        self.guarded(what, b)
    }

    fn dump_tuple_header(&mut self, len: usize) -> TranscodeResult<()> {
        if len < SMALL_TUPLE_LIMIT {
            self.tag(tag::SMALL_TUPLE);
            self.u8("tuple length", len as u8)
        } else {
            self.tag(tag::TUPLE);
            self.len("tuple length", len)
        }
    }

    fn dump_names(&mut self, names: &[String]) -> TranscodeResult<()> {
        self.dump_tuple_header(names.len())?;
        for name in names {
            self.dump_str(name)?;
        }
        Ok(())
    }

    /// Transcode a code value and write it; nested code values in its
    /// constants are transcoded as they are reached
    pub fn dump_code(&mut self, code: &CodeValue) -> TranscodeResult<()> {
        self.tag(tag::CODE);
        let code = transcode(code, self.options)?;
        debug!(name = code.display_name(), at = self.buf.len(), "writing code");

        self.u32("argcount", code.argcount)?;
        self.u32("posonlyargcount", code.posonlyargcount)?;
        self.u32("kwonlyargcount", code.kwonlyargcount)?;
        self.u32("nlocals", code.nlocals)?;
        self.u32("stacksize", code.stacksize)?;
        self.u32("flags", code.flags)?;
        self.dump_bytes("code", &code.code)?;

        self.dump_tuple_header(code.consts.len())?;
        for value in &code.consts {
            self.dump(value)?;
        }
        self.dump_names(&code.names)?;
        self.dump_names(&code.varnames)?;
        self.dump_names(&code.freevars)?;
        self.dump_names(&code.cellvars)?;
        self.dump_str(&code.filename)?;
        self.dump_str(&code.name)?;
        self.u32("firstlineno", code.firstlineno)?;
        self.dump_bytes("lnotab", &code.lnotab)
    }
}

/// Serialize a single value without the container header
pub fn dump_value(value: &Value, options: &Options) -> TranscodeResult<Vec<u8>> {
    let mut marshaller = Marshaller::new(options);
    marshaller.dump(value)?;
    Ok(marshaller.into_bytes())
}

/// Build a complete container in memory: header, then the root code value
pub fn to_container_bytes(code: &CodeValue, options: &Options) -> TranscodeResult<Vec<u8>> {
    let mut marshaller = Marshaller::new(options);
    marshaller.buf.extend_from_slice(&options.magic);
    marshaller.buf.resize(CONTAINER_HEADER_LEN, 0);
    marshaller.dump_code(code)?;
    Ok(marshaller.into_bytes())
}

/// Serialize a code value into `sink`.
///
/// Nothing reaches the sink unless the whole container was built.
pub fn serialize<W: Write>(code: &CodeValue, sink: &mut W, options: &Options) -> TranscodeResult<()> {
    let bytes = to_container_bytes(code, options)?;
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(())
}

/// Serialize a code value into a file at `path`.
///
/// The file is only created once the container was built.
pub fn write_container(code: &CodeValue, path: &Path, options: &Options) -> TranscodeResult<()> {
    let bytes = to_container_bytes(code, options)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    debug!(path = %path.display(), len = bytes.len(), "container written");
    Ok(())
}
