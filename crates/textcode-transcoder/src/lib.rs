//! # textcode transcoder
//!
//! Rewrites wordcode so that every byte of it decodes as UTF-8 text and
//! writes code values into a marshal-style container whose every field is
//! text as well.
//!
//! ## Example
//!
//! ```ignore
//! use textcode_transcoder::{Options, serialize};
//!
//! let mut out = Vec::new();
//! serialize(&code, &mut out, &Options::default())?;
//! assert!(std::str::from_utf8(&out[16..]).is_ok());
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod fixup;
pub mod lnotab;
pub mod marshal;
pub mod options;
pub mod transcoder;

pub use error::{TranscodeError, TranscodeResult};
pub use lnotab::LineTableEncoder;
pub use marshal::{Marshaller, dump_value, serialize, to_container_bytes, write_container};
pub use options::{DEFAULT_MAX_PASSES, Options};
pub use transcoder::{Layout, Placement, TranscodeState, transcode, transcode_tree};
