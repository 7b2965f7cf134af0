//! Front-end seam
//!
//! Compiling source text is somebody else's job. A [`FrontEnd`] turns the
//! input file into a [`CodeValue`]; the only one shipped here reads code
//! values that an external compiler dumped as JSON.

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use textcode_bytecode::CodeValue;
use tracing::debug;

/// Compile mode requested from the front-end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A module: a sequence of statements
    #[default]
    Exec,
    /// A single interactive statement
    Single,
}

/// Produces the root code value for an input file
pub trait FrontEnd {
    /// Compile `source`, recording `filename` in every code value
    fn compile(&self, source: &str, filename: &str, mode: Mode) -> Result<CodeValue>;
}

/// JSON document holding one code value per compile mode
#[derive(Debug, Deserialize)]
struct PerMode {
    exec: Option<CodeValue>,
    single: Option<CodeValue>,
}

/// Reads a JSON-encoded code value.
///
/// The document is either a code value or an object with `exec` and/or
/// `single` keys, each holding the code value compiled in that mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFrontEnd;

impl FrontEnd for JsonFrontEnd {
    fn compile(&self, source: &str, filename: &str, mode: Mode) -> Result<CodeValue> {
        let mut code = match CodeValue::from_json(source) {
            Ok(code) => code,
            Err(bare) => {
                let per_mode: PerMode = serde_json::from_str(source).with_context(|| {
                    format!("input is neither a code value ({bare}) nor a per-mode object")
                })?;
                if per_mode.exec.is_none() && per_mode.single.is_none() {
                    return Err(anyhow::Error::new(bare).context("input is not a code value"));
                }
                let picked = match mode {
                    Mode::Exec => per_mode.exec,
                    Mode::Single => per_mode.single,
                };
                match picked {
                    Some(code) => code,
                    None => bail!("input has no code value for mode {mode:?}"),
                }
            }
        };

        code.set_filename_recursive(filename);
        debug!(name = code.display_name(), filename, ?mode, "loaded code value");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"{
        "name": "<module>",
        "filename": "orig.py",
        "code": [100, 0, 83, 0],
        "consts": [{"code": {"name": "f", "filename": "orig.py", "code": [100, 0, 83, 0]}}, "none"]
    }"#;

    #[test]
    fn test_bare_code_value() {
        let code = JsonFrontEnd.compile(MODULE, "/abs/mod.py", Mode::Exec).unwrap();
        assert_eq!(code.name, "<module>");
        assert_eq!(code.filename, "/abs/mod.py");
        assert_eq!(code.nested_code().next().unwrap().filename, "/abs/mod.py");
    }

    #[test]
    fn test_per_mode_document() {
        let doc = format!(r#"{{"single": {MODULE}}}"#);
        let code = JsonFrontEnd.compile(&doc, "x.py", Mode::Single).unwrap();
        assert_eq!(code.code, vec![100, 0, 83, 0]);

        let err = JsonFrontEnd.compile(&doc, "x.py", Mode::Exec).unwrap_err();
        assert!(err.to_string().contains("Exec"));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = JsonFrontEnd.compile("print('hi')", "x.py", Mode::Exec).unwrap_err();
        assert!(err.to_string().contains("Invalid code value"));
    }

    #[test]
    fn test_bare_field_error_reported() {
        let doc = r#"{"name": "f", "code": "oops"}"#;
        let err = JsonFrontEnd.compile(doc, "x.py", Mode::Exec).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("not a code value"));
        assert!(message.contains("invalid type"));
        assert!(!message.contains("mode"));
    }
}
