//! Code value representation

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instruction::{Instruction, decode};
use crate::value::Value;

/// A compiled function record
///
/// Field order matches the order the serializer writes them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeValue {
    /// Number of positional parameters
    #[serde(default)]
    pub argcount: u32,
    /// Number of positional-only parameters
    #[serde(default)]
    pub posonlyargcount: u32,
    /// Number of keyword-only parameters
    #[serde(default)]
    pub kwonlyargcount: u32,
    /// Number of local variables
    #[serde(default)]
    pub nlocals: u32,
    /// Maximum evaluation stack depth
    #[serde(default)]
    pub stacksize: u32,
    /// Flag bits
    #[serde(default)]
    pub flags: u32,
    /// Raw wordcode
    pub code: Vec<u8>,
    /// Constant table
    #[serde(default)]
    pub consts: Vec<Value>,
    /// Global and attribute names
    #[serde(default)]
    pub names: Vec<String>,
    /// Argument and local variable names
    #[serde(default)]
    pub varnames: Vec<String>,
    /// Free variable names
    #[serde(default)]
    pub freevars: Vec<String>,
    /// Cell variable names
    #[serde(default)]
    pub cellvars: Vec<String>,
    /// Source file name
    #[serde(default)]
    pub filename: String,
    /// Function name
    #[serde(default)]
    pub name: String,
    /// Line of the first source line
    #[serde(default = "default_firstlineno")]
    pub firstlineno: u32,
    /// Packed (offset delta, line delta) position table
    #[serde(default)]
    pub lnotab: Vec<u8>,
}

fn default_firstlineno() -> u32 {
    1
}

impl CodeValue {
    /// Create a new code value builder
    pub fn builder() -> CodeBuilder {
        CodeBuilder::new()
    }

    /// Load a code value from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode the wordcode into instructions, with line markers attached
    pub fn instructions(&self) -> Result<Vec<Instruction>> {
        decode(&self.code, self.firstlineno, &self.lnotab)
    }

    /// Iterate over the code values nested directly in the constant table
    pub fn nested_code(&self) -> impl Iterator<Item = &CodeValue> {
        self.consts.iter().filter_map(Value::as_code)
    }

    /// Replace the source file name here and in every nested code value
    pub fn set_filename_recursive(&mut self, filename: &str) {
        self.filename = filename.to_owned();
        for value in &mut self.consts {
            set_filename_in(value, filename);
        }
    }

    /// The function name or `<anonymous>`
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<anonymous>"
        } else {
            &self.name
        }
    }
}

fn set_filename_in(value: &mut Value, filename: &str) {
    match value {
        Value::Code(code) => code.set_filename_recursive(filename),
        Value::Tuple(items) => items.iter_mut().for_each(|v| set_filename_in(v, filename)),
        _ => {}
    }
}

/// Builder for creating code values
#[derive(Debug)]
pub struct CodeBuilder {
    code: CodeValue,
}

impl Default for CodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuilder {
    /// Create a new code builder
    pub fn new() -> Self {
        Self {
            code: CodeValue {
                argcount: 0,
                posonlyargcount: 0,
                kwonlyargcount: 0,
                nlocals: 0,
                stacksize: 0,
                flags: 0,
                code: Vec::new(),
                consts: Vec::new(),
                names: Vec::new(),
                varnames: Vec::new(),
                freevars: Vec::new(),
                cellvars: Vec::new(),
                filename: String::new(),
                name: String::new(),
                firstlineno: default_firstlineno(),
                lnotab: Vec::new(),
            },
        }
    }

    /// Set function name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.code.name = name.into();
        self
    }

    /// Set source file name
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.code.filename = filename.into();
        self
    }

    /// Set positional parameter count
    pub fn argcount(mut self, count: u32) -> Self {
        self.code.argcount = count;
        self
    }

    /// Set positional-only parameter count
    pub fn posonlyargcount(mut self, count: u32) -> Self {
        self.code.posonlyargcount = count;
        self
    }

    /// Set keyword-only parameter count
    pub fn kwonlyargcount(mut self, count: u32) -> Self {
        self.code.kwonlyargcount = count;
        self
    }

    /// Set local variable count
    pub fn nlocals(mut self, count: u32) -> Self {
        self.code.nlocals = count;
        self
    }

    /// Set stack depth bound
    pub fn stacksize(mut self, size: u32) -> Self {
        self.code.stacksize = size;
        self
    }

    /// Set flag bits
    pub fn flags(mut self, flags: u32) -> Self {
        self.code.flags = flags;
        self
    }

    /// Set raw wordcode
    pub fn code(mut self, code: impl Into<Vec<u8>>) -> Self {
        self.code.code = code.into();
        self
    }

    /// Append one `(opcode, operand)` word
    pub fn word(mut self, opcode: u8, operand: u8) -> Self {
        self.code.code.extend_from_slice(&[opcode, operand]);
        self
    }

    /// Add a constant
    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.code.consts.push(value.into());
        self
    }

    /// Add a global or attribute name
    pub fn name_entry(mut self, name: impl Into<String>) -> Self {
        self.code.names.push(name.into());
        self
    }

    /// Add a local variable name
    pub fn varname(mut self, name: impl Into<String>) -> Self {
        self.code.varnames.push(name.into());
        self
    }

    /// Add a free variable name
    pub fn freevar(mut self, name: impl Into<String>) -> Self {
        self.code.freevars.push(name.into());
        self
    }

    /// Add a cell variable name
    pub fn cellvar(mut self, name: impl Into<String>) -> Self {
        self.code.cellvars.push(name.into());
        self
    }

    /// Set first line number
    pub fn firstlineno(mut self, line: u32) -> Self {
        self.code.firstlineno = line;
        self
    }

    /// Set the packed position table
    pub fn lnotab(mut self, lnotab: impl Into<Vec<u8>>) -> Self {
        self.code.lnotab = lnotab.into();
        self
    }

    /// Build the code value
    pub fn build(self) -> CodeValue {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn test_code_builder() {
        let code = CodeValue::builder()
            .name("add")
            .argcount(2)
            .nlocals(2)
            .stacksize(2)
            .varname("a")
            .varname("b")
            .word(Opcode::LoadFast.to_byte(), 0)
            .word(Opcode::LoadFast.to_byte(), 1)
            .word(Opcode::BinaryAdd.to_byte(), 0)
            .word(Opcode::ReturnValue.to_byte(), 0)
            .build();

        assert_eq!(code.display_name(), "add");
        assert_eq!(code.argcount, 2);
        assert_eq!(code.code.len(), 8);
        assert_eq!(code.instructions().unwrap().len(), 4);
    }

    #[test]
    fn test_filename_reaches_nested_code() {
        let inner = CodeValue::builder().name("inner").filename("a.py").build();
        let mut outer = CodeValue::builder()
            .filename("a.py")
            .constant(Value::Tuple(vec![Value::from(inner.clone())]))
            .constant(inner)
            .build();

        outer.set_filename_recursive("/src/b.py");

        assert_eq!(outer.filename, "/src/b.py");
        assert_eq!(outer.nested_code().next().unwrap().filename, "/src/b.py");
        match &outer.consts[0] {
            Value::Tuple(items) => assert_eq!(items[0].as_code().unwrap().filename, "/src/b.py"),
            other => panic!("unexpected constant {other:?}"),
        }
    }

    #[test]
    fn test_json_defaults() {
        let code = CodeValue::from_json(r#"{"code":[100,0,83,0],"consts":["none"],"name":"<module>"}"#)
            .unwrap();
        assert_eq!(code.firstlineno, 1);
        assert_eq!(code.consts, vec![Value::None]);
        assert!(code.lnotab.is_empty());

        let again = CodeValue::from_json(&code.to_json().unwrap()).unwrap();
        assert_eq!(again, code);
    }
}
