//! Wordcode opcodes
//!
//! Every instruction is two bytes: an opcode and an operand byte. Opcodes
//! below [`HAVE_ARGUMENT`] ignore their operand byte; operands wider than a
//! byte are built up by [`Opcode::ExtendedArg`] prefixes, each contributing
//! eight more high-order bits to the next instruction.

use serde::{Deserialize, Serialize};

/// First opcode that reads its operand byte
pub const HAVE_ARGUMENT: u8 = 90;

/// Raw byte of the operand-extension prefix
pub const EXTENDED_ARG: u8 = 0x90;

/// Raw byte of the no-operation filler
pub const NOP: u8 = 0x09;

/// Wordcode opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Stack ====================
    /// Discard the top of the stack
    PopTop = 0x01,
    /// Swap the two topmost items
    RotTwo = 0x02,
    /// Lift the second and third items one position up
    RotThree = 0x03,
    /// Duplicate the top of the stack
    DupTop = 0x04,
    /// Duplicate the two topmost items
    DupTopTwo = 0x05,
    /// Lift the second, third and fourth items one position up
    RotFour = 0x06,
    /// Do nothing; used as a filler
    Nop = 0x09,

    // ==================== Unary ====================
    /// tos = +tos
    UnaryPositive = 0x0A,
    /// tos = -tos
    UnaryNegative = 0x0B,
    /// tos = not tos
    UnaryNot = 0x0C,
    /// tos = ~tos
    UnaryInvert = 0x0F,

    // ==================== Binary and in-place ====================
    /// tos = tos1 @ tos
    BinaryMatrixMultiply = 0x10,
    /// tos1 @= tos
    InplaceMatrixMultiply = 0x11,
    /// tos = tos1 ** tos
    BinaryPower = 0x13,
    /// tos = tos1 * tos
    BinaryMultiply = 0x14,
    /// tos = tos1 % tos
    BinaryModulo = 0x16,
    /// tos = tos1 + tos
    BinaryAdd = 0x17,
    /// tos = tos1 - tos
    BinarySubtract = 0x18,
    /// tos = tos1\[tos\]
    BinarySubscr = 0x19,
    /// tos = tos1 // tos
    BinaryFloorDivide = 0x1A,
    /// tos = tos1 / tos
    BinaryTrueDivide = 0x1B,
    /// tos1 //= tos
    InplaceFloorDivide = 0x1C,
    /// tos1 /= tos
    InplaceTrueDivide = 0x1D,

    // ==================== Async ====================
    /// tos = tos.__aiter__()
    GetAiter = 0x32,
    /// Push an awaitable for the next item of tos
    GetAnext = 0x33,
    /// Resolve __aenter__ and __aexit__
    BeforeAsyncWith = 0x34,
    /// Push NULL for a following finally block
    BeginFinally = 0x35,
    /// Terminate an async for loop
    EndAsyncFor = 0x36,

    // ==================== More in-place ====================
    /// tos1 += tos
    InplaceAdd = 0x37,
    /// tos1 -= tos
    InplaceSubtract = 0x38,
    /// tos1 *= tos
    InplaceMultiply = 0x39,
    /// tos1 %= tos
    InplaceModulo = 0x3B,
    /// tos1\[tos\] = tos2
    StoreSubscr = 0x3C,
    /// del tos1\[tos\]
    DeleteSubscr = 0x3D,
    /// tos = tos1 << tos
    BinaryLshift = 0x3E,
    /// tos = tos1 >> tos
    BinaryRshift = 0x3F,
    /// tos = tos1 & tos
    BinaryAnd = 0x40,
    /// tos = tos1 ^ tos
    BinaryXor = 0x41,
    /// tos = tos1 | tos
    BinaryOr = 0x42,
    /// tos1 **= tos
    InplacePower = 0x43,
    /// tos = iter(tos)
    GetIter = 0x44,
    /// Prepare tos for yield from
    GetYieldFromIter = 0x45,
    /// Print tos in interactive mode
    PrintExpr = 0x46,
    /// Push builtins.__build_class__
    LoadBuildClass = 0x47,
    /// Delegate to a sub-iterator
    YieldFrom = 0x48,
    /// tos = get_awaitable(tos)
    GetAwaitable = 0x49,
    /// tos1 <<= tos
    InplaceLshift = 0x4B,
    /// tos1 >>= tos
    InplaceRshift = 0x4C,
    /// tos1 &= tos
    InplaceAnd = 0x4D,
    /// tos1 ^= tos
    InplaceXor = 0x4E,
    /// tos1 |= tos
    InplaceOr = 0x4F,

    // ==================== Blocks and returns ====================
    /// Start cleaning up a with block
    WithCleanupStart = 0x51,
    /// Finish cleaning up a with block
    WithCleanupFinish = 0x52,
    /// Return tos to the caller
    ReturnValue = 0x53,
    /// from module import *
    ImportStar = 0x54,
    /// Create __annotations__ if missing
    SetupAnnotations = 0x55,
    /// Yield tos from a generator
    YieldValue = 0x56,
    /// Remove one block from the block stack
    PopBlock = 0x57,
    /// Terminate a finally clause
    EndFinally = 0x58,
    /// Remove one exception handler block
    PopExcept = 0x59,

    // ==================== Names ====================
    /// name\[arg\] = tos
    StoreName = 0x5A,
    /// del name\[arg\]
    DeleteName = 0x5B,
    /// Unpack tos into arg items
    UnpackSequence = 0x5C,
    /// Advance the iterator on tos or jump forward by arg
    ForIter = 0x5D,
    /// Starred unpacking assignment
    UnpackEx = 0x5E,
    /// tos.name\[arg\] = tos1
    StoreAttr = 0x5F,
    /// del tos.name\[arg\]
    DeleteAttr = 0x60,
    /// global name\[arg\] = tos
    StoreGlobal = 0x61,
    /// del global name\[arg\]
    DeleteGlobal = 0x62,
    /// Push consts\[arg\]
    LoadConst = 0x64,
    /// Push name\[arg\]
    LoadName = 0x65,

    // ==================== Builders ====================
    /// Build a tuple from arg items
    BuildTuple = 0x66,
    /// Build a list from arg items
    BuildList = 0x67,
    /// Build a set from arg items
    BuildSet = 0x68,
    /// Build a dict from arg pairs
    BuildMap = 0x69,
    /// tos = getattr(tos, name\[arg\])
    LoadAttr = 0x6A,
    /// Comparison selected by arg
    CompareOp = 0x6B,
    /// Import module name\[arg\]
    ImportName = 0x6C,
    /// Load attribute name\[arg\] from the module on tos
    ImportFrom = 0x6D,

    // ==================== Jumps ====================
    /// Jump forward by arg bytes
    JumpForward = 0x6E,
    /// Jump to arg if tos is false, otherwise pop
    JumpIfFalseOrPop = 0x6F,
    /// Jump to arg if tos is true, otherwise pop
    JumpIfTrueOrPop = 0x70,
    /// Jump to arg
    JumpAbsolute = 0x71,
    /// Pop tos and jump to arg if it was false
    PopJumpIfFalse = 0x72,
    /// Pop tos and jump to arg if it was true
    PopJumpIfTrue = 0x73,
    /// Push global name\[arg\]
    LoadGlobal = 0x74,
    /// Push a try block whose handler is arg bytes ahead
    SetupFinally = 0x7A,

    // ==================== Locals and calls ====================
    /// Push local varnames\[arg\]
    LoadFast = 0x7C,
    /// varnames\[arg\] = tos
    StoreFast = 0x7D,
    /// del varnames\[arg\]
    DeleteFast = 0x7E,
    /// Raise an exception built from arg items
    RaiseVarargs = 0x82,
    /// Call with arg positional arguments
    CallFunction = 0x83,
    /// Build a function object
    MakeFunction = 0x84,
    /// Build a slice from arg items
    BuildSlice = 0x85,
    /// Push the cell in slot arg
    LoadClosure = 0x87,
    /// Push the contents of cell arg
    LoadDeref = 0x88,
    /// Store tos into cell arg
    StoreDeref = 0x89,
    /// Empty cell arg
    DeleteDeref = 0x8A,
    /// Call with keyword arguments
    CallFunctionKw = 0x8D,
    /// Call with unpacked arguments
    CallFunctionEx = 0x8E,
    /// Enter a with block whose cleanup is arg bytes ahead
    SetupWith = 0x8F,
    /// Supply high-order operand bits to the next instruction
    ExtendedArg = 0x90,

    // ==================== Comprehensions and unpacking ====================
    /// Append tos to the list arg deep
    ListAppend = 0x91,
    /// Add tos to the set arg deep
    SetAdd = 0x92,
    /// Insert a pair into the dict arg deep
    MapAdd = 0x93,
    /// Load a class body free variable
    LoadClassderef = 0x94,
    /// Build a list from arg iterables
    BuildListUnpack = 0x95,
    /// Build a dict from arg mappings
    BuildMapUnpack = 0x96,
    /// Merge keyword mappings for a call
    BuildMapUnpackWithCall = 0x97,
    /// Build a tuple from arg iterables
    BuildTupleUnpack = 0x98,
    /// Build a set from arg iterables
    BuildSetUnpack = 0x99,
    /// Enter an async with block
    SetupAsyncWith = 0x9A,
    /// Format tos for an f-string
    FormatValue = 0x9B,
    /// Build a dict from a key tuple
    BuildConstKeyMap = 0x9C,
    /// Concatenate arg strings
    BuildString = 0x9D,
    /// Merge positional iterables for a call
    BuildTupleUnpackWithCall = 0x9E,
    /// Load a method for a fast call
    LoadMethod = 0xA0,
    /// Call a method loaded by LoadMethod
    CallMethod = 0xA1,
    /// Call the finally block arg bytes ahead
    CallFinally = 0xA2,
    /// Leave a finally block
    PopFinally = 0xA3,
}

impl Opcode {
    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::PopTop),
            0x02 => Some(Self::RotTwo),
            0x03 => Some(Self::RotThree),
            0x04 => Some(Self::DupTop),
            0x05 => Some(Self::DupTopTwo),
            0x06 => Some(Self::RotFour),
            0x09 => Some(Self::Nop),

            0x0A => Some(Self::UnaryPositive),
            0x0B => Some(Self::UnaryNegative),
            0x0C => Some(Self::UnaryNot),
            0x0F => Some(Self::UnaryInvert),

            0x10 => Some(Self::BinaryMatrixMultiply),
            0x11 => Some(Self::InplaceMatrixMultiply),
            0x13 => Some(Self::BinaryPower),
            0x14 => Some(Self::BinaryMultiply),
            0x16 => Some(Self::BinaryModulo),
            0x17 => Some(Self::BinaryAdd),
            0x18 => Some(Self::BinarySubtract),
            0x19 => Some(Self::BinarySubscr),
            0x1A => Some(Self::BinaryFloorDivide),
            0x1B => Some(Self::BinaryTrueDivide),
            0x1C => Some(Self::InplaceFloorDivide),
            0x1D => Some(Self::InplaceTrueDivide),

            0x32 => Some(Self::GetAiter),
            0x33 => Some(Self::GetAnext),
            0x34 => Some(Self::BeforeAsyncWith),
            0x35 => Some(Self::BeginFinally),
            0x36 => Some(Self::EndAsyncFor),

            0x37 => Some(Self::InplaceAdd),
            0x38 => Some(Self::InplaceSubtract),
            0x39 => Some(Self::InplaceMultiply),
            0x3B => Some(Self::InplaceModulo),
            0x3C => Some(Self::StoreSubscr),
            0x3D => Some(Self::DeleteSubscr),
            0x3E => Some(Self::BinaryLshift),
            0x3F => Some(Self::BinaryRshift),
            0x40 => Some(Self::BinaryAnd),
            0x41 => Some(Self::BinaryXor),
            0x42 => Some(Self::BinaryOr),
            0x43 => Some(Self::InplacePower),
            0x44 => Some(Self::GetIter),
            0x45 => Some(Self::GetYieldFromIter),
            0x46 => Some(Self::PrintExpr),
            0x47 => Some(Self::LoadBuildClass),
            0x48 => Some(Self::YieldFrom),
            0x49 => Some(Self::GetAwaitable),
            0x4B => Some(Self::InplaceLshift),
            0x4C => Some(Self::InplaceRshift),
            0x4D => Some(Self::InplaceAnd),
            0x4E => Some(Self::InplaceXor),
            0x4F => Some(Self::InplaceOr),

            0x51 => Some(Self::WithCleanupStart),
            0x52 => Some(Self::WithCleanupFinish),
            0x53 => Some(Self::ReturnValue),
            0x54 => Some(Self::ImportStar),
            0x55 => Some(Self::SetupAnnotations),
            0x56 => Some(Self::YieldValue),
            0x57 => Some(Self::PopBlock),
            0x58 => Some(Self::EndFinally),
            0x59 => Some(Self::PopExcept),

            0x5A => Some(Self::StoreName),
            0x5B => Some(Self::DeleteName),
            0x5C => Some(Self::UnpackSequence),
            0x5D => Some(Self::ForIter),
            0x5E => Some(Self::UnpackEx),
            0x5F => Some(Self::StoreAttr),
            0x60 => Some(Self::DeleteAttr),
            0x61 => Some(Self::StoreGlobal),
            0x62 => Some(Self::DeleteGlobal),
            0x64 => Some(Self::LoadConst),
            0x65 => Some(Self::LoadName),

            0x66 => Some(Self::BuildTuple),
            0x67 => Some(Self::BuildList),
            0x68 => Some(Self::BuildSet),
            0x69 => Some(Self::BuildMap),
            0x6A => Some(Self::LoadAttr),
            0x6B => Some(Self::CompareOp),
            0x6C => Some(Self::ImportName),
            0x6D => Some(Self::ImportFrom),

            0x6E => Some(Self::JumpForward),
            0x6F => Some(Self::JumpIfFalseOrPop),
            0x70 => Some(Self::JumpIfTrueOrPop),
            0x71 => Some(Self::JumpAbsolute),
            0x72 => Some(Self::PopJumpIfFalse),
            0x73 => Some(Self::PopJumpIfTrue),
            0x74 => Some(Self::LoadGlobal),
            0x7A => Some(Self::SetupFinally),

            0x7C => Some(Self::LoadFast),
            0x7D => Some(Self::StoreFast),
            0x7E => Some(Self::DeleteFast),
            0x82 => Some(Self::RaiseVarargs),
            0x83 => Some(Self::CallFunction),
            0x84 => Some(Self::MakeFunction),
            0x85 => Some(Self::BuildSlice),
            0x87 => Some(Self::LoadClosure),
            0x88 => Some(Self::LoadDeref),
            0x89 => Some(Self::StoreDeref),
            0x8A => Some(Self::DeleteDeref),
            0x8D => Some(Self::CallFunctionKw),
            0x8E => Some(Self::CallFunctionEx),
            0x8F => Some(Self::SetupWith),
            0x90 => Some(Self::ExtendedArg),

            0x91 => Some(Self::ListAppend),
            0x92 => Some(Self::SetAdd),
            0x93 => Some(Self::MapAdd),
            0x94 => Some(Self::LoadClassderef),
            0x95 => Some(Self::BuildListUnpack),
            0x96 => Some(Self::BuildMapUnpack),
            0x97 => Some(Self::BuildMapUnpackWithCall),
            0x98 => Some(Self::BuildTupleUnpack),
            0x99 => Some(Self::BuildSetUnpack),
            0x9A => Some(Self::SetupAsyncWith),
            0x9B => Some(Self::FormatValue),
            0x9C => Some(Self::BuildConstKeyMap),
            0x9D => Some(Self::BuildString),
            0x9E => Some(Self::BuildTupleUnpackWithCall),
            0xA0 => Some(Self::LoadMethod),
            0xA1 => Some(Self::CallMethod),
            0xA2 => Some(Self::CallFinally),
            0xA3 => Some(Self::PopFinally),

            _ => None,
        }
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Does this opcode read its operand byte
    #[inline]
    pub fn has_argument(self) -> bool {
        self.to_byte() >= HAVE_ARGUMENT
    }

    /// Is the operand a forward distance from the end of this instruction
    pub fn is_jump_relative(self) -> bool {
        matches!(
            self,
            Self::ForIter
                | Self::JumpForward
                | Self::SetupFinally
                | Self::SetupWith
                | Self::SetupAsyncWith
                | Self::CallFinally
        )
    }

    /// Is the operand an absolute offset into the code
    pub fn is_jump_absolute(self) -> bool {
        matches!(
            self,
            Self::JumpIfFalseOrPop
                | Self::JumpIfTrueOrPop
                | Self::JumpAbsolute
                | Self::PopJumpIfFalse
                | Self::PopJumpIfTrue
        )
    }

    /// Is this any kind of branch
    #[inline]
    pub fn is_jump(self) -> bool {
        self.is_jump_relative() || self.is_jump_absolute()
    }

    /// Get the name of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::PopTop => "POP_TOP",
            Self::RotTwo => "ROT_TWO",
            Self::RotThree => "ROT_THREE",
            Self::DupTop => "DUP_TOP",
            Self::DupTopTwo => "DUP_TOP_TWO",
            Self::RotFour => "ROT_FOUR",
            Self::Nop => "NOP",
            Self::UnaryPositive => "UNARY_POSITIVE",
            Self::UnaryNegative => "UNARY_NEGATIVE",
            Self::UnaryNot => "UNARY_NOT",
            Self::UnaryInvert => "UNARY_INVERT",
            Self::BinaryMatrixMultiply => "BINARY_MATRIX_MULTIPLY",
            Self::InplaceMatrixMultiply => "INPLACE_MATRIX_MULTIPLY",
            Self::BinaryPower => "BINARY_POWER",
            Self::BinaryMultiply => "BINARY_MULTIPLY",
            Self::BinaryModulo => "BINARY_MODULO",
            Self::BinaryAdd => "BINARY_ADD",
            Self::BinarySubtract => "BINARY_SUBTRACT",
            Self::BinarySubscr => "BINARY_SUBSCR",
            Self::BinaryFloorDivide => "BINARY_FLOOR_DIVIDE",
            Self::BinaryTrueDivide => "BINARY_TRUE_DIVIDE",
            Self::InplaceFloorDivide => "INPLACE_FLOOR_DIVIDE",
            Self::InplaceTrueDivide => "INPLACE_TRUE_DIVIDE",
            Self::GetAiter => "GET_AITER",
            Self::GetAnext => "GET_ANEXT",
            Self::BeforeAsyncWith => "BEFORE_ASYNC_WITH",
            Self::BeginFinally => "BEGIN_FINALLY",
            Self::EndAsyncFor => "END_ASYNC_FOR",
            Self::InplaceAdd => "INPLACE_ADD",
            Self::InplaceSubtract => "INPLACE_SUBTRACT",
            Self::InplaceMultiply => "INPLACE_MULTIPLY",
            Self::InplaceModulo => "INPLACE_MODULO",
            Self::StoreSubscr => "STORE_SUBSCR",
            Self::DeleteSubscr => "DELETE_SUBSCR",
            Self::BinaryLshift => "BINARY_LSHIFT",
            Self::BinaryRshift => "BINARY_RSHIFT",
            Self::BinaryAnd => "BINARY_AND",
            Self::BinaryXor => "BINARY_XOR",
            Self::BinaryOr => "BINARY_OR",
            Self::InplacePower => "INPLACE_POWER",
            Self::GetIter => "GET_ITER",
            Self::GetYieldFromIter => "GET_YIELD_FROM_ITER",
            Self::PrintExpr => "PRINT_EXPR",
            Self::LoadBuildClass => "LOAD_BUILD_CLASS",
            Self::YieldFrom => "YIELD_FROM",
            Self::GetAwaitable => "GET_AWAITABLE",
            Self::InplaceLshift => "INPLACE_LSHIFT",
            Self::InplaceRshift => "INPLACE_RSHIFT",
            Self::InplaceAnd => "INPLACE_AND",
            Self::InplaceXor => "INPLACE_XOR",
            Self::InplaceOr => "INPLACE_OR",
            Self::WithCleanupStart => "WITH_CLEANUP_START",
            Self::WithCleanupFinish => "WITH_CLEANUP_FINISH",
            Self::ReturnValue => "RETURN_VALUE",
            Self::ImportStar => "IMPORT_STAR",
            Self::SetupAnnotations => "SETUP_ANNOTATIONS",
            Self::YieldValue => "YIELD_VALUE",
            Self::PopBlock => "POP_BLOCK",
            Self::EndFinally => "END_FINALLY",
            Self::PopExcept => "POP_EXCEPT",
            Self::StoreName => "STORE_NAME",
            Self::DeleteName => "DELETE_NAME",
            Self::UnpackSequence => "UNPACK_SEQUENCE",
            Self::ForIter => "FOR_ITER",
            Self::UnpackEx => "UNPACK_EX",
            Self::StoreAttr => "STORE_ATTR",
            Self::DeleteAttr => "DELETE_ATTR",
            Self::StoreGlobal => "STORE_GLOBAL",
            Self::DeleteGlobal => "DELETE_GLOBAL",
            Self::LoadConst => "LOAD_CONST",
            Self::LoadName => "LOAD_NAME",
            Self::BuildTuple => "BUILD_TUPLE",
            Self::BuildList => "BUILD_LIST",
            Self::BuildSet => "BUILD_SET",
            Self::BuildMap => "BUILD_MAP",
            Self::LoadAttr => "LOAD_ATTR",
            Self::CompareOp => "COMPARE_OP",
            Self::ImportName => "IMPORT_NAME",
            Self::ImportFrom => "IMPORT_FROM",
            Self::JumpForward => "JUMP_FORWARD",
            Self::JumpIfFalseOrPop => "JUMP_IF_FALSE_OR_POP",
            Self::JumpIfTrueOrPop => "JUMP_IF_TRUE_OR_POP",
            Self::JumpAbsolute => "JUMP_ABSOLUTE",
            Self::PopJumpIfFalse => "POP_JUMP_IF_FALSE",
            Self::PopJumpIfTrue => "POP_JUMP_IF_TRUE",
            Self::LoadGlobal => "LOAD_GLOBAL",
            Self::SetupFinally => "SETUP_FINALLY",
            Self::LoadFast => "LOAD_FAST",
            Self::StoreFast => "STORE_FAST",
            Self::DeleteFast => "DELETE_FAST",
            Self::RaiseVarargs => "RAISE_VARARGS",
            Self::CallFunction => "CALL_FUNCTION",
            Self::MakeFunction => "MAKE_FUNCTION",
            Self::BuildSlice => "BUILD_SLICE",
            Self::LoadClosure => "LOAD_CLOSURE",
            Self::LoadDeref => "LOAD_DEREF",
            Self::StoreDeref => "STORE_DEREF",
            Self::DeleteDeref => "DELETE_DEREF",
            Self::CallFunctionKw => "CALL_FUNCTION_KW",
            Self::CallFunctionEx => "CALL_FUNCTION_EX",
            Self::SetupWith => "SETUP_WITH",
            Self::ExtendedArg => "EXTENDED_ARG",
            Self::ListAppend => "LIST_APPEND",
            Self::SetAdd => "SET_ADD",
            Self::MapAdd => "MAP_ADD",
            Self::LoadClassderef => "LOAD_CLASSDEREF",
            Self::BuildListUnpack => "BUILD_LIST_UNPACK",
            Self::BuildMapUnpack => "BUILD_MAP_UNPACK",
            Self::BuildMapUnpackWithCall => "BUILD_MAP_UNPACK_WITH_CALL",
            Self::BuildTupleUnpack => "BUILD_TUPLE_UNPACK",
            Self::BuildSetUnpack => "BUILD_SET_UNPACK",
            Self::SetupAsyncWith => "SETUP_ASYNC_WITH",
            Self::FormatValue => "FORMAT_VALUE",
            Self::BuildConstKeyMap => "BUILD_CONST_KEY_MAP",
            Self::BuildString => "BUILD_STRING",
            Self::BuildTupleUnpackWithCall => "BUILD_TUPLE_UNPACK_WITH_CALL",
            Self::LoadMethod => "LOAD_METHOD",
            Self::CallMethod => "CALL_METHOD",
            Self::CallFinally => "CALL_FINALLY",
            Self::PopFinally => "POP_FINALLY",
        }
    }
}
