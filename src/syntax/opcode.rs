//! The opcode table: one row per instruction.
//!
//! Every instruction's identity lives in a single declarative table carrying
//! its text name, binary encoding (optional prefix byte + code), immediate
//! shape, and required feature. The enum, the printable names, the
//! encoding/name lookup maps, and the shape table are all generated from it,
//! so the four can never drift apart.
//!
//! Prefixed opcodes encode as the prefix byte (`0xfc`, `0xfd`, `0xfe`)
//! followed by a LEB128 u32 code.

use crate::features::Feature;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// The shape of the immediate that follows an opcode.
///
/// [`Opcode::immediate_kind`] is the authority on which shape each
/// instruction takes; decoders and parsers dispatch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImmediateKind {
    None,
    S32,
    S64,
    F32,
    F64,
    V128,
    Index,
    Block,
    BrOnExn,
    BrTable,
    CallIndirect,
    Copy,
    Init,
    Let,
    MemArg,
    HeapType,
    SelectTypes,
    Shuffle,
    SimdLane,
}

macro_rules! opcode_prefix {
    (-) => {
        None
    };
    ($p:literal) => {
        Some($p)
    };
}

macro_rules! define_opcodes {
    ($(($variant:ident, $text:literal, $prefix:tt, $code:literal, $imm:ident, $feature:ident)),* $(,)?) => {
        /// Every decodable instruction.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// All opcodes, in table order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// The text-format mnemonic.
            pub fn text(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $text,)*
                }
            }

            /// The prefix byte, if this is a prefixed opcode.
            pub fn prefix(self) -> Option<u8> {
                match self {
                    $(Opcode::$variant => opcode_prefix!($prefix),)*
                }
            }

            /// The opcode value (the single byte, or the post-prefix code).
            pub fn code(self) -> u32 {
                match self {
                    $(Opcode::$variant => $code,)*
                }
            }

            /// The immediate shape this opcode carries.
            pub fn immediate_kind(self) -> ImmediateKind {
                match self {
                    $(Opcode::$variant => ImmediateKind::$imm,)*
                }
            }

            /// The feature required to accept this opcode.
            pub fn required_feature(self) -> Feature {
                match self {
                    $(Opcode::$variant => Feature::$feature,)*
                }
            }
        }
    };
}

impl Opcode {
    /// Looks up an opcode by binary encoding.
    pub fn from_encoding(prefix: Option<u8>, code: u32) -> Option<Opcode> {
        BY_ENCODING.get(&(prefix, code)).copied()
    }

    /// Looks up an opcode by text mnemonic. Where two opcodes share a
    /// mnemonic (`select`), the unprefixed base form wins; the parser remaps
    /// from context.
    pub fn from_name(name: &str) -> Option<Opcode> {
        BY_NAME.get(name).copied()
    }

    /// Whether this opcode opens a nested block (`end` closes it).
    pub fn starts_block(self) -> bool {
        matches!(
            self,
            Opcode::Block | Opcode::Loop | Opcode::If | Opcode::Try | Opcode::Let
        )
    }

    /// The natural alignment (log2) of a memory-access opcode, used when the
    /// text format omits `align=`.
    pub fn natural_alignment_log2(self) -> u32 {
        use Opcode::*;
        match self {
            I32Load8S | I32Load8U | I64Load8S | I64Load8U | I32Store8 | I64Store8
            | V128Load8Splat | I32AtomicLoad8U | I64AtomicLoad8U | I32AtomicStore8
            | I64AtomicStore8 | I32AtomicRmw8AddU | I64AtomicRmw8AddU | I32AtomicRmw8SubU
            | I64AtomicRmw8SubU | I32AtomicRmw8AndU | I64AtomicRmw8AndU | I32AtomicRmw8OrU
            | I64AtomicRmw8OrU | I32AtomicRmw8XorU | I64AtomicRmw8XorU | I32AtomicRmw8XchgU
            | I64AtomicRmw8XchgU | I32AtomicRmw8CmpxchgU | I64AtomicRmw8CmpxchgU => 0,

            I32Load16S | I32Load16U | I64Load16S | I64Load16U | I32Store16 | I64Store16
            | V128Load16Splat | I32AtomicLoad16U | I64AtomicLoad16U | I32AtomicStore16
            | I64AtomicStore16 | I32AtomicRmw16AddU | I64AtomicRmw16AddU | I32AtomicRmw16SubU
            | I64AtomicRmw16SubU | I32AtomicRmw16AndU | I64AtomicRmw16AndU | I32AtomicRmw16OrU
            | I64AtomicRmw16OrU | I32AtomicRmw16XorU | I64AtomicRmw16XorU
            | I32AtomicRmw16XchgU | I64AtomicRmw16XchgU | I32AtomicRmw16CmpxchgU
            | I64AtomicRmw16CmpxchgU => 1,

            I32Load | F32Load | I32Store | F32Store | I64Load32S | I64Load32U | I64Store32
            | V128Load32Splat | V128Load32Zero | MemoryAtomicNotify | MemoryAtomicWait32
            | I32AtomicLoad | I32AtomicStore | I64AtomicLoad32U | I64AtomicStore32
            | I32AtomicRmwAdd | I32AtomicRmwSub | I32AtomicRmwAnd | I32AtomicRmwOr
            | I32AtomicRmwXor | I32AtomicRmwXchg | I32AtomicRmwCmpxchg | I64AtomicRmw32AddU
            | I64AtomicRmw32SubU | I64AtomicRmw32AndU | I64AtomicRmw32OrU
            | I64AtomicRmw32XorU | I64AtomicRmw32XchgU | I64AtomicRmw32CmpxchgU => 2,

            I64Load | F64Load | I64Store | F64Store | V128Load64Splat | V128Load64Zero
            | V128Load8x8S | V128Load8x8U | V128Load16x4S | V128Load16x4U | V128Load32x2S
            | V128Load32x2U | MemoryAtomicWait64 | I64AtomicLoad | I64AtomicStore
            | I64AtomicRmwAdd | I64AtomicRmwSub | I64AtomicRmwAnd | I64AtomicRmwOr
            | I64AtomicRmwXor | I64AtomicRmwXchg | I64AtomicRmwCmpxchg => 3,

            V128Load | V128Store => 4,

            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

static BY_ENCODING: Lazy<HashMap<(Option<u8>, u32), Opcode>> = Lazy::new(|| {
    Opcode::ALL
        .iter()
        .map(|&op| ((op.prefix(), op.code()), op))
        .collect()
});

static BY_NAME: Lazy<HashMap<&'static str, Opcode>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for &op in Opcode::ALL {
        map.entry(op.text()).or_insert(op);
    }
    map
});

define_opcodes! {
    // Control
    (Unreachable, "unreachable", -, 0x00, None, Mvp),
    (Nop, "nop", -, 0x01, None, Mvp),
    (Block, "block", -, 0x02, Block, Mvp),
    (Loop, "loop", -, 0x03, Block, Mvp),
    (If, "if", -, 0x04, Block, Mvp),
    (Else, "else", -, 0x05, None, Mvp),
    (Try, "try", -, 0x06, Block, Exceptions),
    (Catch, "catch", -, 0x07, None, Exceptions),
    (Throw, "throw", -, 0x08, Index, Exceptions),
    (Rethrow, "rethrow", -, 0x09, None, Exceptions),
    (BrOnExn, "br_on_exn", -, 0x0a, BrOnExn, Exceptions),
    (End, "end", -, 0x0b, None, Mvp),
    (Br, "br", -, 0x0c, Index, Mvp),
    (BrIf, "br_if", -, 0x0d, Index, Mvp),
    (BrTable, "br_table", -, 0x0e, BrTable, Mvp),
    (Return, "return", -, 0x0f, None, Mvp),
    (Call, "call", -, 0x10, Index, Mvp),
    (CallIndirect, "call_indirect", -, 0x11, CallIndirect, Mvp),
    (ReturnCall, "return_call", -, 0x12, Index, TailCall),
    (ReturnCallIndirect, "return_call_indirect", -, 0x13, CallIndirect, TailCall),
    (Let, "let", -, 0x17, Let, FunctionReferences),

    // Parametric
    (Drop, "drop", -, 0x1a, None, Mvp),
    (Select, "select", -, 0x1b, None, Mvp),
    (SelectT, "select", -, 0x1c, SelectTypes, ReferenceTypes),

    // Variable
    (LocalGet, "local.get", -, 0x20, Index, Mvp),
    (LocalSet, "local.set", -, 0x21, Index, Mvp),
    (LocalTee, "local.tee", -, 0x22, Index, Mvp),
    (GlobalGet, "global.get", -, 0x23, Index, Mvp),
    (GlobalSet, "global.set", -, 0x24, Index, Mvp),

    // Table
    (TableGet, "table.get", -, 0x25, Index, ReferenceTypes),
    (TableSet, "table.set", -, 0x26, Index, ReferenceTypes),

    // Memory
    (I32Load, "i32.load", -, 0x28, MemArg, Mvp),
    (I64Load, "i64.load", -, 0x29, MemArg, Mvp),
    (F32Load, "f32.load", -, 0x2a, MemArg, Mvp),
    (F64Load, "f64.load", -, 0x2b, MemArg, Mvp),
    (I32Load8S, "i32.load8_s", -, 0x2c, MemArg, Mvp),
    (I32Load8U, "i32.load8_u", -, 0x2d, MemArg, Mvp),
    (I32Load16S, "i32.load16_s", -, 0x2e, MemArg, Mvp),
    (I32Load16U, "i32.load16_u", -, 0x2f, MemArg, Mvp),
    (I64Load8S, "i64.load8_s", -, 0x30, MemArg, Mvp),
    (I64Load8U, "i64.load8_u", -, 0x31, MemArg, Mvp),
    (I64Load16S, "i64.load16_s", -, 0x32, MemArg, Mvp),
    (I64Load16U, "i64.load16_u", -, 0x33, MemArg, Mvp),
    (I64Load32S, "i64.load32_s", -, 0x34, MemArg, Mvp),
    (I64Load32U, "i64.load32_u", -, 0x35, MemArg, Mvp),
    (I32Store, "i32.store", -, 0x36, MemArg, Mvp),
    (I64Store, "i64.store", -, 0x37, MemArg, Mvp),
    (F32Store, "f32.store", -, 0x38, MemArg, Mvp),
    (F64Store, "f64.store", -, 0x39, MemArg, Mvp),
    (I32Store8, "i32.store8", -, 0x3a, MemArg, Mvp),
    (I32Store16, "i32.store16", -, 0x3b, MemArg, Mvp),
    (I64Store8, "i64.store8", -, 0x3c, MemArg, Mvp),
    (I64Store16, "i64.store16", -, 0x3d, MemArg, Mvp),
    (I64Store32, "i64.store32", -, 0x3e, MemArg, Mvp),
    (MemorySize, "memory.size", -, 0x3f, Index, Mvp),
    (MemoryGrow, "memory.grow", -, 0x40, Index, Mvp),

    // Constants
    (I32Const, "i32.const", -, 0x41, S32, Mvp),
    (I64Const, "i64.const", -, 0x42, S64, Mvp),
    (F32Const, "f32.const", -, 0x43, F32, Mvp),
    (F64Const, "f64.const", -, 0x44, F64, Mvp),

    // i32 comparisons
    (I32Eqz, "i32.eqz", -, 0x45, None, Mvp),
    (I32Eq, "i32.eq", -, 0x46, None, Mvp),
    (I32Ne, "i32.ne", -, 0x47, None, Mvp),
    (I32LtS, "i32.lt_s", -, 0x48, None, Mvp),
    (I32LtU, "i32.lt_u", -, 0x49, None, Mvp),
    (I32GtS, "i32.gt_s", -, 0x4a, None, Mvp),
    (I32GtU, "i32.gt_u", -, 0x4b, None, Mvp),
    (I32LeS, "i32.le_s", -, 0x4c, None, Mvp),
    (I32LeU, "i32.le_u", -, 0x4d, None, Mvp),
    (I32GeS, "i32.ge_s", -, 0x4e, None, Mvp),
    (I32GeU, "i32.ge_u", -, 0x4f, None, Mvp),

    // i64 comparisons
    (I64Eqz, "i64.eqz", -, 0x50, None, Mvp),
    (I64Eq, "i64.eq", -, 0x51, None, Mvp),
    (I64Ne, "i64.ne", -, 0x52, None, Mvp),
    (I64LtS, "i64.lt_s", -, 0x53, None, Mvp),
    (I64LtU, "i64.lt_u", -, 0x54, None, Mvp),
    (I64GtS, "i64.gt_s", -, 0x55, None, Mvp),
    (I64GtU, "i64.gt_u", -, 0x56, None, Mvp),
    (I64LeS, "i64.le_s", -, 0x57, None, Mvp),
    (I64LeU, "i64.le_u", -, 0x58, None, Mvp),
    (I64GeS, "i64.ge_s", -, 0x59, None, Mvp),
    (I64GeU, "i64.ge_u", -, 0x5a, None, Mvp),

    // f32 comparisons
    (F32Eq, "f32.eq", -, 0x5b, None, Mvp),
    (F32Ne, "f32.ne", -, 0x5c, None, Mvp),
    (F32Lt, "f32.lt", -, 0x5d, None, Mvp),
    (F32Gt, "f32.gt", -, 0x5e, None, Mvp),
    (F32Le, "f32.le", -, 0x5f, None, Mvp),
    (F32Ge, "f32.ge", -, 0x60, None, Mvp),

    // f64 comparisons
    (F64Eq, "f64.eq", -, 0x61, None, Mvp),
    (F64Ne, "f64.ne", -, 0x62, None, Mvp),
    (F64Lt, "f64.lt", -, 0x63, None, Mvp),
    (F64Gt, "f64.gt", -, 0x64, None, Mvp),
    (F64Le, "f64.le", -, 0x65, None, Mvp),
    (F64Ge, "f64.ge", -, 0x66, None, Mvp),

    // i32 arithmetic
    (I32Clz, "i32.clz", -, 0x67, None, Mvp),
    (I32Ctz, "i32.ctz", -, 0x68, None, Mvp),
    (I32Popcnt, "i32.popcnt", -, 0x69, None, Mvp),
    (I32Add, "i32.add", -, 0x6a, None, Mvp),
    (I32Sub, "i32.sub", -, 0x6b, None, Mvp),
    (I32Mul, "i32.mul", -, 0x6c, None, Mvp),
    (I32DivS, "i32.div_s", -, 0x6d, None, Mvp),
    (I32DivU, "i32.div_u", -, 0x6e, None, Mvp),
    (I32RemS, "i32.rem_s", -, 0x6f, None, Mvp),
    (I32RemU, "i32.rem_u", -, 0x70, None, Mvp),
    (I32And, "i32.and", -, 0x71, None, Mvp),
    (I32Or, "i32.or", -, 0x72, None, Mvp),
    (I32Xor, "i32.xor", -, 0x73, None, Mvp),
    (I32Shl, "i32.shl", -, 0x74, None, Mvp),
    (I32ShrS, "i32.shr_s", -, 0x75, None, Mvp),
    (I32ShrU, "i32.shr_u", -, 0x76, None, Mvp),
    (I32Rotl, "i32.rotl", -, 0x77, None, Mvp),
    (I32Rotr, "i32.rotr", -, 0x78, None, Mvp),

    // i64 arithmetic
    (I64Clz, "i64.clz", -, 0x79, None, Mvp),
    (I64Ctz, "i64.ctz", -, 0x7a, None, Mvp),
    (I64Popcnt, "i64.popcnt", -, 0x7b, None, Mvp),
    (I64Add, "i64.add", -, 0x7c, None, Mvp),
    (I64Sub, "i64.sub", -, 0x7d, None, Mvp),
    (I64Mul, "i64.mul", -, 0x7e, None, Mvp),
    (I64DivS, "i64.div_s", -, 0x7f, None, Mvp),
    (I64DivU, "i64.div_u", -, 0x80, None, Mvp),
    (I64RemS, "i64.rem_s", -, 0x81, None, Mvp),
    (I64RemU, "i64.rem_u", -, 0x82, None, Mvp),
    (I64And, "i64.and", -, 0x83, None, Mvp),
    (I64Or, "i64.or", -, 0x84, None, Mvp),
    (I64Xor, "i64.xor", -, 0x85, None, Mvp),
    (I64Shl, "i64.shl", -, 0x86, None, Mvp),
    (I64ShrS, "i64.shr_s", -, 0x87, None, Mvp),
    (I64ShrU, "i64.shr_u", -, 0x88, None, Mvp),
    (I64Rotl, "i64.rotl", -, 0x89, None, Mvp),
    (I64Rotr, "i64.rotr", -, 0x8a, None, Mvp),

    // f32 arithmetic
    (F32Abs, "f32.abs", -, 0x8b, None, Mvp),
    (F32Neg, "f32.neg", -, 0x8c, None, Mvp),
    (F32Ceil, "f32.ceil", -, 0x8d, None, Mvp),
    (F32Floor, "f32.floor", -, 0x8e, None, Mvp),
    (F32Trunc, "f32.trunc", -, 0x8f, None, Mvp),
    (F32Nearest, "f32.nearest", -, 0x90, None, Mvp),
    (F32Sqrt, "f32.sqrt", -, 0x91, None, Mvp),
    (F32Add, "f32.add", -, 0x92, None, Mvp),
    (F32Sub, "f32.sub", -, 0x93, None, Mvp),
    (F32Mul, "f32.mul", -, 0x94, None, Mvp),
    (F32Div, "f32.div", -, 0x95, None, Mvp),
    (F32Min, "f32.min", -, 0x96, None, Mvp),
    (F32Max, "f32.max", -, 0x97, None, Mvp),
    (F32Copysign, "f32.copysign", -, 0x98, None, Mvp),

    // f64 arithmetic
    (F64Abs, "f64.abs", -, 0x99, None, Mvp),
    (F64Neg, "f64.neg", -, 0x9a, None, Mvp),
    (F64Ceil, "f64.ceil", -, 0x9b, None, Mvp),
    (F64Floor, "f64.floor", -, 0x9c, None, Mvp),
    (F64Trunc, "f64.trunc", -, 0x9d, None, Mvp),
    (F64Nearest, "f64.nearest", -, 0x9e, None, Mvp),
    (F64Sqrt, "f64.sqrt", -, 0x9f, None, Mvp),
    (F64Add, "f64.add", -, 0xa0, None, Mvp),
    (F64Sub, "f64.sub", -, 0xa1, None, Mvp),
    (F64Mul, "f64.mul", -, 0xa2, None, Mvp),
    (F64Div, "f64.div", -, 0xa3, None, Mvp),
    (F64Min, "f64.min", -, 0xa4, None, Mvp),
    (F64Max, "f64.max", -, 0xa5, None, Mvp),
    (F64Copysign, "f64.copysign", -, 0xa6, None, Mvp),

    // Conversions
    (I32WrapI64, "i32.wrap_i64", -, 0xa7, None, Mvp),
    (I32TruncF32S, "i32.trunc_f32_s", -, 0xa8, None, Mvp),
    (I32TruncF32U, "i32.trunc_f32_u", -, 0xa9, None, Mvp),
    (I32TruncF64S, "i32.trunc_f64_s", -, 0xaa, None, Mvp),
    (I32TruncF64U, "i32.trunc_f64_u", -, 0xab, None, Mvp),
    (I64ExtendI32S, "i64.extend_i32_s", -, 0xac, None, Mvp),
    (I64ExtendI32U, "i64.extend_i32_u", -, 0xad, None, Mvp),
    (I64TruncF32S, "i64.trunc_f32_s", -, 0xae, None, Mvp),
    (I64TruncF32U, "i64.trunc_f32_u", -, 0xaf, None, Mvp),
    (I64TruncF64S, "i64.trunc_f64_s", -, 0xb0, None, Mvp),
    (I64TruncF64U, "i64.trunc_f64_u", -, 0xb1, None, Mvp),
    (F32ConvertI32S, "f32.convert_i32_s", -, 0xb2, None, Mvp),
    (F32ConvertI32U, "f32.convert_i32_u", -, 0xb3, None, Mvp),
    (F32ConvertI64S, "f32.convert_i64_s", -, 0xb4, None, Mvp),
    (F32ConvertI64U, "f32.convert_i64_u", -, 0xb5, None, Mvp),
    (F32DemoteF64, "f32.demote_f64", -, 0xb6, None, Mvp),
    (F64ConvertI32S, "f64.convert_i32_s", -, 0xb7, None, Mvp),
    (F64ConvertI32U, "f64.convert_i32_u", -, 0xb8, None, Mvp),
    (F64ConvertI64S, "f64.convert_i64_s", -, 0xb9, None, Mvp),
    (F64ConvertI64U, "f64.convert_i64_u", -, 0xba, None, Mvp),
    (F64PromoteF32, "f64.promote_f32", -, 0xbb, None, Mvp),
    (I32ReinterpretF32, "i32.reinterpret_f32", -, 0xbc, None, Mvp),
    (I64ReinterpretF64, "i64.reinterpret_f64", -, 0xbd, None, Mvp),
    (F32ReinterpretI32, "f32.reinterpret_i32", -, 0xbe, None, Mvp),
    (F64ReinterpretI64, "f64.reinterpret_i64", -, 0xbf, None, Mvp),

    // Sign extension
    (I32Extend8S, "i32.extend8_s", -, 0xc0, None, SignExtension),
    (I32Extend16S, "i32.extend16_s", -, 0xc1, None, SignExtension),
    (I64Extend8S, "i64.extend8_s", -, 0xc2, None, SignExtension),
    (I64Extend16S, "i64.extend16_s", -, 0xc3, None, SignExtension),
    (I64Extend32S, "i64.extend32_s", -, 0xc4, None, SignExtension),

    // References
    (RefNull, "ref.null", -, 0xd0, HeapType, ReferenceTypes),
    (RefIsNull, "ref.is_null", -, 0xd1, None, ReferenceTypes),
    (RefFunc, "ref.func", -, 0xd2, Index, ReferenceTypes),

    // Saturating truncation (0xfc)
    (I32TruncSatF32S, "i32.trunc_sat_f32_s", 0xfc, 0x00, None, SaturatingFloatToInt),
    (I32TruncSatF32U, "i32.trunc_sat_f32_u", 0xfc, 0x01, None, SaturatingFloatToInt),
    (I32TruncSatF64S, "i32.trunc_sat_f64_s", 0xfc, 0x02, None, SaturatingFloatToInt),
    (I32TruncSatF64U, "i32.trunc_sat_f64_u", 0xfc, 0x03, None, SaturatingFloatToInt),
    (I64TruncSatF32S, "i64.trunc_sat_f32_s", 0xfc, 0x04, None, SaturatingFloatToInt),
    (I64TruncSatF32U, "i64.trunc_sat_f32_u", 0xfc, 0x05, None, SaturatingFloatToInt),
    (I64TruncSatF64S, "i64.trunc_sat_f64_s", 0xfc, 0x06, None, SaturatingFloatToInt),
    (I64TruncSatF64U, "i64.trunc_sat_f64_u", 0xfc, 0x07, None, SaturatingFloatToInt),

    // Bulk memory (0xfc)
    (MemoryInit, "memory.init", 0xfc, 0x08, Init, BulkMemory),
    (DataDrop, "data.drop", 0xfc, 0x09, Index, BulkMemory),
    (MemoryCopy, "memory.copy", 0xfc, 0x0a, Copy, BulkMemory),
    (MemoryFill, "memory.fill", 0xfc, 0x0b, Index, BulkMemory),
    (TableInit, "table.init", 0xfc, 0x0c, Init, BulkMemory),
    (ElemDrop, "elem.drop", 0xfc, 0x0d, Index, BulkMemory),
    (TableCopy, "table.copy", 0xfc, 0x0e, Copy, BulkMemory),
    (TableGrow, "table.grow", 0xfc, 0x0f, Index, ReferenceTypes),
    (TableSize, "table.size", 0xfc, 0x10, Index, ReferenceTypes),
    (TableFill, "table.fill", 0xfc, 0x11, Index, ReferenceTypes),

    // SIMD loads/stores (0xfd)
    (V128Load, "v128.load", 0xfd, 0x00, MemArg, Simd),
    (V128Load8x8S, "v128.load8x8_s", 0xfd, 0x01, MemArg, Simd),
    (V128Load8x8U, "v128.load8x8_u", 0xfd, 0x02, MemArg, Simd),
    (V128Load16x4S, "v128.load16x4_s", 0xfd, 0x03, MemArg, Simd),
    (V128Load16x4U, "v128.load16x4_u", 0xfd, 0x04, MemArg, Simd),
    (V128Load32x2S, "v128.load32x2_s", 0xfd, 0x05, MemArg, Simd),
    (V128Load32x2U, "v128.load32x2_u", 0xfd, 0x06, MemArg, Simd),
    (V128Load8Splat, "v128.load8_splat", 0xfd, 0x07, MemArg, Simd),
    (V128Load16Splat, "v128.load16_splat", 0xfd, 0x08, MemArg, Simd),
    (V128Load32Splat, "v128.load32_splat", 0xfd, 0x09, MemArg, Simd),
    (V128Load64Splat, "v128.load64_splat", 0xfd, 0x0a, MemArg, Simd),
    (V128Store, "v128.store", 0xfd, 0x0b, MemArg, Simd),

    // SIMD constants and lanes (0xfd)
    (V128Const, "v128.const", 0xfd, 0x0c, V128, Simd),
    (I8x16Shuffle, "i8x16.shuffle", 0xfd, 0x0d, Shuffle, Simd),
    (I8x16Swizzle, "i8x16.swizzle", 0xfd, 0x0e, None, Simd),
    (I8x16Splat, "i8x16.splat", 0xfd, 0x0f, None, Simd),
    (I16x8Splat, "i16x8.splat", 0xfd, 0x10, None, Simd),
    (I32x4Splat, "i32x4.splat", 0xfd, 0x11, None, Simd),
    (I64x2Splat, "i64x2.splat", 0xfd, 0x12, None, Simd),
    (F32x4Splat, "f32x4.splat", 0xfd, 0x13, None, Simd),
    (F64x2Splat, "f64x2.splat", 0xfd, 0x14, None, Simd),
    (I8x16ExtractLaneS, "i8x16.extract_lane_s", 0xfd, 0x15, SimdLane, Simd),
    (I8x16ExtractLaneU, "i8x16.extract_lane_u", 0xfd, 0x16, SimdLane, Simd),
    (I8x16ReplaceLane, "i8x16.replace_lane", 0xfd, 0x17, SimdLane, Simd),
    (I16x8ExtractLaneS, "i16x8.extract_lane_s", 0xfd, 0x18, SimdLane, Simd),
    (I16x8ExtractLaneU, "i16x8.extract_lane_u", 0xfd, 0x19, SimdLane, Simd),
    (I16x8ReplaceLane, "i16x8.replace_lane", 0xfd, 0x1a, SimdLane, Simd),
    (I32x4ExtractLane, "i32x4.extract_lane", 0xfd, 0x1b, SimdLane, Simd),
    (I32x4ReplaceLane, "i32x4.replace_lane", 0xfd, 0x1c, SimdLane, Simd),
    (I64x2ExtractLane, "i64x2.extract_lane", 0xfd, 0x1d, SimdLane, Simd),
    (I64x2ReplaceLane, "i64x2.replace_lane", 0xfd, 0x1e, SimdLane, Simd),
    (F32x4ExtractLane, "f32x4.extract_lane", 0xfd, 0x1f, SimdLane, Simd),
    (F32x4ReplaceLane, "f32x4.replace_lane", 0xfd, 0x20, SimdLane, Simd),
    (F64x2ExtractLane, "f64x2.extract_lane", 0xfd, 0x21, SimdLane, Simd),
    (F64x2ReplaceLane, "f64x2.replace_lane", 0xfd, 0x22, SimdLane, Simd),

    // SIMD comparisons (0xfd)
    (I8x16Eq, "i8x16.eq", 0xfd, 0x23, None, Simd),
    (I8x16Ne, "i8x16.ne", 0xfd, 0x24, None, Simd),
    (I8x16LtS, "i8x16.lt_s", 0xfd, 0x25, None, Simd),
    (I8x16LtU, "i8x16.lt_u", 0xfd, 0x26, None, Simd),
    (I8x16GtS, "i8x16.gt_s", 0xfd, 0x27, None, Simd),
    (I8x16GtU, "i8x16.gt_u", 0xfd, 0x28, None, Simd),
    (I8x16LeS, "i8x16.le_s", 0xfd, 0x29, None, Simd),
    (I8x16LeU, "i8x16.le_u", 0xfd, 0x2a, None, Simd),
    (I8x16GeS, "i8x16.ge_s", 0xfd, 0x2b, None, Simd),
    (I8x16GeU, "i8x16.ge_u", 0xfd, 0x2c, None, Simd),
    (I16x8Eq, "i16x8.eq", 0xfd, 0x2d, None, Simd),
    (I16x8Ne, "i16x8.ne", 0xfd, 0x2e, None, Simd),
    (I16x8LtS, "i16x8.lt_s", 0xfd, 0x2f, None, Simd),
    (I16x8LtU, "i16x8.lt_u", 0xfd, 0x30, None, Simd),
    (I16x8GtS, "i16x8.gt_s", 0xfd, 0x31, None, Simd),
    (I16x8GtU, "i16x8.gt_u", 0xfd, 0x32, None, Simd),
    (I16x8LeS, "i16x8.le_s", 0xfd, 0x33, None, Simd),
    (I16x8LeU, "i16x8.le_u", 0xfd, 0x34, None, Simd),
    (I16x8GeS, "i16x8.ge_s", 0xfd, 0x35, None, Simd),
    (I16x8GeU, "i16x8.ge_u", 0xfd, 0x36, None, Simd),
    (I32x4Eq, "i32x4.eq", 0xfd, 0x37, None, Simd),
    (I32x4Ne, "i32x4.ne", 0xfd, 0x38, None, Simd),
    (I32x4LtS, "i32x4.lt_s", 0xfd, 0x39, None, Simd),
    (I32x4LtU, "i32x4.lt_u", 0xfd, 0x3a, None, Simd),
    (I32x4GtS, "i32x4.gt_s", 0xfd, 0x3b, None, Simd),
    (I32x4GtU, "i32x4.gt_u", 0xfd, 0x3c, None, Simd),
    (I32x4LeS, "i32x4.le_s", 0xfd, 0x3d, None, Simd),
    (I32x4LeU, "i32x4.le_u", 0xfd, 0x3e, None, Simd),
    (I32x4GeS, "i32x4.ge_s", 0xfd, 0x3f, None, Simd),
    (I32x4GeU, "i32x4.ge_u", 0xfd, 0x40, None, Simd),
    (F32x4Eq, "f32x4.eq", 0xfd, 0x41, None, Simd),
    (F32x4Ne, "f32x4.ne", 0xfd, 0x42, None, Simd),
    (F32x4Lt, "f32x4.lt", 0xfd, 0x43, None, Simd),
    (F32x4Gt, "f32x4.gt", 0xfd, 0x44, None, Simd),
    (F32x4Le, "f32x4.le", 0xfd, 0x45, None, Simd),
    (F32x4Ge, "f32x4.ge", 0xfd, 0x46, None, Simd),
    (F64x2Eq, "f64x2.eq", 0xfd, 0x47, None, Simd),
    (F64x2Ne, "f64x2.ne", 0xfd, 0x48, None, Simd),
    (F64x2Lt, "f64x2.lt", 0xfd, 0x49, None, Simd),
    (F64x2Gt, "f64x2.gt", 0xfd, 0x4a, None, Simd),
    (F64x2Le, "f64x2.le", 0xfd, 0x4b, None, Simd),
    (F64x2Ge, "f64x2.ge", 0xfd, 0x4c, None, Simd),

    // SIMD bitwise (0xfd)
    (V128Not, "v128.not", 0xfd, 0x4d, None, Simd),
    (V128And, "v128.and", 0xfd, 0x4e, None, Simd),
    (V128Andnot, "v128.andnot", 0xfd, 0x4f, None, Simd),
    (V128Or, "v128.or", 0xfd, 0x50, None, Simd),
    (V128Xor, "v128.xor", 0xfd, 0x51, None, Simd),
    (V128Bitselect, "v128.bitselect", 0xfd, 0x52, None, Simd),
    (V128AnyTrue, "v128.any_true", 0xfd, 0x53, None, Simd),
    (V128Load32Zero, "v128.load32_zero", 0xfd, 0x5c, MemArg, Simd),
    (V128Load64Zero, "v128.load64_zero", 0xfd, 0x5d, MemArg, Simd),

    // SIMD conversions and i8x16 arithmetic (0xfd)
    (F32x4DemoteF64x2Zero, "f32x4.demote_f64x2_zero", 0xfd, 0x5e, None, Simd),
    (F64x2PromoteLowF32x4, "f64x2.promote_low_f32x4", 0xfd, 0x5f, None, Simd),
    (I8x16Abs, "i8x16.abs", 0xfd, 0x60, None, Simd),
    (I8x16Neg, "i8x16.neg", 0xfd, 0x61, None, Simd),
    (I8x16Popcnt, "i8x16.popcnt", 0xfd, 0x62, None, Simd),
    (I8x16AllTrue, "i8x16.all_true", 0xfd, 0x63, None, Simd),
    (I8x16Bitmask, "i8x16.bitmask", 0xfd, 0x64, None, Simd),
    (I8x16NarrowI16x8S, "i8x16.narrow_i16x8_s", 0xfd, 0x65, None, Simd),
    (I8x16NarrowI16x8U, "i8x16.narrow_i16x8_u", 0xfd, 0x66, None, Simd),
    (F32x4Ceil, "f32x4.ceil", 0xfd, 0x67, None, Simd),
    (F32x4Floor, "f32x4.floor", 0xfd, 0x68, None, Simd),
    (F32x4Trunc, "f32x4.trunc", 0xfd, 0x69, None, Simd),
    (F32x4Nearest, "f32x4.nearest", 0xfd, 0x6a, None, Simd),
    (I8x16Shl, "i8x16.shl", 0xfd, 0x6b, None, Simd),
    (I8x16ShrS, "i8x16.shr_s", 0xfd, 0x6c, None, Simd),
    (I8x16ShrU, "i8x16.shr_u", 0xfd, 0x6d, None, Simd),
    (I8x16Add, "i8x16.add", 0xfd, 0x6e, None, Simd),
    (I8x16AddSatS, "i8x16.add_sat_s", 0xfd, 0x6f, None, Simd),
    (I8x16AddSatU, "i8x16.add_sat_u", 0xfd, 0x70, None, Simd),
    (I8x16Sub, "i8x16.sub", 0xfd, 0x71, None, Simd),
    (I8x16SubSatS, "i8x16.sub_sat_s", 0xfd, 0x72, None, Simd),
    (I8x16SubSatU, "i8x16.sub_sat_u", 0xfd, 0x73, None, Simd),
    (F64x2Ceil, "f64x2.ceil", 0xfd, 0x74, None, Simd),
    (F64x2Floor, "f64x2.floor", 0xfd, 0x75, None, Simd),
    (I8x16MinS, "i8x16.min_s", 0xfd, 0x76, None, Simd),
    (I8x16MinU, "i8x16.min_u", 0xfd, 0x77, None, Simd),
    (I8x16MaxS, "i8x16.max_s", 0xfd, 0x78, None, Simd),
    (I8x16MaxU, "i8x16.max_u", 0xfd, 0x79, None, Simd),
    (F64x2Trunc, "f64x2.trunc", 0xfd, 0x7a, None, Simd),
    (I8x16AvgrU, "i8x16.avgr_u", 0xfd, 0x7b, None, Simd),

    // SIMD i16x8 arithmetic (0xfd)
    (I16x8ExtaddPairwiseI8x16S, "i16x8.extadd_pairwise_i8x16_s", 0xfd, 0x7c, None, Simd),
    (I16x8ExtaddPairwiseI8x16U, "i16x8.extadd_pairwise_i8x16_u", 0xfd, 0x7d, None, Simd),
    (I32x4ExtaddPairwiseI16x8S, "i32x4.extadd_pairwise_i16x8_s", 0xfd, 0x7e, None, Simd),
    (I32x4ExtaddPairwiseI16x8U, "i32x4.extadd_pairwise_i16x8_u", 0xfd, 0x7f, None, Simd),
    (I16x8Abs, "i16x8.abs", 0xfd, 0x80, None, Simd),
    (I16x8Neg, "i16x8.neg", 0xfd, 0x81, None, Simd),
    (I16x8Q15mulrSatS, "i16x8.q15mulr_sat_s", 0xfd, 0x82, None, Simd),
    (I16x8AllTrue, "i16x8.all_true", 0xfd, 0x83, None, Simd),
    (I16x8Bitmask, "i16x8.bitmask", 0xfd, 0x84, None, Simd),
    (I16x8NarrowI32x4S, "i16x8.narrow_i32x4_s", 0xfd, 0x85, None, Simd),
    (I16x8NarrowI32x4U, "i16x8.narrow_i32x4_u", 0xfd, 0x86, None, Simd),
    (I16x8ExtendLowI8x16S, "i16x8.extend_low_i8x16_s", 0xfd, 0x87, None, Simd),
    (I16x8ExtendHighI8x16S, "i16x8.extend_high_i8x16_s", 0xfd, 0x88, None, Simd),
    (I16x8ExtendLowI8x16U, "i16x8.extend_low_i8x16_u", 0xfd, 0x89, None, Simd),
    (I16x8ExtendHighI8x16U, "i16x8.extend_high_i8x16_u", 0xfd, 0x8a, None, Simd),
    (I16x8Shl, "i16x8.shl", 0xfd, 0x8b, None, Simd),
    (I16x8ShrS, "i16x8.shr_s", 0xfd, 0x8c, None, Simd),
    (I16x8ShrU, "i16x8.shr_u", 0xfd, 0x8d, None, Simd),
    (I16x8Add, "i16x8.add", 0xfd, 0x8e, None, Simd),
    (I16x8AddSatS, "i16x8.add_sat_s", 0xfd, 0x8f, None, Simd),
    (I16x8AddSatU, "i16x8.add_sat_u", 0xfd, 0x90, None, Simd),
    (I16x8Sub, "i16x8.sub", 0xfd, 0x91, None, Simd),
    (I16x8SubSatS, "i16x8.sub_sat_s", 0xfd, 0x92, None, Simd),
    (I16x8SubSatU, "i16x8.sub_sat_u", 0xfd, 0x93, None, Simd),
    (F64x2Nearest, "f64x2.nearest", 0xfd, 0x94, None, Simd),
    (I16x8Mul, "i16x8.mul", 0xfd, 0x95, None, Simd),
    (I16x8MinS, "i16x8.min_s", 0xfd, 0x96, None, Simd),
    (I16x8MinU, "i16x8.min_u", 0xfd, 0x97, None, Simd),
    (I16x8MaxS, "i16x8.max_s", 0xfd, 0x98, None, Simd),
    (I16x8MaxU, "i16x8.max_u", 0xfd, 0x99, None, Simd),
    (I16x8AvgrU, "i16x8.avgr_u", 0xfd, 0x9b, None, Simd),
    (I16x8ExtmulLowI8x16S, "i16x8.extmul_low_i8x16_s", 0xfd, 0x9c, None, Simd),
    (I16x8ExtmulHighI8x16S, "i16x8.extmul_high_i8x16_s", 0xfd, 0x9d, None, Simd),
    (I16x8ExtmulLowI8x16U, "i16x8.extmul_low_i8x16_u", 0xfd, 0x9e, None, Simd),
    (I16x8ExtmulHighI8x16U, "i16x8.extmul_high_i8x16_u", 0xfd, 0x9f, None, Simd),

    // SIMD i32x4 arithmetic (0xfd)
    (I32x4Abs, "i32x4.abs", 0xfd, 0xa0, None, Simd),
    (I32x4Neg, "i32x4.neg", 0xfd, 0xa1, None, Simd),
    (I32x4AllTrue, "i32x4.all_true", 0xfd, 0xa3, None, Simd),
    (I32x4Bitmask, "i32x4.bitmask", 0xfd, 0xa4, None, Simd),
    (I32x4ExtendLowI16x8S, "i32x4.extend_low_i16x8_s", 0xfd, 0xa7, None, Simd),
    (I32x4ExtendHighI16x8S, "i32x4.extend_high_i16x8_s", 0xfd, 0xa8, None, Simd),
    (I32x4ExtendLowI16x8U, "i32x4.extend_low_i16x8_u", 0xfd, 0xa9, None, Simd),
    (I32x4ExtendHighI16x8U, "i32x4.extend_high_i16x8_u", 0xfd, 0xaa, None, Simd),
    (I32x4Shl, "i32x4.shl", 0xfd, 0xab, None, Simd),
    (I32x4ShrS, "i32x4.shr_s", 0xfd, 0xac, None, Simd),
    (I32x4ShrU, "i32x4.shr_u", 0xfd, 0xad, None, Simd),
    (I32x4Add, "i32x4.add", 0xfd, 0xae, None, Simd),
    (I32x4Sub, "i32x4.sub", 0xfd, 0xb1, None, Simd),
    (I32x4Mul, "i32x4.mul", 0xfd, 0xb5, None, Simd),
    (I32x4MinS, "i32x4.min_s", 0xfd, 0xb6, None, Simd),
    (I32x4MinU, "i32x4.min_u", 0xfd, 0xb7, None, Simd),
    (I32x4MaxS, "i32x4.max_s", 0xfd, 0xb8, None, Simd),
    (I32x4MaxU, "i32x4.max_u", 0xfd, 0xb9, None, Simd),
    (I32x4DotI16x8S, "i32x4.dot_i16x8_s", 0xfd, 0xba, None, Simd),
    (I32x4ExtmulLowI16x8S, "i32x4.extmul_low_i16x8_s", 0xfd, 0xbc, None, Simd),
    (I32x4ExtmulHighI16x8S, "i32x4.extmul_high_i16x8_s", 0xfd, 0xbd, None, Simd),
    (I32x4ExtmulLowI16x8U, "i32x4.extmul_low_i16x8_u", 0xfd, 0xbe, None, Simd),
    (I32x4ExtmulHighI16x8U, "i32x4.extmul_high_i16x8_u", 0xfd, 0xbf, None, Simd),

    // SIMD i64x2 arithmetic (0xfd)
    (I64x2Abs, "i64x2.abs", 0xfd, 0xc0, None, Simd),
    (I64x2Neg, "i64x2.neg", 0xfd, 0xc1, None, Simd),
    (I64x2AllTrue, "i64x2.all_true", 0xfd, 0xc3, None, Simd),
    (I64x2Bitmask, "i64x2.bitmask", 0xfd, 0xc4, None, Simd),
    (I64x2ExtendLowI32x4S, "i64x2.extend_low_i32x4_s", 0xfd, 0xc7, None, Simd),
    (I64x2ExtendHighI32x4S, "i64x2.extend_high_i32x4_s", 0xfd, 0xc8, None, Simd),
    (I64x2ExtendLowI32x4U, "i64x2.extend_low_i32x4_u", 0xfd, 0xc9, None, Simd),
    (I64x2ExtendHighI32x4U, "i64x2.extend_high_i32x4_u", 0xfd, 0xca, None, Simd),
    (I64x2Shl, "i64x2.shl", 0xfd, 0xcb, None, Simd),
    (I64x2ShrS, "i64x2.shr_s", 0xfd, 0xcc, None, Simd),
    (I64x2ShrU, "i64x2.shr_u", 0xfd, 0xcd, None, Simd),
    (I64x2Add, "i64x2.add", 0xfd, 0xce, None, Simd),
    (I64x2Sub, "i64x2.sub", 0xfd, 0xd1, None, Simd),
    (I64x2Mul, "i64x2.mul", 0xfd, 0xd5, None, Simd),
    (I64x2Eq, "i64x2.eq", 0xfd, 0xd6, None, Simd),
    (I64x2Ne, "i64x2.ne", 0xfd, 0xd7, None, Simd),
    (I64x2LtS, "i64x2.lt_s", 0xfd, 0xd8, None, Simd),
    (I64x2GtS, "i64x2.gt_s", 0xfd, 0xd9, None, Simd),
    (I64x2LeS, "i64x2.le_s", 0xfd, 0xda, None, Simd),
    (I64x2GeS, "i64x2.ge_s", 0xfd, 0xdb, None, Simd),
    (I64x2ExtmulLowI32x4S, "i64x2.extmul_low_i32x4_s", 0xfd, 0xdc, None, Simd),
    (I64x2ExtmulHighI32x4S, "i64x2.extmul_high_i32x4_s", 0xfd, 0xdd, None, Simd),
    (I64x2ExtmulLowI32x4U, "i64x2.extmul_low_i32x4_u", 0xfd, 0xde, None, Simd),
    (I64x2ExtmulHighI32x4U, "i64x2.extmul_high_i32x4_u", 0xfd, 0xdf, None, Simd),

    // SIMD float arithmetic (0xfd)
    (F32x4Abs, "f32x4.abs", 0xfd, 0xe0, None, Simd),
    (F32x4Neg, "f32x4.neg", 0xfd, 0xe1, None, Simd),
    (F32x4Sqrt, "f32x4.sqrt", 0xfd, 0xe3, None, Simd),
    (F32x4Add, "f32x4.add", 0xfd, 0xe4, None, Simd),
    (F32x4Sub, "f32x4.sub", 0xfd, 0xe5, None, Simd),
    (F32x4Mul, "f32x4.mul", 0xfd, 0xe6, None, Simd),
    (F32x4Div, "f32x4.div", 0xfd, 0xe7, None, Simd),
    (F32x4Min, "f32x4.min", 0xfd, 0xe8, None, Simd),
    (F32x4Max, "f32x4.max", 0xfd, 0xe9, None, Simd),
    (F32x4Pmin, "f32x4.pmin", 0xfd, 0xea, None, Simd),
    (F32x4Pmax, "f32x4.pmax", 0xfd, 0xeb, None, Simd),
    (F64x2Abs, "f64x2.abs", 0xfd, 0xec, None, Simd),
    (F64x2Neg, "f64x2.neg", 0xfd, 0xed, None, Simd),
    (F64x2Sqrt, "f64x2.sqrt", 0xfd, 0xef, None, Simd),
    (F64x2Add, "f64x2.add", 0xfd, 0xf0, None, Simd),
    (F64x2Sub, "f64x2.sub", 0xfd, 0xf1, None, Simd),
    (F64x2Mul, "f64x2.mul", 0xfd, 0xf2, None, Simd),
    (F64x2Div, "f64x2.div", 0xfd, 0xf3, None, Simd),
    (F64x2Min, "f64x2.min", 0xfd, 0xf4, None, Simd),
    (F64x2Max, "f64x2.max", 0xfd, 0xf5, None, Simd),
    (F64x2Pmin, "f64x2.pmin", 0xfd, 0xf6, None, Simd),
    (F64x2Pmax, "f64x2.pmax", 0xfd, 0xf7, None, Simd),
    (I32x4TruncSatF32x4S, "i32x4.trunc_sat_f32x4_s", 0xfd, 0xf8, None, Simd),
    (I32x4TruncSatF32x4U, "i32x4.trunc_sat_f32x4_u", 0xfd, 0xf9, None, Simd),
    (F32x4ConvertI32x4S, "f32x4.convert_i32x4_s", 0xfd, 0xfa, None, Simd),
    (F32x4ConvertI32x4U, "f32x4.convert_i32x4_u", 0xfd, 0xfb, None, Simd),
    (I32x4TruncSatF64x2SZero, "i32x4.trunc_sat_f64x2_s_zero", 0xfd, 0xfc, None, Simd),
    (I32x4TruncSatF64x2UZero, "i32x4.trunc_sat_f64x2_u_zero", 0xfd, 0xfd, None, Simd),
    (F64x2ConvertLowI32x4S, "f64x2.convert_low_i32x4_s", 0xfd, 0xfe, None, Simd),
    (F64x2ConvertLowI32x4U, "f64x2.convert_low_i32x4_u", 0xfd, 0xff, None, Simd),

    // Atomics (0xfe)
    (MemoryAtomicNotify, "memory.atomic.notify", 0xfe, 0x00, MemArg, Threads),
    (MemoryAtomicWait32, "memory.atomic.wait32", 0xfe, 0x01, MemArg, Threads),
    (MemoryAtomicWait64, "memory.atomic.wait64", 0xfe, 0x02, MemArg, Threads),
    (AtomicFence, "atomic.fence", 0xfe, 0x03, Index, Threads),
    (I32AtomicLoad, "i32.atomic.load", 0xfe, 0x10, MemArg, Threads),
    (I64AtomicLoad, "i64.atomic.load", 0xfe, 0x11, MemArg, Threads),
    (I32AtomicLoad8U, "i32.atomic.load8_u", 0xfe, 0x12, MemArg, Threads),
    (I32AtomicLoad16U, "i32.atomic.load16_u", 0xfe, 0x13, MemArg, Threads),
    (I64AtomicLoad8U, "i64.atomic.load8_u", 0xfe, 0x14, MemArg, Threads),
    (I64AtomicLoad16U, "i64.atomic.load16_u", 0xfe, 0x15, MemArg, Threads),
    (I64AtomicLoad32U, "i64.atomic.load32_u", 0xfe, 0x16, MemArg, Threads),
    (I32AtomicStore, "i32.atomic.store", 0xfe, 0x17, MemArg, Threads),
    (I64AtomicStore, "i64.atomic.store", 0xfe, 0x18, MemArg, Threads),
    (I32AtomicStore8, "i32.atomic.store8", 0xfe, 0x19, MemArg, Threads),
    (I32AtomicStore16, "i32.atomic.store16", 0xfe, 0x1a, MemArg, Threads),
    (I64AtomicStore8, "i64.atomic.store8", 0xfe, 0x1b, MemArg, Threads),
    (I64AtomicStore16, "i64.atomic.store16", 0xfe, 0x1c, MemArg, Threads),
    (I64AtomicStore32, "i64.atomic.store32", 0xfe, 0x1d, MemArg, Threads),
    (I32AtomicRmwAdd, "i32.atomic.rmw.add", 0xfe, 0x1e, MemArg, Threads),
    (I64AtomicRmwAdd, "i64.atomic.rmw.add", 0xfe, 0x1f, MemArg, Threads),
    (I32AtomicRmw8AddU, "i32.atomic.rmw8.add_u", 0xfe, 0x20, MemArg, Threads),
    (I32AtomicRmw16AddU, "i32.atomic.rmw16.add_u", 0xfe, 0x21, MemArg, Threads),
    (I64AtomicRmw8AddU, "i64.atomic.rmw8.add_u", 0xfe, 0x22, MemArg, Threads),
    (I64AtomicRmw16AddU, "i64.atomic.rmw16.add_u", 0xfe, 0x23, MemArg, Threads),
    (I64AtomicRmw32AddU, "i64.atomic.rmw32.add_u", 0xfe, 0x24, MemArg, Threads),
    (I32AtomicRmwSub, "i32.atomic.rmw.sub", 0xfe, 0x25, MemArg, Threads),
    (I64AtomicRmwSub, "i64.atomic.rmw.sub", 0xfe, 0x26, MemArg, Threads),
    (I32AtomicRmw8SubU, "i32.atomic.rmw8.sub_u", 0xfe, 0x27, MemArg, Threads),
    (I32AtomicRmw16SubU, "i32.atomic.rmw16.sub_u", 0xfe, 0x28, MemArg, Threads),
    (I64AtomicRmw8SubU, "i64.atomic.rmw8.sub_u", 0xfe, 0x29, MemArg, Threads),
    (I64AtomicRmw16SubU, "i64.atomic.rmw16.sub_u", 0xfe, 0x2a, MemArg, Threads),
    (I64AtomicRmw32SubU, "i64.atomic.rmw32.sub_u", 0xfe, 0x2b, MemArg, Threads),
    (I32AtomicRmwAnd, "i32.atomic.rmw.and", 0xfe, 0x2c, MemArg, Threads),
    (I64AtomicRmwAnd, "i64.atomic.rmw.and", 0xfe, 0x2d, MemArg, Threads),
    (I32AtomicRmw8AndU, "i32.atomic.rmw8.and_u", 0xfe, 0x2e, MemArg, Threads),
    (I32AtomicRmw16AndU, "i32.atomic.rmw16.and_u", 0xfe, 0x2f, MemArg, Threads),
    (I64AtomicRmw8AndU, "i64.atomic.rmw8.and_u", 0xfe, 0x30, MemArg, Threads),
    (I64AtomicRmw16AndU, "i64.atomic.rmw16.and_u", 0xfe, 0x31, MemArg, Threads),
    (I64AtomicRmw32AndU, "i64.atomic.rmw32.and_u", 0xfe, 0x32, MemArg, Threads),
    (I32AtomicRmwOr, "i32.atomic.rmw.or", 0xfe, 0x33, MemArg, Threads),
    (I64AtomicRmwOr, "i64.atomic.rmw.or", 0xfe, 0x34, MemArg, Threads),
    (I32AtomicRmw8OrU, "i32.atomic.rmw8.or_u", 0xfe, 0x35, MemArg, Threads),
    (I32AtomicRmw16OrU, "i32.atomic.rmw16.or_u", 0xfe, 0x36, MemArg, Threads),
    (I64AtomicRmw8OrU, "i64.atomic.rmw8.or_u", 0xfe, 0x37, MemArg, Threads),
    (I64AtomicRmw16OrU, "i64.atomic.rmw16.or_u", 0xfe, 0x38, MemArg, Threads),
    (I64AtomicRmw32OrU, "i64.atomic.rmw32.or_u", 0xfe, 0x39, MemArg, Threads),
    (I32AtomicRmwXor, "i32.atomic.rmw.xor", 0xfe, 0x3a, MemArg, Threads),
    (I64AtomicRmwXor, "i64.atomic.rmw.xor", 0xfe, 0x3b, MemArg, Threads),
    (I32AtomicRmw8XorU, "i32.atomic.rmw8.xor_u", 0xfe, 0x3c, MemArg, Threads),
    (I32AtomicRmw16XorU, "i32.atomic.rmw16.xor_u", 0xfe, 0x3d, MemArg, Threads),
    (I64AtomicRmw8XorU, "i64.atomic.rmw8.xor_u", 0xfe, 0x3e, MemArg, Threads),
    (I64AtomicRmw16XorU, "i64.atomic.rmw16.xor_u", 0xfe, 0x3f, MemArg, Threads),
    (I64AtomicRmw32XorU, "i64.atomic.rmw32.xor_u", 0xfe, 0x40, MemArg, Threads),
    (I32AtomicRmwXchg, "i32.atomic.rmw.xchg", 0xfe, 0x41, MemArg, Threads),
    (I64AtomicRmwXchg, "i64.atomic.rmw.xchg", 0xfe, 0x42, MemArg, Threads),
    (I32AtomicRmw8XchgU, "i32.atomic.rmw8.xchg_u", 0xfe, 0x43, MemArg, Threads),
    (I32AtomicRmw16XchgU, "i32.atomic.rmw16.xchg_u", 0xfe, 0x44, MemArg, Threads),
    (I64AtomicRmw8XchgU, "i64.atomic.rmw8.xchg_u", 0xfe, 0x45, MemArg, Threads),
    (I64AtomicRmw16XchgU, "i64.atomic.rmw16.xchg_u", 0xfe, 0x46, MemArg, Threads),
    (I64AtomicRmw32XchgU, "i64.atomic.rmw32.xchg_u", 0xfe, 0x47, MemArg, Threads),
    (I32AtomicRmwCmpxchg, "i32.atomic.rmw.cmpxchg", 0xfe, 0x48, MemArg, Threads),
    (I64AtomicRmwCmpxchg, "i64.atomic.rmw.cmpxchg", 0xfe, 0x49, MemArg, Threads),
    (I32AtomicRmw8CmpxchgU, "i32.atomic.rmw8.cmpxchg_u", 0xfe, 0x4a, MemArg, Threads),
    (I32AtomicRmw16CmpxchgU, "i32.atomic.rmw16.cmpxchg_u", 0xfe, 0x4b, MemArg, Threads),
    (I64AtomicRmw8CmpxchgU, "i64.atomic.rmw8.cmpxchg_u", 0xfe, 0x4c, MemArg, Threads),
    (I64AtomicRmw16CmpxchgU, "i64.atomic.rmw16.cmpxchg_u", 0xfe, 0x4d, MemArg, Threads),
    (I64AtomicRmw32CmpxchgU, "i64.atomic.rmw32.cmpxchg_u", 0xfe, 0x4e, MemArg, Threads),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_are_unique() {
        // The lazy map would silently drop collisions; count them instead.
        assert_eq!(BY_ENCODING.len(), Opcode::ALL.len());
    }

    #[test]
    fn lookup_plain() {
        assert_eq!(Opcode::from_encoding(None, 0x00), Some(Opcode::Unreachable));
        assert_eq!(Opcode::from_encoding(None, 0x41), Some(Opcode::I32Const));
        assert_eq!(Opcode::from_encoding(None, 0x1f), None);
    }

    #[test]
    fn lookup_prefixed() {
        assert_eq!(
            Opcode::from_encoding(Some(0xfc), 0x08),
            Some(Opcode::MemoryInit)
        );
        assert_eq!(
            Opcode::from_encoding(Some(0xfd), 0x0c),
            Some(Opcode::V128Const)
        );
        assert_eq!(
            Opcode::from_encoding(Some(0xfe), 0x4e),
            Some(Opcode::I64AtomicRmw32CmpxchgU)
        );
        assert_eq!(Opcode::from_encoding(Some(0xfd), 0x9a), None);
    }

    #[test]
    fn select_name_collision_prefers_base_form() {
        assert_eq!(Opcode::from_name("select"), Some(Opcode::Select));
    }

    #[test]
    fn shapes_match_table() {
        assert_eq!(Opcode::I32Const.immediate_kind(), ImmediateKind::S32);
        assert_eq!(Opcode::BrTable.immediate_kind(), ImmediateKind::BrTable);
        assert_eq!(Opcode::I8x16Shuffle.immediate_kind(), ImmediateKind::Shuffle);
        assert_eq!(Opcode::Let.immediate_kind(), ImmediateKind::Let);
        assert_eq!(
            Opcode::I8x16ExtractLaneS.immediate_kind(),
            ImmediateKind::SimdLane
        );
    }

    #[test]
    fn feature_gates() {
        assert_eq!(Opcode::V128Const.required_feature(), Feature::Simd);
        assert_eq!(Opcode::MemoryCopy.required_feature(), Feature::BulkMemory);
        assert_eq!(Opcode::I32AtomicLoad.required_feature(), Feature::Threads);
        assert_eq!(Opcode::BrOnExn.required_feature(), Feature::Exceptions);
        assert_eq!(Opcode::I32Add.required_feature(), Feature::Mvp);
    }

    #[test]
    fn block_starters() {
        assert!(Opcode::Block.starts_block());
        assert!(Opcode::Try.starts_block());
        assert!(Opcode::Let.starts_block());
        assert!(!Opcode::End.starts_block());
        assert!(!Opcode::I32Add.starts_block());
    }
}
