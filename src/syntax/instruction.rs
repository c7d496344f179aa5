//! Instructions: an opcode paired with exactly one immediate.
//!
//! The pairing is constrained by the opcode table: [`Immediate::kind`] must
//! equal [`Opcode::immediate_kind`]. [`Instruction::new`] asserts this in
//! debug builds; both front-ends construct immediates by dispatching on the
//! table, so the invariant holds by construction.

use super::opcode::{ImmediateKind, Opcode};
use super::types::{BlockType, HeapType, Locals, TypeUse, ValueType, Var};
use crate::error::Location;
use fhex::ToHex;
use std::fmt;

/// Alignment and offset for a memory access.
///
/// `align_log2` is the encoded log2 alignment hint; the reader accepts any
/// LEB128 value here and leaves range checking to validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemArg {
    pub align_log2: u32,
    pub offset: u32,
}

/// The immediate operand attached to an instruction.
///
/// Equality compares floats bitwise: two modules agree only when their
/// constants carry the same bits, NaN payloads and zero signs included.
#[derive(Debug, Clone)]
pub enum Immediate {
    None,
    S32(i32),
    S64(i64),
    F32(f32),
    F64(f64),
    V128([u8; 16]),
    Index(Var),
    Block(BlockType),
    BrOnExn { label: Var, event: Var },
    BrTable { targets: Vec<Var>, default: Var },
    CallIndirect { type_use: TypeUse, table: Var },
    Copy { dst: Var, src: Var },
    Init { segment: Var, dst: Var },
    Let { block_type: BlockType, locals: Vec<Locals> },
    MemArg(MemArg),
    HeapType(HeapType),
    SelectTypes(Vec<ValueType>),
    Shuffle([u8; 16]),
    SimdLane(u8),
}

impl PartialEq for Immediate {
    fn eq(&self, other: &Self) -> bool {
        use Immediate::*;
        match (self, other) {
            (None, None) => true,
            (S32(a), S32(b)) => a == b,
            (S64(a), S64(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (F64(a), F64(b)) => a.to_bits() == b.to_bits(),
            (V128(a), V128(b)) => a == b,
            (Index(a), Index(b)) => a == b,
            (Block(a), Block(b)) => a == b,
            (
                BrOnExn { label: a, event: b },
                BrOnExn { label: c, event: d },
            ) => a == c && b == d,
            (
                BrTable { targets: a, default: b },
                BrTable { targets: c, default: d },
            ) => a == c && b == d,
            (
                CallIndirect { type_use: a, table: b },
                CallIndirect { type_use: c, table: d },
            ) => a == c && b == d,
            (Copy { dst: a, src: b }, Copy { dst: c, src: d }) => a == c && b == d,
            (
                Init { segment: a, dst: b },
                Init { segment: c, dst: d },
            ) => a == c && b == d,
            (
                Let { block_type: a, locals: b },
                Let { block_type: c, locals: d },
            ) => a == c && b == d,
            (MemArg(a), MemArg(b)) => a == b,
            (HeapType(a), HeapType(b)) => a == b,
            (SelectTypes(a), SelectTypes(b)) => a == b,
            (Shuffle(a), Shuffle(b)) => a == b,
            (SimdLane(a), SimdLane(b)) => a == b,
            _ => false,
        }
    }
}

impl Immediate {
    pub fn kind(&self) -> ImmediateKind {
        match self {
            Immediate::None => ImmediateKind::None,
            Immediate::S32(_) => ImmediateKind::S32,
            Immediate::S64(_) => ImmediateKind::S64,
            Immediate::F32(_) => ImmediateKind::F32,
            Immediate::F64(_) => ImmediateKind::F64,
            Immediate::V128(_) => ImmediateKind::V128,
            Immediate::Index(_) => ImmediateKind::Index,
            Immediate::Block(_) => ImmediateKind::Block,
            Immediate::BrOnExn { .. } => ImmediateKind::BrOnExn,
            Immediate::BrTable { .. } => ImmediateKind::BrTable,
            Immediate::CallIndirect { .. } => ImmediateKind::CallIndirect,
            Immediate::Copy { .. } => ImmediateKind::Copy,
            Immediate::Init { .. } => ImmediateKind::Init,
            Immediate::Let { .. } => ImmediateKind::Let,
            Immediate::MemArg(_) => ImmediateKind::MemArg,
            Immediate::HeapType(_) => ImmediateKind::HeapType,
            Immediate::SelectTypes(_) => ImmediateKind::SelectTypes,
            Immediate::Shuffle(_) => ImmediateKind::Shuffle,
            Immediate::SimdLane(_) => ImmediateKind::SimdLane,
        }
    }
}

/// One decoded instruction.
///
/// `location` is the byte span of the instruction in its front-end's input.
/// Equality compares opcode and immediate only, so that modules decoded from
/// different surface forms compare equal when they mean the same thing.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub immediate: Immediate,
    pub location: Location,
}

impl Instruction {
    pub fn new(opcode: Opcode, immediate: Immediate) -> Self {
        debug_assert_eq!(
            immediate.kind(),
            opcode.immediate_kind(),
            "immediate shape mismatch for {}",
            opcode
        );
        Self {
            opcode,
            immediate,
            location: Location::default(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// A bare instruction with no immediate.
    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, Immediate::None)
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.opcode == other.opcode && self.immediate == other.immediate
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match &self.immediate {
            Immediate::None => Ok(()),
            Immediate::S32(v) => write!(f, " {}", v),
            Immediate::S64(v) => write!(f, " {}", v),
            Immediate::F32(v) => write!(f, " {}", v.to_hex()),
            Immediate::F64(v) => write!(f, " {}", v.to_hex()),
            Immediate::V128(bytes) => {
                write!(f, " 0x")?;
                for b in bytes.iter().rev() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Immediate::Index(var) => write!(f, " {}", var),
            Immediate::Block(bt) => write!(f, " {}", bt),
            Immediate::BrOnExn { label, event } => write!(f, " {} {}", label, event),
            Immediate::BrTable { targets, default } => {
                for t in targets {
                    write!(f, " {}", t)?;
                }
                write!(f, " {}", default)
            }
            Immediate::CallIndirect { type_use, table } => {
                match &type_use.index {
                    Some(index) => write!(f, " {} {}", index, table),
                    None => write!(f, " {} {}", type_use.ty.unbind(), table),
                }
            }
            Immediate::Copy { dst, src } => write!(f, " {} {}", dst, src),
            Immediate::Init { segment, dst } => write!(f, " {} {}", segment, dst),
            Immediate::Let { block_type, locals } => {
                write!(f, " {}", block_type)?;
                for l in locals {
                    write!(f, " {} {}", l.count, l.value_type)?;
                }
                Ok(())
            }
            Immediate::MemArg(m) => write!(f, " align={} offset={}", m.align_log2, m.offset),
            Immediate::HeapType(h) => write!(f, " {}", h),
            Immediate::SelectTypes(types) => {
                for t in types {
                    write!(f, " {}", t)?;
                }
                Ok(())
            }
            Immediate::Shuffle(lanes) => {
                for l in lanes {
                    write!(f, " {}", l)?;
                }
                Ok(())
            }
            Immediate::SimdLane(lane) => write!(f, " {}", lane),
        }
    }
}

/// A decoded instruction sequence (a function body or an init expression),
/// terminated by an `end` instruction.
pub type Expression = Vec<Instruction>;
