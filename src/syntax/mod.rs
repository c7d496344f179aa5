//! The unified module tree shared by both front-ends.
//!
//! The binary reader and the text parser produce the same types despite their
//! very different surface syntaxes; formatters, the validator, and the tools
//! all traverse this representation. Values are created by a reader and never
//! mutated afterwards.

pub mod custom;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod types;

pub use instruction::{Expression, Immediate, Instruction, MemArg};
pub use module::{Module, ModuleItem, SectionId};
pub use opcode::{ImmediateKind, Opcode};
pub use types::{BlockType, FunctionType, ValueType, Var};
