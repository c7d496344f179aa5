//! Instruction and expression decoding.
//!
//! An opcode is a single byte, or a prefix byte (`0xfc`, `0xfd`, `0xfe`)
//! followed by a LEB128 code. The matched opcode's table row dictates its
//! feature gate and the immediate that follows. [`read_expression`] decodes a
//! whole body, tracking block nesting until the matching `end`.

use super::reader::Reader;
use super::values::{read_block_type, read_heap_type, read_value_type, ReadContext};
use crate::error::ErrorContext;
use crate::syntax::instruction::{Expression, Immediate, Instruction, MemArg};
use crate::syntax::opcode::{ImmediateKind, Opcode};
use crate::syntax::types::{Locals, TypeUse, Var};

const PREFIX_MISC: u8 = 0xfc;
const PREFIX_SIMD: u8 = 0xfd;
const PREFIX_ATOMIC: u8 = 0xfe;

pub fn read_instruction(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Instruction> {
    let start = reader.pos();
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "instruction");

    let byte = reader.read_byte(cx.errors, "opcode")?;
    let opcode = if matches!(byte, PREFIX_MISC | PREFIX_SIMD | PREFIX_ATOMIC) {
        let code = reader.read_u32_leb(cx.errors, "opcode")?;
        match Opcode::from_encoding(Some(byte), code) {
            Some(op) => op,
            None => {
                cx.errors.on_error(
                    reader.location_from(start),
                    &format!("unknown opcode: {:#04x} {:#04x}", byte, code),
                );
                return None;
            }
        }
    } else {
        match Opcode::from_encoding(None, byte as u32) {
            Some(op) => op,
            None => {
                cx.errors.on_error(
                    reader.location_from(start),
                    &format!("unknown opcode: {:#04x}", byte),
                );
                return None;
            }
        }
    };

    if !cx.features.allows(opcode.required_feature()) {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("instruction not allowed: {}", opcode),
        );
        return None;
    }

    let immediate = read_immediate(reader, cx, opcode)?;
    Some(Instruction::new(opcode, immediate).at(reader.location_from(start)))
}

fn read_immediate(
    reader: &mut Reader<'_>,
    cx: &ReadContext<'_>,
    opcode: Opcode,
) -> Option<Immediate> {
    let errors = cx.errors;
    match opcode.immediate_kind() {
        ImmediateKind::None => Some(Immediate::None),
        ImmediateKind::S32 => reader.read_s32_leb(errors, "i32 constant").map(Immediate::S32),
        ImmediateKind::S64 => reader.read_s64_leb(errors, "i64 constant").map(Immediate::S64),
        ImmediateKind::F32 => reader.read_f32(errors, "f32 constant").map(Immediate::F32),
        ImmediateKind::F64 => reader.read_f64(errors, "f64 constant").map(Immediate::F64),
        ImmediateKind::V128 => reader.read_v128(errors, "v128 constant").map(Immediate::V128),
        ImmediateKind::Index => {
            let index = reader.read_index(errors, "index")?;
            Some(Immediate::Index(Var::Index(index)))
        }
        ImmediateKind::Block => read_block_type(reader, cx).map(Immediate::Block),
        ImmediateKind::BrOnExn => {
            let label = reader.read_index(errors, "label index")?;
            let event = reader.read_index(errors, "event index")?;
            Some(Immediate::BrOnExn {
                label: Var::Index(label),
                event: Var::Index(event),
            })
        }
        ImmediateKind::BrTable => {
            let count = reader.read_count(errors)?;
            let mut targets = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                targets.push(Var::Index(reader.read_index(errors, "branch target")?));
            }
            let default = reader.read_index(errors, "default target")?;
            Some(Immediate::BrTable {
                targets,
                default: Var::Index(default),
            })
        }
        ImmediateKind::CallIndirect => {
            let type_index = reader.read_index(errors, "type index")?;
            // The table byte is reserved until reference-types gives it meaning.
            let table = if cx.features.reference_types {
                reader.read_index(errors, "table index")?
            } else {
                reader.read_reserved(errors)?
            };
            Some(Immediate::CallIndirect {
                type_use: TypeUse::by_index(type_index),
                table: Var::Index(table),
            })
        }
        ImmediateKind::Copy => {
            let dst = reader.read_index(errors, "destination index")?;
            let src = reader.read_index(errors, "source index")?;
            Some(Immediate::Copy {
                dst: Var::Index(dst),
                src: Var::Index(src),
            })
        }
        ImmediateKind::Init => {
            let segment = reader.read_index(errors, "segment index")?;
            let dst = reader.read_index(errors, "destination index")?;
            Some(Immediate::Init {
                segment: Var::Index(segment),
                dst: Var::Index(dst),
            })
        }
        ImmediateKind::Let => {
            let block_type = read_block_type(reader, cx)?;
            let count = reader.read_count(errors)?;
            let mut locals = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                let n = reader.read_u32_leb(errors, "locals count")?;
                let value_type = read_value_type(reader, cx)?;
                locals.push(Locals {
                    count: n,
                    value_type,
                });
            }
            Some(Immediate::Let { block_type, locals })
        }
        ImmediateKind::MemArg => {
            let align_log2 = reader.read_u32_leb(errors, "alignment")?;
            let offset = reader.read_u32_leb(errors, "offset")?;
            Some(Immediate::MemArg(MemArg { align_log2, offset }))
        }
        ImmediateKind::HeapType => read_heap_type(reader, cx).map(Immediate::HeapType),
        ImmediateKind::SelectTypes => {
            let count = reader.read_count(errors)?;
            let mut types = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                types.push(read_value_type(reader, cx)?);
            }
            Some(Immediate::SelectTypes(types))
        }
        ImmediateKind::Shuffle => reader.read_v128(errors, "shuffle lanes").map(Immediate::Shuffle),
        ImmediateKind::SimdLane => reader.read_byte(errors, "lane index").map(Immediate::SimdLane),
    }
}

/// Reads instructions up to and including the `end` that closes the
/// expression. Nested blocks are tracked; `else` and `catch` are legal only
/// inside a block.
pub fn read_expression(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Expression> {
    let mut instructions = Vec::new();
    let mut depth: u32 = 0;

    loop {
        let start = reader.pos();
        let instruction = read_instruction(reader, cx)?;
        let opcode = instruction.opcode;
        instructions.push(instruction);

        if opcode.starts_block() {
            depth += 1;
        } else if opcode == Opcode::End {
            if depth == 0 {
                return Some(instructions);
            }
            depth -= 1;
        } else if matches!(opcode, Opcode::Else | Opcode::Catch) && depth == 0 {
            cx.errors.on_error(
                reader.location_from(start),
                &format!("unmatched {}", opcode),
            );
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingErrors;
    use crate::features::Features;
    use crate::syntax::types::BlockType;
    use crate::syntax::ValueType;

    fn decode(bytes: &[u8], features: Features) -> (Option<Instruction>, CollectingErrors) {
        let errors = CollectingErrors::new();
        let result = {
            let cx = ReadContext::new(features, &errors);
            read_instruction(&mut Reader::new(bytes), &cx)
        };
        (result, errors)
    }

    #[test]
    fn bare_opcode() {
        let (instr, errors) = decode(&[0x01], Features::mvp());
        assert_eq!(instr, Some(Instruction::bare(Opcode::Nop)));
        assert!(errors.is_empty());
    }

    #[test]
    fn i32_const() {
        let (instr, _) = decode(&[0x41, 0x2a], Features::mvp());
        assert_eq!(
            instr,
            Some(Instruction::new(Opcode::I32Const, Immediate::S32(42)))
        );
        let (instr, _) = decode(&[0x41, 0x7f], Features::mvp());
        assert_eq!(
            instr,
            Some(Instruction::new(Opcode::I32Const, Immediate::S32(-1)))
        );
    }

    #[test]
    fn mem_arg() {
        let (instr, _) = decode(&[0x28, 0x02, 0x10], Features::mvp());
        assert_eq!(
            instr,
            Some(Instruction::new(
                Opcode::I32Load,
                Immediate::MemArg(MemArg {
                    align_log2: 2,
                    offset: 16
                })
            ))
        );
    }

    #[test]
    fn br_table() {
        let (instr, _) = decode(&[0x0e, 0x02, 0x00, 0x01, 0x02], Features::mvp());
        assert_eq!(
            instr,
            Some(Instruction::new(
                Opcode::BrTable,
                Immediate::BrTable {
                    targets: vec![Var::Index(0), Var::Index(1)],
                    default: Var::Index(2),
                }
            ))
        );
    }

    #[test]
    fn call_indirect_reserved_table() {
        // Non-zero table byte without reference-types is rejected.
        let (instr, errors) = decode(&[0x11, 0x00, 0x01], Features::mvp());
        assert_eq!(instr, None);
        assert!(errors.diagnostics()[0].message.contains("reserved"));

        // With reference-types it is a real table index.
        let (instr, _) = decode(&[0x11, 0x00, 0x01], Features::mvp().enable(crate::features::Feature::ReferenceTypes));
        assert_eq!(
            instr,
            Some(Instruction::new(
                Opcode::CallIndirect,
                Immediate::CallIndirect {
                    type_use: TypeUse::by_index(0),
                    table: Var::Index(1),
                }
            ))
        );
    }

    #[test]
    fn simd_gated() {
        // v128.const: prefix 0xfd, code 0x0c, 16 bytes payload.
        let mut bytes = vec![0xfd, 0x0c];
        bytes.extend_from_slice(&[0; 16]);

        let (instr, errors) = decode(&bytes, Features::mvp());
        assert_eq!(instr, None);
        assert!(errors.diagnostics()[0]
            .message
            .contains("instruction not allowed"));

        let (instr, errors) = decode(&bytes, Features::mvp().enable(crate::features::Feature::Simd));
        assert_eq!(
            instr,
            Some(Instruction::new(Opcode::V128Const, Immediate::V128([0; 16])))
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_prefixed_opcode() {
        let (instr, errors) = decode(&[0xfd, 0x9a], Features::all());
        assert_eq!(instr, None);
        assert!(errors.diagnostics()[0].message.contains("unknown opcode"));
    }

    #[test]
    fn select_with_types() {
        let (instr, _) = decode(
            &[0x1c, 0x01, 0x7f],
            Features::mvp().enable(crate::features::Feature::ReferenceTypes),
        );
        assert_eq!(
            instr,
            Some(Instruction::new(
                Opcode::SelectT,
                Immediate::SelectTypes(vec![ValueType::I32])
            ))
        );
    }

    #[test]
    fn expression_with_nesting() {
        // block (result i32) i32.const 1 end  end
        let bytes = [0x02, 0x7f, 0x41, 0x01, 0x0b, 0x0b];
        let errors = CollectingErrors::new();
        let cx = ReadContext::new(Features::mvp(), &errors);
        let expr = read_expression(&mut Reader::new(&bytes), &cx).unwrap();
        assert_eq!(expr.len(), 4);
        assert_eq!(expr[0].opcode, Opcode::Block);
        assert_eq!(expr[0].immediate, Immediate::Block(BlockType::Value(ValueType::I32)));
        assert_eq!(expr[3].opcode, Opcode::End);
    }

    #[test]
    fn expression_truncated() {
        let bytes = [0x02, 0x40, 0x41, 0x01];
        let errors = CollectingErrors::new();
        let cx = ReadContext::new(Features::mvp(), &errors);
        assert_eq!(read_expression(&mut Reader::new(&bytes), &cx), None);
        assert!(!errors.is_empty());
    }

    #[test]
    fn unmatched_else() {
        let bytes = [0x05];
        let errors = CollectingErrors::new();
        let cx = ReadContext::new(Features::mvp(), &errors);
        assert_eq!(read_expression(&mut Reader::new(&bytes), &cx), None);
        assert!(errors.diagnostics()[0].message.contains("unmatched"));
    }

    #[test]
    fn exceptions_gated() {
        // throw 0
        let (instr, errors) = decode(&[0x08, 0x00], Features::mvp());
        assert_eq!(instr, None);
        assert!(!errors.is_empty());

        let (instr, _) = decode(
            &[0x08, 0x00],
            Features::mvp().enable(crate::features::Feature::Exceptions),
        );
        assert_eq!(
            instr,
            Some(Instruction::new(
                Opcode::Throw,
                Immediate::Index(Var::Index(0))
            ))
        );
    }
}
