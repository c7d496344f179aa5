//! Text rendering of the module tree.
//!
//! [`wat`] produces a deterministic, parseable rendering: feeding it back
//! through [`crate::text::parse`] yields a semantically equal module. Bodies
//! print in plain linear form (blocks closed by `end`); the trailing `end`
//! of each body or init expression is implicit in the text grammar and is
//! therefore omitted.

use crate::syntax::instruction::{Immediate, Instruction};
use crate::syntax::module::{
    DataSegment, ElementItems, ElementSegment, Export, Function, Global, Import, ImportDesc,
    Module, ModuleItem, TypeEntry,
};
use crate::syntax::opcode::Opcode;
use crate::syntax::types::{
    BlockType, BoundFunctionType, HeapKind, HeapType, Limits, Mutability, RefType, ReferenceType,
    SegmentType, Shared, TypeUse, ValueType, Var,
};
use std::fmt::Write;

/// Renders a materialised module as parseable text.
pub fn wat(module: &Module) -> String {
    let mut out = String::new();
    match &module.name {
        Some(name) => _ = writeln!(out, "(module ${}", name),
        None => out.push_str("(module\n"),
    }
    for item in &module.items {
        write_item(&mut out, item);
    }
    out.push_str(")\n");
    out
}

fn write_item(out: &mut String, item: &ModuleItem) {
    match item {
        ModuleItem::Type(entry) => write_type_entry(out, entry),
        ModuleItem::Import(import) => write_import(out, import),
        ModuleItem::Function(function) => write_function(out, function),
        ModuleItem::Table(table) => {
            out.push_str("  (table ");
            write_name_opt(out, &table.name);
            write_limits(out, &table.ty.limits);
            out.push(' ');
            write_reference_type(out, table.ty.element);
            out.push_str(")\n");
        }
        ModuleItem::Memory(memory) => {
            out.push_str("  (memory ");
            write_name_opt(out, &memory.name);
            write_limits(out, &memory.ty.limits);
            out.push_str(")\n");
        }
        ModuleItem::Global(global) => write_global(out, global),
        ModuleItem::Export(export) => write_export(out, export),
        ModuleItem::Start(start) => {
            _ = writeln!(out, "  (start {})", var(&start.func));
        }
        ModuleItem::Element(segment) => write_element(out, segment),
        ModuleItem::Data(segment) => write_data(out, segment),
        // The data count is implicit in the text format.
        ModuleItem::DataCount(_) => {}
        // Bare code entries only exist in unmerged binary views.
        ModuleItem::Code(_) => {}
        ModuleItem::Event(event) => {
            out.push_str("  (event ");
            write_name_opt(out, &event.name);
            write_type_use(out, &event.ty.type_use);
            out.push_str(")\n");
        }
    }
}

fn write_name_opt(out: &mut String, name: &Option<String>) {
    if let Some(name) = name {
        _ = write!(out, "${} ", name);
    }
}

fn var(v: &Var) -> String {
    format!("{}", v)
}

fn write_type_entry(out: &mut String, entry: &TypeEntry) {
    out.push_str("  (type ");
    write_name_opt(out, &entry.name);
    out.push_str("(func");
    write_signature(out, &entry.ty);
    out.push_str("))\n");
}

fn write_signature(out: &mut String, ty: &BoundFunctionType) {
    for param in &ty.params {
        match &param.name {
            Some(name) => _ = write!(out, " (param ${} ", name),
            None => out.push_str(" (param "),
        }
        write_value_type(out, param.value_type);
        out.push(')');
    }
    if !ty.results.is_empty() {
        out.push_str(" (result");
        for result in &ty.results {
            out.push(' ');
            write_value_type(out, *result);
        }
        out.push(')');
    }
}

fn write_type_use(out: &mut String, type_use: &TypeUse) {
    if let Some(index) = &type_use.index {
        _ = write!(out, "(type {})", var(index));
    }
    write_signature(out, &type_use.ty);
}

fn write_value_type(out: &mut String, value_type: ValueType) {
    match value_type {
        ValueType::Numeric(n) => _ = write!(out, "{}", n),
        ValueType::Reference(r) => write_reference_type(out, r),
    }
}

fn write_reference_type(out: &mut String, reference: ReferenceType) {
    match reference {
        ReferenceType::Kind(kind) => _ = write!(out, "{}", kind),
        ReferenceType::Ref(RefType { null, heap }) => {
            out.push_str("(ref ");
            if null {
                out.push_str("null ");
            }
            write_heap_type(out, heap);
            out.push(')');
        }
    }
}

fn write_heap_type(out: &mut String, heap: HeapType) {
    match heap {
        HeapType::Kind(HeapKind::Func) => out.push_str("func"),
        HeapType::Kind(kind) => _ = write!(out, "{}", kind),
        HeapType::Index(index) => _ = write!(out, "{}", index),
    }
}

fn write_limits(out: &mut String, limits: &Limits) {
    _ = write!(out, "{}", limits.min);
    if let Some(max) = limits.max {
        _ = write!(out, " {}", max);
    }
    if limits.shared == Shared::Yes {
        out.push_str(" shared");
    }
}

fn write_import(out: &mut String, import: &Import) {
    _ = write!(
        out,
        "  (import {} {} (",
        quote(import.module.as_bytes()),
        quote(import.field.as_bytes())
    );
    match &import.desc {
        ImportDesc::Function(type_use) => {
            out.push_str("func ");
            write_name_opt(out, &import.name);
            write_type_use(out, type_use);
        }
        ImportDesc::Table(ty) => {
            out.push_str("table ");
            write_name_opt(out, &import.name);
            write_limits(out, &ty.limits);
            out.push(' ');
            write_reference_type(out, ty.element);
        }
        ImportDesc::Memory(ty) => {
            out.push_str("memory ");
            write_name_opt(out, &import.name);
            write_limits(out, &ty.limits);
        }
        ImportDesc::Global(ty) => {
            out.push_str("global ");
            write_name_opt(out, &import.name);
            match ty.mutability {
                Mutability::Const => write_value_type(out, ty.value_type),
                Mutability::Var => {
                    out.push_str("(mut ");
                    write_value_type(out, ty.value_type);
                    out.push(')');
                }
            }
        }
        ImportDesc::Event(ty) => {
            out.push_str("event ");
            write_name_opt(out, &import.name);
            write_type_use(out, &ty.type_use);
        }
    }
    out.push_str("))\n");
}

fn write_export(out: &mut String, export: &Export) {
    _ = writeln!(
        out,
        "  (export {} ({} {}))",
        quote(export.name.as_bytes()),
        export.kind,
        var(&export.index)
    );
}

fn write_function(out: &mut String, function: &Function) {
    out.push_str("  (func ");
    write_name_opt(out, &function.name);
    write_type_use(out, &function.type_use);
    for locals in &function.locals {
        for _ in 0..locals.count {
            out.push_str(" (local ");
            write_value_type(out, locals.value_type);
            out.push(')');
        }
    }
    out.push('\n');
    write_body(out, &function.body, 2);
    out.push_str("  )\n");
}

fn write_global(out: &mut String, global: &Global) {
    out.push_str("  (global ");
    write_name_opt(out, &global.name);
    match global.ty.mutability {
        Mutability::Const => write_value_type(out, global.ty.value_type),
        Mutability::Var => {
            out.push_str("(mut ");
            write_value_type(out, global.ty.value_type);
            out.push(')');
        }
    }
    out.push(' ');
    write_inline_expression(out, &global.init);
    out.push_str(")\n");
}

fn write_element(out: &mut String, segment: &ElementSegment) {
    out.push_str("  (elem ");
    write_name_opt(out, &segment.name);
    match segment.mode {
        SegmentType::Active => {
            if let Some(table) = &segment.table {
                if table.index() != Some(0) {
                    _ = write!(out, "(table {}) ", var(table));
                }
            }
            if let Some(offset) = &segment.offset {
                out.push_str("(offset ");
                write_inline_expression(out, offset);
                out.push_str(") ");
            }
        }
        SegmentType::Passive => {}
        SegmentType::Declared => out.push_str("declare "),
    }
    match &segment.items {
        ElementItems::Functions(funcs) => {
            out.push_str("func");
            for func in funcs {
                _ = write!(out, " {}", var(func));
            }
        }
        ElementItems::Expressions(exprs) => {
            write_reference_type(out, segment.element_type);
            for expr in exprs {
                out.push_str(" (item ");
                write_inline_expression(out, expr);
                out.push(')');
            }
        }
    }
    out.push_str(")\n");
}

fn write_data(out: &mut String, segment: &DataSegment) {
    out.push_str("  (data ");
    write_name_opt(out, &segment.name);
    if segment.mode == SegmentType::Active {
        if let Some(memory) = &segment.memory {
            if memory.index() != Some(0) {
                _ = write!(out, "(memory {}) ", var(memory));
            }
        }
        if let Some(offset) = &segment.offset {
            out.push_str("(offset ");
            write_inline_expression(out, offset);
            out.push_str(") ");
        }
    }
    out.push_str(&quote(&segment.data));
    out.push_str(")\n");
}

/// An init expression on one line, without its trailing `end`.
fn write_inline_expression(out: &mut String, expression: &[Instruction]) {
    let body = trim_end_instruction(expression);
    for (i, instruction) in body.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_instruction(out, instruction);
    }
}

fn trim_end_instruction(expression: &[Instruction]) -> &[Instruction] {
    match expression.last() {
        Some(last) if last.opcode == Opcode::End => &expression[..expression.len() - 1],
        _ => expression,
    }
}

/// A body in linear form, indented by block depth.
fn write_body(out: &mut String, body: &[Instruction], base_indent: usize) {
    let body = trim_end_instruction(body);
    let mut depth: usize = 0;
    for instruction in body {
        let this_depth = match instruction.opcode {
            Opcode::End | Opcode::Else | Opcode::Catch => depth.saturating_sub(1),
            _ => depth,
        };
        for _ in 0..base_indent + this_depth {
            out.push_str("  ");
        }
        write_instruction(out, instruction);
        out.push('\n');

        if instruction.opcode.starts_block() {
            depth += 1;
        } else if instruction.opcode == Opcode::End {
            depth = depth.saturating_sub(1);
        }
    }
}

fn write_block_type(out: &mut String, block_type: &BlockType) {
    match block_type {
        BlockType::Void => {}
        BlockType::Value(value_type) => {
            out.push_str(" (result ");
            write_value_type(out, *value_type);
            out.push(')');
        }
        BlockType::TypeIndex(index) => _ = write!(out, " (type {})", index),
    }
}

fn write_instruction(out: &mut String, instruction: &Instruction) {
    _ = write!(out, "{}", instruction.opcode);
    match &instruction.immediate {
        Immediate::None => {}
        Immediate::S32(v) => _ = write!(out, " {}", v),
        Immediate::S64(v) => _ = write!(out, " {}", v),
        Immediate::F32(v) => _ = write!(out, " {}", float32(*v)),
        Immediate::F64(v) => _ = write!(out, " {}", float64(*v)),
        Immediate::V128(bytes) => {
            out.push_str(" i8x16");
            for byte in bytes {
                _ = write!(out, " {}", byte);
            }
        }
        Immediate::Index(v) => {
            // memory.size/grow/fill and atomic.fence spell no operand.
            if !matches!(
                instruction.opcode,
                Opcode::MemorySize
                    | Opcode::MemoryGrow
                    | Opcode::MemoryFill
                    | Opcode::AtomicFence
            ) {
                _ = write!(out, " {}", var(v));
            }
        }
        Immediate::Block(block_type) => write_block_type(out, block_type),
        Immediate::BrOnExn { label, event } => {
            _ = write!(out, " {} {}", var(label), var(event));
        }
        Immediate::BrTable { targets, default } => {
            for target in targets {
                _ = write!(out, " {}", var(target));
            }
            _ = write!(out, " {}", var(default));
        }
        Immediate::CallIndirect { type_use, table } => {
            if table.index() != Some(0) {
                _ = write!(out, " {}", var(table));
            }
            out.push(' ');
            write_type_use(out, type_use);
        }
        Immediate::Copy { dst, src } => {
            if instruction.opcode == Opcode::TableCopy
                && (dst.index() != Some(0) || src.index() != Some(0))
            {
                _ = write!(out, " {} {}", var(dst), var(src));
            }
        }
        Immediate::Init { segment, dst } => {
            if dst.index() != Some(0) {
                _ = write!(out, " {}", var(dst));
            }
            _ = write!(out, " {}", var(segment));
        }
        Immediate::Let { block_type, locals } => {
            write_block_type(out, block_type);
            for run in locals {
                for _ in 0..run.count {
                    out.push_str(" (local ");
                    write_value_type(out, run.value_type);
                    out.push(')');
                }
            }
        }
        Immediate::MemArg(mem_arg) => {
            if mem_arg.offset != 0 {
                _ = write!(out, " offset={}", mem_arg.offset);
            }
            if mem_arg.align_log2 != instruction.opcode.natural_alignment_log2() {
                _ = write!(out, " align={}", 1u64 << mem_arg.align_log2);
            }
        }
        Immediate::HeapType(heap) => {
            out.push(' ');
            write_heap_type(out, *heap);
        }
        Immediate::SelectTypes(types) => {
            if !types.is_empty() {
                out.push_str(" (result");
                for value_type in types {
                    out.push(' ');
                    write_value_type(out, *value_type);
                }
                out.push(')');
            }
        }
        Immediate::Shuffle(lanes) => {
            for lane in lanes {
                _ = write!(out, " {}", lane);
            }
        }
        Immediate::SimdLane(lane) => _ = write!(out, " {}", lane),
    }
}

/// A float rendering that survives re-parsing bit-exactly: shortest decimal
/// for finite values, `inf`, and `nan`/`nan:0x…` preserving payload bits.
fn float32(value: f32) -> String {
    if value.is_nan() {
        let bits = value.to_bits();
        let payload = bits & 0x7f_ffff;
        let sign = if bits & 0x8000_0000 != 0 { "-" } else { "" };
        if payload == 0x40_0000 {
            format!("{}nan", sign)
        } else {
            format!("{}nan:0x{:x}", sign, payload)
        }
    } else if value.is_infinite() {
        if value < 0.0 {
            "-inf".to_string()
        } else {
            "inf".to_string()
        }
    } else {
        format!("{}", value)
    }
}

fn float64(value: f64) -> String {
    if value.is_nan() {
        let bits = value.to_bits();
        let payload = bits & 0xf_ffff_ffff_ffff;
        let sign = if bits >> 63 != 0 { "-" } else { "" };
        if payload == 0x8_0000_0000_0000 {
            format!("{}nan", sign)
        } else {
            format!("{}nan:0x{:x}", sign, payload)
        }
    } else if value.is_infinite() {
        if value < 0.0 { "-inf".to_string() } else { "inf".to_string() }
    } else {
        format!("{}", value)
    }
}

/// Quotes bytes as a text-format string literal.
fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &byte in bytes {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            _ => _ = write!(out, "\\{:02x}", byte),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingErrors;
    use crate::features::Features;
    use crate::text;

    fn round_trip(source: &str) -> (Module, Module, String) {
        let errors = CollectingErrors::new();
        let first = text::parse(source, Features::all(), &errors).unwrap();
        assert!(errors.is_empty(), "{:?}", errors.diagnostics());

        let rendered = wat(&first);
        let errors = CollectingErrors::new();
        let second = text::parse(&rendered, Features::all(), &errors)
            .unwrap_or_else(|| panic!("rendered text failed to parse:\n{}", rendered));
        assert!(
            errors.is_empty(),
            "diagnostics on rendered text:\n{}\n{:?}",
            rendered,
            errors.diagnostics()
        );
        (first, second, rendered)
    }

    #[test]
    fn empty_module_round_trips() {
        let (first, second, _) = round_trip("(module)");
        assert_eq!(first, second);
    }

    #[test]
    fn function_round_trips() {
        let (first, second, _) = round_trip(
            "(module (func (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add))",
        );
        assert_eq!(first, second);
    }

    #[test]
    fn blocks_round_trip() {
        let (first, second, _) = round_trip(
            "(module (func (result i32)
                block (result i32)
                    i32.const 1
                    br 0
                end))",
        );
        assert_eq!(first, second);
    }

    #[test]
    fn if_else_round_trips() {
        let (first, second, _) = round_trip(
            "(module (func (param i32) (result i32)
                local.get 0
                if (result i32)
                    i32.const 1
                else
                    i32.const 2
                end))",
        );
        assert_eq!(first, second);
    }

    #[test]
    fn segments_round_trip() {
        let (first, second, _) = round_trip(
            r#"(module
                (func $f)
                (table 2 funcref)
                (memory 1)
                (elem (offset i32.const 0) func $f)
                (data (offset i32.const 8) "ab\00cd"))"#,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn imports_and_exports_round_trip() {
        let (first, second, _) = round_trip(
            r#"(module
                (import "env" "f" (func (param i32)))
                (import "env" "mem" (memory 1 4))
                (global (mut i64) (i64.const -1))
                (func $g)
                (export "g" (func $g))
                (export "mem2" (memory 0)))"#,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn float_immediates_round_trip() {
        let (first, second, rendered) = round_trip(
            "(module (func (result f64)
                f32.const -0.5
                drop
                f32.const nan:0x600001
                drop
                f64.const inf
                drop
                f64.const 1.5e300))",
        );
        assert_eq!(first, second, "rendered:\n{}", rendered);
    }

    #[test]
    fn memarg_round_trips() {
        let (first, second, _) = round_trip(
            "(module (memory 1) (func
                i32.const 0
                i64.load32_u offset=4 align=2
                drop))",
        );
        assert_eq!(first, second);
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote(b"ab"), "\"ab\"");
        assert_eq!(quote(b"a\"b"), "\"a\\\"b\"");
        assert_eq!(quote(&[0x00, 0xff]), "\"\\00\\ff\"");
    }

    #[test]
    fn nan_payload_formatting() {
        assert_eq!(float32(f32::from_bits(0x7fc0_0000)), "nan");
        assert_eq!(float32(f32::from_bits(0xffc0_0000)), "-nan");
        assert_eq!(float32(f32::from_bits(0x7fc0_0001)), "nan:0x400001");
        assert_eq!(float64(f64::NEG_INFINITY), "-inf");
    }
}
