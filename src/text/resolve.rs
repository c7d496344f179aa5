//! Post-parse name resolution.
//!
//! The parser leaves module-level references symbolic so that forward
//! references work in a single streaming pass; once every declaration has
//! claimed its index this pass rewrites `Var::Name` to `Var::Index`
//! everywhere. Labels and locals are lexically scoped and were already
//! resolved during parsing. Undefined names are diagnosed at the source
//! location the name carries and left symbolic; the module stays
//! best-effort.

use super::parser::{index_space, Context, IndexSpace};
use crate::syntax::instruction::{Expression, Immediate, Instruction};
use crate::syntax::module::{ExternalKind, Module, ModuleItem};
use crate::syntax::types::{TypeUse, Var};

pub fn resolve(module: &mut Module, ctx: &Context<'_>) {
    for item in &mut module.items {
        match item {
            ModuleItem::Type(_) | ModuleItem::DataCount(_) => {}
            ModuleItem::Import(import) => {
                use crate::syntax::module::ImportDesc;
                match &mut import.desc {
                    ImportDesc::Function(type_use) => resolve_type_use(type_use, ctx),
                    ImportDesc::Event(event_type) => resolve_type_use(&mut event_type.type_use, ctx),
                    ImportDesc::Table(_) | ImportDesc::Memory(_) | ImportDesc::Global(_) => {}
                }
            }
            ModuleItem::Function(function) => {
                resolve_type_use(&mut function.type_use, ctx);
                resolve_expression(&mut function.body, ctx);
            }
            ModuleItem::Table(_) | ModuleItem::Memory(_) => {}
            ModuleItem::Global(global) => resolve_expression(&mut global.init, ctx),
            ModuleItem::Export(export) => {
                let space = match export.kind {
                    ExternalKind::Function => IndexSpace::Function,
                    ExternalKind::Table => IndexSpace::Table,
                    ExternalKind::Memory => IndexSpace::Memory,
                    ExternalKind::Global => IndexSpace::Global,
                    ExternalKind::Event => IndexSpace::Event,
                };
                resolve_var(&mut export.index, space, ctx);
            }
            ModuleItem::Start(start) => resolve_var(&mut start.func, IndexSpace::Function, ctx),
            ModuleItem::Element(segment) => {
                if let Some(table) = &mut segment.table {
                    resolve_var(table, IndexSpace::Table, ctx);
                }
                if let Some(offset) = &mut segment.offset {
                    resolve_expression(offset, ctx);
                }
                match &mut segment.items {
                    crate::syntax::module::ElementItems::Functions(vars) => {
                        for var in vars {
                            resolve_var(var, IndexSpace::Function, ctx);
                        }
                    }
                    crate::syntax::module::ElementItems::Expressions(exprs) => {
                        for expr in exprs {
                            resolve_expression(expr, ctx);
                        }
                    }
                }
            }
            ModuleItem::Data(segment) => {
                if let Some(memory) = &mut segment.memory {
                    resolve_var(memory, IndexSpace::Memory, ctx);
                }
                if let Some(offset) = &mut segment.offset {
                    resolve_expression(offset, ctx);
                }
            }
            ModuleItem::Code(code) => resolve_expression(&mut code.body, ctx),
            ModuleItem::Event(event) => resolve_type_use(&mut event.ty.type_use, ctx),
        }
    }
}

fn resolve_expression(expression: &mut Expression, ctx: &Context<'_>) {
    for instruction in expression {
        resolve_instruction(instruction, ctx);
    }
}

fn resolve_instruction(instruction: &mut Instruction, ctx: &Context<'_>) {
    let opcode = instruction.opcode;
    match &mut instruction.immediate {
        Immediate::Index(var) => resolve_var(var, index_space(opcode), ctx),
        Immediate::BrOnExn { event, .. } => resolve_var(event, IndexSpace::Event, ctx),
        Immediate::CallIndirect { type_use, table } => {
            resolve_type_use(type_use, ctx);
            resolve_var(table, IndexSpace::Table, ctx);
        }
        Immediate::Copy { dst, src } => {
            let space = copy_space(opcode);
            resolve_var(dst, space, ctx);
            resolve_var(src, space, ctx);
        }
        Immediate::Init { segment, dst } => {
            let (segment_space, dst_space) = init_spaces(opcode);
            resolve_var(segment, segment_space, ctx);
            resolve_var(dst, dst_space, ctx);
        }
        _ => {}
    }
}

fn copy_space(opcode: crate::syntax::Opcode) -> IndexSpace {
    match opcode {
        crate::syntax::Opcode::TableCopy => IndexSpace::Table,
        _ => IndexSpace::Memory,
    }
}

fn init_spaces(opcode: crate::syntax::Opcode) -> (IndexSpace, IndexSpace) {
    match opcode {
        crate::syntax::Opcode::TableInit => (IndexSpace::Elem, IndexSpace::Table),
        _ => (IndexSpace::Data, IndexSpace::Memory),
    }
}

fn resolve_type_use(type_use: &mut TypeUse, ctx: &Context<'_>) {
    if let Some(index) = &mut type_use.index {
        resolve_var(index, IndexSpace::Type, ctx);
    }
}

fn resolve_var(var: &mut Var, space: IndexSpace, ctx: &Context<'_>) {
    let Var::Name(name, location) = var else { return };
    match ctx.names(space).get(name) {
        Some(index) => *var = Var::Index(index),
        None => ctx.errors.on_error(
            *location,
            &format!("undefined {}: ${}", space.describe(), name),
        ),
    }
}
