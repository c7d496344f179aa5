//! Validator entry: a visitor over the module tree.
//!
//! [`visit`] drives a [`Visitor`] over every item in order, with begin/end
//! hooks around the module, and returns `false` iff the visitor emitted a
//! diagnostic. [`ValidateVisitor`] implements the structural half of
//! validation: index-space bookkeeping and range checks for every
//! cross-reference the tree can express. Full operand-stack typing is a
//! separate concern and not implemented here.

use crate::error::{ErrorSink, Location};
use crate::features::Features;
use crate::syntax::instruction::{Expression, Immediate, Instruction};
use crate::syntax::module::{
    Code, DataSegment, ElementItems, ElementSegment, Event, Export, ExternalKind, Function,
    Global, Import, ImportDesc, Module, ModuleItem, Start, Table, TypeEntry,
};
use crate::syntax::types::{FunctionType, TypeUse, Var};
use crate::syntax::Opcode;

/// Item hooks, called in module order. All default to no-ops so a visitor
/// implements only what it cares about.
pub trait Visitor {
    fn begin_module(&mut self, _module: &Module) {}
    fn visit_type(&mut self, _entry: &TypeEntry) {}
    fn visit_import(&mut self, _import: &Import) {}
    fn visit_function(&mut self, _function: &Function) {}
    fn visit_table(&mut self, _table: &Table) {}
    fn visit_memory(&mut self, _memory: &crate::syntax::module::Memory) {}
    fn visit_global(&mut self, _global: &Global) {}
    fn visit_export(&mut self, _export: &Export) {}
    fn visit_start(&mut self, _start: &Start) {}
    fn visit_element(&mut self, _segment: &ElementSegment) {}
    fn visit_data(&mut self, _segment: &DataSegment) {}
    fn visit_data_count(&mut self, _count: u32) {}
    fn visit_code(&mut self, _code: &Code) {}
    fn visit_event(&mut self, _event: &Event) {}
    fn end_module(&mut self, _module: &Module) {}

    /// Whether this visitor emitted a diagnostic. Drives [`visit`]'s return
    /// value; purely observational visitors keep the default.
    fn failed(&self) -> bool {
        false
    }
}

/// Drives `visitor` over `module`; `false` iff the visitor emitted a
/// diagnostic.
pub fn visit(module: &Module, visitor: &mut dyn Visitor) -> bool {
    visitor.begin_module(module);
    for item in &module.items {
        match item {
            ModuleItem::Type(entry) => visitor.visit_type(entry),
            ModuleItem::Import(import) => visitor.visit_import(import),
            ModuleItem::Function(function) => visitor.visit_function(function),
            ModuleItem::Table(table) => visitor.visit_table(table),
            ModuleItem::Memory(memory) => visitor.visit_memory(memory),
            ModuleItem::Global(global) => visitor.visit_global(global),
            ModuleItem::Export(export) => visitor.visit_export(export),
            ModuleItem::Start(start) => visitor.visit_start(start),
            ModuleItem::Element(segment) => visitor.visit_element(segment),
            ModuleItem::Data(segment) => visitor.visit_data(segment),
            ModuleItem::DataCount(count) => visitor.visit_data_count(*count),
            ModuleItem::Code(code) => visitor.visit_code(code),
            ModuleItem::Event(event) => visitor.visit_event(event),
        }
    }
    visitor.end_module(module);
    !visitor.failed()
}

/// Validates `module` structurally; `false` iff a diagnostic was emitted.
pub fn validate(module: &Module, features: Features, errors: &dyn ErrorSink) -> bool {
    let mut visitor = ValidateVisitor::new(module, features, errors);
    visit(module, &mut visitor)
}

/// Index-space sizes gathered in a prepass, so forward references within the
/// item list check correctly.
#[derive(Debug, Default)]
struct IndexSpaces {
    types: Vec<FunctionType>,
    functions: u32,
    tables: u32,
    memories: u32,
    globals: u32,
    events: u32,
    elements: u32,
    data_segments: u32,
    declared_data_count: Option<u32>,
}

impl IndexSpaces {
    fn collect(module: &Module) -> Self {
        let mut spaces = IndexSpaces::default();
        for item in &module.items {
            match item {
                ModuleItem::Type(entry) => spaces.types.push(entry.ty.unbind()),
                ModuleItem::Import(import) => match import.desc {
                    ImportDesc::Function(_) => spaces.functions += 1,
                    ImportDesc::Table(_) => spaces.tables += 1,
                    ImportDesc::Memory(_) => spaces.memories += 1,
                    ImportDesc::Global(_) => spaces.globals += 1,
                    ImportDesc::Event(_) => spaces.events += 1,
                },
                ModuleItem::Function(_) => spaces.functions += 1,
                ModuleItem::Table(_) => spaces.tables += 1,
                ModuleItem::Memory(_) => spaces.memories += 1,
                ModuleItem::Global(_) => spaces.globals += 1,
                ModuleItem::Element(_) => spaces.elements += 1,
                ModuleItem::Data(_) => spaces.data_segments += 1,
                ModuleItem::DataCount(count) => spaces.declared_data_count = Some(*count),
                ModuleItem::Event(_) => spaces.events += 1,
                _ => {}
            }
        }
        spaces
    }
}

/// The structural validator.
pub struct ValidateVisitor<'a> {
    errors: &'a dyn ErrorSink,
    #[allow(dead_code)]
    features: Features,
    spaces: IndexSpaces,
    /// Locals (params included) of the function currently being checked.
    current_locals: u32,
    failed: bool,
}

impl<'a> ValidateVisitor<'a> {
    pub fn new(module: &Module, features: Features, errors: &'a dyn ErrorSink) -> Self {
        Self {
            errors,
            features,
            spaces: IndexSpaces::collect(module),
            current_locals: 0,
            failed: false,
        }
    }

    fn error(&mut self, message: &str) {
        self.failed = true;
        self.errors.on_error(Location::default(), message);
    }

    fn check_index(&mut self, var: &Var, limit: u32, what: &str) {
        match var {
            Var::Index(index) if *index < limit => {}
            Var::Index(index) => {
                self.error(&format!(
                    "{} index {} out of range (max {})",
                    what, index, limit
                ));
            }
            Var::Name(name, _) => {
                self.error(&format!("unresolved {} reference: ${}", what, name));
            }
        }
    }

    fn check_type_use(&mut self, type_use: &TypeUse) {
        if let Some(index) = &type_use.index {
            self.check_index(index, self.spaces.types.len() as u32, "type");
        }
    }

    fn signature(&self, type_use: &TypeUse) -> Option<FunctionType> {
        match &type_use.index {
            Some(Var::Index(index)) => self.spaces.types.get(*index as usize).cloned(),
            Some(Var::Name(..)) => None,
            None => Some(type_use.ty.unbind()),
        }
    }

    /// Instruction-level index checks. Labels were depth-checked at decode
    /// time for text input; binary labels are depth-valid by construction of
    /// the nesting decoder, so only item-space references are checked here.
    fn check_instruction(&mut self, instruction: &Instruction) {
        let functions = self.spaces.functions;
        let globals = self.spaces.globals;
        let tables = self.spaces.tables;
        let events = self.spaces.events;
        let elements = self.spaces.elements;
        let data_segments = self.spaces.data_segments;
        match (&instruction.opcode, &instruction.immediate) {
            (Opcode::Call | Opcode::ReturnCall | Opcode::RefFunc, Immediate::Index(var)) => {
                self.check_index(var, functions, "function");
            }
            (Opcode::LocalGet | Opcode::LocalSet | Opcode::LocalTee, Immediate::Index(var)) => {
                let limit = self.current_locals;
                self.check_index(var, limit, "local");
            }
            (Opcode::GlobalGet | Opcode::GlobalSet, Immediate::Index(var)) => {
                self.check_index(var, globals, "global");
            }
            (Opcode::Throw, Immediate::Index(var)) => {
                self.check_index(var, events, "event");
            }
            (
                Opcode::TableGet
                | Opcode::TableSet
                | Opcode::TableGrow
                | Opcode::TableSize
                | Opcode::TableFill,
                Immediate::Index(var),
            ) => {
                self.check_index(var, tables, "table");
            }
            (Opcode::DataDrop, Immediate::Index(var)) => {
                self.check_index(var, data_segments, "data segment");
            }
            (Opcode::ElemDrop, Immediate::Index(var)) => {
                self.check_index(var, elements, "element segment");
            }
            (_, Immediate::CallIndirect { type_use, table }) => {
                let type_use = type_use.clone();
                self.check_type_use(&type_use);
                self.check_index(table, tables, "table");
            }
            (_, Immediate::BrOnExn { event, .. }) => {
                self.check_index(event, events, "event");
            }
            (Opcode::TableInit, Immediate::Init { segment, dst }) => {
                self.check_index(segment, elements, "element segment");
                self.check_index(dst, tables, "table");
            }
            (Opcode::MemoryInit, Immediate::Init { segment, .. }) => {
                self.check_index(segment, data_segments, "data segment");
            }
            (Opcode::TableCopy, Immediate::Copy { dst, src }) => {
                self.check_index(dst, tables, "table");
                self.check_index(src, tables, "table");
            }
            _ => {}
        }
    }

    fn check_expression(&mut self, expression: &Expression) {
        for instruction in expression {
            self.check_instruction(instruction);
        }
    }

    /// Init expressions allow only constants and a final `end`.
    fn check_constant_expression(&mut self, expression: &Expression, what: &str) {
        for instruction in expression {
            match instruction.opcode {
                Opcode::I32Const
                | Opcode::I64Const
                | Opcode::F32Const
                | Opcode::F64Const
                | Opcode::V128Const
                | Opcode::RefNull
                | Opcode::RefFunc
                | Opcode::GlobalGet
                | Opcode::End => {}
                other => {
                    self.error(&format!(
                        "non-constant instruction in {}: {}",
                        what, other
                    ));
                }
            }
            self.check_instruction(instruction);
        }
    }
}

impl Visitor for ValidateVisitor<'_> {
    fn visit_import(&mut self, import: &Import) {
        match &import.desc {
            ImportDesc::Function(type_use) => self.check_type_use(type_use),
            ImportDesc::Event(event_type) => self.check_type_use(&event_type.type_use),
            _ => {}
        }
    }

    fn visit_function(&mut self, function: &Function) {
        self.check_type_use(&function.type_use);

        let params = self
            .signature(&function.type_use)
            .map(|ty| ty.params.len() as u32)
            .unwrap_or(0);
        let locals: u32 = function.locals.iter().map(|run| run.count).sum();
        self.current_locals = params + locals;

        self.check_expression(&function.body);

        match function.body.last() {
            Some(last) if last.opcode == Opcode::End => {}
            _ => self.error("function body must end with `end`"),
        }
    }

    fn visit_global(&mut self, global: &Global) {
        self.check_constant_expression(&global.init, "global initialiser");
    }

    fn visit_export(&mut self, export: &Export) {
        let limit = match export.kind {
            ExternalKind::Function => self.spaces.functions,
            ExternalKind::Table => self.spaces.tables,
            ExternalKind::Memory => self.spaces.memories,
            ExternalKind::Global => self.spaces.globals,
            ExternalKind::Event => self.spaces.events,
        };
        self.check_index(&export.index, limit, export.kind.name());
    }

    fn visit_start(&mut self, start: &Start) {
        self.check_index(&start.func, self.spaces.functions, "start function");
    }

    fn visit_element(&mut self, segment: &ElementSegment) {
        if let Some(table) = &segment.table {
            self.check_index(table, self.spaces.tables, "table");
        }
        if let Some(offset) = &segment.offset {
            self.check_constant_expression(offset, "element offset");
        }
        match &segment.items {
            ElementItems::Functions(vars) => {
                for var in vars {
                    self.check_index(var, self.spaces.functions, "function");
                }
            }
            ElementItems::Expressions(exprs) => {
                for expr in exprs {
                    self.check_constant_expression(expr, "element expression");
                }
            }
        }
    }

    fn visit_data(&mut self, segment: &DataSegment) {
        if let Some(memory) = &segment.memory {
            self.check_index(memory, self.spaces.memories, "memory");
        }
        if let Some(offset) = &segment.offset {
            self.check_constant_expression(offset, "data offset");
        }
    }

    fn visit_data_count(&mut self, count: u32) {
        if count != self.spaces.data_segments {
            self.error(&format!(
                "data count section declares {} segments, module has {}",
                count, self.spaces.data_segments
            ));
        }
    }

    fn visit_event(&mut self, event: &Event) {
        if event.ty.attribute != 0 {
            self.error(&format!("unknown event attribute: {}", event.ty.attribute));
        }
        self.check_type_use(&event.ty.type_use);
    }

    fn failed(&self) -> bool {
        self.failed
    }
}
