//! Recursive-descent parser for the text format.
//!
//! Consumes the token stream and produces the same module tree as the binary
//! front-end. Name bindings are collected into per-space [`NameMap`]s as
//! declarations are read; uses of names that may be forward references stay
//! symbolic ([`Var::Name`]) and are resolved by [`super::resolve`] once the
//! whole module has been read. Labels and locals are lexically scoped, so
//! those resolve on the spot.
//!
//! Inline sugar (imports, exports, table `elem`, memory `data`) is desugared
//! here into the same items the binary format carries. Folded expressions
//! flatten into linear instruction sequences with synthetic `end`s.

use super::numeric;
use super::token::{Keyword, Literal, SimdShape, Span, TokenKind};
use super::tokenizer::Tokenizer;
use crate::error::ErrorSink;
use crate::features::{Feature, Features};
use crate::syntax::instruction::{Expression, Immediate, Instruction, MemArg};
use crate::syntax::module::{
    DataSegment, ElementItems, ElementSegment, Event, Export, ExternalKind, Function, Global,
    Import, ImportDesc, Memory, Module, ModuleItem, Start, Table, TypeEntry,
};
use crate::syntax::opcode::{ImmediateKind, Opcode};
use crate::syntax::types::{
    BlockType, BoundFunctionType, BoundParam, EventType, FunctionType, GlobalType, HeapKind,
    HeapType, Limits, Locals, MemoryType, Mutability, RefType, ReferenceType, SegmentType,
    Shared, TableType, TypeUse, ValueType, Var,
};
use std::collections::HashMap;

// ============================================================================
// Name maps
// ============================================================================

/// Names bound within one index space, in declaration order.
///
/// Anonymous declarations advance the index counter without binding, so a
/// bound name's value is always its item's final index.
#[derive(Debug, Default)]
pub struct NameMap {
    map: HashMap<String, u32>,
    next: u32,
}

impl NameMap {
    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied()
    }

    pub fn new_bound(&mut self, name: &str) -> u32 {
        let index = self.next;
        self.next += 1;
        self.map.insert(name.to_string(), index);
        index
    }

    pub fn new_unbound(&mut self) -> u32 {
        let index = self.next;
        self.next += 1;
        index
    }

    /// Number of indices assigned so far.
    pub fn len(&self) -> u32 {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.next = 0;
    }
}

/// The deferred type map: explicit `(type …)` signatures in index order plus
/// inline signatures awaiting synthetic entries at end of module.
#[derive(Debug, Default)]
pub struct FunctionTypeMap {
    defined: Vec<FunctionType>,
    deferred: Vec<FunctionType>,
}

impl FunctionTypeMap {
    /// Records an explicit type entry. Duplicates get their own index, as in
    /// the binary format.
    pub fn define(&mut self, ty: FunctionType) -> u32 {
        self.defined.push(ty);
        self.defined.len() as u32 - 1
    }

    /// Records an inline signature for possible synthesis at end of module.
    pub fn use_inline(&mut self, ty: &FunctionType) {
        if !self.defined.contains(ty) && !self.deferred.contains(ty) {
            self.deferred.push(ty.clone());
        }
    }

    pub fn find(&self, ty: &FunctionType) -> Option<u32> {
        self.defined.iter().position(|t| t == ty).map(|i| i as u32)
    }

    /// Inline signatures still missing from the type space, in first-seen
    /// order. Called once, after the last field.
    pub fn end_module(&mut self) -> Vec<FunctionType> {
        let defined = std::mem::take(&mut self.defined);
        self.deferred
            .drain(..)
            .filter(|ty| !defined.contains(ty))
            .collect()
    }
}

// ============================================================================
// Context
// ============================================================================

/// The index spaces a symbolic reference can point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace {
    Type,
    Function,
    Table,
    Memory,
    Global,
    Event,
    Elem,
    Data,
    Local,
    Label,
}

impl IndexSpace {
    pub fn describe(self) -> &'static str {
        match self {
            IndexSpace::Type => "type",
            IndexSpace::Function => "function",
            IndexSpace::Table => "table",
            IndexSpace::Memory => "memory",
            IndexSpace::Global => "global",
            IndexSpace::Event => "event",
            IndexSpace::Elem => "element segment",
            IndexSpace::Data => "data segment",
            IndexSpace::Local => "local",
            IndexSpace::Label => "label",
        }
    }
}

/// The index space each variable-carrying opcode's immediate refers to.
pub fn index_space(opcode: Opcode) -> IndexSpace {
    match opcode {
        Opcode::Br | Opcode::BrIf => IndexSpace::Label,
        Opcode::Call | Opcode::ReturnCall | Opcode::RefFunc => IndexSpace::Function,
        Opcode::LocalGet | Opcode::LocalSet | Opcode::LocalTee => IndexSpace::Local,
        Opcode::GlobalGet | Opcode::GlobalSet => IndexSpace::Global,
        Opcode::Throw => IndexSpace::Event,
        Opcode::TableGet
        | Opcode::TableSet
        | Opcode::TableGrow
        | Opcode::TableSize
        | Opcode::TableFill => IndexSpace::Table,
        Opcode::DataDrop => IndexSpace::Data,
        Opcode::ElemDrop => IndexSpace::Elem,
        // memory.size/grow/fill and atomic.fence encode a reserved zero.
        _ => IndexSpace::Memory,
    }
}

/// Accumulated parser state: feature set, sink, name spaces, label stack,
/// deferred types, and the ordering flags.
pub struct Context<'a> {
    pub features: Features,
    pub errors: &'a dyn ErrorSink,

    pub type_names: NameMap,
    pub function_names: NameMap,
    pub table_names: NameMap,
    pub memory_names: NameMap,
    pub global_names: NameMap,
    pub event_names: NameMap,
    pub elem_names: NameMap,
    pub data_names: NameMap,
    /// Per-function; cleared at each function header.
    pub local_names: NameMap,
    /// Per-function label stack. Labels may shadow, so this is a stack, not a
    /// map.
    pub labels: Vec<Option<String>>,

    pub type_map: FunctionTypeMap,
    pub seen_non_import: bool,
    pub seen_start: bool,
}

impl<'a> Context<'a> {
    pub fn new(features: Features, errors: &'a dyn ErrorSink) -> Self {
        Self {
            features,
            errors,
            type_names: NameMap::default(),
            function_names: NameMap::default(),
            table_names: NameMap::default(),
            memory_names: NameMap::default(),
            global_names: NameMap::default(),
            event_names: NameMap::default(),
            elem_names: NameMap::default(),
            data_names: NameMap::default(),
            local_names: NameMap::default(),
            labels: Vec::new(),
            type_map: FunctionTypeMap::default(),
            seen_non_import: false,
            seen_start: false,
        }
    }

    pub fn names(&self, space: IndexSpace) -> &NameMap {
        match space {
            IndexSpace::Type => &self.type_names,
            IndexSpace::Function => &self.function_names,
            IndexSpace::Table => &self.table_names,
            IndexSpace::Memory => &self.memory_names,
            IndexSpace::Global => &self.global_names,
            IndexSpace::Event => &self.event_names,
            IndexSpace::Elem => &self.elem_names,
            IndexSpace::Data => &self.data_names,
            IndexSpace::Local => &self.local_names,
            IndexSpace::Label => unreachable!("labels use the stack"),
        }
    }

    fn names_mut(&mut self, space: IndexSpace) -> &mut NameMap {
        match space {
            IndexSpace::Type => &mut self.type_names,
            IndexSpace::Function => &mut self.function_names,
            IndexSpace::Table => &mut self.table_names,
            IndexSpace::Memory => &mut self.memory_names,
            IndexSpace::Global => &mut self.global_names,
            IndexSpace::Event => &mut self.event_names,
            IndexSpace::Elem => &mut self.elem_names,
            IndexSpace::Data => &mut self.data_names,
            IndexSpace::Local => &mut self.local_names,
            IndexSpace::Label => unreachable!("labels use the stack"),
        }
    }

    fn reset_function_scope(&mut self) {
        self.local_names.clear();
        self.labels.clear();
    }

    fn resolve_label(&self, name: &str) -> Option<u32> {
        self.labels
            .iter()
            .rev()
            .position(|l| l.as_deref() == Some(name))
            .map(|depth| depth as u32)
    }

    fn error(&self, span: Span, message: &str) {
        self.errors.on_error(span.to_location(), message);
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Parses a complete `(module …)` and resolves symbolic references.
///
/// Returns the best-effort module; callers must consult the sink for
/// diagnostics. `None` only when the top-level shape is unusable.
pub fn parse(source: &str, features: Features, errors: &dyn ErrorSink) -> Option<Module> {
    let mut tokenizer = Tokenizer::new(source, errors);
    let mut context = Context::new(features, errors);
    let mut module = read_module(&mut tokenizer, &mut context)?;
    log::debug!(
        "parsed module: {} items, {} functions",
        module.items.len(),
        context.function_names.len()
    );
    super::resolve::resolve(&mut module, &context);
    Some(module)
}

fn read_module(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Module> {
    expect_lpar_keyword(tok, ctx, Keyword::Module)?;

    let mut module = Module::new();
    module.name = tok.match_id().map(|(name, _)| name);

    while matches!(tok.peek().kind, TokenKind::Lpar) {
        let depth = tok.depth();
        if read_module_field(tok, ctx, &mut module).is_none() {
            skip_field(tok, depth);
        }
    }
    expect_rpar(tok, ctx);

    if !matches!(tok.peek().kind, TokenKind::Eof) {
        let token = tok.peek().clone();
        ctx.error(
            token.span,
            &format!("expected end of input, got {}", token.kind.describe()),
        );
    }

    // Inline signatures not covered by explicit entries become synthetic type
    // entries, appended in first-seen order.
    for ty in ctx.type_map.end_module() {
        ctx.type_names.new_unbound();
        module.push(ModuleItem::Type(TypeEntry {
            name: None,
            ty: bind_plain(ty),
        }));
    }

    Some(module)
}

fn bind_plain(ty: FunctionType) -> BoundFunctionType {
    BoundFunctionType {
        params: ty
            .params
            .into_iter()
            .map(|value_type| BoundParam {
                name: None,
                value_type,
            })
            .collect(),
        results: ty.results,
    }
}

/// Error recovery: consume tokens until the failed field's parens balance.
fn skip_field(tok: &mut Tokenizer<'_>, base_depth: u32) {
    if tok.depth() == base_depth && !matches!(tok.peek().kind, TokenKind::Eof) {
        tok.read();
    }
    while tok.depth() > base_depth && !matches!(tok.peek().kind, TokenKind::Eof) {
        tok.read();
    }
}

fn read_module_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    let head = tok.peek_at(1).clone();
    match head.kind {
        TokenKind::Keyword(Keyword::Type) => read_type_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Import) => read_import_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Func) => read_function_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Table) => read_table_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Memory) => read_memory_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Global) => read_global_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Export) => read_export_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Start) => read_start_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Elem) => read_element_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Data) => read_data_field(tok, ctx, module),
        TokenKind::Keyword(Keyword::Event) => read_event_field(tok, ctx, module),
        _ => {
            ctx.error(
                head.span,
                &format!("unexpected module field: {}", head.kind.describe()),
            );
            None
        }
    }
}

// ============================================================================
// Small expectations
// ============================================================================

fn expect_rpar(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<()> {
    if tok.match_rpar().is_some() {
        Some(())
    } else {
        let token = tok.peek().clone();
        ctx.error(
            token.span,
            &format!("expected ')', got {}", token.kind.describe()),
        );
        None
    }
}

fn expect_lpar_keyword(tok: &mut Tokenizer<'_>, ctx: &Context<'_>, kw: Keyword) -> Option<Span> {
    match tok.match_lpar_keyword(kw) {
        Some(span) => Some(span),
        None => {
            let token = tok.peek().clone();
            ctx.error(
                token.span,
                &format!("expected '(' {:?}, got {}", kw, token.kind.describe()),
            );
            None
        }
    }
}

/// Binds an optional `$name` in the given space per the binding rules:
/// absent advances the counter unbound; a duplicate name diagnoses and is
/// treated as unbound (the index still advances).
fn read_bind_var_opt(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    space: IndexSpace,
) -> (u32, Option<String>) {
    match tok.match_id() {
        None => (ctx.names_mut(space).new_unbound(), None),
        Some((name, span)) => {
            if ctx.names(space).has(&name) {
                let bound = ctx.names(space).get(&name).unwrap();
                ctx.error(
                    span,
                    &format!("Variable ${} is already bound to index {}", name, bound),
                );
                (ctx.names_mut(space).new_unbound(), None)
            } else {
                let index = ctx.names_mut(space).new_bound(&name);
                (index, Some(name))
            }
        }
    }
}

/// A required variable: `$name` or a natural index.
fn read_var(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<Var> {
    match read_var_opt(tok, ctx) {
        Some(var) => Some(var),
        None => {
            let token = tok.peek().clone();
            ctx.error(
                token.span,
                &format!("expected a variable, got {}", token.kind.describe()),
            );
            None
        }
    }
}

fn read_var_opt(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<Var> {
    if matches!(tok.peek().kind, TokenKind::Id(_)) {
        let (name, span) = tok.match_id().unwrap();
        return Some(Var::Name(name, span.to_location()));
    }
    if matches!(tok.peek().kind, TokenKind::Nat(_)) {
        let token = tok.read();
        let TokenKind::Nat(lit) = token.kind else {
            unreachable!()
        };
        return match numeric::nat32(&lit) {
            Some(value) => Some(Var::Index(value)),
            None => {
                ctx.error(token.span, &format!("invalid index: {}", lit.text));
                None
            }
        };
    }
    None
}

/// A variable resolved against a lexical scope (locals), where forward
/// references are impossible.
fn read_scoped_var(
    tok: &mut Tokenizer<'_>,
    ctx: &Context<'_>,
    space: IndexSpace,
) -> Option<Var> {
    let token = tok.peek().clone();
    match read_var(tok, ctx)? {
        Var::Index(index) => Some(Var::Index(index)),
        Var::Name(name, _) => match ctx.names(space).get(&name) {
            Some(index) => Some(Var::Index(index)),
            None => {
                ctx.error(
                    token.span,
                    &format!("undefined {}: ${}", space.describe(), name),
                );
                None
            }
        },
    }
}

/// A label use: depth index, or a name resolved against the label stack.
fn read_label_use(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<Var> {
    let token = tok.peek().clone();
    match read_var(tok, ctx)? {
        Var::Index(depth) => Some(Var::Index(depth)),
        Var::Name(name, _) => match ctx.resolve_label(&name) {
            Some(depth) => Some(Var::Index(depth)),
            None => {
                ctx.error(token.span, &format!("undefined label: ${}", name));
                None
            }
        },
    }
}

fn read_nat32(tok: &mut Tokenizer<'_>, ctx: &Context<'_>, what: &str) -> Option<u32> {
    let token = tok.peek().clone();
    match &token.kind {
        TokenKind::Nat(lit) => {
            let lit = lit.clone();
            tok.read();
            match numeric::nat32(&lit) {
                Some(value) => Some(value),
                None => {
                    ctx.error(token.span, &format!("invalid {}: {}", what, lit.text));
                    None
                }
            }
        }
        _ => {
            ctx.error(
                token.span,
                &format!("expected {}, got {}", what, token.kind.describe()),
            );
            None
        }
    }
}

fn read_utf8_text(tok: &mut Tokenizer<'_>, ctx: &Context<'_>, what: &str) -> Option<String> {
    let token = tok.peek().clone();
    match tok.match_text() {
        Some((bytes, span)) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                ctx.error(span, &format!("invalid UTF-8 encoding in {}", what));
                None
            }
        },
        None => {
            ctx.error(
                token.span,
                &format!("expected quoted {}, got {}", what, token.kind.describe()),
            );
            None
        }
    }
}

// ============================================================================
// Types
// ============================================================================

fn read_value_type(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<ValueType> {
    let token = tok.peek().clone();
    match token.kind {
        TokenKind::ValueType(value_type) => {
            tok.read();
            let feature = value_type.required_feature();
            if !ctx.features.allows(feature) {
                ctx.error(
                    token.span,
                    &format!("value type {} not allowed", value_type),
                );
                return None;
            }
            Some(value_type)
        }
        TokenKind::Lpar if tok.peek_lpar_keyword(Keyword::Ref) => {
            let span = tok.match_lpar_keyword(Keyword::Ref).unwrap();
            if !ctx.features.allows(Feature::FunctionReferences) {
                ctx.error(span, "typed reference not allowed");
                return None;
            }
            let null = tok.match_keyword(Keyword::Null).is_some();
            let heap = read_heap_type(tok, ctx)?;
            expect_rpar(tok, ctx)?;
            Some(ValueType::Reference(ReferenceType::Ref(RefType {
                null,
                heap,
            })))
        }
        _ => {
            ctx.error(
                token.span,
                &format!("expected value type, got {}", token.kind.describe()),
            );
            None
        }
    }
}

fn read_heap_type(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<HeapType> {
    let token = tok.peek().clone();
    match &token.kind {
        TokenKind::Keyword(Keyword::Func) => {
            tok.read();
            Some(HeapType::Kind(HeapKind::Func))
        }
        TokenKind::HeapKind(kind) => {
            let kind = *kind;
            tok.read();
            Some(HeapType::Kind(kind))
        }
        TokenKind::Nat(_) => read_var(tok, ctx).map(|var| match var {
            Var::Index(index) => HeapType::Index(index),
            Var::Name(..) => unreachable!(),
        }),
        TokenKind::Id(_) => {
            let (name, span) = tok.match_id().unwrap();
            match ctx.type_names.get(&name) {
                Some(index) => Some(HeapType::Index(index)),
                None => {
                    ctx.error(span, &format!("undefined type: ${}", name));
                    None
                }
            }
        }
        _ => {
            ctx.error(
                token.span,
                &format!("expected heap type, got {}", token.kind.describe()),
            );
            None
        }
    }
}

fn read_reference_type(tok: &mut Tokenizer<'_>, ctx: &Context<'_>) -> Option<ReferenceType> {
    let token = tok.peek().clone();
    match read_value_type(tok, ctx)? {
        ValueType::Reference(rt) => Some(rt),
        other => {
            ctx.error(
                token.span,
                &format!("expected reference type, got {}", other),
            );
            None
        }
    }
}

/// `(param $x? t*)*`; named params bind into the local name map.
fn read_params(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    bind_locals: bool,
) -> Option<Vec<BoundParam>> {
    let mut params = Vec::new();
    while tok.match_lpar_keyword(Keyword::Param).is_some() {
        if matches!(tok.peek().kind, TokenKind::Id(_)) {
            let name = if bind_locals {
                read_bind_var_opt(tok, ctx, IndexSpace::Local).1
            } else {
                // Parameter names in type entries and type uses are allowed
                // but bind nothing.
                tok.match_id().map(|(name, _)| name)
            };
            let value_type = read_value_type(tok, ctx)?;
            params.push(BoundParam { name, value_type });
        } else {
            while !matches!(tok.peek().kind, TokenKind::Rpar) {
                let value_type = read_value_type(tok, ctx)?;
                if bind_locals {
                    ctx.local_names.new_unbound();
                }
                params.push(BoundParam {
                    name: None,
                    value_type,
                });
            }
        }
        expect_rpar(tok, ctx)?;
    }
    Some(params)
}

fn read_results(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Vec<ValueType>> {
    let mut results = Vec::new();
    while tok.match_lpar_keyword(Keyword::Result).is_some() {
        while !matches!(tok.peek().kind, TokenKind::Rpar) {
            results.push(read_value_type(tok, ctx)?);
        }
        expect_rpar(tok, ctx)?;
    }
    Some(results)
}

/// `(type x)? (param …)* (result …)*`.
///
/// With no explicit index, the inline signature is recorded in the deferred
/// type map (even an empty one, so `(func)` synthesises `(func)`).
fn read_type_use(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    bind_locals: bool,
) -> Option<TypeUse> {
    let index = if tok.peek_lpar_keyword(Keyword::Type) {
        tok.match_lpar_keyword(Keyword::Type).unwrap();
        let var = read_var(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        Some(var)
    } else {
        None
    };

    let params = read_params(tok, ctx, bind_locals)?;
    let results = read_results(tok, ctx)?;
    let ty = BoundFunctionType { params, results };

    if index.is_none() {
        ctx.type_map.use_inline(&ty.unbind());
    }
    Some(TypeUse { index, ty })
}

// ============================================================================
// Fields
// ============================================================================

fn read_type_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Type)?;
    let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Type);

    expect_lpar_keyword(tok, ctx, Keyword::Func)?;
    let params = read_params(tok, ctx, false)?;
    let results = read_results(tok, ctx)?;
    expect_rpar(tok, ctx)?;
    expect_rpar(tok, ctx)?;

    let ty = BoundFunctionType { params, results };
    ctx.type_map.define(ty.unbind());
    module.push(ModuleItem::Type(TypeEntry { name, ty }));
    Some(())
}

/// `(export "name")*` inline sugar; returns the export names.
fn read_inline_exports(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Vec<String>> {
    let mut names = Vec::new();
    while tok.peek_lpar_keyword(Keyword::Export) {
        tok.match_lpar_keyword(Keyword::Export).unwrap();
        names.push(read_utf8_text(tok, ctx, "export name")?);
        expect_rpar(tok, ctx)?;
    }
    Some(names)
}

/// `(import "module" "field")` inline sugar.
fn read_inline_import(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
) -> Option<Option<(String, String)>> {
    if !tok.peek_lpar_keyword(Keyword::Import) {
        return Some(None);
    }
    let span = tok.match_lpar_keyword(Keyword::Import).unwrap();
    if ctx.seen_non_import {
        ctx.error(
            span,
            "Imports must occur before all non-import definitions",
        );
        return None;
    }
    let module = read_utf8_text(tok, ctx, "import module name")?;
    let field = read_utf8_text(tok, ctx, "import field name")?;
    expect_rpar(tok, ctx)?;
    Some(Some((module, field)))
}

fn push_exports(module: &mut Module, kind: ExternalKind, index: u32, names: Vec<String>) {
    for name in names {
        module.push(ModuleItem::Export(Export {
            name,
            kind,
            index: Var::Index(index),
        }));
    }
}

fn read_import_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    let span = expect_lpar_keyword(tok, ctx, Keyword::Import)?;
    if ctx.seen_non_import {
        ctx.error(
            span,
            "Imports must occur before all non-import definitions",
        );
        return None;
    }

    let import_module = read_utf8_text(tok, ctx, "import module name")?;
    let field = read_utf8_text(tok, ctx, "import field name")?;

    let head = tok.peek_at(1).clone();
    let (name, desc) = match head.kind {
        TokenKind::Keyword(Keyword::Func) => {
            tok.match_lpar_keyword(Keyword::Func);
            let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Function);
            let type_use = read_type_use(tok, ctx, false)?;
            expect_rpar(tok, ctx)?;
            (name, ImportDesc::Function(type_use))
        }
        TokenKind::Keyword(Keyword::Table) => {
            tok.match_lpar_keyword(Keyword::Table);
            let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Table);
            let ty = read_table_type(tok, ctx)?;
            expect_rpar(tok, ctx)?;
            (name, ImportDesc::Table(ty))
        }
        TokenKind::Keyword(Keyword::Memory) => {
            tok.match_lpar_keyword(Keyword::Memory);
            let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Memory);
            let limits = read_limits(tok, ctx)?;
            expect_rpar(tok, ctx)?;
            (name, ImportDesc::Memory(MemoryType { limits }))
        }
        TokenKind::Keyword(Keyword::Global) => {
            tok.match_lpar_keyword(Keyword::Global);
            let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Global);
            let ty = read_global_type(tok, ctx)?;
            expect_rpar(tok, ctx)?;
            (name, ImportDesc::Global(ty))
        }
        TokenKind::Keyword(Keyword::Event) => {
            tok.match_lpar_keyword(Keyword::Event);
            let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Event);
            let type_use = read_type_use(tok, ctx, false)?;
            expect_rpar(tok, ctx)?;
            (
                name,
                ImportDesc::Event(EventType {
                    attribute: 0,
                    type_use,
                }),
            )
        }
        _ => {
            ctx.error(
                head.span,
                &format!("expected import descriptor, got {}", head.kind.describe()),
            );
            return None;
        }
    };
    expect_rpar(tok, ctx)?;

    module.push(ModuleItem::Import(Import {
        module: import_module,
        field,
        name,
        desc,
    }));
    Some(())
}

fn read_function_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Func)?;
    let (index, name) = read_bind_var_opt(tok, ctx, IndexSpace::Function);
    let exports = read_inline_exports(tok, ctx)?;

    if let Some((import_module, field)) = read_inline_import(tok, ctx)? {
        let type_use = read_type_use(tok, ctx, false)?;
        expect_rpar(tok, ctx)?;
        module.push(ModuleItem::Import(Import {
            module: import_module,
            field,
            name,
            desc: ImportDesc::Function(type_use),
        }));
        push_exports(module, ExternalKind::Function, index, exports);
        return Some(());
    }

    ctx.seen_non_import = true;
    ctx.reset_function_scope();

    let type_use = read_type_use(tok, ctx, true)?;
    let locals = read_locals(tok, ctx)?;
    let mut body = read_instruction_list(tok, ctx)?;
    body.push(Instruction::bare(Opcode::End));
    expect_rpar(tok, ctx)?;

    module.push(ModuleItem::Function(Function {
        name,
        type_use,
        locals,
        body,
    }));
    push_exports(module, ExternalKind::Function, index, exports);
    Some(())
}

/// `(local $x? t*)*`; names bind into the function's local space.
fn read_locals(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Vec<Locals>> {
    let mut locals: Vec<Locals> = Vec::new();
    while tok.match_lpar_keyword(Keyword::Local).is_some() {
        if matches!(tok.peek().kind, TokenKind::Id(_)) {
            read_bind_var_opt(tok, ctx, IndexSpace::Local);
            let value_type = read_value_type(tok, ctx)?;
            push_local(&mut locals, value_type, 1);
        } else {
            while !matches!(tok.peek().kind, TokenKind::Rpar) {
                let value_type = read_value_type(tok, ctx)?;
                ctx.local_names.new_unbound();
                push_local(&mut locals, value_type, 1);
            }
        }
        expect_rpar(tok, ctx)?;
    }
    Some(locals)
}

/// Coalesces adjacent same-typed locals into runs, as the binary format
/// stores them.
fn push_local(locals: &mut Vec<Locals>, value_type: ValueType, count: u32) {
    if let Some(last) = locals.last_mut() {
        if last.value_type == value_type {
            last.count += count;
            return;
        }
    }
    locals.push(Locals { count, value_type });
}

fn read_limits(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Limits> {
    let min = read_nat32(tok, ctx, "minimum size")?;
    let max = if matches!(tok.peek().kind, TokenKind::Nat(_)) {
        Some(read_nat32(tok, ctx, "maximum size")?)
    } else {
        None
    };
    let shared = if tok.match_keyword(Keyword::Shared).is_some() {
        if !ctx.features.allows(Feature::Threads) {
            ctx.error(tok.peek().span, "shared limits not allowed");
            return None;
        }
        Shared::Yes
    } else {
        Shared::No
    };
    Some(Limits { min, max, shared })
}

fn read_table_type(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<TableType> {
    let limits = read_limits(tok, ctx)?;
    let element = read_reference_type(tok, ctx)?;
    Some(TableType { limits, element })
}

fn read_global_type(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<GlobalType> {
    if tok.peek_lpar_keyword(Keyword::Mut) {
        tok.match_lpar_keyword(Keyword::Mut).unwrap();
        let value_type = read_value_type(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        Some(GlobalType {
            value_type,
            mutability: Mutability::Var,
        })
    } else {
        let value_type = read_value_type(tok, ctx)?;
        Some(GlobalType {
            value_type,
            mutability: Mutability::Const,
        })
    }
}

fn read_table_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Table)?;
    let (index, name) = read_bind_var_opt(tok, ctx, IndexSpace::Table);
    let exports = read_inline_exports(tok, ctx)?;

    if let Some((import_module, field)) = read_inline_import(tok, ctx)? {
        let ty = read_table_type(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        module.push(ModuleItem::Import(Import {
            module: import_module,
            field,
            name,
            desc: ImportDesc::Table(ty),
        }));
        push_exports(module, ExternalKind::Table, index, exports);
        return Some(());
    }

    ctx.seen_non_import = true;

    // Inline element sugar: `(table reftype (elem …))` sizes the table from
    // the segment.
    if matches!(
        tok.peek().kind,
        TokenKind::ValueType(ValueType::Reference(_))
    ) {
        let element = read_reference_type(tok, ctx)?;
        expect_lpar_keyword(tok, ctx, Keyword::Elem)?;
        ctx.elem_names.new_unbound();

        let items = if matches!(tok.peek().kind, TokenKind::Lpar) {
            let mut exprs = Vec::new();
            while matches!(tok.peek().kind, TokenKind::Lpar) {
                exprs.push(read_element_expression(tok, ctx)?);
            }
            ElementItems::Expressions(exprs)
        } else {
            let mut funcs = Vec::new();
            while let Some(var) = read_var_opt(tok, ctx) {
                funcs.push(var);
            }
            ElementItems::Functions(funcs)
        };
        expect_rpar(tok, ctx)?;
        expect_rpar(tok, ctx)?;

        let count = items.len() as u32;
        module.push(ModuleItem::Table(Table {
            name,
            ty: TableType {
                limits: Limits::new(count, Some(count)),
                element,
            },
        }));
        module.push(ModuleItem::Element(ElementSegment {
            name: None,
            mode: SegmentType::Active,
            table: Some(Var::Index(index)),
            offset: Some(const_offset_zero()),
            element_type: element,
            items,
        }));
        push_exports(module, ExternalKind::Table, index, exports);
        return Some(());
    }

    let ty = read_table_type(tok, ctx)?;
    expect_rpar(tok, ctx)?;
    module.push(ModuleItem::Table(Table { name, ty }));
    push_exports(module, ExternalKind::Table, index, exports);
    Some(())
}

fn const_offset_zero() -> Expression {
    vec![
        Instruction::new(Opcode::I32Const, Immediate::S32(0)),
        Instruction::bare(Opcode::End),
    ]
}

/// Bytes per page, for sizing inline-data memories.
const PAGE_SIZE: usize = 65536;

fn read_memory_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Memory)?;
    let (index, name) = read_bind_var_opt(tok, ctx, IndexSpace::Memory);
    let exports = read_inline_exports(tok, ctx)?;

    if let Some((import_module, field)) = read_inline_import(tok, ctx)? {
        let limits = read_limits(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        module.push(ModuleItem::Import(Import {
            module: import_module,
            field,
            name,
            desc: ImportDesc::Memory(MemoryType { limits }),
        }));
        push_exports(module, ExternalKind::Memory, index, exports);
        return Some(());
    }

    ctx.seen_non_import = true;

    // Inline data sugar: `(memory (data "…"))` sizes the memory from the
    // segment bytes.
    if tok.peek_lpar_keyword(Keyword::Data) {
        tok.match_lpar_keyword(Keyword::Data).unwrap();
        ctx.data_names.new_unbound();
        let mut data = Vec::new();
        while let Some((bytes, _)) = tok.match_text() {
            data.extend_from_slice(&bytes);
        }
        expect_rpar(tok, ctx)?;
        expect_rpar(tok, ctx)?;

        let pages = data.len().div_ceil(PAGE_SIZE) as u32;
        module.push(ModuleItem::Memory(Memory {
            name,
            ty: MemoryType {
                limits: Limits::new(pages, Some(pages)),
            },
        }));
        module.push(ModuleItem::Data(DataSegment {
            name: None,
            mode: SegmentType::Active,
            memory: Some(Var::Index(index)),
            offset: Some(const_offset_zero()),
            data,
        }));
        push_exports(module, ExternalKind::Memory, index, exports);
        return Some(());
    }

    let limits = read_limits(tok, ctx)?;
    expect_rpar(tok, ctx)?;
    module.push(ModuleItem::Memory(Memory {
        name,
        ty: MemoryType { limits },
    }));
    push_exports(module, ExternalKind::Memory, index, exports);
    Some(())
}

fn read_global_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Global)?;
    let (index, name) = read_bind_var_opt(tok, ctx, IndexSpace::Global);
    let exports = read_inline_exports(tok, ctx)?;

    if let Some((import_module, field)) = read_inline_import(tok, ctx)? {
        let ty = read_global_type(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        module.push(ModuleItem::Import(Import {
            module: import_module,
            field,
            name,
            desc: ImportDesc::Global(ty),
        }));
        push_exports(module, ExternalKind::Global, index, exports);
        return Some(());
    }

    ctx.seen_non_import = true;

    let ty = read_global_type(tok, ctx)?;
    let mut init = read_instruction_list(tok, ctx)?;
    init.push(Instruction::bare(Opcode::End));
    expect_rpar(tok, ctx)?;

    module.push(ModuleItem::Global(Global { name, ty, init }));
    push_exports(module, ExternalKind::Global, index, exports);
    Some(())
}

fn read_export_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Export)?;
    let name = read_utf8_text(tok, ctx, "export name")?;

    let kinds = [
        (Keyword::Func, ExternalKind::Function),
        (Keyword::Table, ExternalKind::Table),
        (Keyword::Memory, ExternalKind::Memory),
        (Keyword::Global, ExternalKind::Global),
        (Keyword::Event, ExternalKind::Event),
    ];
    let kind = kinds
        .iter()
        .find(|(kw, _)| tok.peek_lpar_keyword(*kw))
        .map(|&(kw, kind)| {
            tok.match_lpar_keyword(kw);
            kind
        });
    let Some(kind) = kind else {
        let token = tok.peek().clone();
        ctx.error(
            token.span,
            &format!("expected export descriptor, got {}", token.kind.describe()),
        );
        return None;
    };
    let index = read_var(tok, ctx)?;
    expect_rpar(tok, ctx)?;
    expect_rpar(tok, ctx)?;

    module.push(ModuleItem::Export(Export { name, kind, index }));
    Some(())
}

fn read_start_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    let span = expect_lpar_keyword(tok, ctx, Keyword::Start)?;
    if ctx.seen_start {
        ctx.error(span, "multiple start sections");
        return None;
    }
    ctx.seen_start = true;
    let func = read_var(tok, ctx)?;
    expect_rpar(tok, ctx)?;
    module.push(ModuleItem::Start(Start { func }));
    Some(())
}

/// One element expression: `(item e)`, or a single folded instruction such
/// as `(ref.func $f)`.
fn read_element_expression(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Expression> {
    let mut expr = Vec::new();
    if tok.peek_lpar_keyword(Keyword::Item) {
        tok.match_lpar_keyword(Keyword::Item).unwrap();
        expr = read_instruction_list(tok, ctx)?;
        expect_rpar(tok, ctx)?;
    } else {
        read_folded_instruction(tok, ctx, &mut expr)?;
    }
    expr.push(Instruction::bare(Opcode::End));
    Some(expr)
}

fn read_element_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Elem)?;
    let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Elem);

    let declared = tok.match_keyword(Keyword::Declare).is_some();

    // An explicit table target, or an offset expression, makes the segment
    // active; `declare` wins over both.
    let mut table = if tok.peek_lpar_keyword(Keyword::Table) {
        tok.match_lpar_keyword(Keyword::Table).unwrap();
        let var = read_var(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        Some(var)
    } else {
        None
    };

    // Legacy form: a bare table index before the offset expression, as in
    // `(elem 0 (i32.const 0) …)`.
    if table.is_none()
        && !declared
        && matches!(tok.peek().kind, TokenKind::Nat(_) | TokenKind::Id(_))
        && matches!(tok.peek_at(1).kind, TokenKind::Lpar)
    {
        table = read_var_opt(tok, ctx);
    }

    let offset = if tok.peek_lpar_keyword(Keyword::Offset) {
        tok.match_lpar_keyword(Keyword::Offset).unwrap();
        let mut expr = read_instruction_list(tok, ctx)?;
        expr.push(Instruction::bare(Opcode::End));
        expect_rpar(tok, ctx)?;
        Some(expr)
    } else if !declared
        && matches!(tok.peek().kind, TokenKind::Lpar)
        && !matches!(tok.peek_at(1).kind, TokenKind::Keyword(_))
    {
        // Bare folded offset, MVP style: `(elem (i32.const 0) …)`.
        let mut expr = Vec::new();
        read_folded_instruction(tok, ctx, &mut expr)?;
        expr.push(Instruction::bare(Opcode::End));
        Some(expr)
    } else {
        None
    };

    let mode = if declared {
        SegmentType::Declared
    } else if offset.is_some() {
        SegmentType::Active
    } else {
        SegmentType::Passive
    };

    if mode != SegmentType::Active && !ctx.features.allows(Feature::BulkMemory) {
        ctx.error(tok.peek().span, "element segment kind not allowed");
        return None;
    }

    // Item list: `func` + indices, a reference type + expressions, or bare
    // indices.
    let (element_type, items) = if tok.match_keyword(Keyword::Func).is_some() {
        let mut funcs = Vec::new();
        while let Some(var) = read_var_opt(tok, ctx) {
            funcs.push(var);
        }
        (ReferenceType::FUNCREF, ElementItems::Functions(funcs))
    } else if matches!(
        tok.peek().kind,
        TokenKind::ValueType(ValueType::Reference(_))
    ) {
        let element_type = read_reference_type(tok, ctx)?;
        let mut exprs = Vec::new();
        while matches!(tok.peek().kind, TokenKind::Lpar) {
            exprs.push(read_element_expression(tok, ctx)?);
        }
        (element_type, ElementItems::Expressions(exprs))
    } else {
        let mut funcs = Vec::new();
        while let Some(var) = read_var_opt(tok, ctx) {
            funcs.push(var);
        }
        (ReferenceType::FUNCREF, ElementItems::Functions(funcs))
    };
    expect_rpar(tok, ctx)?;

    // Active segments with no explicit table target table 0.
    let table = match (mode, table) {
        (SegmentType::Active, None) => Some(Var::Index(0)),
        (_, t) => t,
    };

    module.push(ModuleItem::Element(ElementSegment {
        name,
        mode,
        table,
        offset,
        element_type,
        items,
    }));
    Some(())
}

fn read_data_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    expect_lpar_keyword(tok, ctx, Keyword::Data)?;
    let (_, name) = read_bind_var_opt(tok, ctx, IndexSpace::Data);

    let memory = if tok.peek_lpar_keyword(Keyword::Memory) {
        tok.match_lpar_keyword(Keyword::Memory).unwrap();
        let var = read_var(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        Some(var)
    } else {
        None
    };

    let offset = if tok.peek_lpar_keyword(Keyword::Offset) {
        tok.match_lpar_keyword(Keyword::Offset).unwrap();
        let mut expr = read_instruction_list(tok, ctx)?;
        expr.push(Instruction::bare(Opcode::End));
        expect_rpar(tok, ctx)?;
        Some(expr)
    } else if matches!(tok.peek().kind, TokenKind::Lpar) {
        let mut expr = Vec::new();
        read_folded_instruction(tok, ctx, &mut expr)?;
        expr.push(Instruction::bare(Opcode::End));
        Some(expr)
    } else {
        None
    };

    let mode = if offset.is_some() {
        SegmentType::Active
    } else {
        SegmentType::Passive
    };
    if mode == SegmentType::Passive && !ctx.features.allows(Feature::BulkMemory) {
        ctx.error(tok.peek().span, "passive data segment not allowed");
        return None;
    }

    let mut data = Vec::new();
    while let Some((bytes, _)) = tok.match_text() {
        data.extend_from_slice(&bytes);
    }
    expect_rpar(tok, ctx)?;

    let memory = match (mode, memory) {
        (SegmentType::Active, None) => Some(Var::Index(0)),
        (_, m) => m,
    };

    module.push(ModuleItem::Data(DataSegment {
        name,
        mode,
        memory,
        offset,
        data,
    }));
    Some(())
}

fn read_event_field(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    module: &mut Module,
) -> Option<()> {
    let span = expect_lpar_keyword(tok, ctx, Keyword::Event)?;
    if !ctx.features.allows(Feature::Exceptions) {
        ctx.error(span, "event not allowed");
        return None;
    }
    let (index, name) = read_bind_var_opt(tok, ctx, IndexSpace::Event);
    let exports = read_inline_exports(tok, ctx)?;

    if let Some((import_module, field)) = read_inline_import(tok, ctx)? {
        let type_use = read_type_use(tok, ctx, false)?;
        expect_rpar(tok, ctx)?;
        module.push(ModuleItem::Import(Import {
            module: import_module,
            field,
            name,
            desc: ImportDesc::Event(EventType {
                attribute: 0,
                type_use,
            }),
        }));
        push_exports(module, ExternalKind::Event, index, exports);
        return Some(());
    }

    ctx.seen_non_import = true;

    let type_use = read_type_use(tok, ctx, false)?;
    expect_rpar(tok, ctx)?;
    module.push(ModuleItem::Event(Event {
        name,
        ty: EventType {
            attribute: 0,
            type_use,
        },
    }));
    push_exports(module, ExternalKind::Event, index, exports);
    Some(())
}

// ============================================================================
// Instructions
// ============================================================================

/// Reads a linear instruction sequence. Stops (without consuming) at `)`,
/// `else`, `end`, `catch`, or anything that is not an instruction.
pub fn read_instruction_list(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
) -> Option<Vec<Instruction>> {
    let mut out = Vec::new();
    loop {
        let kind = tok.peek().kind.clone();
        match kind {
            TokenKind::PlainInstr(op) => {
                let token = tok.read();
                let instruction = read_plain_instruction(tok, ctx, op, token.span)?;
                out.push(instruction);
            }
            TokenKind::BlockInstr(op) => {
                let token = tok.read();
                read_block_instruction(tok, ctx, op, token.span, &mut out)?;
            }
            TokenKind::Lpar => {
                read_folded_instruction(tok, ctx, &mut out)?;
            }
            _ => return Some(out),
        }
    }
}

fn feature_check(ctx: &Context<'_>, span: Span, opcode: Opcode) -> Option<()> {
    if ctx.features.allows(opcode.required_feature()) {
        Some(())
    } else {
        ctx.error(span, &format!("instruction not allowed: {}", opcode));
        None
    }
}

fn read_plain_instruction(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    opcode: Opcode,
    span: Span,
) -> Option<Instruction> {
    // `select` grows explicit result types under reference-types and becomes
    // the typed opcode.
    if opcode == Opcode::Select && tok.peek_lpar_keyword(Keyword::Result) {
        let results = read_results(tok, ctx)?;
        feature_check(ctx, span, Opcode::SelectT)?;
        return Some(Instruction::new(
            Opcode::SelectT,
            Immediate::SelectTypes(results),
        ));
    }

    feature_check(ctx, span, opcode)?;
    let immediate = read_immediate(tok, ctx, opcode)?;
    Some(Instruction::new(opcode, immediate))
}

fn read_immediate(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    opcode: Opcode,
) -> Option<Immediate> {
    match opcode.immediate_kind() {
        ImmediateKind::None => Some(Immediate::None),
        ImmediateKind::S32 => read_literal(tok, ctx, "i32 constant", numeric::int32).map(Immediate::S32),
        ImmediateKind::S64 => read_literal(tok, ctx, "i64 constant", numeric::int64).map(Immediate::S64),
        ImmediateKind::F32 => read_literal(tok, ctx, "f32 constant", numeric::float32).map(Immediate::F32),
        ImmediateKind::F64 => read_literal(tok, ctx, "f64 constant", numeric::float64).map(Immediate::F64),
        ImmediateKind::V128 => read_v128_literal(tok, ctx).map(Immediate::V128),
        ImmediateKind::Index => read_index_immediate(tok, ctx, opcode),
        ImmediateKind::Block => unreachable!("block instructions take the block path"),
        ImmediateKind::BrOnExn => {
            let label = read_label_use(tok, ctx)?;
            let event = read_var(tok, ctx)?;
            Some(Immediate::BrOnExn { label, event })
        }
        ImmediateKind::BrTable => {
            let mut targets = Vec::new();
            while matches!(tok.peek().kind, TokenKind::Nat(_) | TokenKind::Id(_)) {
                targets.push(read_label_use(tok, ctx)?);
            }
            let default = match targets.pop() {
                Some(var) => var,
                None => {
                    ctx.error(tok.peek().span, "br_table needs at least one target");
                    return None;
                }
            };
            Some(Immediate::BrTable { targets, default })
        }
        ImmediateKind::CallIndirect => {
            // Optional table var, then the type use.
            let table = match read_var_opt(tok, ctx) {
                Some(var) => var,
                None => Var::Index(0),
            };
            let type_use = read_type_use(tok, ctx, false)?;
            Some(Immediate::CallIndirect { type_use, table })
        }
        ImmediateKind::Copy => {
            let (dst, src) = match read_var_opt(tok, ctx) {
                Some(dst) => {
                    let src = read_var(tok, ctx)?;
                    (dst, src)
                }
                None => (Var::Index(0), Var::Index(0)),
            };
            Some(Immediate::Copy { dst, src })
        }
        ImmediateKind::Init => {
            let first = read_var(tok, ctx)?;
            match read_var_opt(tok, ctx) {
                Some(segment) => Some(Immediate::Init { segment, dst: first }),
                None => Some(Immediate::Init {
                    segment: first,
                    dst: Var::Index(0),
                }),
            }
        }
        ImmediateKind::Let => unreachable!("let takes the block path"),
        ImmediateKind::MemArg => read_mem_arg(tok, ctx, opcode).map(Immediate::MemArg),
        ImmediateKind::HeapType => read_heap_type(tok, ctx).map(Immediate::HeapType),
        ImmediateKind::SelectTypes => {
            // Only reachable via the select remap, which parses the types.
            Some(Immediate::SelectTypes(Vec::new()))
        }
        ImmediateKind::Shuffle => {
            let mut lanes = [0u8; 16];
            for lane in &mut lanes {
                let value = read_nat32(tok, ctx, "shuffle lane")?;
                if value > 31 {
                    ctx.error(tok.peek().span, &format!("shuffle lane out of range: {}", value));
                    return None;
                }
                *lane = value as u8;
            }
            Some(Immediate::Shuffle(lanes))
        }
        ImmediateKind::SimdLane => {
            let value = read_nat32(tok, ctx, "lane index")?;
            if value > 255 {
                ctx.error(tok.peek().span, &format!("lane index out of range: {}", value));
                return None;
            }
            Some(Immediate::SimdLane(value as u8))
        }
    }
}

fn read_index_immediate(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    opcode: Opcode,
) -> Option<Immediate> {
    let var = match index_space(opcode) {
        IndexSpace::Label => read_label_use(tok, ctx)?,
        IndexSpace::Local => read_scoped_var(tok, ctx, IndexSpace::Local)?,
        IndexSpace::Memory => {
            // memory.size/grow/fill and atomic.fence take no text operand.
            Var::Index(0)
        }
        _ => read_var(tok, ctx)?,
    };
    Some(Immediate::Index(var))
}

/// A numeric literal converted by `convert`, accepting Nat/Int/Float tokens.
fn read_literal<T>(
    tok: &mut Tokenizer<'_>,
    ctx: &Context<'_>,
    what: &str,
    convert: impl Fn(&Literal) -> Option<T>,
) -> Option<T> {
    let token = tok.peek().clone();
    let literal = match &token.kind {
        TokenKind::Nat(lit) | TokenKind::Int(lit) | TokenKind::Float(lit) => lit.clone(),
        _ => {
            ctx.error(
                token.span,
                &format!("expected {}, got {}", what, token.kind.describe()),
            );
            return None;
        }
    };
    tok.read();
    match convert(&literal) {
        Some(value) => Some(value),
        None => {
            ctx.error(token.span, &format!("invalid {}: {}", what, literal.text));
            None
        }
    }
}

/// `v128.const <shape> <lane>*`.
fn read_v128_literal(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<[u8; 16]> {
    let token = tok.peek().clone();
    let TokenKind::SimdShape(shape) = token.kind else {
        ctx.error(
            token.span,
            &format!("expected SIMD shape, got {}", token.kind.describe()),
        );
        return None;
    };
    tok.read();

    let mut bytes = [0u8; 16];
    match shape {
        SimdShape::I8x16 | SimdShape::I16x8 | SimdShape::I32x4 | SimdShape::I64x2 => {
            let bits = (128 / shape.lanes()) as u32;
            let width = bits as usize / 8;
            for i in 0..shape.lanes() {
                let value = read_literal(tok, ctx, "lane value", |lit| numeric::lane(lit, bits))?;
                bytes[i * width..(i + 1) * width]
                    .copy_from_slice(&value.to_le_bytes()[..width]);
            }
        }
        SimdShape::F32x4 => {
            for i in 0..4 {
                let value = read_literal(tok, ctx, "lane value", numeric::float32)?;
                bytes[i * 4..(i + 1) * 4].copy_from_slice(&value.to_le_bytes());
            }
        }
        SimdShape::F64x2 => {
            for i in 0..2 {
                let value = read_literal(tok, ctx, "lane value", numeric::float64)?;
                bytes[i * 8..(i + 1) * 8].copy_from_slice(&value.to_le_bytes());
            }
        }
    }
    Some(bytes)
}

/// `offset=N? align=N?`. `align` is in bytes in the text format and must be
/// a power of two; the tree stores log2.
fn read_mem_arg(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>, opcode: Opcode) -> Option<MemArg> {
    let offset = if matches!(tok.peek().kind, TokenKind::OffsetEqNat(_)) {
        let token = tok.read();
        let TokenKind::OffsetEqNat(lit) = token.kind else {
            unreachable!()
        };
        match numeric::nat32(&lit) {
            Some(value) => value,
            None => {
                ctx.error(token.span, &format!("invalid offset: {}", lit.text));
                return None;
            }
        }
    } else {
        0
    };

    let align_log2 = if matches!(tok.peek().kind, TokenKind::AlignEqNat(_)) {
        let token = tok.read();
        let TokenKind::AlignEqNat(lit) = token.kind else {
            unreachable!()
        };
        match numeric::nat32(&lit) {
            Some(value) if value.is_power_of_two() => value.trailing_zeros(),
            Some(value) => {
                ctx.error(
                    token.span,
                    &format!("alignment must be a power of two, got {}", value),
                );
                return None;
            }
            None => {
                ctx.error(token.span, &format!("invalid alignment: {}", lit.text));
                return None;
            }
        }
    } else {
        opcode.natural_alignment_log2()
    };

    Some(MemArg { align_log2, offset })
}

/// Block types in the text format: `(type x)?` plus results. Multi-value
/// shapes need the explicit index since the tree's block type is a single
/// value or an index.
fn read_block_type(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<BlockType> {
    if tok.peek_lpar_keyword(Keyword::Type) {
        tok.match_lpar_keyword(Keyword::Type).unwrap();
        let token = tok.peek().clone();
        let var = read_var(tok, ctx)?;
        expect_rpar(tok, ctx)?;
        if !ctx.features.allows(Feature::MultiValue) {
            ctx.error(token.span, "block type index not allowed");
            return None;
        }
        let index = match var {
            Var::Index(index) => index,
            Var::Name(name, _) => match ctx.type_names.get(&name) {
                Some(index) => index,
                None => {
                    ctx.error(token.span, &format!("undefined type: ${}", name));
                    return None;
                }
            },
        };
        // Trailing (result …) repetitions of the indexed type are allowed and
        // ignored.
        read_results(tok, ctx)?;
        return Some(BlockType::TypeIndex(index));
    }

    let span = tok.peek().span;
    let results = read_results(tok, ctx)?;
    match results.len() {
        0 => Some(BlockType::Void),
        1 => Some(BlockType::Value(results[0])),
        _ => {
            if !ctx.features.allows(Feature::MultiValue) {
                ctx.error(span, "multiple block results not allowed");
                return None;
            }
            ctx.error(
                span,
                "multi-value block types require an explicit (type n)",
            );
            None
        }
    }
}

/// An optional label binding for a block. Labels shadow rather than
/// duplicate-check, so this pushes unconditionally.
fn read_label_binding(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<String> {
    let name = tok.match_id().map(|(name, _)| name);
    ctx.labels.push(name.clone());
    name
}

/// The optional repeated label after `end`/`else`/`catch` must match the
/// block's own.
fn check_label_repeat(
    tok: &mut Tokenizer<'_>,
    ctx: &Context<'_>,
    label: &Option<String>,
) {
    if let Some((name, span)) = tok.match_id() {
        if label.as_deref() != Some(&name) {
            ctx.error(span, &format!("label mismatch: ${}", name));
        }
    }
}

/// A block instruction in linear form: `block … end`, `if … else … end`,
/// `try … catch … end`, `let … end`.
fn read_block_instruction(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    opcode: Opcode,
    span: Span,
    out: &mut Vec<Instruction>,
) -> Option<()> {
    feature_check(ctx, span, opcode)?;
    let label = read_label_binding(tok, ctx);
    let block_type = read_block_type(tok, ctx)?;

    let head = if opcode == Opcode::Let {
        let locals = read_let_locals(tok, ctx)?;
        Instruction::new(Opcode::Let, Immediate::Let { block_type, locals })
    } else {
        Instruction::new(opcode, Immediate::Block(block_type))
    };
    out.push(head);

    let mut body = read_instruction_list(tok, ctx)?;
    out.append(&mut body);

    match opcode {
        Opcode::If => {
            if tok.match_keyword(Keyword::Else).is_some() {
                check_label_repeat(tok, ctx, &label);
                out.push(Instruction::bare(Opcode::Else));
                let mut else_body = read_instruction_list(tok, ctx)?;
                out.append(&mut else_body);
            }
        }
        Opcode::Try => {
            if tok.match_keyword(Keyword::Catch).is_some() {
                check_label_repeat(tok, ctx, &label);
                out.push(Instruction::bare(Opcode::Catch));
                let mut catch_body = read_instruction_list(tok, ctx)?;
                out.append(&mut catch_body);
            }
        }
        _ => {}
    }

    if tok.match_keyword(Keyword::End).is_none() {
        let token = tok.peek().clone();
        ctx.error(
            token.span,
            &format!("expected 'end', got {}", token.kind.describe()),
        );
        ctx.labels.pop();
        return None;
    }
    check_label_repeat(tok, ctx, &label);
    out.push(Instruction::bare(Opcode::End));
    ctx.labels.pop();
    Some(())
}

/// `(local t*)*` declarations of a `let` block. The bound names extend the
/// function's local space for the block's extent.
fn read_let_locals(tok: &mut Tokenizer<'_>, ctx: &mut Context<'_>) -> Option<Vec<Locals>> {
    let mut locals = Vec::new();
    while tok.match_lpar_keyword(Keyword::Local).is_some() {
        if matches!(tok.peek().kind, TokenKind::Id(_)) {
            read_bind_var_opt(tok, ctx, IndexSpace::Local);
            let value_type = read_value_type(tok, ctx)?;
            push_local(&mut locals, value_type, 1);
        } else {
            while !matches!(tok.peek().kind, TokenKind::Rpar) {
                let value_type = read_value_type(tok, ctx)?;
                ctx.local_names.new_unbound();
                push_local(&mut locals, value_type, 1);
            }
        }
        expect_rpar(tok, ctx)?;
    }
    Some(locals)
}

/// A folded expression: `(op operand* )` flattens to `operand* op`; folded
/// control forms emit their synthetic structure.
fn read_folded_instruction(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    out: &mut Vec<Instruction>,
) -> Option<()> {
    let lpar = tok.peek().clone();
    if tok.match_lpar().is_none() {
        ctx.error(lpar.span, "expected a folded instruction");
        return None;
    }

    let head = tok.peek().clone();
    match head.kind {
        TokenKind::PlainInstr(op) => {
            tok.read();
            let instruction = read_plain_instruction(tok, ctx, op, head.span)?;
            // Operands first in the flattened order.
            while matches!(tok.peek().kind, TokenKind::Lpar) {
                read_folded_instruction(tok, ctx, out)?;
            }
            out.push(instruction);
            expect_rpar(tok, ctx)?;
            Some(())
        }
        TokenKind::BlockInstr(op) if op == Opcode::If => {
            tok.read();
            read_folded_if(tok, ctx, head.span, out)
        }
        TokenKind::BlockInstr(op) if op == Opcode::Try => {
            tok.read();
            read_folded_try(tok, ctx, head.span, out)
        }
        TokenKind::BlockInstr(op) => {
            tok.read();
            feature_check(ctx, head.span, op)?;
            let _label = read_label_binding(tok, ctx);
            let block_type = read_block_type(tok, ctx)?;
            let head_instr = if op == Opcode::Let {
                let locals = read_let_locals(tok, ctx)?;
                Instruction::new(Opcode::Let, Immediate::Let { block_type, locals })
            } else {
                Instruction::new(op, Immediate::Block(block_type))
            };
            out.push(head_instr);
            let mut body = read_instruction_list(tok, ctx)?;
            out.append(&mut body);
            out.push(Instruction::bare(Opcode::End));
            ctx.labels.pop();
            expect_rpar(tok, ctx)?;
            Some(())
        }
        _ => {
            ctx.error(
                head.span,
                &format!("expected an instruction, got {}", head.kind.describe()),
            );
            None
        }
    }
}

/// `(if label? bt cond* (then …) (else …)?)`.
fn read_folded_if(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    span: Span,
    out: &mut Vec<Instruction>,
) -> Option<()> {
    feature_check(ctx, span, Opcode::If)?;
    let _label = read_label_binding(tok, ctx);
    let block_type = read_block_type(tok, ctx)?;

    // Condition operands come before the `if` in flattened order.
    while matches!(tok.peek().kind, TokenKind::Lpar) && !tok.peek_lpar_keyword(Keyword::Then) {
        read_folded_instruction(tok, ctx, out)?;
    }
    out.push(Instruction::new(Opcode::If, Immediate::Block(block_type)));

    if expect_lpar_keyword(tok, ctx, Keyword::Then).is_none() {
        ctx.labels.pop();
        return None;
    }
    let mut then_body = read_instruction_list(tok, ctx)?;
    out.append(&mut then_body);
    expect_rpar(tok, ctx)?;

    if tok.peek_lpar_keyword(Keyword::Else) {
        tok.match_lpar_keyword(Keyword::Else).unwrap();
        out.push(Instruction::bare(Opcode::Else));
        let mut else_body = read_instruction_list(tok, ctx)?;
        out.append(&mut else_body);
        expect_rpar(tok, ctx)?;
    }

    out.push(Instruction::bare(Opcode::End));
    ctx.labels.pop();
    expect_rpar(tok, ctx)?;
    Some(())
}

/// `(try label? bt body* (catch …))`.
fn read_folded_try(
    tok: &mut Tokenizer<'_>,
    ctx: &mut Context<'_>,
    span: Span,
    out: &mut Vec<Instruction>,
) -> Option<()> {
    feature_check(ctx, span, Opcode::Try)?;
    let _label = read_label_binding(tok, ctx);
    let block_type = read_block_type(tok, ctx)?;

    out.push(Instruction::new(Opcode::Try, Immediate::Block(block_type)));

    let mut body = read_instruction_list(tok, ctx)?;
    out.append(&mut body);

    if expect_lpar_keyword(tok, ctx, Keyword::Catch).is_none() {
        ctx.labels.pop();
        return None;
    }
    out.push(Instruction::bare(Opcode::Catch));
    let mut catch_body = read_instruction_list(tok, ctx)?;
    out.append(&mut catch_body);
    expect_rpar(tok, ctx)?;

    out.push(Instruction::bare(Opcode::End));
    ctx.labels.pop();
    expect_rpar(tok, ctx)?;
    Some(())
}
