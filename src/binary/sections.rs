//! Lazy per-section item sequences.
//!
//! Each known section gets a `read_<name>_section` entry point returning a
//! [`LazySequence`] over its items. A sequence is constructed fresh from the
//! section's byte span, so it is restartable and independent of any other
//! section's cursor. Items decode on demand; a failed item emits diagnostics
//! and, where the format gives the item a declared byte extent (code
//! entries), the cursor skips to that extent so iteration continues.

use super::instructions::read_expression;
use super::module::KnownSection;
use super::reader::Reader;
use super::values::{
    read_element_type, read_limits, read_mutability, read_reference_type, read_value_type,
    ReadContext,
};
use crate::error::{ErrorContext, ErrorSink};
use crate::features::{Feature, Features};
use crate::syntax::module::{
    Code, DataSegment, ElementItems, ElementSegment, Event, Export, ExternalKind, Global, Import,
    ImportDesc, Memory, Start, Table, TypeEntry, TypeUse,
};
use crate::syntax::types::{
    BoundFunctionType, BoundParam, EventType, GlobalType, Locals, MemoryType, ReferenceType,
    SegmentType, TableType, Var,
};

/// An iterator decoding `count` items on demand from a section's bytes.
pub struct LazySequence<'a, T> {
    reader: Reader<'a>,
    cx: ReadContext<'a>,
    desc: &'static str,
    count: u32,
    index: u32,
    stopped: bool,
    read: fn(&mut Reader<'a>, &ReadContext<'a>) -> Option<T>,
}

impl<'a, T> LazySequence<'a, T> {
    fn new(
        section: &KnownSection<'a>,
        features: Features,
        errors: &'a dyn ErrorSink,
        desc: &'static str,
        read: fn(&mut Reader<'a>, &ReadContext<'a>) -> Option<T>,
    ) -> Self {
        let cx = ReadContext::new(features, errors);
        let mut reader = Reader::with_base(section.data, section.offset);
        let count = {
            let _guard = ErrorContext::new(errors, reader.location_here(), desc);
            reader.read_count(errors).unwrap_or(0)
        };
        Self {
            reader,
            cx,
            desc,
            count,
            index: 0,
            stopped: false,
            read,
        }
    }

    /// The declared item count.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl<'a, T> Iterator for LazySequence<'a, T> {
    type Item = Option<T>;

    /// Yields `Some(item)` per well-formed item and `None` for a failed one.
    /// A failed item that made no cursor progress ends iteration, since the
    /// remaining bytes cannot be re-synchronised.
    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.index >= self.count {
            return None;
        }
        self.index += 1;
        let before = self.reader.pos();
        let _guard = ErrorContext::new(self.cx.errors, self.reader.location_here(), self.desc);
        let item = (self.read)(&mut self.reader, &self.cx);
        if item.is_none() && self.reader.pos() == before {
            self.stopped = true;
            return None;
        }
        Some(item)
    }
}

// ============================================================================
// Section entry points
// ============================================================================

pub fn read_type_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, TypeEntry> {
    LazySequence::new(section, features, errors, "type section", read_type_entry)
}

pub fn read_import_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Import> {
    LazySequence::new(section, features, errors, "import section", read_import)
}

/// Function-section items are type indices, paired positionally with code
/// entries.
pub fn read_function_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, u32> {
    LazySequence::new(
        section,
        features,
        errors,
        "function section",
        |reader, cx| reader.read_index(cx.errors, "type index"),
    )
}

pub fn read_table_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Table> {
    LazySequence::new(section, features, errors, "table section", |reader, cx| {
        read_table_type(reader, cx).map(|ty| Table { name: None, ty })
    })
}

pub fn read_memory_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Memory> {
    LazySequence::new(section, features, errors, "memory section", |reader, cx| {
        read_limits(reader, cx).map(|limits| Memory {
            name: None,
            ty: MemoryType { limits },
        })
    })
}

pub fn read_global_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Global> {
    LazySequence::new(section, features, errors, "global section", read_global)
}

pub fn read_export_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Export> {
    LazySequence::new(section, features, errors, "export section", read_export)
}

pub fn read_element_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, ElementSegment> {
    LazySequence::new(
        section,
        features,
        errors,
        "element section",
        read_element_segment,
    )
}

pub fn read_code_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Code> {
    LazySequence::new(section, features, errors, "code section", read_code)
}

pub fn read_data_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, DataSegment> {
    LazySequence::new(section, features, errors, "data section", read_data_segment)
}

pub fn read_event_section<'a>(
    section: &KnownSection<'a>,
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazySequence<'a, Event> {
    LazySequence::new(section, features, errors, "event section", |reader, cx| {
        read_event_type(reader, cx).map(|ty| Event { name: None, ty })
    })
}

/// The start section holds a single function index, not a vector.
pub fn read_start_section(
    section: &KnownSection<'_>,
    errors: &dyn ErrorSink,
) -> Option<Start> {
    let mut reader = Reader::with_base(section.data, section.offset);
    let _guard = ErrorContext::new(errors, reader.location_here(), "start section");
    let func = reader.read_index(errors, "start function index")?;
    Some(Start {
        func: Var::Index(func),
    })
}

/// The data-count section holds a single count.
pub fn read_data_count_section(
    section: &KnownSection<'_>,
    errors: &dyn ErrorSink,
) -> Option<u32> {
    let mut reader = Reader::with_base(section.data, section.offset);
    let _guard = ErrorContext::new(errors, reader.location_here(), "data count section");
    reader.read_u32_leb(errors, "data count")
}

// ============================================================================
// Item readers
// ============================================================================

const TYPE_FUNCTION: u8 = 0x60;

fn read_type_entry(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<TypeEntry> {
    let start = reader.pos();
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "function type");

    let form = reader.read_byte(cx.errors, "type form")?;
    if form != TYPE_FUNCTION {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown type form: {:#04x}", form),
        );
        return None;
    }

    let params = read_value_type_vec(reader, cx, "parameter")?;
    let results = read_value_type_vec(reader, cx, "result")?;
    Some(TypeEntry {
        name: None,
        ty: BoundFunctionType {
            params: params
                .into_iter()
                .map(|value_type| BoundParam {
                    name: None,
                    value_type,
                })
                .collect(),
            results,
        },
    })
}

fn read_value_type_vec(
    reader: &mut Reader<'_>,
    cx: &ReadContext<'_>,
    desc: &str,
) -> Option<Vec<crate::syntax::ValueType>> {
    let count = reader.read_u32_leb(cx.errors, desc)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        out.push(read_value_type(reader, cx)?);
    }
    Some(out)
}

fn read_import(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Import> {
    let start = reader.pos();
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "import");

    let module = reader.read_string(cx.errors, "import module name")?;
    let field = reader.read_string(cx.errors, "import field name")?;
    let kind_byte = reader.read_byte(cx.errors, "import kind")?;
    let Some(kind) = ExternalKind::from_byte(kind_byte) else {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown external kind: {:#04x}", kind_byte),
        );
        return None;
    };

    let desc = match kind {
        ExternalKind::Function => {
            let index = reader.read_index(cx.errors, "type index")?;
            ImportDesc::Function(TypeUse::by_index(index))
        }
        ExternalKind::Table => ImportDesc::Table(read_table_type(reader, cx)?),
        ExternalKind::Memory => ImportDesc::Memory(MemoryType {
            limits: read_limits(reader, cx)?,
        }),
        ExternalKind::Global => ImportDesc::Global(read_global_type(reader, cx)?),
        ExternalKind::Event => {
            if !cx.check_feature(reader, start, Feature::Exceptions, "event import") {
                return None;
            }
            ImportDesc::Event(read_event_type_body(reader, cx)?)
        }
    };

    Some(Import {
        module,
        field,
        name: None,
        desc,
    })
}

fn read_table_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<TableType> {
    let element = read_element_type(reader, cx)?;
    let limits = read_limits(reader, cx)?;
    Some(TableType { limits, element })
}

fn read_global_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<GlobalType> {
    let value_type = read_value_type(reader, cx)?;
    let mutability = read_mutability(reader, cx)?;
    Some(GlobalType {
        value_type,
        mutability,
    })
}

fn read_event_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<EventType> {
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "event");
    read_event_type_body(reader, cx)
}

fn read_event_type_body(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<EventType> {
    let attribute = reader.read_u32_leb(cx.errors, "event attribute")?;
    let type_index = reader.read_index(cx.errors, "event type index")?;
    Some(EventType {
        attribute,
        type_use: TypeUse::by_index(type_index),
    })
}

fn read_global(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Global> {
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "global");
    let ty = read_global_type(reader, cx)?;
    let init = read_expression(reader, cx)?;
    Some(Global {
        name: None,
        ty,
        init,
    })
}

fn read_export(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Export> {
    let start = reader.pos();
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "export");

    let name = reader.read_string(cx.errors, "export name")?;
    let kind_byte = reader.read_byte(cx.errors, "export kind")?;
    let Some(kind) = ExternalKind::from_byte(kind_byte) else {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown external kind: {:#04x}", kind_byte),
        );
        return None;
    };
    let index = reader.read_index(cx.errors, "export index")?;
    Some(Export {
        name,
        kind,
        index: Var::Index(index),
    })
}

// Element segment flag bits: bit 0 selects a non-active mode, bit 1 an
// explicit table (active) or declared (non-active), bit 2 expression items.
const ELEM_PASSIVE_BIT: u32 = 0x1;
const ELEM_EXPLICIT_BIT: u32 = 0x2;
const ELEM_EXPRS_BIT: u32 = 0x4;
const ELEMKIND_FUNCREF: u8 = 0x00;

fn read_element_segment(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<ElementSegment> {
    let start = reader.pos();
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "element segment");

    let flags = reader.read_u32_leb(cx.errors, "element flags")?;
    if flags > 7 {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown element segment flags: {}", flags),
        );
        return None;
    }
    if flags != 0 && !cx.check_feature(reader, start, Feature::BulkMemory, "element segment kind") {
        return None;
    }

    let mode = if flags & ELEM_PASSIVE_BIT == 0 {
        SegmentType::Active
    } else if flags & ELEM_EXPLICIT_BIT == 0 {
        SegmentType::Passive
    } else {
        SegmentType::Declared
    };

    // Active segments always target a table; flags without the explicit bit
    // mean table 0.
    let table = if mode == SegmentType::Active {
        if flags & ELEM_EXPLICIT_BIT != 0 {
            Some(Var::Index(reader.read_index(cx.errors, "table index")?))
        } else {
            Some(Var::Index(0))
        }
    } else {
        None
    };

    let offset = if mode == SegmentType::Active {
        Some(read_expression(reader, cx)?)
    } else {
        None
    };

    // Flags 0 and 4 imply funcref; the others carry an explicit elemkind or
    // reference type byte.
    let has_type_byte = flags & (ELEM_PASSIVE_BIT | ELEM_EXPLICIT_BIT) != 0;
    let element_type = if !has_type_byte {
        ReferenceType::FUNCREF
    } else if flags & ELEM_EXPRS_BIT == 0 {
        let kind = reader.read_byte(cx.errors, "element kind")?;
        if kind != ELEMKIND_FUNCREF {
            cx.errors.on_error(
                reader.location_from(start),
                &format!("unknown element kind: {:#04x}", kind),
            );
            return None;
        }
        ReferenceType::FUNCREF
    } else {
        read_reference_type(reader, cx)?
    };

    let count = reader.read_count(cx.errors)?;
    let items = if flags & ELEM_EXPRS_BIT == 0 {
        let mut funcs = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            funcs.push(Var::Index(reader.read_index(cx.errors, "function index")?));
        }
        ElementItems::Functions(funcs)
    } else {
        let mut exprs = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            exprs.push(read_expression(reader, cx)?);
        }
        ElementItems::Expressions(exprs)
    };

    Some(ElementSegment {
        name: None,
        mode,
        table,
        offset,
        element_type,
        items,
    })
}

const DATA_ACTIVE: u32 = 0;
const DATA_PASSIVE: u32 = 1;
const DATA_ACTIVE_EXPLICIT: u32 = 2;

fn read_data_segment(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<DataSegment> {
    let start = reader.pos();
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "data segment");

    let flags = reader.read_u32_leb(cx.errors, "data flags")?;
    let (mode, memory) = match flags {
        DATA_ACTIVE => (SegmentType::Active, Some(Var::Index(0))),
        DATA_PASSIVE => {
            if !cx.check_feature(reader, start, Feature::BulkMemory, "passive data segment") {
                return None;
            }
            (SegmentType::Passive, None)
        }
        DATA_ACTIVE_EXPLICIT => {
            let index = reader.read_index(cx.errors, "memory index")?;
            (SegmentType::Active, Some(Var::Index(index)))
        }
        _ => {
            cx.errors.on_error(
                reader.location_from(start),
                &format!("unknown data segment flags: {}", flags),
            );
            return None;
        }
    };

    let offset = if mode == SegmentType::Active {
        Some(read_expression(reader, cx)?)
    } else {
        None
    };

    let data = reader.read_raw_vec(cx.errors, "data bytes")?.to_vec();
    Some(DataSegment {
        name: None,
        mode,
        memory,
        offset,
        data,
    })
}

fn read_code(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Code> {
    let _guard = ErrorContext::new(cx.errors, reader.location_here(), "code entry");

    // The entry's size prefix bounds it; on an inner error the parent cursor
    // is already past the entry, so later entries still decode.
    let size = reader.read_u32_leb(cx.errors, "code entry size")?;
    let mut body_reader = reader.sub_reader(size as usize, cx.errors, "code entry")?;

    let locals_count = body_reader.read_count(cx.errors)?;
    let mut locals = Vec::with_capacity(locals_count.min(1024) as usize);
    for _ in 0..locals_count {
        let count = body_reader.read_u32_leb(cx.errors, "locals count")?;
        let value_type = read_value_type(&mut body_reader, cx)?;
        locals.push(Locals { count, value_type });
    }

    let body = read_expression(&mut body_reader, cx)?;
    if !body_reader.is_empty() {
        cx.errors.on_error(
            body_reader.location_here(),
            "trailing bytes after function body",
        );
    }
    Some(Code { locals, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::module::{read_module, Section};
    use crate::error::CollectingErrors;
    use crate::syntax::{Opcode, ValueType};

    fn section_bytes(id: u8, body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        bytes.push(id);
        bytes.push(body.len() as u8);
        bytes.extend_from_slice(body);
        bytes
    }

    fn first_known<'a>(
        module: &crate::binary::module::LazyModule<'a>,
    ) -> crate::binary::module::KnownSection<'a> {
        match module.sections().next().unwrap() {
            Section::Known(k) => k,
            Section::Custom(_) => panic!("expected known section"),
        }
    }

    #[test]
    fn type_section_entries() {
        // Two types: () -> (), (i32 i32) -> (i32)
        let body = [
            0x02, 0x60, 0x00, 0x00, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f,
        ];
        let bytes = section_bytes(1, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let entries: Vec<_> = read_type_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ty.is_empty());
        assert_eq!(entries[1].ty.params.len(), 2);
        assert_eq!(entries[1].ty.results, vec![ValueType::I32]);
        assert!(errors.is_empty());
    }

    #[test]
    fn lazy_sequence_is_restartable() {
        let body = [0x01, 0x60, 0x00, 0x00];
        let bytes = section_bytes(1, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);

        let first: Vec<_> = read_type_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        let second: Vec<_> = read_type_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn import_section_entries() {
        // (import "env" "f" (func (type 0))) and (import "env" "m" (memory 1))
        let body = [
            0x02, // count
            0x03, b'e', b'n', b'v', 0x01, b'f', 0x00, 0x00, // func import
            0x03, b'e', b'n', b'v', 0x01, b'm', 0x02, 0x00, 0x01, // memory import
        ];
        let bytes = section_bytes(2, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let imports: Vec<_> = read_import_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].module, "env");
        assert_eq!(imports[0].field, "f");
        assert_eq!(imports[0].desc.kind(), ExternalKind::Function);
        assert_eq!(imports[1].desc.kind(), ExternalKind::Memory);
        assert!(errors.is_empty());
    }

    #[test]
    fn import_bad_utf8_fails_item() {
        let body = [
            0x01, // count
            0x02, 0xc0, 0x20, 0x01, b'f', 0x00, 0x00,
        ];
        let bytes = section_bytes(2, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let imports: Vec<_> = read_import_section(&section, Features::mvp(), &errors).collect();
        assert_eq!(imports, vec![None]);
        assert!(errors
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("UTF-8")));
    }

    #[test]
    fn code_section_error_locality() {
        // Two entries: the first has an unknown opcode inside its sized
        // extent, the second is fine.
        let body = [
            0x02, // count
            0x03, 0x00, 0x1f, 0x0b, // entry 0: no locals, bad opcode 0x1f
            0x02, 0x00, 0x0b, // entry 1: no locals, end
        ];
        let bytes = section_bytes(10, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let entries: Vec<_> = read_code_section(&section, Features::mvp(), &errors).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_none());
        assert!(entries[1].is_some());
        assert!(errors
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("unknown opcode")));
    }

    #[test]
    fn global_section() {
        // (global i32 (i32.const 7))
        let body = [0x01, 0x7f, 0x00, 0x41, 0x07, 0x0b];
        let bytes = section_bytes(6, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let globals: Vec<_> = read_global_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].ty.value_type, ValueType::I32);
        assert_eq!(globals[0].init.len(), 2);
        assert_eq!(globals[0].init[0].opcode, Opcode::I32Const);
    }

    #[test]
    fn element_segment_mvp_form() {
        // flags 0, offset (i32.const 0, end), two function indices
        let body = [0x01, 0x00, 0x41, 0x00, 0x0b, 0x02, 0x00, 0x01];
        let bytes = section_bytes(9, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let segments: Vec<_> = read_element_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].mode, SegmentType::Active);
        assert_eq!(segments[0].element_type, ReferenceType::FUNCREF);
        assert_eq!(
            segments[0].items,
            ElementItems::Functions(vec![Var::Index(0), Var::Index(1)])
        );
    }

    #[test]
    fn passive_element_requires_bulk_memory() {
        // flags 1, elemkind 0, one function index
        let body = [0x01, 0x01, 0x00, 0x01, 0x00];
        let bytes = section_bytes(9, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let segments: Vec<_> = read_element_section(&section, Features::mvp(), &errors).collect();
        assert_eq!(segments, vec![None]);

        let errors = CollectingErrors::new();
        let segments: Vec<_> = read_element_section(&section, Features::all(), &errors)
            .flatten()
            .collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].mode, SegmentType::Passive);
    }

    #[test]
    fn data_segment_forms() {
        // Active: flags 0, offset, 3 bytes.
        let body = [0x01, 0x00, 0x41, 0x08, 0x0b, 0x03, b'a', b'b', b'c'];
        let bytes = section_bytes(11, &body);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        let segments: Vec<_> = read_data_section(&section, Features::mvp(), &errors)
            .flatten()
            .collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].data, b"abc");
        assert_eq!(segments[0].mode, SegmentType::Active);
    }

    #[test]
    fn start_and_data_count() {
        let bytes = section_bytes(8, &[0x02]);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        assert_eq!(
            read_start_section(&section, &errors),
            Some(Start {
                func: Var::Index(2)
            })
        );

        let bytes = section_bytes(12, &[0x03]);
        let module = read_module(&bytes, Features::mvp(), &errors);
        let section = first_known(&module);
        assert_eq!(read_data_count_section(&section, &errors), Some(3));
    }
}
