//! Module-level items of the unified tree.
//!
//! Both front-ends populate these types: the binary reader per section, the
//! text parser per field. A materialised [`Module`] is an ordered list of
//! items; binary-origin modules carry separate `Function` and `Code` items
//! until [`crate::binary::to_module`] zips them, text-origin modules carry
//! functions with inline bodies and no `Code` items.

use super::instruction::Expression;
use super::types::{
    BoundFunctionType, EventType, GlobalType, Locals, MemoryType, ReferenceType, SegmentType,
    TableType, Var,
};
use std::fmt;

// ============================================================================
// Sections
// ============================================================================

/// Identifier of a known (non-custom) section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
    DataCount,
    Event,
}

impl SectionId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(SectionId::Type),
            2 => Some(SectionId::Import),
            3 => Some(SectionId::Function),
            4 => Some(SectionId::Table),
            5 => Some(SectionId::Memory),
            6 => Some(SectionId::Global),
            7 => Some(SectionId::Export),
            8 => Some(SectionId::Start),
            9 => Some(SectionId::Element),
            10 => Some(SectionId::Code),
            11 => Some(SectionId::Data),
            12 => Some(SectionId::DataCount),
            13 => Some(SectionId::Event),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            SectionId::Type => 1,
            SectionId::Import => 2,
            SectionId::Function => 3,
            SectionId::Table => 4,
            SectionId::Memory => 5,
            SectionId::Global => 6,
            SectionId::Export => 7,
            SectionId::Start => 8,
            SectionId::Element => 9,
            SectionId::Code => 10,
            SectionId::Data => 11,
            SectionId::DataCount => 12,
            SectionId::Event => 13,
        }
    }

    /// Position in the canonical section ordering. Known sections must appear
    /// in strictly increasing rank; note DataCount sits between Element and
    /// Code, not at its numeric position.
    pub fn order_rank(self) -> u8 {
        match self {
            SectionId::Type => 1,
            SectionId::Import => 2,
            SectionId::Function => 3,
            SectionId::Table => 4,
            SectionId::Memory => 5,
            SectionId::Global => 6,
            SectionId::Export => 7,
            SectionId::Start => 8,
            SectionId::Element => 9,
            SectionId::DataCount => 10,
            SectionId::Code => 11,
            SectionId::Data => 12,
            SectionId::Event => 13,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SectionId::Type => "type",
            SectionId::Import => "import",
            SectionId::Function => "function",
            SectionId::Table => "table",
            SectionId::Memory => "memory",
            SectionId::Global => "global",
            SectionId::Export => "export",
            SectionId::Start => "start",
            SectionId::Element => "element",
            SectionId::Code => "code",
            SectionId::Data => "data",
            SectionId::DataCount => "data count",
            SectionId::Event => "event",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What an import or export refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
    Event,
}

impl ExternalKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ExternalKind::Function),
            1 => Some(ExternalKind::Table),
            2 => Some(ExternalKind::Memory),
            3 => Some(ExternalKind::Global),
            4 => Some(ExternalKind::Event),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExternalKind::Function => "func",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
            ExternalKind::Event => "event",
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub use super::types::TypeUse;

// ============================================================================
// Items
// ============================================================================

/// An explicit `(type …)` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    pub name: Option<String>,
    pub ty: BoundFunctionType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    Function(TypeUse),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
    Event(EventType),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDesc::Function(_) => ExternalKind::Function,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
            ImportDesc::Event(_) => ExternalKind::Event,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub field: String,
    /// Text-format binding for the imported item, e.g. `(func $f (import …))`.
    pub name: Option<String>,
    pub desc: ImportDesc,
}

/// A defined function: signature use, locals, and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<String>,
    pub type_use: TypeUse,
    pub locals: Vec<Locals>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: Option<String>,
    pub ty: TableType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub name: Option<String>,
    pub ty: MemoryType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: Option<String>,
    pub ty: GlobalType,
    pub init: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub index: Var,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Start {
    pub func: Var,
}

/// The payload of an element segment: function references by index, or full
/// element expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementItems {
    Functions(Vec<Var>),
    Expressions(Vec<Expression>),
}

impl ElementItems {
    pub fn len(&self) -> usize {
        match self {
            ElementItems::Functions(v) => v.len(),
            ElementItems::Expressions(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementSegment {
    pub name: Option<String>,
    pub mode: SegmentType,
    /// Target table for active segments.
    pub table: Option<Var>,
    /// Offset expression for active segments.
    pub offset: Option<Expression>,
    pub element_type: ReferenceType,
    pub items: ElementItems,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    pub name: Option<String>,
    pub mode: SegmentType,
    /// Target memory for active segments.
    pub memory: Option<Var>,
    /// Offset expression for active segments.
    pub offset: Option<Expression>,
    pub data: Vec<u8>,
}

/// A code-section entry, paired positionally with a function-section entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub locals: Vec<Locals>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: Option<String>,
    pub ty: EventType,
}

/// Any top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    Type(TypeEntry),
    Import(Import),
    Function(Function),
    Table(Table),
    Memory(Memory),
    Global(Global),
    Export(Export),
    Start(Start),
    Element(ElementSegment),
    Data(DataSegment),
    DataCount(u32),
    Code(Code),
    Event(Event),
}

/// A materialised module: an ordered list of items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: Option<String>,
    pub items: Vec<ModuleItem>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ModuleItem) {
        self.items.push(item);
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeEntry> {
        self.items.iter().filter_map(|i| match i {
            ModuleItem::Type(t) => Some(t),
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.items.iter().filter_map(|i| match i {
            ModuleItem::Import(imp) => Some(imp),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|i| match i {
            ModuleItem::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.items.iter().filter_map(|i| match i {
            ModuleItem::Export(e) => Some(e),
            _ => None,
        })
    }

    /// Count of imports of the given kind, for index-space bookkeeping.
    pub fn import_count(&self, kind: ExternalKind) -> u32 {
        self.imports().filter(|i| i.desc.kind() == kind).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_id_round_trip() {
        for byte in 1..=13u8 {
            let id = SectionId::from_byte(byte).unwrap();
            assert_eq!(id.to_byte(), byte);
        }
        assert_eq!(SectionId::from_byte(0), None);
        assert_eq!(SectionId::from_byte(14), None);
    }

    #[test]
    fn data_count_ranks_before_code() {
        assert!(SectionId::Element.order_rank() < SectionId::DataCount.order_rank());
        assert!(SectionId::DataCount.order_rank() < SectionId::Code.order_rank());
        assert!(SectionId::Code.order_rank() < SectionId::Data.order_rank());
    }

    #[test]
    fn external_kind_bytes() {
        assert_eq!(ExternalKind::from_byte(0), Some(ExternalKind::Function));
        assert_eq!(ExternalKind::from_byte(4), Some(ExternalKind::Event));
        assert_eq!(ExternalKind::from_byte(5), None);
    }

    #[test]
    fn import_counts_by_kind() {
        let mut module = Module::new();
        module.push(ModuleItem::Import(Import {
            module: "env".to_string(),
            field: "f".to_string(),
            name: None,
            desc: ImportDesc::Function(TypeUse::by_index(0)),
        }));
        module.push(ModuleItem::Import(Import {
            module: "env".to_string(),
            field: "m".to_string(),
            name: None,
            desc: ImportDesc::Memory(crate::syntax::types::MemoryType {
                limits: crate::syntax::types::Limits::new(1, None),
            }),
        }));
        assert_eq!(module.import_count(ExternalKind::Function), 1);
        assert_eq!(module.import_count(ExternalKind::Memory), 1);
        assert_eq!(module.import_count(ExternalKind::Global), 0);
    }
}
