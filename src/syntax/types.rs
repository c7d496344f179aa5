//! Type-level vocabulary of the unified module tree.
//!
//! These are the leaves shared by the binary and text front-ends: numeric and
//! reference value types, limits, and the composite types attached to
//! imports, tables, memories, globals, and events. Binary byte encodings live
//! alongside each type as `from_byte` constructors; the text keyword spelling
//! is the `Display` impl.

use crate::error::Location;
use crate::features::Feature;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Numeric and reference types
// ============================================================================

/// A plain numeric value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    I32,
    I64,
    F32,
    F64,
    V128,
}

impl NumericType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7f => Some(NumericType::I32),
            0x7e => Some(NumericType::I64),
            0x7d => Some(NumericType::F32),
            0x7c => Some(NumericType::F64),
            0x7b => Some(NumericType::V128),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            NumericType::I32 => 0x7f,
            NumericType::I64 => 0x7e,
            NumericType::F32 => 0x7d,
            NumericType::F64 => 0x7c,
            NumericType::V128 => 0x7b,
        }
    }

    pub fn required_feature(self) -> Feature {
        match self {
            NumericType::V128 => Feature::Simd,
            _ => Feature::Mvp,
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NumericType::I32 => "i32",
            NumericType::I64 => "i64",
            NumericType::F32 => "f32",
            NumericType::F64 => "f64",
            NumericType::V128 => "v128",
        };
        write!(f, "{}", s)
    }
}

/// A named reference-type shorthand (`funcref`, `externref`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Funcref,
    Externref,
    Exnref,
    Anyref,
    Eqref,
    I31ref,
}

impl ReferenceKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x70 => Some(ReferenceKind::Funcref),
            0x6f => Some(ReferenceKind::Externref),
            0x68 => Some(ReferenceKind::Exnref),
            0x6e => Some(ReferenceKind::Anyref),
            0x6d => Some(ReferenceKind::Eqref),
            0x6a => Some(ReferenceKind::I31ref),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ReferenceKind::Funcref => 0x70,
            ReferenceKind::Externref => 0x6f,
            ReferenceKind::Exnref => 0x68,
            ReferenceKind::Anyref => 0x6e,
            ReferenceKind::Eqref => 0x6d,
            ReferenceKind::I31ref => 0x6a,
        }
    }

    /// The feature required to use this kind as a value type.
    pub fn required_feature(self) -> Feature {
        match self {
            ReferenceKind::Funcref | ReferenceKind::Externref => Feature::ReferenceTypes,
            ReferenceKind::Exnref => Feature::Exceptions,
            ReferenceKind::Anyref | ReferenceKind::Eqref | ReferenceKind::I31ref => Feature::Gc,
        }
    }

    /// The heap type this shorthand abbreviates: `funcref` = `(ref null func)`.
    pub fn heap_kind(self) -> HeapKind {
        match self {
            ReferenceKind::Funcref => HeapKind::Func,
            ReferenceKind::Externref => HeapKind::Extern,
            ReferenceKind::Exnref => HeapKind::Exn,
            ReferenceKind::Anyref => HeapKind::Any,
            ReferenceKind::Eqref => HeapKind::Eq,
            ReferenceKind::I31ref => HeapKind::I31,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferenceKind::Funcref => "funcref",
            ReferenceKind::Externref => "externref",
            ReferenceKind::Exnref => "exnref",
            ReferenceKind::Anyref => "anyref",
            ReferenceKind::Eqref => "eqref",
            ReferenceKind::I31ref => "i31ref",
        };
        write!(f, "{}", s)
    }
}

/// A heap kind named in a `(ref <heap>)` type or a `ref.null` immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapKind {
    Func,
    Extern,
    Exn,
    Any,
    Eq,
    I31,
}

impl fmt::Display for HeapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeapKind::Func => "func",
            HeapKind::Extern => "extern",
            HeapKind::Exn => "exn",
            HeapKind::Any => "any",
            HeapKind::Eq => "eq",
            HeapKind::I31 => "i31",
        };
        write!(f, "{}", s)
    }
}

/// The target of a reference: either a named heap kind or a type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapType {
    Kind(HeapKind),
    Index(u32),
}

impl fmt::Display for HeapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapType::Kind(kind) => write!(f, "{}", kind),
            HeapType::Index(index) => write!(f, "{}", index),
        }
    }
}

/// A full reference type with explicit nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefType {
    pub null: bool,
    pub heap: HeapType,
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            write!(f, "ref null {}", self.heap)
        } else {
            write!(f, "ref {}", self.heap)
        }
    }
}

/// Either a shorthand reference kind or a full `(ref …)` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Kind(ReferenceKind),
    Ref(RefType),
}

impl ReferenceType {
    pub const FUNCREF: ReferenceType = ReferenceType::Kind(ReferenceKind::Funcref);
    pub const EXTERNREF: ReferenceType = ReferenceType::Kind(ReferenceKind::Externref);

    pub fn required_feature(self) -> Feature {
        match self {
            ReferenceType::Kind(kind) => kind.required_feature(),
            ReferenceType::Ref(_) => Feature::FunctionReferences,
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceType::Kind(kind) => write!(f, "{}", kind),
            ReferenceType::Ref(rt) => write!(f, "{}", rt),
        }
    }
}

/// Any value type: numeric or reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Numeric(NumericType),
    Reference(ReferenceType),
}

impl ValueType {
    pub const I32: ValueType = ValueType::Numeric(NumericType::I32);
    pub const I64: ValueType = ValueType::Numeric(NumericType::I64);
    pub const F32: ValueType = ValueType::Numeric(NumericType::F32);
    pub const F64: ValueType = ValueType::Numeric(NumericType::F64);
    pub const V128: ValueType = ValueType::Numeric(NumericType::V128);

    /// Decodes a single-byte value type. `(ref …)` forms use a two-byte
    /// encoding handled by the binary reader directly.
    pub fn from_byte(byte: u8) -> Option<Self> {
        NumericType::from_byte(byte)
            .map(ValueType::Numeric)
            .or_else(|| {
                ReferenceKind::from_byte(byte)
                    .map(|k| ValueType::Reference(ReferenceType::Kind(k)))
            })
    }

    pub fn required_feature(self) -> Feature {
        match self {
            ValueType::Numeric(n) => n.required_feature(),
            ValueType::Reference(r) => r.required_feature(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Numeric(n) => write!(f, "{}", n),
            ValueType::Reference(r) => write!(f, "{}", r),
        }
    }
}

// ============================================================================
// Block types
// ============================================================================

/// The type of a structured control block.
///
/// Renders as `[]`, `[<valtype>]`, or `type[<n>]` in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    #[default]
    Void,
    Value(ValueType),
    /// A function-type index; requires the multi-value feature.
    TypeIndex(u32),
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Void => write!(f, "[]"),
            BlockType::Value(v) => write!(f, "[{}]", v),
            BlockType::TypeIndex(n) => write!(f, "type[{}]", n),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    Const,
    Var,
}

impl Mutability {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Mutability::Const),
            1 => Some(Mutability::Var),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shared {
    #[default]
    No,
    Yes,
}

/// How an element or data segment takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    Active,
    Passive,
    Declared,
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SegmentType::Active => "active",
            SegmentType::Passive => "passive",
            SegmentType::Declared => "declared",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Composite types
// ============================================================================

/// Size bounds for a table or memory, with an optional shared flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
    pub shared: Shared,
}

impl Limits {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self {
            min,
            max,
            shared: Shared::No,
        }
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min: {}", self.min)?;
        if let Some(max) = self.max {
            write!(f, " max: {}", max)?;
        }
        if self.shared == Shared::Yes {
            write!(f, " shared")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableType {
    pub limits: Limits,
    pub element: ReferenceType,
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.limits, self.element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryType {
    pub limits: Limits,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.limits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutability: Mutability,
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mutability {
            Mutability::Const => write!(f, "{}", self.value_type),
            Mutability::Var => write!(f, "(mut {})", self.value_type),
        }
    }
}

/// The type of an exception event: an attribute word plus a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct EventType {
    /// Only attribute 0 ("exception") is defined by the proposal.
    pub attribute: u32,
    pub type_use: TypeUse,
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FunctionType {
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        Self { params, results }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> (")?;
        for (i, r) in self.results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", r)?;
        }
        write!(f, ")")
    }
}

/// A parameter with an optional text-format name binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundParam {
    pub name: Option<String>,
    pub value_type: ValueType,
}

/// A function signature whose parameters may carry names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BoundFunctionType {
    pub params: Vec<BoundParam>,
    pub results: Vec<ValueType>,
}

impl BoundFunctionType {
    /// Drops the parameter names, leaving the plain signature.
    pub fn unbind(&self) -> FunctionType {
        FunctionType {
            params: self.params.iter().map(|p| p.value_type).collect(),
            results: self.results.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

/// A reference to a function type: by index, inline, or both.
///
/// Text-origin items may give the signature inline; the parser's type map
/// appends a synthetic type entry for inline signatures not already present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeUse {
    pub index: Option<Var>,
    pub ty: BoundFunctionType,
}

impl TypeUse {
    pub fn by_index(index: impl Into<Var>) -> Self {
        Self {
            index: Some(index.into()),
            ty: BoundFunctionType::default(),
        }
    }

    /// Whether this use carries no explicit index and must be resolved
    /// through the deferred type map.
    pub fn is_inline(&self) -> bool {
        self.index.is_none()
    }
}

/// A run of locals of one type, as declared in a code entry or `let` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locals {
    pub count: u32,
    pub value_type: ValueType,
}

// ============================================================================
// Variable references
// ============================================================================

/// A reference to an indexed item: concrete index, or a symbolic name that
/// the text front-end resolves once the whole module has been read.
///
/// A symbolic name keeps the source location it was written at, so the
/// resolution pass can report undefined names where they appear. Equality
/// and hashing compare the name alone, matching [`Instruction`]'s treatment
/// of locations.
///
/// [`Instruction`]: super::instruction::Instruction
#[derive(Debug, Clone)]
pub enum Var {
    Index(u32),
    Name(String, Location),
}

impl Var {
    /// The concrete index, if resolution has happened (always, for
    /// binary-origin modules).
    pub fn index(&self) -> Option<u32> {
        match self {
            Var::Index(n) => Some(*n),
            Var::Name(..) => None,
        }
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Var::Index(a), Var::Index(b)) => a == b,
            (Var::Name(a, _), Var::Name(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Var::Index(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            Var::Name(name, _) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl From<u32> for Var {
    fn from(index: u32) -> Self {
        Var::Index(index)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Index(n) => write!(f, "{}", n),
            Var::Name(name, _) => write!(f, "${}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_bytes_round_trip() {
        for byte in [0x7f, 0x7e, 0x7d, 0x7c, 0x7b] {
            let vt = ValueType::from_byte(byte).unwrap();
            match vt {
                ValueType::Numeric(n) => assert_eq!(n.to_byte(), byte),
                ValueType::Reference(_) => panic!("expected numeric"),
            }
        }
        for byte in [0x70, 0x6f, 0x68, 0x6e, 0x6d, 0x6a] {
            assert!(matches!(
                ValueType::from_byte(byte),
                Some(ValueType::Reference(_))
            ));
        }
        assert_eq!(ValueType::from_byte(0x17), None);
    }

    #[test]
    fn reference_feature_gates() {
        assert_eq!(
            ReferenceKind::Externref.required_feature(),
            Feature::ReferenceTypes
        );
        assert_eq!(ReferenceKind::Exnref.required_feature(), Feature::Exceptions);
        assert_eq!(ReferenceKind::I31ref.required_feature(), Feature::Gc);
    }

    #[test]
    fn block_type_display() {
        assert_eq!(format!("{}", BlockType::Void), "[]");
        assert_eq!(format!("{}", BlockType::Value(ValueType::I32)), "[i32]");
        assert_eq!(format!("{}", BlockType::TypeIndex(8)), "type[8]");
    }

    #[test]
    fn ref_type_display() {
        let rt = RefType {
            null: true,
            heap: HeapType::Kind(HeapKind::Func),
        };
        assert_eq!(format!("{}", rt), "ref null func");
        let rt = RefType {
            null: false,
            heap: HeapType::Index(3),
        };
        assert_eq!(format!("{}", rt), "ref 3");
    }

    #[test]
    fn global_type_display() {
        let g = GlobalType {
            value_type: ValueType::I64,
            mutability: Mutability::Var,
        };
        assert_eq!(format!("{}", g), "(mut i64)");
    }

    #[test]
    fn var_equality_ignores_location() {
        let a = Var::Name("f".to_string(), Location::new(10, 12));
        let b = Var::Name("f".to_string(), Location::new(30, 32));
        assert_eq!(a, b);
        assert_ne!(a, Var::Name("g".to_string(), Location::new(10, 12)));
        assert_ne!(a, Var::Index(0));
    }

    #[test]
    fn unbind_drops_names() {
        let bound = BoundFunctionType {
            params: vec![
                BoundParam {
                    name: Some("x".to_string()),
                    value_type: ValueType::I32,
                },
                BoundParam {
                    name: None,
                    value_type: ValueType::F64,
                },
            ],
            results: vec![ValueType::I32],
        };
        let plain = bound.unbind();
        assert_eq!(plain.params, vec![ValueType::I32, ValueType::F64]);
        assert_eq!(plain.results, vec![ValueType::I32]);
    }
}
