//! Tokens produced by the text-format lexer.
//!
//! Words are classified as they are lexed: grammar keywords, value types,
//! SIMD shapes, and instruction mnemonics (through the opcode table's name
//! index) each get their own kind, so the parser dispatches on structure
//! rather than re-examining strings. Numeric tokens keep their source text
//! plus a [`LiteralInfo`]; conversion to a concrete type happens in
//! [`super::numeric`] once the parser knows the target width.

use crate::error::Location;
use crate::syntax::opcode::Opcode;
use crate::syntax::types::{HeapKind, ValueType};
use std::fmt;

/// A token's place in the source: byte span plus the line/column of its
/// first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn to_location(self) -> Location {
        Location::new(self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    None,
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Normal,
    Nan,
    NanPayload,
    Infinity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Decimal,
    Hex,
}

/// Shape information about a numeric literal, gathered while lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralInfo {
    pub sign: Sign,
    pub kind: LiteralKind,
    pub base: Base,
    pub has_underscores: bool,
}

impl LiteralInfo {
    pub fn nat(base: Base, has_underscores: bool) -> Self {
        Self {
            sign: Sign::None,
            kind: LiteralKind::Normal,
            base,
            has_underscores,
        }
    }
}

/// A numeric literal: its source text and shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub text: String,
    pub info: LiteralInfo,
}

/// Grammar keywords (everything structural that is not an instruction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Module,
    Type,
    Func,
    Import,
    Export,
    Memory,
    Data,
    Elem,
    Table,
    Global,
    Event,
    Local,
    Param,
    Result,
    Mut,
    Offset,
    Item,
    Then,
    Else,
    End,
    Catch,
    Declare,
    Shared,
    Start,
    Ref,
    Null,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        Some(match word {
            "module" => Keyword::Module,
            "type" => Keyword::Type,
            "func" => Keyword::Func,
            "import" => Keyword::Import,
            "export" => Keyword::Export,
            "memory" => Keyword::Memory,
            "data" => Keyword::Data,
            "elem" => Keyword::Elem,
            "table" => Keyword::Table,
            "global" => Keyword::Global,
            "event" => Keyword::Event,
            "local" => Keyword::Local,
            "param" => Keyword::Param,
            "result" => Keyword::Result,
            "mut" => Keyword::Mut,
            "offset" => Keyword::Offset,
            "item" => Keyword::Item,
            "then" => Keyword::Then,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "catch" => Keyword::Catch,
            "declare" => Keyword::Declare,
            "shared" => Keyword::Shared,
            "start" => Keyword::Start,
            "ref" => Keyword::Ref,
            "null" => Keyword::Null,
            _ => return None,
        })
    }
}

/// The SIMD lane shape prefixes used by `v128.const` literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdShape {
    I8x16,
    I16x8,
    I32x4,
    I64x2,
    F32x4,
    F64x2,
}

impl SimdShape {
    fn from_word(word: &str) -> Option<SimdShape> {
        Some(match word {
            "i8x16" => SimdShape::I8x16,
            "i16x8" => SimdShape::I16x8,
            "i32x4" => SimdShape::I32x4,
            "i64x2" => SimdShape::I64x2,
            "f32x4" => SimdShape::F32x4,
            "f64x2" => SimdShape::F64x2,
            _ => return None,
        })
    }

    /// Number of lanes a literal of this shape carries.
    pub fn lanes(self) -> usize {
        match self {
            SimdShape::I8x16 => 16,
            SimdShape::I16x8 => 8,
            SimdShape::I32x4 | SimdShape::F32x4 => 4,
            SimdShape::I64x2 | SimdShape::F64x2 => 2,
        }
    }
}

fn value_type_from_word(word: &str) -> Option<ValueType> {
    use crate::syntax::types::{NumericType, ReferenceKind, ReferenceType};
    Some(match word {
        "i32" => ValueType::Numeric(NumericType::I32),
        "i64" => ValueType::Numeric(NumericType::I64),
        "f32" => ValueType::Numeric(NumericType::F32),
        "f64" => ValueType::Numeric(NumericType::F64),
        "v128" => ValueType::Numeric(NumericType::V128),
        "funcref" => ValueType::Reference(ReferenceType::Kind(ReferenceKind::Funcref)),
        "externref" => ValueType::Reference(ReferenceType::Kind(ReferenceKind::Externref)),
        "exnref" => ValueType::Reference(ReferenceType::Kind(ReferenceKind::Exnref)),
        "anyref" => ValueType::Reference(ReferenceType::Kind(ReferenceKind::Anyref)),
        "eqref" => ValueType::Reference(ReferenceType::Kind(ReferenceKind::Eqref)),
        "i31ref" => ValueType::Reference(ReferenceType::Kind(ReferenceKind::I31ref)),
        _ => return None,
    })
}

fn heap_kind_from_word(word: &str) -> Option<HeapKind> {
    // `func` doubles as a grammar keyword and wins classification; the parser
    // maps it back to a heap kind where one is expected.
    Some(match word {
        "extern" => HeapKind::Extern,
        "exn" => HeapKind::Exn,
        "any" => HeapKind::Any,
        "eq" => HeapKind::Eq,
        "i31" => HeapKind::I31,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Lpar,
    Rpar,
    /// `$name`; the stored string excludes the sigil.
    Id(String),
    Nat(Literal),
    Int(Literal),
    Float(Literal),
    /// A quoted string with escapes resolved; raw bytes, not UTF-8.
    Text(Vec<u8>),
    ValueType(ValueType),
    HeapKind(HeapKind),
    Keyword(Keyword),
    /// Any instruction that is not a block starter.
    PlainInstr(Opcode),
    /// `block`, `loop`, `if`, `try`, `let`.
    BlockInstr(Opcode),
    AlignEqNat(Literal),
    OffsetEqNat(Literal),
    SimdShape(SimdShape),
    /// A word with no meaning in the grammar.
    Reserved(String),
    Eof,
}

impl TokenKind {
    /// Classifies a bare word. Grammar keywords win over instruction names so
    /// that `end`/`else`/`catch` parse structurally.
    pub fn classify_word(word: &str) -> TokenKind {
        if let Some(stripped) = word.strip_prefix("align=") {
            return TokenKind::AlignEqNat(nat_literal(stripped));
        }
        if let Some(stripped) = word.strip_prefix("offset=") {
            return TokenKind::OffsetEqNat(nat_literal(stripped));
        }
        if let Some(kw) = Keyword::from_word(word) {
            return TokenKind::Keyword(kw);
        }
        if let Some(vt) = value_type_from_word(word) {
            return TokenKind::ValueType(vt);
        }
        if let Some(heap) = heap_kind_from_word(word) {
            return TokenKind::HeapKind(heap);
        }
        if let Some(shape) = SimdShape::from_word(word) {
            return TokenKind::SimdShape(shape);
        }
        if let Some(op) = Opcode::from_name(word) {
            return if op.starts_block() {
                TokenKind::BlockInstr(op)
            } else {
                TokenKind::PlainInstr(op)
            };
        }
        TokenKind::Reserved(word.to_string())
    }

    /// A short printable description used in "expected X, got Y" messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Lpar => "'('".to_string(),
            TokenKind::Rpar => "')'".to_string(),
            TokenKind::Id(name) => format!("${}", name),
            TokenKind::Nat(lit) | TokenKind::Int(lit) | TokenKind::Float(lit) => {
                lit.text.clone()
            }
            TokenKind::Text(_) => "string".to_string(),
            TokenKind::ValueType(vt) => format!("{}", vt),
            TokenKind::HeapKind(h) => format!("{}", h),
            TokenKind::Keyword(_) => "keyword".to_string(),
            TokenKind::PlainInstr(op) | TokenKind::BlockInstr(op) => op.text().to_string(),
            TokenKind::AlignEqNat(lit) => format!("align={}", lit.text),
            TokenKind::OffsetEqNat(lit) => format!("offset={}", lit.text),
            TokenKind::SimdShape(_) => "simd shape".to_string(),
            TokenKind::Reserved(word) => format!("'{}'", word),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

fn nat_literal(text: &str) -> Literal {
    let (base, digits) = match text.strip_prefix("0x") {
        Some(_) => (Base::Hex, text),
        None => (Base::Decimal, text),
    };
    Literal {
        text: digits.to_string(),
        info: LiteralInfo::nat(base, digits.contains('_')),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn location(&self) -> Location {
        self.span.to_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_keywords_win_over_instructions() {
        assert_eq!(
            TokenKind::classify_word("end"),
            TokenKind::Keyword(Keyword::End)
        );
        assert_eq!(
            TokenKind::classify_word("else"),
            TokenKind::Keyword(Keyword::Else)
        );
        assert_eq!(
            TokenKind::classify_word("catch"),
            TokenKind::Keyword(Keyword::Catch)
        );
    }

    #[test]
    fn instruction_classification() {
        assert_eq!(
            TokenKind::classify_word("i32.add"),
            TokenKind::PlainInstr(Opcode::I32Add)
        );
        assert_eq!(
            TokenKind::classify_word("block"),
            TokenKind::BlockInstr(Opcode::Block)
        );
        assert_eq!(
            TokenKind::classify_word("let"),
            TokenKind::BlockInstr(Opcode::Let)
        );
        assert_eq!(
            TokenKind::classify_word("select"),
            TokenKind::PlainInstr(Opcode::Select)
        );
    }

    #[test]
    fn value_types_and_shapes() {
        assert_eq!(
            TokenKind::classify_word("i32"),
            TokenKind::ValueType(ValueType::I32)
        );
        assert!(matches!(
            TokenKind::classify_word("funcref"),
            TokenKind::ValueType(_)
        ));
        assert_eq!(
            TokenKind::classify_word("i8x16"),
            TokenKind::SimdShape(SimdShape::I8x16)
        );
        assert_eq!(SimdShape::I16x8.lanes(), 8);
    }

    #[test]
    fn align_and_offset_words() {
        match TokenKind::classify_word("align=8") {
            TokenKind::AlignEqNat(lit) => {
                assert_eq!(lit.text, "8");
                assert_eq!(lit.info.base, Base::Decimal);
            }
            other => panic!("unexpected classification: {:?}", other),
        }
        match TokenKind::classify_word("offset=0x10") {
            TokenKind::OffsetEqNat(lit) => {
                assert_eq!(lit.text, "0x10");
                assert_eq!(lit.info.base, Base::Hex);
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn unknown_words_are_reserved() {
        assert_eq!(
            TokenKind::classify_word("frobnicate"),
            TokenKind::Reserved("frobnicate".to_string())
        );
    }

    #[test]
    fn span_display() {
        let span = Span {
            start: 0,
            end: 4,
            line: 2,
            column: 7,
        };
        assert_eq!(format!("{}", span), "2:7");
    }
}
