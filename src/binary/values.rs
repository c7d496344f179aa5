//! Shared decoders for the small typed values that appear throughout
//! sections and instruction immediates.

use super::reader::Reader;
use crate::error::ErrorSink;
use crate::features::{Feature, Features};
use crate::syntax::types::{
    BlockType, HeapType, Limits, Mutability, RefType, ReferenceKind, ReferenceType, Shared,
    ValueType,
};

/// State threaded through every binary read: the feature set and the sink.
#[derive(Clone, Copy)]
pub struct ReadContext<'a> {
    pub features: Features,
    pub errors: &'a dyn ErrorSink,
}

impl<'a> ReadContext<'a> {
    pub fn new(features: Features, errors: &'a dyn ErrorSink) -> Self {
        Self { features, errors }
    }

    /// Diagnoses a form gated behind a disabled feature.
    pub fn check_feature(&self, reader: &Reader<'_>, start: usize, feature: Feature, what: &str) -> bool {
        if self.features.allows(feature) {
            true
        } else {
            self.errors.on_error(
                reader.location_from(start),
                &format!("{} not allowed", what),
            );
            false
        }
    }
}

const REF_NO_NULL: u8 = 0x6b;
const REF_NULL: u8 = 0x6c;
const BLOCK_VOID: u8 = 0x40;

pub fn read_value_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<ValueType> {
    let start = reader.pos();
    let byte = reader.read_byte(cx.errors, "value type")?;

    if byte == REF_NO_NULL || byte == REF_NULL {
        if !cx.check_feature(reader, start, Feature::FunctionReferences, "typed reference") {
            return None;
        }
        let heap = read_heap_type(reader, cx)?;
        return Some(ValueType::Reference(ReferenceType::Ref(RefType {
            null: byte == REF_NULL,
            heap,
        })));
    }

    let Some(value_type) = ValueType::from_byte(byte) else {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown value type: {:#04x}", byte),
        );
        return None;
    };
    if !cx.check_feature(
        reader,
        start,
        value_type.required_feature(),
        &format!("value type {}", value_type),
    ) {
        return None;
    }
    Some(value_type)
}

pub fn read_reference_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<ReferenceType> {
    let start = reader.pos();
    match read_value_type(reader, cx)? {
        ValueType::Reference(rt) => Some(rt),
        other => {
            cx.errors.on_error(
                reader.location_from(start),
                &format!("expected reference type, got {}", other),
            );
            None
        }
    }
}

/// The element type of an MVP table. `funcref` is accepted without the
/// reference-types feature here; anything else needs its gate.
pub fn read_element_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<ReferenceType> {
    let start = reader.pos();
    let byte = reader.read_byte(cx.errors, "element type")?;
    if byte == ReferenceKind::Funcref.to_byte() {
        return Some(ReferenceType::FUNCREF);
    }
    let Some(kind) = ReferenceKind::from_byte(byte) else {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown element type: {:#04x}", byte),
        );
        return None;
    };
    if !cx.check_feature(
        reader,
        start,
        kind.required_feature(),
        &format!("element type {}", kind),
    ) {
        return None;
    }
    Some(ReferenceType::Kind(kind))
}

pub fn read_heap_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<HeapType> {
    let start = reader.pos();
    if let Some(byte) = reader.peek_byte() {
        if let Some(kind) = ReferenceKind::from_byte(byte) {
            reader.read_byte(cx.errors, "heap type")?;
            return Some(HeapType::Kind(kind.heap_kind()));
        }
    }
    let index = reader.read_s33_leb(cx.errors, "heap type")?;
    if index < 0 {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown heap type: {}", index),
        );
        return None;
    }
    Some(HeapType::Index(index as u32))
}

/// Heap kinds double as block-type bytes, so the decode order is: void
/// marker, single-byte value type, then a signed 33-bit type index.
pub fn read_block_type(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<BlockType> {
    let start = reader.pos();

    match reader.peek_byte() {
        Some(BLOCK_VOID) => {
            reader.read_byte(cx.errors, "block type")?;
            return Some(BlockType::Void);
        }
        Some(byte) if ValueType::from_byte(byte).is_some() => {
            let value_type = read_value_type(reader, cx)?;
            return Some(BlockType::Value(value_type));
        }
        Some(REF_NO_NULL) | Some(REF_NULL) => {
            let value_type = read_value_type(reader, cx)?;
            return Some(BlockType::Value(value_type));
        }
        _ => {}
    }

    let index = reader.read_s33_leb(cx.errors, "block type")?;
    if index < 0 {
        cx.errors.on_error(
            reader.location_from(start),
            &format!("unknown block type: {}", index),
        );
        return None;
    }
    if !cx.check_feature(reader, start, Feature::MultiValue, "block type index") {
        return None;
    }
    Some(BlockType::TypeIndex(index as u32))
}

pub fn read_limits(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Limits> {
    const NO_MAX: u8 = 0x00;
    const HAS_MAX: u8 = 0x01;
    const HAS_MAX_SHARED: u8 = 0x03;

    let start = reader.pos();
    let flags = reader.read_byte(cx.errors, "limits flags")?;
    let shared = match flags {
        NO_MAX | HAS_MAX => Shared::No,
        HAS_MAX_SHARED => {
            if !cx.check_feature(reader, start, Feature::Threads, "shared limits") {
                return None;
            }
            Shared::Yes
        }
        _ => {
            cx.errors.on_error(
                reader.location_from(start),
                &format!("unknown limits flags: {:#04x}", flags),
            );
            return None;
        }
    };

    let min = reader.read_u32_leb(cx.errors, "limits minimum")?;
    let max = if flags == NO_MAX {
        None
    } else {
        Some(reader.read_u32_leb(cx.errors, "limits maximum")?)
    };

    Some(Limits { min, max, shared })
}

pub fn read_mutability(reader: &mut Reader<'_>, cx: &ReadContext<'_>) -> Option<Mutability> {
    let start = reader.pos();
    let byte = reader.read_byte(cx.errors, "mutability")?;
    match Mutability::from_byte(byte) {
        Some(m) => Some(m),
        None => {
            cx.errors.on_error(
                reader.location_from(start),
                &format!("unknown mutability: {:#04x}", byte),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingErrors;
    use crate::syntax::types::{HeapKind, NumericType};

    fn cx_all(errors: &CollectingErrors) -> ReadContext<'_> {
        ReadContext::new(Features::all(), errors)
    }

    fn cx_mvp(errors: &CollectingErrors) -> ReadContext<'_> {
        ReadContext::new(Features::mvp(), errors)
    }

    #[test]
    fn numeric_value_types() {
        let errors = CollectingErrors::new();
        let cx = cx_mvp(&errors);
        let mut reader = Reader::new(&[0x7f, 0x7e]);
        assert_eq!(read_value_type(&mut reader, &cx), Some(ValueType::I32));
        assert_eq!(read_value_type(&mut reader, &cx), Some(ValueType::I64));
        assert!(errors.is_empty());
    }

    #[test]
    fn v128_requires_simd() {
        let errors = CollectingErrors::new();
        let cx = cx_mvp(&errors);
        assert_eq!(read_value_type(&mut Reader::new(&[0x7b]), &cx), None);
        assert!(errors.diagnostics()[0].message.contains("not allowed"));

        let errors = CollectingErrors::new();
        let cx = cx_all(&errors);
        assert_eq!(
            read_value_type(&mut Reader::new(&[0x7b]), &cx),
            Some(ValueType::Numeric(NumericType::V128))
        );
    }

    #[test]
    fn typed_references() {
        let errors = CollectingErrors::new();
        let cx = cx_all(&errors);
        // (ref null func)
        let mut reader = Reader::new(&[0x6c, 0x70]);
        let vt = read_value_type(&mut reader, &cx).unwrap();
        assert_eq!(
            vt,
            ValueType::Reference(ReferenceType::Ref(RefType {
                null: true,
                heap: HeapType::Kind(HeapKind::Func),
            }))
        );
        // (ref 5)
        let mut reader = Reader::new(&[0x6b, 0x05]);
        let vt = read_value_type(&mut reader, &cx).unwrap();
        assert_eq!(
            vt,
            ValueType::Reference(ReferenceType::Ref(RefType {
                null: false,
                heap: HeapType::Index(5),
            }))
        );
    }

    #[test]
    fn element_type_funcref_is_mvp() {
        let errors = CollectingErrors::new();
        let cx = cx_mvp(&errors);
        assert_eq!(
            read_element_type(&mut Reader::new(&[0x70]), &cx),
            Some(ReferenceType::FUNCREF)
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn block_types() {
        let errors = CollectingErrors::new();
        let cx = cx_all(&errors);
        assert_eq!(
            read_block_type(&mut Reader::new(&[0x40]), &cx),
            Some(BlockType::Void)
        );
        assert_eq!(
            read_block_type(&mut Reader::new(&[0x7f]), &cx),
            Some(BlockType::Value(ValueType::I32))
        );
        assert_eq!(
            read_block_type(&mut Reader::new(&[0x08]), &cx),
            Some(BlockType::TypeIndex(8))
        );
    }

    #[test]
    fn block_type_index_requires_multi_value() {
        let errors = CollectingErrors::new();
        let cx = cx_mvp(&errors);
        assert_eq!(read_block_type(&mut Reader::new(&[0x08]), &cx), None);
        assert!(errors.diagnostics()[0].message.contains("not allowed"));
    }

    #[test]
    fn limits_variants() {
        let errors = CollectingErrors::new();
        let cx = cx_all(&errors);
        assert_eq!(
            read_limits(&mut Reader::new(&[0x00, 0x01]), &cx),
            Some(Limits::new(1, None))
        );
        assert_eq!(
            read_limits(&mut Reader::new(&[0x01, 0x01, 0x10]), &cx),
            Some(Limits::new(1, Some(16)))
        );
        let shared = read_limits(&mut Reader::new(&[0x03, 0x01, 0x10]), &cx).unwrap();
        assert_eq!(shared.shared, Shared::Yes);
        assert_eq!(read_limits(&mut Reader::new(&[0x07, 0x01]), &cx), None);
    }

    #[test]
    fn shared_limits_require_threads() {
        let errors = CollectingErrors::new();
        let cx = cx_mvp(&errors);
        assert_eq!(read_limits(&mut Reader::new(&[0x03, 0x01, 0x10]), &cx), None);
    }
}
