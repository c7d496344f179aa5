//! Decoding of the `"linking"` and `"reloc.*"` custom sections.

use super::module::CustomSection;
use super::reader::Reader;
use crate::error::{ErrorContext, ErrorSink};
use crate::syntax::custom::{
    symbol_flags, Comdat, ComdatSymbol, ComdatSymbolKind, DataSymbolDef, InitFunction,
    LinkingSubsection, LinkingSubsectionId, RelocationEntry, RelocationType, SegmentInfo,
    SymbolBase, SymbolInfo, SymbolInfoKind, LINKING_VERSION,
};

/// The decoded frame of a `"linking"` section: its version, plus a lazy
/// iterator over subsections.
pub struct LinkingSectionReader<'a> {
    pub version: u32,
    reader: Reader<'a>,
    errors: &'a dyn ErrorSink,
    stopped: bool,
}

/// Reads the linking-section header. A version other than the supported one
/// is diagnosed and the subsection iterator yields nothing.
pub fn read_linking_section<'a>(
    section: &CustomSection<'a>,
    errors: &'a dyn ErrorSink,
) -> Option<LinkingSectionReader<'a>> {
    let mut reader = Reader::with_base(section.data, section.offset);
    let _guard = ErrorContext::new(errors, reader.location_here(), "linking section");

    let start = reader.pos();
    let version = reader.read_u32_leb(errors, "linking version")?;
    if version != LINKING_VERSION {
        errors.on_error(
            reader.location_from(start),
            &format!(
                "linking version mismatch: expected {}, got {}",
                LINKING_VERSION, version
            ),
        );
        return None;
    }

    Some(LinkingSectionReader {
        version,
        reader,
        errors,
        stopped: false,
    })
}

impl<'a> Iterator for LinkingSectionReader<'a> {
    type Item = LinkingSubsection;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stopped || self.reader.is_empty() {
                return None;
            }

            let _guard =
                ErrorContext::new(self.errors, self.reader.location_here(), "linking section");

            let start = self.reader.pos();
            let Some(id_byte) = self.reader.read_byte(self.errors, "linking subsection id") else {
                self.stopped = true;
                return None;
            };
            let Some(size) = self
                .reader
                .read_u32_leb(self.errors, "linking subsection size")
            else {
                self.stopped = true;
                return None;
            };
            let Some(mut sub) =
                self.reader
                    .sub_reader(size as usize, self.errors, "linking subsection")
            else {
                self.stopped = true;
                return None;
            };

            let Some(id) = LinkingSubsectionId::from_byte(id_byte) else {
                self.errors.on_error(
                    self.reader.location_from(start),
                    &format!("unknown linking subsection id: {}", id_byte),
                );
                continue;
            };

            let subsection = match id {
                LinkingSubsectionId::SegmentInfo => {
                    read_segment_infos(&mut sub, self.errors).map(LinkingSubsection::SegmentInfo)
                }
                LinkingSubsectionId::InitFunctions => read_init_functions(&mut sub, self.errors)
                    .map(LinkingSubsection::InitFunctions),
                LinkingSubsectionId::ComdatInfo => {
                    read_comdats(&mut sub, self.errors).map(LinkingSubsection::ComdatInfo)
                }
                LinkingSubsectionId::SymbolTable => {
                    read_symbol_table(&mut sub, self.errors).map(LinkingSubsection::SymbolTable)
                }
            };

            match subsection {
                Some(s) => return Some(s),
                None => continue,
            }
        }
    }
}

fn read_segment_infos(reader: &mut Reader<'_>, errors: &dyn ErrorSink) -> Option<Vec<SegmentInfo>> {
    let count = reader.read_count(errors)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let name = reader.read_string(errors, "segment name")?;
        let align_log2 = reader.read_u32_leb(errors, "segment alignment")?;
        let flags = reader.read_u32_leb(errors, "segment flags")?;
        out.push(SegmentInfo {
            name,
            align_log2,
            flags,
        });
    }
    Some(out)
}

fn read_init_functions(
    reader: &mut Reader<'_>,
    errors: &dyn ErrorSink,
) -> Option<Vec<InitFunction>> {
    let count = reader.read_count(errors)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let priority = reader.read_u32_leb(errors, "init priority")?;
        let symbol_index = reader.read_index(errors, "init symbol index")?;
        out.push(InitFunction {
            priority,
            symbol_index,
        });
    }
    Some(out)
}

fn read_comdats(reader: &mut Reader<'_>, errors: &dyn ErrorSink) -> Option<Vec<Comdat>> {
    let count = reader.read_count(errors)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let name = reader.read_string(errors, "comdat name")?;
        let flags = reader.read_u32_leb(errors, "comdat flags")?;
        let symbol_count = reader.read_count(errors)?;
        let mut symbols = Vec::with_capacity(symbol_count.min(1024) as usize);
        for _ in 0..symbol_count {
            let start = reader.pos();
            let kind_byte = reader.read_byte(errors, "comdat symbol kind")?;
            let Some(kind) = ComdatSymbolKind::from_byte(kind_byte) else {
                errors.on_error(
                    reader.location_from(start),
                    &format!("unknown comdat symbol kind: {}", kind_byte),
                );
                return None;
            };
            let index = reader.read_index(errors, "comdat symbol index")?;
            symbols.push(ComdatSymbol { kind, index });
        }
        out.push(Comdat {
            name,
            flags,
            symbols,
        });
    }
    Some(out)
}

fn read_symbol_table(reader: &mut Reader<'_>, errors: &dyn ErrorSink) -> Option<Vec<SymbolInfo>> {
    let count = reader.read_count(errors)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        out.push(read_symbol_info(reader, errors)?);
    }
    Some(out)
}

fn read_symbol_info(reader: &mut Reader<'_>, errors: &dyn ErrorSink) -> Option<SymbolInfo> {
    let start = reader.pos();
    let _guard = ErrorContext::new(errors, reader.location_here(), "symbol");

    let kind_byte = reader.read_byte(errors, "symbol kind")?;
    let Some(kind) = SymbolInfoKind::from_byte(kind_byte) else {
        errors.on_error(
            reader.location_from(start),
            &format!("unknown symbol kind: {}", kind_byte),
        );
        return None;
    };
    let flags = reader.read_u32_leb(errors, "symbol flags")?;
    let defined = flags & symbol_flags::UNDEFINED == 0;

    let base = match kind {
        SymbolInfoKind::Function
        | SymbolInfoKind::Global
        | SymbolInfoKind::Event
        | SymbolInfoKind::Table => {
            let index = reader.read_index(errors, "symbol item index")?;
            // Imported symbols reuse the import's name unless one is given
            // explicitly.
            let name = if defined || flags & symbol_flags::EXPLICIT_NAME != 0 {
                Some(reader.read_string(errors, "symbol name")?)
            } else {
                None
            };
            SymbolBase::Item { index, name }
        }
        SymbolInfoKind::Data => {
            let name = reader.read_string(errors, "symbol name")?;
            let def = if defined {
                let segment = reader.read_index(errors, "data segment index")?;
                let offset = reader.read_u32_leb(errors, "data symbol offset")?;
                let size = reader.read_u32_leb(errors, "data symbol size")?;
                Some(DataSymbolDef {
                    segment,
                    offset,
                    size,
                })
            } else {
                None
            };
            SymbolBase::Data { name, def }
        }
        SymbolInfoKind::Section => {
            let section = reader.read_index(errors, "symbol section index")?;
            SymbolBase::Section { section }
        }
    };

    Some(SymbolInfo { kind, flags, base })
}

// ============================================================================
// Relocation sections
// ============================================================================

/// A decoded `"reloc.*"` section: the index of the section the entries
/// target, plus a lazy entry iterator.
pub struct RelocationSectionReader<'a> {
    pub target_section: u32,
    count: u32,
    index: u32,
    reader: Reader<'a>,
    errors: &'a dyn ErrorSink,
    stopped: bool,
}

pub fn read_relocation_section<'a>(
    section: &CustomSection<'a>,
    errors: &'a dyn ErrorSink,
) -> Option<RelocationSectionReader<'a>> {
    let mut reader = Reader::with_base(section.data, section.offset);
    let _guard = ErrorContext::new(errors, reader.location_here(), "relocation section");

    let target_section = reader.read_index(errors, "relocation target section")?;
    let count = reader.read_count(errors)?;
    Some(RelocationSectionReader {
        target_section,
        count,
        index: 0,
        reader,
        errors,
        stopped: false,
    })
}

impl Iterator for RelocationSectionReader<'_> {
    type Item = RelocationEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.index >= self.count {
            return None;
        }
        self.index += 1;

        let _guard = ErrorContext::new(
            self.errors,
            self.reader.location_here(),
            "relocation entry",
        );

        let start = self.reader.pos();
        let result = (|| {
            let type_byte = self.reader.read_byte(self.errors, "relocation type")?;
            let Some(ty) = RelocationType::from_byte(type_byte) else {
                self.errors.on_error(
                    self.reader.location_from(start),
                    &format!("unknown relocation type: {}", type_byte),
                );
                return None;
            };
            let offset = self.reader.read_u32_leb(self.errors, "relocation offset")?;
            let index = self.reader.read_index(self.errors, "relocation index")?;
            let addend = if ty.has_addend() {
                Some(self.reader.read_s32_leb(self.errors, "relocation addend")?)
            } else {
                None
            };
            Some(RelocationEntry {
                ty,
                offset,
                index,
                addend,
            })
        })();

        if result.is_none() {
            self.stopped = true;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingErrors;

    fn custom<'a>(name: &str, data: &'a [u8]) -> CustomSection<'a> {
        CustomSection {
            name: name.to_string(),
            data,
            offset: 0,
        }
    }

    #[test]
    fn rejects_wrong_version() {
        let data = [0x01];
        let errors = CollectingErrors::new();
        let section = custom("linking", &data);
        assert!(read_linking_section(&section, &errors).is_none());
        assert!(errors.diagnostics()[0].message.contains("version"));
    }

    #[test]
    fn symbol_table_defined_and_undefined() {
        // Two symbols: a defined function "f" at index 0, and an undefined
        // function import at index 1 with no name.
        let mut payload = vec![0x02];
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, b'f']);
        payload.extend_from_slice(&[0x00, 0x10, 0x01]);
        let mut data = vec![0x02]; // version
        data.push(0x08); // subsection id: symbol table
        data.push(payload.len() as u8);
        data.extend_from_slice(&payload);

        let errors = CollectingErrors::new();
        let section = custom("linking", &data);
        let reader = read_linking_section(&section, &errors).unwrap();
        let subs: Vec<_> = reader.collect();
        assert_eq!(subs.len(), 1);
        match &subs[0] {
            LinkingSubsection::SymbolTable(symbols) => {
                assert_eq!(symbols.len(), 2);
                assert_eq!(symbols[0].name(), Some("f"));
                assert_eq!(symbols[1].name(), None);
                assert_eq!(symbols[1].flags & symbol_flags::UNDEFINED, 0x10);
            }
            other => panic!("unexpected subsection: {:?}", other),
        }
        assert!(errors.is_empty());
    }

    #[test]
    fn segment_info_subsection() {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&[0x04, b'.', b'd', b'a', b't', 0x02, 0x00]);
        let mut data = vec![0x02, 0x05];
        data.push(payload.len() as u8);
        data.extend_from_slice(&payload);

        let errors = CollectingErrors::new();
        let section = custom("linking", &data);
        let subs: Vec<_> = read_linking_section(&section, &errors).unwrap().collect();
        match &subs[0] {
            LinkingSubsection::SegmentInfo(infos) => {
                assert_eq!(infos[0].name, ".dat");
                assert_eq!(infos[0].align_log2, 2);
            }
            other => panic!("unexpected subsection: {:?}", other),
        }
    }

    #[test]
    fn relocation_entries() {
        // Target section 3, two entries; the second carries an addend.
        let data = [
            0x03, 0x02, // target, count
            0x00, 0x10, 0x02, // R_WASM_FUNCTION_INDEX_LEB at 0x10, index 2
            0x03, 0x20, 0x01, 0x04, // R_WASM_MEMORY_ADDR_LEB, addend 4
        ];
        let errors = CollectingErrors::new();
        let section = custom("reloc.CODE", &data);
        let reader = read_relocation_section(&section, &errors).unwrap();
        assert_eq!(reader.target_section, 3);
        let entries: Vec<_> = reader.collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ty, RelocationType::FunctionIndexLeb);
        assert_eq!(entries[0].addend, None);
        assert_eq!(entries[1].ty, RelocationType::MemoryAddrLeb);
        assert_eq!(entries[1].addend, Some(4));
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_relocation_type_stops_entries() {
        let data = [0x00, 0x01, 0x63, 0x00, 0x00];
        let errors = CollectingErrors::new();
        let section = custom("reloc.DATA", &data);
        let entries: Vec<_> = read_relocation_section(&section, &errors).unwrap().collect();
        assert!(entries.is_empty());
        assert!(errors.diagnostics()[0]
            .message
            .contains("unknown relocation type"));
    }
}
