//! Decoding of the `"name"` custom section.
//!
//! The section is a sequence of size-prefixed subsections: module name,
//! function names, and local names. Unknown subsection IDs are diagnosed and
//! skipped using their size prefix, so a malformed subsection does not take
//! the rest of the section with it.

use super::module::CustomSection;
use super::reader::Reader;
use crate::error::{ErrorContext, ErrorSink};
use crate::syntax::custom::{IndirectNameAssoc, NameAssoc, NameSubsection, NameSubsectionId};

/// Iterates the subsections of a `"name"` custom section.
pub struct NameSectionReader<'a> {
    reader: Reader<'a>,
    errors: &'a dyn ErrorSink,
    stopped: bool,
}

pub fn read_name_section<'a>(
    section: &CustomSection<'a>,
    errors: &'a dyn ErrorSink,
) -> NameSectionReader<'a> {
    NameSectionReader {
        reader: Reader::with_base(section.data, section.offset),
        errors,
        stopped: false,
    }
}

impl<'a> Iterator for NameSectionReader<'a> {
    type Item = NameSubsection;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stopped || self.reader.is_empty() {
                return None;
            }

            let _guard =
                ErrorContext::new(self.errors, self.reader.location_here(), "name section");

            let start = self.reader.pos();
            let Some(id_byte) = self.reader.read_byte(self.errors, "name subsection id") else {
                self.stopped = true;
                return None;
            };
            let Some(size) = self.reader.read_u32_leb(self.errors, "name subsection size") else {
                self.stopped = true;
                return None;
            };
            let Some(mut sub) =
                self.reader
                    .sub_reader(size as usize, self.errors, "name subsection")
            else {
                self.stopped = true;
                return None;
            };

            let Some(id) = NameSubsectionId::from_byte(id_byte) else {
                self.errors.on_error(
                    self.reader.location_from(start),
                    &format!("unknown name subsection id: {}", id_byte),
                );
                continue;
            };

            let subsection = match id {
                NameSubsectionId::ModuleName => sub
                    .read_string(self.errors, "module name")
                    .map(NameSubsection::ModuleName),
                NameSubsectionId::FunctionNames => {
                    read_name_assocs(&mut sub, self.errors).map(NameSubsection::FunctionNames)
                }
                NameSubsectionId::LocalNames => {
                    read_indirect_name_assocs(&mut sub, self.errors).map(NameSubsection::LocalNames)
                }
            };

            match subsection {
                Some(s) => return Some(s),
                // The size prefix already advanced the parent cursor, so a
                // bad subsection only loses itself.
                None => continue,
            }
        }
    }
}

fn read_name_assocs(reader: &mut Reader<'_>, errors: &dyn ErrorSink) -> Option<Vec<NameAssoc>> {
    let count = reader.read_count(errors)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let index = reader.read_index(errors, "name map index")?;
        let name = reader.read_string(errors, "name map entry")?;
        out.push(NameAssoc { index, name });
    }
    Some(out)
}

fn read_indirect_name_assocs(
    reader: &mut Reader<'_>,
    errors: &dyn ErrorSink,
) -> Option<Vec<IndirectNameAssoc>> {
    let count = reader.read_count(errors)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let index = reader.read_index(errors, "function index")?;
        let names = read_name_assocs(reader, errors)?;
        out.push(IndirectNameAssoc { index, names });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingErrors;

    fn custom<'a>(data: &'a [u8]) -> CustomSection<'a> {
        CustomSection {
            name: "name".to_string(),
            data,
            offset: 0,
        }
    }

    #[test]
    fn module_and_function_names() {
        // Module name "hi", then one function name entry 0 -> "run".
        let mut data = vec![0x00, 0x03, 0x02, b'h', b'i'];
        let mut fsub = vec![0x01, 0x00, 0x03];
        fsub.extend_from_slice(b"run");
        data.push(0x01);
        data.push(fsub.len() as u8);
        data.extend_from_slice(&fsub);

        let errors = CollectingErrors::new();
        let section = custom(&data);
        let subs: Vec<_> = read_name_section(&section, &errors).collect();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0], NameSubsection::ModuleName("hi".to_string()));
        assert_eq!(
            subs[1],
            NameSubsection::FunctionNames(vec![NameAssoc {
                index: 0,
                name: "run".to_string()
            }])
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn local_names() {
        // One function (index 1) with locals 0 -> "x", 1 -> "y".
        let mut payload = vec![0x01, 0x01, 0x02];
        payload.extend_from_slice(&[0x00, 0x01, b'x']);
        payload.extend_from_slice(&[0x01, 0x01, b'y']);
        let mut data = vec![0x02, payload.len() as u8];
        data.extend_from_slice(&payload);

        let errors = CollectingErrors::new();
        let section = custom(&data);
        let subs: Vec<_> = read_name_section(&section, &errors).collect();
        assert_eq!(subs.len(), 1);
        match &subs[0] {
            NameSubsection::LocalNames(assocs) => {
                assert_eq!(assocs.len(), 1);
                assert_eq!(assocs[0].index, 1);
                assert_eq!(assocs[0].names[0].name, "x");
                assert_eq!(assocs[0].names[1].name, "y");
            }
            other => panic!("unexpected subsection: {:?}", other),
        }
    }

    #[test]
    fn unknown_subsection_skipped() {
        let mut data = vec![0x09, 0x02, 0xaa, 0xbb]; // unknown id 9
        data.extend_from_slice(&[0x00, 0x02, 0x01, b'm']); // module name "m"

        let errors = CollectingErrors::new();
        let section = custom(&data);
        let subs: Vec<_> = read_name_section(&section, &errors).collect();
        assert_eq!(subs, vec![NameSubsection::ModuleName("m".to_string())]);
        assert!(errors.diagnostics()[0]
            .message
            .contains("unknown name subsection"));
    }

    #[test]
    fn malformed_subsection_does_not_stop_later_ones() {
        // Function-names subsection whose payload is truncated relative to
        // its declared count, followed by a healthy module-name subsection.
        let mut data = vec![0x01, 0x02, 0x02, 0x00]; // claims 2 entries, has half of one
        data.extend_from_slice(&[0x00, 0x02, 0x01, b'm']);

        let errors = CollectingErrors::new();
        let section = custom(&data);
        let subs: Vec<_> = read_name_section(&section, &errors).collect();
        assert_eq!(subs, vec![NameSubsection::ModuleName("m".to_string())]);
        assert!(!errors.is_empty());
    }
}
