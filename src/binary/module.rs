//! Top-level binary module framing.
//!
//! [`read_module`] checks the magic and version and hands back a
//! [`LazyModule`]; nothing else is decoded until a section iterator is
//! consumed. Each call to [`LazyModule::sections`] starts a fresh cursor over
//! the section bytes, so iteration is restartable and independent per caller.

use super::reader::Reader;
use crate::error::{ErrorSink, Location};
use crate::features::Features;
use crate::syntax::SectionId;
use log::debug;

/// The 4-byte magic: `\0asm`.
pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
/// The 4-byte version, currently 1.
pub const VERSION: u32 = 1;

/// A known section's identity and undecoded body bytes.
#[derive(Debug, Clone, Copy)]
pub struct KnownSection<'a> {
    pub id: SectionId,
    pub data: &'a [u8],
    /// File offset of the first body byte.
    pub offset: usize,
}

/// A custom section: name plus opaque payload (the bytes after the name).
#[derive(Debug, Clone)]
pub struct CustomSection<'a> {
    pub name: String,
    pub data: &'a [u8],
    /// File offset of the first payload byte (after the name).
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub enum Section<'a> {
    Known(KnownSection<'a>),
    Custom(CustomSection<'a>),
}

impl<'a> Section<'a> {
    pub fn data(&self) -> &'a [u8] {
        match self {
            Section::Known(k) => k.data,
            Section::Custom(c) => c.data,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Section::Known(k) => k.offset,
            Section::Custom(c) => c.offset,
        }
    }
}

/// A module whose sections decode on demand.
///
/// The input byte span must outlive every section sequence drawn from it;
/// decoded items own their content and may outlive the span.
pub struct LazyModule<'a> {
    pub magic: Option<[u8; 4]>,
    pub version: Option<u32>,
    body: &'a [u8],
    body_offset: usize,
    features: Features,
    errors: &'a dyn ErrorSink,
}

/// Reads the module header and returns a lazy section view.
///
/// A bad magic or version is diagnosed; the returned module then carries
/// `None` for both and yields no sections.
pub fn read_module<'a>(
    bytes: &'a [u8],
    features: Features,
    errors: &'a dyn ErrorSink,
) -> LazyModule<'a> {
    let mut reader = Reader::new(bytes);

    let empty = LazyModule {
        magic: None,
        version: None,
        body: &[],
        body_offset: 0,
        features,
        errors,
    };

    let Some(magic) = reader.read_bytes(4, errors, "magic") else {
        return empty;
    };
    if magic != MAGIC {
        errors.on_error(Location::new(0, 4), "magic mismatch");
        return empty;
    }

    let Some(version) = reader.read_u32_fixed(errors, "version") else {
        return empty;
    };
    if version != VERSION {
        errors.on_error(
            Location::new(4, 8),
            &format!("version mismatch: expected {}, got {}", VERSION, version),
        );
        return empty;
    }

    debug!("module header ok, {} section bytes", reader.remaining());

    LazyModule {
        magic: Some(MAGIC),
        version: Some(version),
        body: reader.remaining_bytes(),
        body_offset: reader.pos(),
        features,
        errors,
    }
}

impl<'a> LazyModule<'a> {
    /// Whether the header was accepted.
    pub fn is_valid_header(&self) -> bool {
        self.magic.is_some() && self.version.is_some()
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn errors(&self) -> &'a dyn ErrorSink {
        self.errors
    }

    /// A fresh iterator over the sections, in on-disk order.
    pub fn sections(&self) -> SectionIter<'a> {
        SectionIter {
            reader: Reader::with_base(self.body, self.body_offset),
            errors: self.errors,
            last_rank: 0,
            seen: 0,
        }
    }
}

/// Iterates sections, diagnosing unknown IDs, duplicates, and canonical-order
/// violations without stopping.
pub struct SectionIter<'a> {
    reader: Reader<'a>,
    errors: &'a dyn ErrorSink,
    last_rank: u8,
    seen: u16,
}

impl<'a> Iterator for SectionIter<'a> {
    type Item = Section<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.reader.is_empty() {
                return None;
            }

            let header_start = self.reader.pos();
            let id_byte = self.reader.read_byte(self.errors, "section id")?;
            let len = self.reader.read_u32_leb(self.errors, "section length")?;
            let data = self
                .reader
                .read_bytes(len as usize, self.errors, "section body")?;
            let data_offset = self.reader.offset() - len as usize;

            if id_byte == 0 {
                // Custom section: the name is part of the length-prefixed body.
                let mut sub = Reader::with_base(data, data_offset);
                let Some(name) = sub.read_string(self.errors, "custom section name") else {
                    continue;
                };
                debug!("custom section '{}', {} payload bytes", name, sub.remaining());
                return Some(Section::Custom(CustomSection {
                    name,
                    data: sub.remaining_bytes(),
                    offset: sub.offset(),
                }));
            }

            let Some(id) = SectionId::from_byte(id_byte) else {
                self.errors.on_error(
                    self.reader.location_from(header_start),
                    &format!("unknown section id: {}", id_byte),
                );
                continue;
            };

            let rank = id.order_rank();
            let bit = 1u16 << rank;
            if self.seen & bit != 0 {
                self.errors.on_error(
                    self.reader.location_from(header_start),
                    &format!("duplicate {} section", id),
                );
            } else if rank < self.last_rank {
                self.errors.on_error(
                    self.reader.location_from(header_start),
                    &format!("{} section out of order", id),
                );
            }
            self.seen |= bit;
            self.last_rank = self.last_rank.max(rank);

            debug!("{} section, {} bytes", id, data.len());
            return Some(Section::Known(KnownSection {
                id,
                data,
                offset: data_offset,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectingErrors;

    fn header() -> Vec<u8> {
        let mut v = MAGIC.to_vec();
        v.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        v
    }

    #[test]
    fn empty_module() {
        let bytes = header();
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        assert_eq!(module.magic, Some(MAGIC));
        assert_eq!(module.version, Some(1));
        assert_eq!(module.sections().count(), 0);
        assert!(errors.is_empty());
    }

    #[test]
    fn bad_magic() {
        let bytes = [0x00, 0x61, 0x73, 0x00, 0x01, 0x00, 0x00, 0x00];
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        assert_eq!(module.magic, None);
        assert_eq!(module.version, None);
        assert_eq!(module.sections().count(), 0);
        assert!(errors.diagnostics()[0].message.contains("magic"));
    }

    #[test]
    fn bad_version() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        assert_eq!(module.version, None);
        assert!(errors.diagnostics()[0].message.contains("version"));
    }

    #[test]
    fn known_and_custom_sections() {
        let mut bytes = header();
        // Type section: one empty function type.
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        // Custom section named "note" with 2 payload bytes.
        bytes.extend_from_slice(&[0x00, 0x07, 0x04]);
        bytes.extend_from_slice(b"note");
        bytes.extend_from_slice(&[0xaa, 0xbb]);

        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let sections: Vec<_> = module.sections().collect();
        assert_eq!(sections.len(), 2);
        match &sections[0] {
            Section::Known(k) => {
                assert_eq!(k.id, SectionId::Type);
                assert_eq!(k.data, &[0x01, 0x60, 0x00, 0x00]);
            }
            Section::Custom(_) => panic!("expected known section"),
        }
        match &sections[1] {
            Section::Custom(c) => {
                assert_eq!(c.name, "note");
                assert_eq!(c.data, &[0xaa, 0xbb]);
            }
            Section::Known(_) => panic!("expected custom section"),
        }
        assert!(errors.is_empty());
    }

    #[test]
    fn out_of_order_section_diagnosed_but_yielded() {
        let mut bytes = header();
        // Function section before type section.
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);

        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let sections: Vec<_> = module.sections().collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(errors.len(), 1);
        assert!(errors.diagnostics()[0].message.contains("out of order"));
    }

    #[test]
    fn duplicate_section_diagnosed() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);

        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        assert_eq!(module.sections().count(), 2);
        assert!(errors.diagnostics()[0].message.contains("duplicate"));
    }

    #[test]
    fn sections_iterator_is_restartable() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);

        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        let first: Vec<usize> = module.sections().map(|s| s.offset()).collect();
        let second: Vec<usize> = module.sections().map(|s| s.offset()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn truncated_section_body() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0x01, 0x10, 0x01]);

        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        assert_eq!(module.sections().count(), 0);
        assert!(!errors.is_empty());
    }

    #[test]
    fn custom_sections_allowed_anywhere() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]); // function
        bytes.extend_from_slice(&[0x00, 0x02, 0x01, b'x']); // custom
        bytes.extend_from_slice(&[0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b]); // code

        let errors = CollectingErrors::new();
        let module = read_module(&bytes, Features::mvp(), &errors);
        assert_eq!(module.sections().count(), 3);
        assert!(errors.is_empty());
    }
}
