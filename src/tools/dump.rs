//! The `dump` inspector.
//!
//! Runs a prepass over the module collecting type entries, function
//! signatures, and names (from exports, the `"name"` section, and the
//! linking symbol table), then one output pass per requested view: section
//! headers, per-item details, code disassembly, and raw contents.

use crate::binary::{self, module::Section, sections, CustomSection, KnownSection, LazyModule};
use crate::error::CollectingErrors;
use crate::features::Features;
use crate::syntax::custom::{LinkingSubsection, NameSubsection, SymbolBase};
use crate::syntax::module::{ExternalKind, ImportDesc};
use crate::syntax::types::BoundFunctionType;
use crate::syntax::SectionId;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub headers: bool,
    pub details: bool,
    pub disassemble: bool,
    pub raw: bool,
    /// Restrict output to the named section (`-j`).
    pub section: Option<String>,
}

/// Dumps one module, returning the rendered report and the diagnostics
/// collected along the way.
pub fn dump(filename: &str, bytes: &[u8], options: &Options) -> (String, CollectingErrors) {
    let errors = CollectingErrors::new();
    let features = Features::all();
    let module = binary::read_module(bytes, features, &errors);

    let mut out = String::new();
    if !module.is_valid_header() {
        return (out, errors);
    }
    _ = writeln!(out, "\n{}:\tfile format wasm 0x{:x}", filename, module.version.unwrap());

    let mut tool = Tool {
        options,
        module: &module,
        features,
        errors: &errors,
        types: Vec::new(),
        function_types: Vec::new(),
        imported_functions: 0,
        function_names: BTreeMap::new(),
        global_names: BTreeMap::new(),
    };
    tool.prepass();

    if options.headers {
        tool.headers(&mut out);
    }
    if options.details {
        tool.details(&mut out);
    }
    if options.disassemble {
        tool.disassemble(&mut out);
    }
    if options.raw {
        tool.raw(&mut out);
    }

    (out, errors)
}

struct Tool<'a> {
    options: &'a Options,
    module: &'a LazyModule<'a>,
    features: Features,
    errors: &'a CollectingErrors,
    types: Vec<BoundFunctionType>,
    /// Type index per function, imports first.
    function_types: Vec<u32>,
    imported_functions: u32,
    function_names: BTreeMap<u32, String>,
    global_names: BTreeMap<u32, String>,
}

impl<'a> Tool<'a> {
    fn section_matches(&self, name: &str) -> bool {
        match &self.options.section {
            Some(wanted) => wanted == name,
            None => true,
        }
    }

    /// Collects types, signatures, and names before any output pass.
    fn prepass(&mut self) {
        let mut imported_globals = 0u32;
        for section in self.module.sections() {
            match &section {
                Section::Known(known) => {
                    match known.id {
                        SectionId::Type => {
                            self.types.extend(
                                sections::read_type_section(known, self.features, self.errors)
                                    .flatten()
                                    .map(|entry| entry.ty),
                            );
                        }
                        SectionId::Import => {
                            for import in
                                sections::read_import_section(known, self.features, self.errors)
                                    .flatten()
                            {
                                match import.desc {
                                    ImportDesc::Function(type_use) => {
                                        let index = self.imported_functions;
                                        if let Some(idx) =
                                            type_use.index.as_ref().and_then(|v| v.index())
                                        {
                                            self.function_types.push(idx);
                                        }
                                        self.function_names.insert(index, import.field.clone());
                                        self.imported_functions += 1;
                                    }
                                    ImportDesc::Global(_) => {
                                        self.global_names
                                            .insert(imported_globals, import.field.clone());
                                        imported_globals += 1;
                                    }
                                    _ => {}
                                }
                            }
                        }
                        SectionId::Function => {
                            self.function_types.extend(
                                sections::read_function_section(known, self.features, self.errors)
                                    .flatten(),
                            );
                        }
                        SectionId::Export => {
                            for export in
                                sections::read_export_section(known, self.features, self.errors)
                                    .flatten()
                            {
                                let Some(item_index) = export.index.index() else {
                                    continue;
                                };
                                match export.kind {
                                    ExternalKind::Function => {
                                        self.function_names
                                            .entry(item_index)
                                            .or_insert(export.name);
                                    }
                                    ExternalKind::Global => {
                                        self.global_names.entry(item_index).or_insert(export.name);
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Section::Custom(custom) => {
                    if custom.name == "name" {
                        self.collect_name_section(custom);
                    } else if custom.name == "linking" {
                        self.collect_linking_section(custom);
                    }
                }
            }
        }
    }

    fn collect_name_section(&mut self, custom: &CustomSection<'a>) {
        for subsection in binary::names::read_name_section(custom, self.errors) {
            if let NameSubsection::FunctionNames(assocs) = subsection {
                for assoc in assocs {
                    self.function_names.insert(assoc.index, assoc.name);
                }
            }
        }
    }

    fn collect_linking_section(&mut self, custom: &CustomSection<'a>) {
        let Some(reader) = binary::linking::read_linking_section(custom, self.errors) else {
            return;
        };
        for subsection in reader {
            if let LinkingSubsection::SymbolTable(symbols) = subsection {
                for symbol in symbols {
                    if let SymbolBase::Item { index, name: Some(name) } = &symbol.base {
                        match symbol.kind {
                            crate::syntax::custom::SymbolInfoKind::Function => {
                                self.function_names.entry(*index).or_insert(name.clone());
                            }
                            crate::syntax::custom::SymbolInfoKind::Global => {
                                self.global_names.entry(*index).or_insert(name.clone());
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    fn function_name(&self, index: u32) -> String {
        match self.function_names.get(&index) {
            Some(name) => format!(" <{}>", name),
            None => String::new(),
        }
    }

    // ------------------------------------------------------------------
    // Headers pass
    // ------------------------------------------------------------------

    fn headers(&self, out: &mut String) {
        _ = writeln!(out, "\nSections:\n");
        for section in self.module.sections() {
            let (name, offset, len) = match &section {
                Section::Known(k) => (k.id.name().to_string(), k.offset, k.data.len()),
                Section::Custom(c) => (format!("\"{}\"", c.name), c.offset, c.data.len()),
            };
            if !self.section_matches(name.trim_matches('"')) {
                continue;
            }
            _ = writeln!(
                out,
                "{:>12} start=0x{:08x} end=0x{:08x} (size=0x{:08x})",
                name,
                offset,
                offset + len,
                len
            );
        }
    }

    // ------------------------------------------------------------------
    // Details pass
    // ------------------------------------------------------------------

    fn details(&self, out: &mut String) {
        _ = writeln!(out, "\nSection Details:\n");
        for section in self.module.sections() {
            match &section {
                Section::Known(known) => {
                    if self.section_matches(known.id.name()) {
                        self.known_section_details(out, known);
                    }
                }
                Section::Custom(custom) => {
                    if self.section_matches(&custom.name) {
                        self.custom_section_details(out, custom);
                    }
                }
            }
        }
    }

    fn known_section_details(&self, out: &mut String, known: &KnownSection<'a>) {
        let features = self.features;
        let errors = self.errors;
        match known.id {
            SectionId::Type => {
                let seq = sections::read_type_section(known, features, errors);
                _ = writeln!(out, "Type[{}]:", sections::LazySequence::count(&seq));
                for (i, entry) in seq.flatten().enumerate() {
                    _ = writeln!(out, " - type[{}] {}", i, entry.ty.unbind());
                }
            }
            SectionId::Import => {
                let seq = sections::read_import_section(known, features, errors);
                _ = writeln!(out, "Import[{}]:", sections::LazySequence::count(&seq));
                for import in seq.flatten() {
                    _ = writeln!(
                        out,
                        " - {} <- {}.{}",
                        import.desc.kind(),
                        import.module,
                        import.field
                    );
                }
            }
            SectionId::Function => {
                let seq = sections::read_function_section(known, features, errors);
                _ = writeln!(out, "Function[{}]:", sections::LazySequence::count(&seq));
                for (i, type_index) in seq.flatten().enumerate() {
                    let func_index = self.imported_functions + i as u32;
                    _ = writeln!(
                        out,
                        " - func[{}] sig={}{}",
                        func_index,
                        type_index,
                        self.function_name(func_index)
                    );
                }
            }
            SectionId::Table => {
                let seq = sections::read_table_section(known, features, errors);
                _ = writeln!(out, "Table[{}]:", sections::LazySequence::count(&seq));
                for (i, table) in seq.flatten().enumerate() {
                    _ = writeln!(out, " - table[{}] {}", i, table.ty);
                }
            }
            SectionId::Memory => {
                let seq = sections::read_memory_section(known, features, errors);
                _ = writeln!(out, "Memory[{}]:", sections::LazySequence::count(&seq));
                for (i, memory) in seq.flatten().enumerate() {
                    _ = writeln!(out, " - memory[{}] {}", i, memory.ty);
                }
            }
            SectionId::Global => {
                let seq = sections::read_global_section(known, features, errors);
                _ = writeln!(out, "Global[{}]:", sections::LazySequence::count(&seq));
                for (i, global) in seq.flatten().enumerate() {
                    _ = writeln!(out, " - global[{}] {}", i, global.ty);
                }
            }
            SectionId::Export => {
                let seq = sections::read_export_section(known, features, errors);
                _ = writeln!(out, "Export[{}]:", sections::LazySequence::count(&seq));
                for export in seq.flatten() {
                    _ = writeln!(
                        out,
                        " - {}[{}] -> \"{}\"",
                        export.kind,
                        export.index,
                        export.name
                    );
                }
            }
            SectionId::Start => {
                if let Some(start) = sections::read_start_section(known, errors) {
                    _ = writeln!(out, "Start:");
                    _ = writeln!(out, " - start function: {}", start.func);
                }
            }
            SectionId::Element => {
                let seq = sections::read_element_section(known, features, errors);
                _ = writeln!(out, "Elem[{}]:", sections::LazySequence::count(&seq));
                for (i, segment) in seq.flatten().enumerate() {
                    _ = writeln!(
                        out,
                        " - segment[{}] mode={} count={}",
                        i,
                        segment.mode,
                        segment.items.len()
                    );
                }
            }
            SectionId::Code => {
                let seq = sections::read_code_section(known, features, errors);
                _ = writeln!(out, "Code[{}]:", sections::LazySequence::count(&seq));
                for (i, code) in seq.flatten().enumerate() {
                    let func_index = self.imported_functions + i as u32;
                    let locals: u32 = code.locals.iter().map(|run| run.count).sum();
                    _ = writeln!(
                        out,
                        " - func[{}] size={} locals={}{}",
                        func_index,
                        code.body.len(),
                        locals,
                        self.function_name(func_index)
                    );
                }
            }
            SectionId::Data => {
                let seq = sections::read_data_section(known, features, errors);
                _ = writeln!(out, "Data[{}]:", sections::LazySequence::count(&seq));
                for (i, segment) in seq.flatten().enumerate() {
                    _ = writeln!(
                        out,
                        " - segment[{}] mode={} size={}",
                        i,
                        segment.mode,
                        segment.data.len()
                    );
                }
            }
            SectionId::DataCount => {
                if let Some(count) = sections::read_data_count_section(known, errors) {
                    _ = writeln!(out, "DataCount:");
                    _ = writeln!(out, " - data count: {}", count);
                }
            }
            SectionId::Event => {
                let seq = sections::read_event_section(known, features, errors);
                _ = writeln!(out, "Event[{}]:", sections::LazySequence::count(&seq));
                for (i, event) in seq.flatten().enumerate() {
                    _ = writeln!(
                        out,
                        " - event[{}] attribute={} type={:?}",
                        i,
                        event.ty.attribute,
                        event.ty.type_use.index
                    );
                }
            }
        }
    }

    fn custom_section_details(&self, out: &mut String, custom: &CustomSection<'a>) {
        _ = writeln!(out, "Custom \"{}\" [{} bytes]:", custom.name, custom.data.len());
        if custom.name == "name" {
            for subsection in binary::names::read_name_section(custom, self.errors) {
                match subsection {
                    NameSubsection::ModuleName(name) => {
                        _ = writeln!(out, " - module <{}>", name);
                    }
                    NameSubsection::FunctionNames(assocs) => {
                        for assoc in assocs {
                            _ = writeln!(out, " - func[{}] <{}>", assoc.index, assoc.name);
                        }
                    }
                    NameSubsection::LocalNames(assocs) => {
                        for assoc in assocs {
                            for local in assoc.names {
                                _ = writeln!(
                                    out,
                                    " - func[{}] local[{}] <{}>",
                                    assoc.index, local.index, local.name
                                );
                            }
                        }
                    }
                }
            }
        } else if custom.name == "linking" {
            if let Some(reader) = binary::linking::read_linking_section(custom, self.errors) {
                for subsection in reader {
                    match subsection {
                        LinkingSubsection::SymbolTable(symbols) => {
                            _ = writeln!(out, " - symbol table [count={}]", symbols.len());
                            for (i, symbol) in symbols.iter().enumerate() {
                                _ = writeln!(
                                    out,
                                    "  - {}: {} <{}> flags=0x{:x}",
                                    i,
                                    symbol.kind,
                                    symbol.name().unwrap_or(""),
                                    symbol.flags
                                );
                            }
                        }
                        LinkingSubsection::SegmentInfo(infos) => {
                            _ = writeln!(out, " - segment info [count={}]", infos.len());
                            for info in infos {
                                _ = writeln!(
                                    out,
                                    "  - <{}> align={} flags=0x{:x}",
                                    info.name, info.align_log2, info.flags
                                );
                            }
                        }
                        LinkingSubsection::InitFunctions(inits) => {
                            _ = writeln!(out, " - init functions [count={}]", inits.len());
                            for init in inits {
                                _ = writeln!(
                                    out,
                                    "  - symbol={} priority={}",
                                    init.symbol_index, init.priority
                                );
                            }
                        }
                        LinkingSubsection::ComdatInfo(comdats) => {
                            _ = writeln!(out, " - comdat info [count={}]", comdats.len());
                            for comdat in comdats {
                                _ = writeln!(
                                    out,
                                    "  - <{}> symbols={}",
                                    comdat.name,
                                    comdat.symbols.len()
                                );
                            }
                        }
                    }
                }
            }
        } else if custom.name.starts_with("reloc.") {
            if let Some(reader) = binary::linking::read_relocation_section(custom, self.errors) {
                _ = writeln!(out, " - relocations for section {}", reader.target_section);
                for entry in reader {
                    match entry.addend {
                        Some(addend) => {
                            _ = writeln!(
                                out,
                                "  - {} offset=0x{:06x} index={} addend={}",
                                entry.ty, entry.offset, entry.index, addend
                            );
                        }
                        None => {
                            _ = writeln!(
                                out,
                                "  - {} offset=0x{:06x} index={}",
                                entry.ty, entry.offset, entry.index
                            );
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Disassembly pass
    // ------------------------------------------------------------------

    fn disassemble(&self, out: &mut String) {
        _ = writeln!(out, "\nCode Disassembly:\n");
        for section in self.module.sections() {
            let Section::Known(known) = section else { continue };
            if known.id != SectionId::Code || !self.section_matches("code") {
                continue;
            }
            let seq = sections::read_code_section(&known, self.features, self.errors);
            for (i, code) in seq.enumerate() {
                let func_index = self.imported_functions + i as u32;
                let signature = self
                    .function_types
                    .get(func_index as usize)
                    .and_then(|type_index| self.types.get(*type_index as usize))
                    .map(|ty| format!(" {}", ty.unbind()))
                    .unwrap_or_default();
                _ = writeln!(
                    out,
                    "func[{}]{}:{}",
                    func_index,
                    self.function_name(func_index),
                    signature
                );
                let Some(code) = code else { continue };
                let mut indent = 0usize;
                for instruction in &code.body {
                    use crate::syntax::Opcode;
                    if matches!(
                        instruction.opcode,
                        Opcode::End | Opcode::Else | Opcode::Catch
                    ) {
                        indent = indent.saturating_sub(1);
                    }
                    _ = writeln!(
                        out,
                        " {:06x}: {:indent$}{}",
                        instruction.location.start,
                        "",
                        instruction,
                        indent = indent * 2
                    );
                    if instruction.opcode.starts_block()
                        || matches!(instruction.opcode, Opcode::Else | Opcode::Catch)
                    {
                        indent += 1;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Raw-contents pass
    // ------------------------------------------------------------------

    fn raw(&self, out: &mut String) {
        for section in self.module.sections() {
            let (name, offset, data) = match &section {
                Section::Known(k) => (k.id.name().to_string(), k.offset, k.data),
                Section::Custom(c) => (format!("\"{}\"", c.name), c.offset, c.data),
            };
            if !self.section_matches(name.trim_matches('"')) {
                continue;
            }
            _ = writeln!(out, "\nContents of section {}:", name);
            hex_dump(out, data, offset);
        }
    }
}

/// Sixteen octets per line, grouped in pairs, with a printable-character
/// gutter.
fn hex_dump(out: &mut String, data: &[u8], base: usize) {
    for (line_index, chunk) in data.chunks(16).enumerate() {
        _ = write!(out, " 0x{:08x}:", base + line_index * 16);
        for (i, byte) in chunk.iter().enumerate() {
            if i % 2 == 0 {
                out.push(' ');
            }
            _ = write!(out, "{:02x}", byte);
        }
        let used = chunk.len() * 2 + chunk.len().div_ceil(2);
        for _ in used..40 {
            out.push(' ');
        }
        out.push(' ');
        for byte in chunk {
            out.push(if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_module() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        // (type (func)) (func (type 0)) (export "f" (func 0)) code: end
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x07, 0x05, 0x01, 0x01, b'f', 0x00, 0x00]);
        bytes.extend_from_slice(&[0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b]);
        bytes
    }

    #[test]
    fn headers_pass_lists_sections() {
        let bytes = tiny_module();
        let options = Options {
            headers: true,
            ..Options::default()
        };
        let (out, errors) = dump("t.wasm", &bytes, &options);
        assert!(errors.is_empty(), "{:?}", errors.diagnostics());
        assert!(out.contains("Sections:"));
        assert!(out.contains("type"));
        assert!(out.contains("code"));
    }

    #[test]
    fn details_pass_uses_export_names() {
        let bytes = tiny_module();
        let options = Options {
            details: true,
            ..Options::default()
        };
        let (out, _) = dump("t.wasm", &bytes, &options);
        assert!(out.contains("Type[1]:"));
        // The export prepass names func[0] "f".
        assert!(out.contains("<f>"), "output:\n{}", out);
    }

    #[test]
    fn disassembly_prints_instructions() {
        let bytes = tiny_module();
        let options = Options {
            disassemble: true,
            ..Options::default()
        };
        let (out, _) = dump("t.wasm", &bytes, &options);
        assert!(out.contains("func[0] <f>:"));
        assert!(out.contains("end"));
    }

    #[test]
    fn section_filter_restricts_output() {
        let bytes = tiny_module();
        let options = Options {
            headers: true,
            section: Some("code".to_string()),
            ..Options::default()
        };
        let (out, _) = dump("t.wasm", &bytes, &options);
        assert!(out.contains("code"));
        assert!(!out.contains("type"));
    }

    #[test]
    fn bad_magic_produces_no_report() {
        let options = Options {
            headers: true,
            ..Options::default()
        };
        let (out, errors) = dump("bad.wasm", &[0, 0, 0, 0, 1, 0, 0, 0], &options);
        assert!(out.is_empty());
        assert!(!errors.is_empty());
    }

    #[test]
    fn hex_dump_format() {
        let mut out = String::new();
        hex_dump(&mut out, b"Hello, world ...", 0x20);
        assert!(out.contains("0x00000020:"));
        assert!(out.contains("4865 6c6c"));
        assert!(out.contains("Hello, world"));
    }
}
