//! Binary front-end: lazy, section-oriented decoding of `.wasm` bytes.
//!
//! [`read_module`] frames the input into sections without decoding their
//! contents; per-section readers in [`sections`] decode items on demand.
//! [`to_module`] materialises the whole thing into the unified tree for
//! consumers that want the module at once (formatters, the validator).

pub mod instructions;
pub mod linking;
pub mod module;
pub mod names;
pub mod reader;
pub mod sections;
pub mod values;

pub use module::{read_module, CustomSection, KnownSection, LazyModule, Section};
pub use reader::Reader;
pub use values::ReadContext;

use crate::syntax::module::{Function, Module, ModuleItem, TypeUse};
use crate::syntax::SectionId;

/// Materialises a lazy module into the unified tree.
///
/// Items appear in on-disk section order. Function-section type indices and
/// code-section bodies are zipped into full [`Function`] items, emitted at
/// the code section's position; a count mismatch is diagnosed and the
/// unpaired remainder dropped.
pub fn to_module(lazy: &LazyModule<'_>) -> Module {
    let features = lazy.features();
    let errors = lazy.errors();
    let mut module = Module::new();
    let mut function_types: Vec<u32> = Vec::new();

    for section in lazy.sections() {
        let known = match section {
            Section::Known(k) => k,
            Section::Custom(_) => continue,
        };
        match known.id {
            SectionId::Type => {
                for entry in sections::read_type_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Type(entry));
                }
            }
            SectionId::Import => {
                for import in sections::read_import_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Import(import));
                }
            }
            SectionId::Function => {
                function_types
                    .extend(sections::read_function_section(&known, features, errors).flatten());
            }
            SectionId::Table => {
                for table in sections::read_table_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Table(table));
                }
            }
            SectionId::Memory => {
                for memory in sections::read_memory_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Memory(memory));
                }
            }
            SectionId::Global => {
                for global in sections::read_global_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Global(global));
                }
            }
            SectionId::Export => {
                for export in sections::read_export_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Export(export));
                }
            }
            SectionId::Start => {
                if let Some(start) = sections::read_start_section(&known, errors) {
                    module.push(ModuleItem::Start(start));
                }
            }
            SectionId::Element => {
                for segment in sections::read_element_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Element(segment));
                }
            }
            SectionId::DataCount => {
                if let Some(count) = sections::read_data_count_section(&known, errors) {
                    module.push(ModuleItem::DataCount(count));
                }
            }
            SectionId::Code => {
                let codes: Vec<_> =
                    sections::read_code_section(&known, features, errors).collect();
                if codes.len() != function_types.len() {
                    errors.on_error(
                        crate::error::Location::at(known.offset),
                        &format!(
                            "function and code section counts disagree: {} vs {}",
                            function_types.len(),
                            codes.len()
                        ),
                    );
                }
                for (type_index, code) in function_types.drain(..).zip(codes) {
                    let Some(code) = code else { continue };
                    module.push(ModuleItem::Function(Function {
                        name: None,
                        type_use: TypeUse::by_index(type_index),
                        locals: code.locals,
                        body: code.body,
                    }));
                }
            }
            SectionId::Data => {
                for segment in sections::read_data_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Data(segment));
                }
            }
            SectionId::Event => {
                for event in sections::read_event_section(&known, features, errors).flatten() {
                    module.push(ModuleItem::Event(event));
                }
            }
        }
    }

    if !function_types.is_empty() {
        errors.on_error(
            crate::error::Location::default(),
            &format!(
                "{} function section entries have no code section bodies",
                function_types.len()
            ),
        );
    }

    module
}
