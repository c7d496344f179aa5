//! A WebAssembly module reader and inspector.
//!
//! wasmlens decodes WebAssembly modules from both their binary container
//! format and their S-expression text format into one shared tree, and
//! ships the `dump` and `validate` tools on top of it.
//!
//! # Modules
//!
//! - [`binary`] -- Lazy binary decoder. Reads `.wasm` bytes section by
//!   section on demand.
//! - [`text`] -- Text-format tokenizer and parser. Reads source into the
//!   same [`syntax::Module`] tree.
//! - [`syntax`] -- The shared module tree: types, instructions, items, and
//!   the opcode table.
//! - [`format`] -- Deterministic text rendering that round-trips through the
//!   text parser.
//! - [`valid`] -- Validator entry: a visitor over the tree with structural
//!   checks.
//! - [`features`] / [`error`] -- The feature-gate set and the diagnostic
//!   sink threaded through every reader.
//!
//! # Example
//!
//! Decode a binary module and render it as text:
//!
//! ```
//! use wasmlens::error::CollectingErrors;
//! use wasmlens::features::Features;
//! use wasmlens::{binary, format};
//!
//! let bytes = [
//!     0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // magic + version
//!     0x01, 0x04, 0x01, 0x60, 0x00, 0x00,             // type section: (func)
//! ];
//! let errors = CollectingErrors::new();
//! let lazy = binary::read_module(&bytes, Features::mvp(), &errors);
//! let module = binary::to_module(&lazy);
//! assert!(errors.is_empty());
//! assert!(format::wat(&module).contains("(type (func))"));
//! ```

pub mod binary;
pub mod error;
pub mod features;
pub mod format;
pub mod syntax;
pub mod text;
pub mod tools;
pub mod valid;
