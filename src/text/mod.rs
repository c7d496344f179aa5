//! Text front-end: tokenizer and recursive-descent parser for the
//! S-expression module syntax.
//!
//! [`parse`] produces the same tree as the binary front-end, with inline
//! sugar desugared, folded expressions flattened, and names resolved to
//! indices.
//!
//! # Example
//!
//! ```
//! use wasmlens::error::CollectingErrors;
//! use wasmlens::features::Features;
//! use wasmlens::text;
//!
//! let errors = CollectingErrors::new();
//! let module = text::parse("(module (func))", Features::mvp(), &errors).unwrap();
//! assert!(errors.is_empty());
//! assert_eq!(module.functions().count(), 1);
//! ```

pub mod cursor;
pub mod lexer;
pub mod numeric;
pub mod parser;
pub mod resolve;
pub mod token;
pub mod tokenizer;

pub use lexer::{LexError, Lexer};
pub use parser::{parse, Context, FunctionTypeMap, NameMap};
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
