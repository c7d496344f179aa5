//! Diagnostic accumulation with breadcrumb context.
//!
//! Readers never abort on malformed input. Each production that fails emits a
//! diagnostic through an [`ErrorSink`] and returns `None`; the caller decides
//! whether to recover or give up on the enclosing production. Diagnostics
//! carry the context stack active at the time of the error, so a bad value
//! type inside a function type inside the type section reports
//! `type section → function type → value type`.
//!
//! Sink methods take `&self` and implementations use interior mutability, so
//! a reader can hold a shared sink reference while an RAII [`ErrorContext`]
//! guard is alive.

use std::cell::RefCell;
use std::fmt;

/// A byte span into a front-end's input.
///
/// Both front-ends report locations as byte offsets: the binary reader into
/// the module bytes, the text reader into the UTF-8 source. Tools map text
/// offsets back to line/column for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-length location at `offset`.
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.start)
    }
}

/// Receiver for diagnostics and the context breadcrumb protocol.
pub trait ErrorSink {
    /// Opens a context frame. Paired with [`pop_context`](Self::pop_context);
    /// prefer [`ErrorContext`] which guarantees the pair.
    fn push_context(&self, location: Location, desc: &str);

    /// Closes the most recent context frame.
    fn pop_context(&self);

    /// Records a diagnostic at `location` with the current breadcrumb.
    fn on_error(&self, location: Location, message: &str);
}

/// RAII guard pairing `push_context` with `pop_context` on every exit path,
/// including `?`-propagated failures.
pub struct ErrorContext<'a> {
    errors: &'a dyn ErrorSink,
}

impl<'a> ErrorContext<'a> {
    pub fn new(errors: &'a dyn ErrorSink, location: Location, desc: &str) -> Self {
        errors.push_context(location, desc);
        Self { errors }
    }
}

impl Drop for ErrorContext<'_> {
    fn drop(&mut self) {
        self.errors.pop_context();
    }
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub message: String,
    /// Context descriptions outermost-first at the time of the error.
    pub context: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.location)?;
        for desc in &self.context {
            write!(f, "{} → ", desc)?;
        }
        write!(f, "{}", self.message)
    }
}

/// An [`ErrorSink`] that collects diagnostics into a vector.
#[derive(Default)]
pub struct CollectingErrors {
    context: RefCell<Vec<(Location, String)>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    /// Consumes the sink, returning the recorded diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }

    /// Clones out the recorded diagnostics, leaving the sink intact.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }
}

impl ErrorSink for CollectingErrors {
    fn push_context(&self, location: Location, desc: &str) {
        self.context.borrow_mut().push((location, desc.to_string()));
    }

    fn pop_context(&self) {
        self.context.borrow_mut().pop();
    }

    fn on_error(&self, location: Location, message: &str) {
        let context = self.context.borrow().iter().map(|(_, d)| d.clone()).collect();
        self.diagnostics.borrow_mut().push(Diagnostic {
            location,
            message: message.to_string(),
            context,
        });
    }
}
