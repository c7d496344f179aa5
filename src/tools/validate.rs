//! The `validate` checker.
//!
//! Decodes each input under the selected feature set, materialises it, and
//! runs the structural validator. Prints a `[ OK ]`/`[FAIL]` line per file
//! (always on failure, on success only when verbose) followed by rendered
//! diagnostics.

use super::render_diagnostic;
use crate::error::CollectingErrors;
use crate::features::Features;
use crate::{binary, valid};
use std::fmt::Write;

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub verbose: bool,
    pub features: Features,
}

/// The outcome for one input file.
pub struct Outcome {
    pub valid: bool,
    pub report: String,
}

pub fn validate(filename: &str, bytes: &[u8], options: &Options) -> Outcome {
    let errors = CollectingErrors::new();
    let lazy = binary::read_module(bytes, options.features, &errors);

    let valid = if lazy.is_valid_header() {
        let module = binary::to_module(&lazy);
        let structurally_valid = valid::validate(&module, options.features, &errors);
        structurally_valid && errors.is_empty()
    } else {
        false
    };

    let mut report = String::new();
    if !valid || options.verbose {
        _ = writeln!(report, "[{}] {}", if valid { " OK " } else { "FAIL" }, filename);
        for diagnostic in errors.diagnostics() {
            report.push_str(&render_diagnostic(filename, bytes, &diagnostic));
        }
    }

    Outcome { valid, report }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_module() -> Vec<u8> {
        vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]
    }

    #[test]
    fn empty_module_is_valid_and_quiet() {
        let outcome = validate("a.wasm", &empty_module(), &Options::default());
        assert!(outcome.valid);
        assert!(outcome.report.is_empty());
    }

    #[test]
    fn verbose_reports_ok() {
        let options = Options {
            verbose: true,
            ..Options::default()
        };
        let outcome = validate("a.wasm", &empty_module(), &options);
        assert!(outcome.valid);
        assert!(outcome.report.contains("[ OK ] a.wasm"));
    }

    #[test]
    fn bad_magic_fails() {
        let outcome = validate("bad.wasm", &[0x00, 0x61, 0x73, 0x00], &Options::default());
        assert!(!outcome.valid);
        assert!(outcome.report.contains("[FAIL] bad.wasm"));
    }

    #[test]
    fn feature_gated_opcode_fails_without_feature() {
        // (func) whose body is a v128.const.
        let mut bytes = empty_module();
        bytes.extend_from_slice(&[0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7b]); // type: () -> v128
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        let mut body = vec![0x00u8]; // no locals
        body.push(0xfd);
        body.push(0x0c);
        body.extend_from_slice(&[0; 16]);
        body.push(0x0b);
        bytes.extend_from_slice(&[0x0a, (body.len() + 2) as u8, 0x01, body.len() as u8]);
        bytes.extend_from_slice(&body);

        let outcome = validate("simd.wasm", &bytes, &Options::default());
        assert!(!outcome.valid);
        assert!(
            outcome.report.contains("not allowed"),
            "report:\n{}",
            outcome.report
        );

        let options = Options {
            verbose: false,
            features: Features::all(),
        };
        let outcome = validate("simd.wasm", &bytes, &options);
        assert!(outcome.valid, "report:\n{}", outcome.report);
    }
}
