//! End-to-end text parsing scenarios.

use wasmlens::error::CollectingErrors;
use wasmlens::features::{Feature, Features};
use wasmlens::syntax::module::ModuleItem;
use wasmlens::syntax::types::Var;
use wasmlens::syntax::Opcode;
use wasmlens::text;

#[test]
fn empty_function_gets_a_synthesised_type() {
    let errors = CollectingErrors::new();
    let module = text::parse("(module (func))", Features::mvp(), &errors).unwrap();
    assert!(errors.is_empty());
    assert_eq!(module.functions().count(), 1);
    // One synthesised `(func)` type entry.
    let types: Vec<_> = module.types().collect();
    assert_eq!(types.len(), 1);
    assert!(types[0].ty.params.is_empty() && types[0].ty.results.is_empty());
}

#[test]
fn duplicate_binding_still_assigns_an_index() {
    let errors = CollectingErrors::new();
    let module = text::parse("(module (func $a) (func $a))", Features::mvp(), &errors).unwrap();
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("Variable $a is already bound")));
    assert_eq!(module.functions().count(), 2);
}

#[test]
fn late_import_is_rejected() {
    let source = r#"(module
        (func (import "m" "n"))
        (global i32 (i32.const 0))
        (func (import "m" "o")))"#;
    let errors = CollectingErrors::new();
    let module = text::parse(source, Features::mvp(), &errors).unwrap();
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("Imports must occur before all non-import definitions")));
    // The first import and the global survive.
    assert_eq!(module.imports().count(), 1);
    assert!(module
        .items
        .iter()
        .any(|item| matches!(item, ModuleItem::Global(_))));
}

#[test]
fn folded_and_linear_forms_agree() {
    let errors = CollectingErrors::new();
    let folded = text::parse(
        "(module (func (result i32) (i32.add (i32.const 1) (i32.const 2))))",
        Features::mvp(),
        &errors,
    )
    .unwrap();
    let linear = text::parse(
        "(module (func (result i32) i32.const 1 i32.const 2 i32.add))",
        Features::mvp(),
        &errors,
    )
    .unwrap();
    assert!(errors.is_empty());
    assert_eq!(
        folded.functions().next().unwrap().body,
        linear.functions().next().unwrap().body
    );
}

#[test]
fn exports_may_precede_their_targets() {
    let errors = CollectingErrors::new();
    let module = text::parse(
        r#"(module (export "f" (func $later)) (func $later))"#,
        Features::mvp(),
        &errors,
    )
    .unwrap();
    assert!(errors.is_empty(), "{:?}", errors.diagnostics());
    let export = module.exports().next().unwrap();
    assert_eq!(export.index, Var::Index(0));
}

#[test]
fn element_segment_with_declared_mode() {
    let errors = CollectingErrors::new();
    let features = Features::mvp().enable(Feature::BulkMemory).enable(Feature::ReferenceTypes);
    let module = text::parse(
        "(module (func $f) (elem declare func $f))",
        features,
        &errors,
    )
    .unwrap();
    assert!(errors.is_empty(), "{:?}", errors.diagnostics());
    let segment = module
        .items
        .iter()
        .find_map(|item| match item {
            ModuleItem::Element(e) => Some(e),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        segment.mode,
        wasmlens::syntax::types::SegmentType::Declared
    );
}

#[test]
fn passive_segments_are_feature_gated() {
    let errors = CollectingErrors::new();
    let _ = text::parse("(module (func $f) (elem func $f))", Features::mvp(), &errors);
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("not allowed")));
}

#[test]
fn tail_call_opcodes_are_gated() {
    let errors = CollectingErrors::new();
    let _ = text::parse(
        "(module (func $f return_call $f))",
        Features::mvp(),
        &errors,
    );
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("instruction not allowed: return_call")));

    let errors = CollectingErrors::new();
    let module = text::parse(
        "(module (func $f return_call $f))",
        Features::mvp().enable(Feature::TailCall),
        &errors,
    )
    .unwrap();
    assert!(errors.is_empty());
    let function = module.functions().next().unwrap();
    assert_eq!(function.body[0].opcode, Opcode::ReturnCall);
}

#[test]
fn block_labels_nest_and_shadow() {
    let errors = CollectingErrors::new();
    let module = text::parse(
        "(module (func
            (block $a
                (block $b
                    (br $a)
                    (br $b)))))",
        Features::mvp(),
        &errors,
    )
    .unwrap();
    assert!(errors.is_empty(), "{:?}", errors.diagnostics());
    let function = module.functions().next().unwrap();
    let branches: Vec<_> = function
        .body
        .iter()
        .filter(|i| i.opcode == Opcode::Br)
        .map(|i| i.immediate.clone())
        .collect();
    use wasmlens::syntax::Immediate;
    assert_eq!(
        branches,
        vec![
            Immediate::Index(Var::Index(1)),
            Immediate::Index(Var::Index(0)),
        ]
    );
}

#[test]
fn undefined_names_report_their_source_locations() {
    // Undefined references resolved in the post-parse pass must point at the
    // offending token, wherever it sits: an export descriptor, an
    // instruction operand, or a global initialiser.
    let source = r#"(module
        (export "f" (func $nofunc))
        (global i32 (global.get $noglobal))
        (func (call $nofunc)))"#;
    let errors = CollectingErrors::new();
    let _ = text::parse(source, Features::mvp(), &errors);

    let diagnostics = errors.diagnostics();
    for (name, message) in [
        ("$nofunc", "undefined function: $nofunc"),
        ("$noglobal", "undefined global: $noglobal"),
    ] {
        let diagnostic = diagnostics
            .iter()
            .find(|d| d.message.contains(message))
            .unwrap_or_else(|| panic!("missing diagnostic for {}", name));
        let offset = source.find(name).unwrap();
        assert_eq!(
            diagnostic.location.start, offset,
            "wrong location for {}: {:?}",
            name, diagnostic
        );
    }
}

#[test]
fn call_indirect_with_inline_type() {
    let errors = CollectingErrors::new();
    let module = text::parse(
        "(module
            (table 1 funcref)
            (func (param i32) (result i32)
                local.get 0
                call_indirect (param i32) (result i32)))",
        Features::mvp(),
        &errors,
    )
    .unwrap();
    assert!(errors.is_empty(), "{:?}", errors.diagnostics());
    // The inline call_indirect signature matches the function's own, so only
    // one type entry is synthesised.
    assert_eq!(module.types().count(), 1);
}
