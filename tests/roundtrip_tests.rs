//! Round-trip law: `parse_text ∘ format ∘ parse_binary = parse_binary`.
//!
//! Each case assembles a reference binary by hand, materialises it, renders
//! it as text, parses the text, and requires the two trees to be equal (the
//! text parser may append inline types at the end of the type space, which
//! these fixtures avoid by declaring their types explicitly).

mod common;

use common::{module_bytes, uleb};
use wasmlens::error::CollectingErrors;
use wasmlens::features::{Feature, Features};
use wasmlens::syntax::Module;
use wasmlens::{binary, format, text, valid};

fn round_trip(bytes: &[u8], features: Features) -> (Module, Module, String) {
    let errors = CollectingErrors::new();
    let lazy = binary::read_module(bytes, features, &errors);
    let from_binary = binary::to_module(&lazy);
    assert!(
        errors.is_empty(),
        "binary diagnostics: {:?}",
        errors.diagnostics()
    );
    assert!(valid::validate(&from_binary, features, &errors));

    let rendered = format::wat(&from_binary);
    let errors = CollectingErrors::new();
    let from_text = text::parse(&rendered, features, &errors)
        .unwrap_or_else(|| panic!("rendered text failed to parse:\n{}", rendered));
    assert!(
        errors.is_empty(),
        "text diagnostics on:\n{}\n{:?}",
        rendered,
        errors.diagnostics()
    );
    (from_binary, from_text, rendered)
}

#[test]
fn empty_module() {
    let bytes = module_bytes(&[]);
    let (from_binary, from_text, _) = round_trip(&bytes, Features::mvp());
    assert_eq!(from_binary, from_text);
}

#[test]
fn add_function() {
    // (type (func (param i32 i32) (result i32)))
    // (func (type 0) local.get 0; local.get 1; i32.add; end)
    // (export "add" (func 0))
    let code_body = vec![0x00, 0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b];
    let mut code_section = vec![0x01];
    code_section.extend_from_slice(&uleb(code_body.len() as u64));
    code_section.extend_from_slice(&code_body);

    let bytes = module_bytes(&[
        (1, vec![0x01, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f]),
        (3, vec![0x01, 0x00]),
        (7, vec![0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00]),
        (10, code_section),
    ]);
    let (from_binary, from_text, rendered) = round_trip(&bytes, Features::mvp());
    assert_eq!(from_binary, from_text, "rendered:\n{}", rendered);
}

#[test]
fn control_flow_and_memory() {
    // (func (type 0)
    //   block
    //     i32.const 0
    //     if  i32.const 8 i32.load drop  else  nop  end
    //   end
    // end)
    let code_body = vec![
        0x00, // no locals
        0x02, 0x40, // block void
        0x41, 0x00, // i32.const 0
        0x04, 0x40, // if void
        0x41, 0x08, // i32.const 8
        0x28, 0x02, 0x00, // i32.load align=2 offset=0
        0x1a, // drop
        0x05, // else
        0x01, // nop
        0x0b, // end (if)
        0x0b, // end (block)
        0x0b, // end (function)
    ];
    let mut code_section = vec![0x01];
    code_section.extend_from_slice(&uleb(code_body.len() as u64));
    code_section.extend_from_slice(&code_body);

    let bytes = module_bytes(&[
        (1, vec![0x01, 0x60, 0x00, 0x00]),
        (3, vec![0x01, 0x00]),
        (5, vec![0x01, 0x00, 0x01]), // memory 1
        (10, code_section),
    ]);
    let (from_binary, from_text, rendered) = round_trip(&bytes, Features::mvp());
    assert_eq!(from_binary, from_text, "rendered:\n{}", rendered);
}

#[test]
fn globals_tables_and_segments() {
    let mut data_body = vec![0x01, 0x00, 0x41, 0x08, 0x0b];
    data_body.extend_from_slice(&uleb(2));
    data_body.extend_from_slice(b"hi");

    let bytes = module_bytes(&[
        (1, vec![0x01, 0x60, 0x00, 0x00]),
        (3, vec![0x01, 0x00]),
        (4, vec![0x01, 0x70, 0x00, 0x02]), // table 2 funcref
        (5, vec![0x01, 0x00, 0x01]),       // memory 1
        (6, vec![0x01, 0x7f, 0x01, 0x41, 0x2a, 0x0b]), // (global (mut i32) (i32.const 42))
        (9, vec![0x01, 0x00, 0x41, 0x00, 0x0b, 0x01, 0x00]), // elem {0} at 0
        (10, vec![0x01, 0x02, 0x00, 0x0b]),
        (11, data_body),
    ]);
    let (from_binary, from_text, rendered) = round_trip(&bytes, Features::mvp());
    assert_eq!(from_binary, from_text, "rendered:\n{}", rendered);
}

#[test]
fn imports_before_definitions() {
    let bytes = module_bytes(&[
        (1, vec![0x01, 0x60, 0x00, 0x00]),
        (2, {
            let mut body = vec![0x02];
            body.extend_from_slice(&[0x03, b'e', b'n', b'v', 0x01, b'f', 0x00, 0x00]);
            body.extend_from_slice(&[0x03, b'e', b'n', b'v', 0x01, b'g', 0x03, 0x7e, 0x00]);
            body
        }),
        (3, vec![0x01, 0x00]),
        (10, vec![0x01, 0x04, 0x00, 0x10, 0x00, 0x0b]), // call 0; end
    ]);
    let (from_binary, from_text, rendered) = round_trip(&bytes, Features::mvp());
    assert_eq!(from_binary, from_text, "rendered:\n{}", rendered);
}

#[test]
fn float_constants_survive_bit_exactly() {
    // f32.const with a non-canonical NaN payload, f64.const -0.
    let mut code_body = vec![0x00];
    code_body.push(0x43);
    code_body.extend_from_slice(&f32::from_bits(0x7fc0_0001).to_le_bytes());
    code_body.push(0x1a);
    code_body.push(0x44);
    code_body.extend_from_slice(&(-0.0f64).to_le_bytes());
    code_body.push(0x1a);
    code_body.push(0x0b);
    let mut code_section = vec![0x01];
    code_section.extend_from_slice(&uleb(code_body.len() as u64));
    code_section.extend_from_slice(&code_body);

    let bytes = module_bytes(&[
        (1, vec![0x01, 0x60, 0x00, 0x00]),
        (3, vec![0x01, 0x00]),
        (10, code_section),
    ]);
    let (from_binary, from_text, rendered) = round_trip(&bytes, Features::mvp());

    use wasmlens::syntax::Immediate;
    let binary_body = &from_binary.functions().next().unwrap().body;
    let text_body = &from_text.functions().next().unwrap().body;
    match (&binary_body[0].immediate, &text_body[0].immediate) {
        (Immediate::F32(a), Immediate::F32(b)) => assert_eq!(a.to_bits(), b.to_bits()),
        other => panic!("unexpected immediates: {:?}", other),
    }
    match (&binary_body[2].immediate, &text_body[2].immediate) {
        (Immediate::F64(a), Immediate::F64(b)) => {
            assert_eq!(a.to_bits(), b.to_bits(), "rendered:\n{}", rendered);
        }
        other => panic!("unexpected immediates: {:?}", other),
    }
}

#[test]
fn bulk_memory_instructions() {
    let features = Features::mvp().enable(Feature::BulkMemory);
    // memory.fill: i32.const 0 (dest), i32.const 0 (value), i32.const 4 (len)
    let code_body = vec![
        0x00, 0x41, 0x00, 0x41, 0x00, 0x41, 0x04, 0xfc, 0x0b, 0x00, 0x0b,
    ];
    let mut code_section = vec![0x01];
    code_section.extend_from_slice(&uleb(code_body.len() as u64));
    code_section.extend_from_slice(&code_body);

    let bytes = module_bytes(&[
        (1, vec![0x01, 0x60, 0x00, 0x00]),
        (3, vec![0x01, 0x00]),
        (5, vec![0x01, 0x00, 0x01]),
        (10, code_section),
    ]);
    let (from_binary, from_text, rendered) = round_trip(&bytes, features);
    assert_eq!(from_binary, from_text, "rendered:\n{}", rendered);
}
