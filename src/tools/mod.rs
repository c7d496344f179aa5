//! The `dump` and `validate` command implementations.

pub mod dump;
pub mod validate;

use crate::error::Diagnostic;
use std::fmt::Write;

/// Renders a diagnostic with its file offset, breadcrumb, and a hex window
/// of the surrounding bytes with `^^` markers under the offending span.
pub fn render_diagnostic(filename: &str, bytes: &[u8], diagnostic: &Diagnostic) -> String {
    let mut out = String::new();

    _ = write!(out, "{}:{:08x}: ", filename, diagnostic.location.start);
    for desc in &diagnostic.context {
        _ = write!(out, "{} → ", desc);
    }
    _ = writeln!(out, "{}", diagnostic.message);

    if bytes.is_empty() {
        return out;
    }

    const BEFORE: usize = 4;
    const MAX_WINDOW: usize = 32;
    let loc_start = diagnostic.location.start.min(bytes.len());
    let loc_end = diagnostic.location.end.min(bytes.len());
    let start = loc_start.saturating_sub(BEFORE);
    let end = (loc_end + 8).min(bytes.len()).min(start + MAX_WINDOW);

    let mut hex_line = String::from("    ");
    let mut marker_line = String::from("    ");
    let mut spacer = false;
    for (i, byte) in bytes[start..end].iter().enumerate() {
        let offset = start + i;
        _ = write!(hex_line, "{:02x}", byte);
        if offset >= loc_start && offset < loc_end {
            marker_line.push_str("^^");
        } else {
            marker_line.push_str("  ");
        }
        if spacer {
            hex_line.push(' ');
            marker_line.push(' ');
        }
        spacer = !spacer;
    }
    _ = writeln!(out, "{}", hex_line);
    _ = writeln!(out, "{}", marker_line.trim_end());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Diagnostic, Location};

    #[test]
    fn renders_offset_breadcrumb_and_markers() {
        let bytes: Vec<u8> = (0..16).collect();
        let diagnostic = Diagnostic {
            location: Location::new(6, 8),
            message: "unknown value type".to_string(),
            context: vec!["type section".to_string()],
        };
        let rendered = render_diagnostic("a.wasm", &bytes, &diagnostic);
        assert!(rendered.starts_with("a.wasm:00000006: type section → unknown value type"));
        assert!(rendered.contains("^^"));
    }

    #[test]
    fn location_past_end_is_clamped() {
        let diagnostic = Diagnostic {
            location: Location::new(100, 104),
            message: "truncated".to_string(),
            context: vec![],
        };
        let rendered = render_diagnostic("b.wasm", &[1, 2, 3], &diagnostic);
        assert!(rendered.contains("truncated"));
    }
}
