//! Speculative stand-in buffers for completion.
//!
//! The line under the cursor is usually half-typed and would make the whole
//! buffer fail to compile. The probe buffer replaces that line with a
//! trivially valid expression, keeping its exact indentation so the block
//! structure of every later line is unchanged. Once the probe compiles, the
//! host line it landed on is overwritten with the real line text, which the
//! host completion service can cope with.

use tower_lsp::lsp_types::Position;

use crate::text::{indentation, utf16_len};

/// Expression substituted for the line under the cursor.
pub const PLACEHOLDER: &str = "true";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Full dialect text with the cursor line replaced.
    pub candidate_text: String,
    /// Dialect position of the placeholder (cursor line, indentation width).
    pub probe_position: Position,
    /// Real text of the cursor line, without its terminator.
    pub current_line: String,
}

/// Build the probe buffer for `cursor` in `text`.
///
/// Returns `None` when the cursor line does not exist.
pub fn synthesize(text: &str, cursor: Position) -> Option<Probe> {
    let target = cursor.line as usize;
    let raw = text.split('\n').nth(target)?;
    let (current, terminator) = match raw.strip_suffix('\r') {
        Some(line) => (line, "\r"),
        None => (raw, ""),
    };
    let indent = indentation(current);
    let replacement = format!("{}{}{}", indent, PLACEHOLDER, terminator);
    let candidate_text = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| if i == target { replacement.as_str() } else { line })
        .collect::<Vec<_>>()
        .join("\n");

    Some(Probe {
        candidate_text,
        probe_position: Position::new(cursor.line, utf16_len(indent)),
        current_line: current.to_string(),
    })
}

/// Overwrite `host_line` of the compiled probe with the real cursor line.
///
/// Returns the host text to hand to the completion service and the emulated
/// cursor at the end of the substituted line.
pub fn emulate(
    host_source: &str,
    host_line: u32,
    current_line: &str,
) -> Option<(String, Position)> {
    let mut lines: Vec<&str> = host_source.split('\n').collect();
    let slot = lines.get_mut(host_line as usize)?;
    *slot = current_line;
    Some((
        lines.join("\n"),
        Position::new(host_line, utf16_len(current_line)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_replaces_cursor_line() {
        let probe = synthesize("x = 1\ny = x.", Position::new(1, 6)).unwrap();
        assert_eq!(probe.candidate_text, "x = 1\ntrue");
        assert_eq!(probe.probe_position, Position::new(1, 0));
        assert_eq!(probe.current_line, "y = x.");
    }

    #[test]
    fn test_indentation_is_preserved_exactly() {
        let text = "if a\n    b = a.\n    c = 2\nd = 3\n";
        let probe = synthesize(text, Position::new(1, 10)).unwrap();
        insta::assert_snapshot!(probe.candidate_text, @r"
        if a
            true
            c = 2
        d = 3
        ");
        assert_eq!(probe.probe_position, Position::new(1, 4));
        let placeholder_line = probe.candidate_text.split('\n').nth(1).unwrap();
        assert_eq!(placeholder_line, format!("{}{}", " ".repeat(4), PLACEHOLDER));
    }

    #[test]
    fn test_tabs_and_crlf_survive() {
        let text = "f = ->\r\n\tg.\r\n\th = 1\r\n";
        let probe = synthesize(text, Position::new(1, 3)).unwrap();
        assert_eq!(probe.candidate_text, "f = ->\r\n\ttrue\r\n\th = 1\r\n");
        assert_eq!(probe.current_line, "\tg.");
        assert_eq!(probe.probe_position, Position::new(1, 1));
    }

    #[test]
    fn test_empty_and_blank_lines() {
        let probe = synthesize("", Position::new(0, 0)).unwrap();
        assert_eq!(probe.candidate_text, "true");
        let probe = synthesize("a = 1\n  ", Position::new(1, 2)).unwrap();
        assert_eq!(probe.candidate_text, "a = 1\n  true");
        assert_eq!(probe.probe_position, Position::new(1, 2));
    }

    #[test]
    fn test_cursor_past_last_line() {
        assert!(synthesize("a = 1", Position::new(3, 0)).is_none());
    }

    #[test]
    fn test_emulate_overwrites_single_line() {
        let host = "var x, y;\n\nx = 1;\ntrue;";
        let (text, cursor) = emulate(host, 3, "y = x.").unwrap();
        assert_eq!(text, "var x, y;\n\nx = 1;\ny = x.");
        assert_eq!(cursor, Position::new(3, 6));
        assert!(emulate(host, 4, "y = x.").is_none());
    }
}
