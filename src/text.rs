//! Line and column helpers shared by the mapper, the synthesizer and the
//! diagnostic renderer. Columns are UTF-16 code units, the unit used both by
//! LSP positions and by the CoffeeScript source map.

use tower_lsp::lsp_types::Position;

/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Number of `\n`-separated lines. A trailing newline counts as a final
/// empty line.
pub fn line_count(source: &str) -> usize {
    source.bytes().filter(|&b| b == b'\n').count() + 1
}

/// Text of line `line` without its terminator (`\r\n` is handled).
pub fn line_at(source: &str, line: u32) -> Option<&str> {
    source
        .split('\n')
        .nth(line as usize)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// UTF-16 length of line `line`, or 0 when the line does not exist.
pub fn line_len(source: &str, line: u32) -> u32 {
    line_at(source, line).map_or(0, utf16_len)
}

/// Leading whitespace of a line, exactly as written.
pub fn indentation(line: &str) -> &str {
    let rest = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - rest.len()]
}

/// Byte offset of `pos`. A column past the end of its line clamps to the
/// end of that line; a line past the end of the source yields `None`.
pub fn position_to_byte_offset(source: &str, pos: Position) -> Option<usize> {
    let mut line = 0u32;
    let mut col = 0u32;
    for (i, ch) in source.char_indices() {
        if line == pos.line && col >= pos.character {
            return Some(i);
        }
        if ch == '\n' {
            if line == pos.line {
                return Some(i);
            }
            line += 1;
            col = 0;
        } else {
            col += ch.len_utf16() as u32;
        }
    }
    if line == pos.line {
        Some(source.len())
    } else {
        None
    }
}
