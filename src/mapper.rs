//! Position translation between dialect and host coordinates.
//!
//! The forward table (host line → dialect positions) produced by the
//! compiler is reliable; reading it backwards column by column is not. Host
//! ranges therefore map back at line granularity: the dialect range always
//! spans column 0 to the end of the resolved dialect line(s).

use std::fmt;

use tower_lsp::lsp_types::{Position, Range};

use crate::sourcemap::{ColumnMapping, SourceMap};
use crate::text::line_len;

/// How far from the requested host line to look for a populated entry.
/// Generated lines (declarations, closing braces) carry no mapping.
pub const NEIGHBORHOOD: u32 = 2;

/// No mapping exists for the requested coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingMiss {
    pub host_line: u32,
}

impl fmt::Display for MappingMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no source mapping within {} lines of host line {}",
            NEIGHBORHOOD, self.host_line
        )
    }
}

impl std::error::Error for MappingMiss {}

/// Host lines to try for `line`, nearest first: the line itself, then one
/// below and one above, then two below and two above.
fn candidate_lines(line: u32) -> impl Iterator<Item = u32> {
    std::iter::once(Some(line))
        .chain((1..=NEIGHBORHOOD).flat_map(move |d| [line.checked_add(d), line.checked_sub(d)]))
        .flatten()
}

/// First populated column mapping on `host_line` or its neighborhood.
pub fn nearest_mapping(map: &SourceMap, host_line: u32) -> Result<ColumnMapping, MappingMiss> {
    candidate_lines(host_line)
        .filter_map(|line| map.line(line).and_then(|l| l.first()).copied())
        .next()
        .ok_or(MappingMiss { host_line })
}

/// Map a host range onto whole dialect lines.
///
/// `dialect_source` supplies the end-of-line column for the resolved end
/// line.
pub fn host_to_dialect(
    map: &SourceMap,
    host: Range,
    dialect_source: &str,
) -> Result<Range, MappingMiss> {
    let start = nearest_mapping(map, host.start.line)?;
    let end = nearest_mapping(map, host.end.line)?;
    let (first, last) = if end.dialect_line < start.dialect_line {
        (end.dialect_line, start.dialect_line)
    } else {
        (start.dialect_line, end.dialect_line)
    };
    Ok(Range::new(
        Position::new(first, 0),
        Position::new(last, line_len(dialect_source, last)),
    ))
}

/// Host line holding a mapping for exactly `dialect` (line and column).
///
/// No fallback: `None` means the position has no host counterpart.
pub fn dialect_to_host(map: &SourceMap, dialect: Position) -> Option<u32> {
    map.lines()
        .find(|(_, line)| {
            line.columns
                .iter()
                .any(|c| c.dialect_line == dialect.line && c.dialect_column == dialect.character)
        })
        .map(|(host_line, _)| host_line)
}
