//! Per-host-line source map between dialect and host coordinates.
//!
//! Host line `i` owns the set of column mappings produced for it, ordered by
//! host column. Structural lines the compiler invents (declarations, braces,
//! blank lines) carry no mappings at all.

mod vlq;

use std::fmt::Write as _;

use serde::Deserialize;

pub use vlq::decode_segment;

/// One column correspondence on a host line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    pub host_column: u32,
    pub dialect_line: u32,
    pub dialect_column: u32,
}

/// Mappings of a single host line, sorted by host column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineMap {
    pub columns: Vec<ColumnMapping>,
}

impl LineMap {
    pub fn first(&self) -> Option<&ColumnMapping> {
        self.columns.first()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Host-line-ordered mapping table. `lines.len()` equals the host line count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceMap {
    lines: Vec<LineMap>,
}

#[derive(Deserialize)]
struct RawSourceMap {
    version: u8,
    mappings: String,
}

impl SourceMap {
    pub fn from_lines(lines: Vec<LineMap>) -> Self {
        Self { lines }
    }

    /// Decode a Source Map v3 JSON document.
    ///
    /// The compiler emits a single source, so the source index and name
    /// fields of each segment are skipped.
    pub fn from_v3_json(json: &str) -> Result<Self, String> {
        let raw: RawSourceMap =
            serde_json::from_str(json).map_err(|e| format!("malformed source map: {}", e))?;
        if raw.version != 3 {
            return Err(format!("unsupported source map version {}", raw.version));
        }
        Self::from_v3_mappings(&raw.mappings)
    }

    /// Decode a v3 `mappings` string (`;` separates host lines, `,`
    /// separates segments).
    pub fn from_v3_mappings(mappings: &str) -> Result<Self, String> {
        let mut lines = Vec::new();
        let mut dialect_line: i64 = 0;
        let mut dialect_column: i64 = 0;

        for line in mappings.split(';') {
            let mut host_column: i64 = 0;
            let mut columns = Vec::new();
            for segment in line.split(',').filter(|s| !s.is_empty()) {
                let fields = decode_segment(segment)?;
                match fields.len() {
                    1 => host_column += fields[0],
                    4 | 5 => {
                        host_column += fields[0];
                        dialect_line += fields[2];
                        dialect_column += fields[3];
                        if host_column < 0 || dialect_line < 0 || dialect_column < 0 {
                            return Err(format!("negative position in segment '{}'", segment));
                        }
                        columns.push(ColumnMapping {
                            host_column: host_column as u32,
                            dialect_line: dialect_line as u32,
                            dialect_column: dialect_column as u32,
                        });
                    }
                    n => return Err(format!("segment '{}' has {} fields", segment, n)),
                }
            }
            columns.sort_by_key(|c| c.host_column);
            columns.dedup_by_key(|c| c.host_column);
            lines.push(LineMap { columns });
        }

        Ok(Self { lines })
    }

    /// Pad with empty lines or truncate so the map covers exactly
    /// `host_lines` lines.
    pub fn fit_to(mut self, host_lines: usize) -> Self {
        self.lines.resize_with(host_lines, LineMap::default);
        self
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, host_line: u32) -> Option<&LineMap> {
        self.lines.get(host_line as usize)
    }

    pub fn lines(&self) -> impl Iterator<Item = (u32, &LineMap)> {
        self.lines.iter().enumerate().map(|(i, l)| (i as u32, l))
    }

    /// Human-readable table, one host line per row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (host_line, line) in self.lines() {
            let _ = write!(out, "{}:", host_line);
            for c in &line.columns {
                let _ = write!(
                    out,
                    " {}->{}:{}",
                    c.host_column, c.dialect_line, c.dialect_column
                );
            }
            out.push('\n');
        }
        out
    }
}
