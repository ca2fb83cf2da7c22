//! CoffeeScript CLI adapter.
//!
//! Runs `coffee --bare --compile --inline-map --stdio` (configurable) with
//! the dialect source on stdin. On success the JavaScript arrives on stdout
//! with the source map appended as a base64 `sourceMappingURL` comment. On
//! a syntax error the compiler exits non-zero and prints
//!
//! ```text
//! [stdin]:2:5: error: missing "
//! y = "abc
//!     ^
//! ```
//!
//! with 1-based line and column, the offending line, and a caret underline.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use tower_lsp::lsp_types::{Position, Range};
use tracing::debug;

use super::{CompilationResult, CompilerFault, DialectCompiler};
use crate::config::CommandConfig;
use crate::diagnostic::{Diagnostic, Origin};
use crate::sourcemap::SourceMap;

static ERROR_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?:(\d+):(\d+): error: (.*)$").unwrap());

const MAP_PREFIX: &str = "//# sourceMappingURL=";
const URL_PREFIX: &str = "//# sourceURL=";

pub struct CoffeeCompiler {
    command: CommandConfig,
}

impl CoffeeCompiler {
    pub fn new(command: CommandConfig) -> Self {
        Self { command }
    }
}

impl DialectCompiler for CoffeeCompiler {
    fn compile(&self, source: &str) -> Result<CompilationResult, CompilerFault> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompilerFault::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a chatty compiler cannot
        // block on a full stdout pipe while we are still writing.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = source.to_string();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let output = child.wait_with_output()?;
        let written = match writer {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked"))),
            None => Ok(()),
        };

        if output.status.success() {
            written?;
            let stdout = String::from_utf8(output.stdout).map_err(|_| CompilerFault::NotUtf8)?;
            let (host_source, map_json) = split_inline_map(&stdout)?;
            let source_map =
                SourceMap::from_v3_json(&map_json).map_err(CompilerFault::InvalidSourceMap)?;
            debug!(host_lines = source_map.len(), "dialect compile succeeded");
            return Ok(CompilationResult::success(host_source, source_map));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        match parse_syntax_error(&stderr) {
            Some(diagnostic) => {
                debug!(message = %diagnostic.message, "dialect syntax error");
                Ok(CompilationResult::Failure {
                    diagnostics: vec![diagnostic],
                })
            }
            None => Err(CompilerFault::Crashed {
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            }),
        }
    }
}

/// Separate compiler stdout into host source (trailing whitespace trimmed)
/// and the decoded source map JSON.
pub fn split_inline_map(stdout: &str) -> Result<(String, String), CompilerFault> {
    let mut host_lines = Vec::new();
    let mut map_json = None;

    for line in stdout.lines() {
        let trimmed = line.trim();
        if let Some(url) = trimmed.strip_prefix(MAP_PREFIX) {
            let payload = url
                .split_once("base64,")
                .map(|(_, data)| data)
                .ok_or(CompilerFault::MissingSourceMap)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| CompilerFault::InvalidSourceMap(e.to_string()))?;
            map_json = Some(String::from_utf8(bytes).map_err(|_| CompilerFault::NotUtf8)?);
            continue;
        }
        if trimmed.starts_with(URL_PREFIX) {
            continue;
        }
        host_lines.push(line);
    }

    let map_json = map_json.ok_or(CompilerFault::MissingSourceMap)?;
    let host_source = host_lines.join("\n").trim_end().to_string();
    Ok((host_source, map_json))
}

/// Recognise the compiler's syntax error report. Returns `None` for any
/// other kind of failure output.
pub fn parse_syntax_error(stderr: &str) -> Option<Diagnostic> {
    let lines: Vec<&str> = stderr.lines().collect();
    let (index, caps) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| ERROR_HEADER.captures(l.trim_end()).map(|c| (i, c)))?;

    let line: u32 = caps[1].parse().ok()?;
    let column: u32 = caps[2].parse().ok()?;
    if line == 0 || column == 0 {
        return None;
    }
    let message = caps[3].trim().to_string();

    // The caret underline follows the echoed source line.
    let width = lines
        .get(index + 2)
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && l.chars().all(|c| c == '^'))
        .map_or(1, |l| l.chars().count() as u32);

    let start = Position::new(line - 1, column - 1);
    let end = Position::new(line - 1, column - 1 + width);
    Some(Diagnostic::error(
        message,
        Range::new(start, end),
        Origin::Compiler,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline_map(json: &str) -> String {
        format!(
            "{}data:application/json;charset=utf-8;base64,{}",
            MAP_PREFIX,
            base64::engine::general_purpose::STANDARD.encode(json)
        )
    }

    #[test]
    fn test_parse_unterminated_string() {
        let stderr = "[stdin]:2:5: error: missing \"\ny = \"abc\n    ^\n";
        let d = parse_syntax_error(stderr).unwrap();
        assert_eq!(d.message, "missing \"");
        assert_eq!(d.range, Range::new(Position::new(1, 4), Position::new(1, 5)));
        assert_eq!(d.origin, Origin::Compiler);
    }

    #[test]
    fn test_parse_wide_caret() {
        let stderr = "[stdin]:3:1: error: unexpected indentation\n    z = 3\n^^^^\n";
        let d = parse_syntax_error(stderr).unwrap();
        assert_eq!(d.range, Range::new(Position::new(2, 0), Position::new(2, 4)));
    }

    #[test]
    fn test_parse_without_caret_defaults_to_one_column() {
        let d = parse_syntax_error("/tmp/a.coffee:1:7: error: unexpected end of input").unwrap();
        assert_eq!(d.range, Range::new(Position::new(0, 6), Position::new(0, 7)));
    }

    #[test]
    fn test_unrecognised_failure_is_not_a_syntax_error() {
        assert!(parse_syntax_error("env: node: No such file or directory\n").is_none());
        assert!(parse_syntax_error("").is_none());
    }

    #[test]
    fn test_split_inline_map_strips_comments_and_trailing_whitespace() {
        let json = r#"{"version":3,"sources":[""],"names":[],"mappings":"AAAA;AACA"}"#;
        let stdout = format!(
            "var x;\n\nx = 1;\n\n{}\n//# sourceURL=[stdin]\n",
            inline_map(json)
        );
        let (host, map) = split_inline_map(&stdout).unwrap();
        assert_eq!(host, "var x;\n\nx = 1;");
        assert_eq!(map, json);
    }

    #[test]
    fn test_split_inline_map_requires_a_map() {
        assert!(matches!(
            split_inline_map("var x;\n"),
            Err(CompilerFault::MissingSourceMap)
        ));
    }

    #[test]
    fn test_missing_program_is_a_fault() {
        let compiler = CoffeeCompiler::new(CommandConfig {
            program: "brewline-no-such-compiler".to_string(),
            args: Vec::new(),
        });
        assert!(matches!(
            compiler.compile("x = 1"),
            Err(CompilerFault::Spawn { .. })
        ));
    }
}
