//! Dialect → host compilation.
//!
//! A [`DialectCompiler`] turns dialect source into host source plus a
//! per-line [`SourceMap`], or into a single syntax diagnostic. Anything the
//! adapter does not recognise as a syntax error is a [`CompilerFault`] and
//! is returned as an `Err`, never folded into a diagnostic.

mod coffee;

pub use coffee::{parse_syntax_error, split_inline_map, CoffeeCompiler};

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::sourcemap::SourceMap;

/// Outcome of compiling one dialect text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompilationResult {
    Success {
        host_source: String,
        source_map: SourceMap,
    },
    /// Compilation stopped at the first syntax error. The diagnostics are in
    /// dialect coordinates; the compiler reports exactly one.
    Failure { diagnostics: Vec<Diagnostic> },
}

impl CompilationResult {
    /// Build a success value, fitting the map to the host line count.
    pub fn success(host_source: String, source_map: SourceMap) -> Self {
        let lines = crate::text::line_count(&host_source);
        CompilationResult::Success {
            source_map: source_map.fit_to(lines),
            host_source,
        }
    }
}

/// Compiler failures that are not syntax errors in the user's code.
#[derive(Debug, Error)]
pub enum CompilerFault {
    #[error("cannot run dialect compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to the dialect compiler: {0}")]
    Io(#[from] std::io::Error),

    #[error("dialect compiler exited with {status}: {stderr}")]
    Crashed { status: String, stderr: String },

    #[error("dialect compiler output has no inline source map")]
    MissingSourceMap,

    #[error("invalid source map from dialect compiler: {0}")]
    InvalidSourceMap(String),

    #[error("dialect compiler produced non UTF-8 output")]
    NotUtf8,
}

/// Synchronous dialect compiler.
pub trait DialectCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<CompilationResult, CompilerFault>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sourcemap::LineMap;

    #[test]
    fn test_success_fits_map_to_host_lines() {
        let result = CompilationResult::success(
            "var x;\n\nx = 1;".to_string(),
            SourceMap::from_lines(vec![LineMap::default()]),
        );
        match result {
            CompilationResult::Success { source_map, .. } => assert_eq!(source_map.len(), 3),
            CompilationResult::Failure { .. } => panic!("expected success"),
        }
    }
}
