//! The debounced diagnostic pipeline.
//!
//! ```text
//! edit ─▶ Debouncing ─(quiet)─▶ CompilingDialect ─┬─▶ FailedDialect (publish syntax error)
//!                                                 └─▶ clear ─(quiet)─▶ CompilingHostVerify ─▶ Mapping ─▶ Published
//! ```
//!
//! Every step re-checks the generation it was started for and stops as soon
//! as a newer edit exists.

use std::sync::Arc;

use tower_lsp::lsp_types::{Position, Range};
use tracing::{debug, error, warn};

use super::session::{DocumentSession, Phase};
use super::Engine;
use crate::compiler::CompilationResult;
use crate::diagnostic::{Diagnostic, Origin};
use crate::mapper::host_to_dialect;
use crate::sourcemap::SourceMap;
use crate::text::line_len;
use crate::verifier::HostDiagnostic;

/// Record an edit and (re)start the compile settle timer.
pub fn on_edit(engine: &Arc<Engine>, session: &Arc<DocumentSession>, text: String) {
    let generation = session.begin_edit(text);
    let job = run_compile(Arc::clone(engine), Arc::clone(session), generation);
    session.schedule_compile(job);
    debug!(uri = %session.uri(), generation, "compile scheduled");
}

async fn run_compile(engine: Arc<Engine>, session: Arc<DocumentSession>, generation: u64) {
    let Some(text) = session.advance_with_text(generation, Phase::CompilingDialect) else {
        return;
    };
    let uri = session.uri().clone();

    let result = match engine.compile_blocking(text.clone()).await {
        Ok(result) => result,
        Err(fault) => {
            error!(uri = %uri, error = %fault, "dialect compiler fault");
            if session.advance(generation, Phase::Idle) {
                engine.sink().report_fault(uri, fault.to_string()).await;
            }
            return;
        }
    };

    match result.as_ref() {
        CompilationResult::Failure { diagnostics } => {
            if session.advance(generation, Phase::FailedDialect) {
                debug!(uri = %uri, generation, "dialect syntax error");
                engine.sink().publish(uri, diagnostics.clone()).await;
            }
        }
        CompilationResult::Success { .. } => {
            let verify = engine.config().verify;
            let next = if verify {
                Phase::CompilingHostVerify
            } else {
                Phase::Published
            };
            if !session.advance(generation, next) {
                return;
            }
            engine.sink().clear(uri).await;
            if verify {
                let job = run_verify(
                    Arc::clone(&engine),
                    Arc::clone(&session),
                    generation,
                    text,
                    result,
                );
                if session.schedule_verify(generation, job) {
                    debug!(uri = %session.uri(), generation, "verify scheduled");
                }
            }
        }
    }
}

async fn run_verify(
    engine: Arc<Engine>,
    session: Arc<DocumentSession>,
    generation: u64,
    dialect_text: String,
    compiled: Arc<CompilationResult>,
) {
    let CompilationResult::Success {
        host_source,
        source_map,
    } = compiled.as_ref()
    else {
        return;
    };
    if !session.is_current(generation) {
        return;
    }
    let uri = session.uri().clone();

    let found = match engine.verify(host_source).await {
        Ok(found) => found,
        Err(e) => {
            warn!(uri = %uri, error = %e, "host verification failed");
            session.advance(generation, Phase::Published);
            return;
        }
    };

    if !session.advance(generation, Phase::Mapping) {
        return;
    }
    let mapped = map_host_diagnostics(source_map, &found, &dialect_text);

    if session.advance(generation, Phase::Published) {
        debug!(uri = %uri, generation, count = mapped.len(), "publishing verifier diagnostics");
        engine.sink().publish(uri, mapped).await;
    }
}

/// Move verifier diagnostics onto whole dialect lines. Anything that cannot
/// be mapped lands on dialect line 0.
pub fn map_host_diagnostics(
    map: &SourceMap,
    found: &[HostDiagnostic],
    dialect_text: &str,
) -> Vec<Diagnostic> {
    let fallback = Range::new(Position::new(0, 0), Position::new(0, line_len(dialect_text, 0)));
    found
        .iter()
        .map(|d| {
            let range = match d.line {
                Some(line) => {
                    let host = Range::new(Position::new(line, 0), Position::new(line, 0));
                    host_to_dialect(map, host, dialect_text).unwrap_or_else(|miss| {
                        debug!(%miss, "verifier diagnostic falls back to line 0");
                        fallback
                    })
                }
                None => fallback,
            };
            Diagnostic::error(d.message.clone(), range, Origin::Verifier)
        })
        .collect()
}
