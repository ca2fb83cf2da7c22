//! Completion by forwarding to the host language service.

use std::sync::Arc;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionList, CompletionResponse, CompletionTextEdit, InsertReplaceEdit,
    Position, Range, TextEdit, Url,
};
use tracing::{debug, warn};

use super::Engine;
use crate::compiler::{CompilationResult, CompilerFault};
use crate::host::ForwardedCompletion;
use crate::mapper::dialect_to_host;
use crate::synthesize::{emulate, synthesize};

/// Complete at `cursor` in the dialect buffer `text` of `uri`.
///
/// `Ok(None)` covers every recoverable dead end: the probe does not
/// compile, the probe has no host counterpart, or the host service failed.
/// Compiler faults are returned to the caller.
pub async fn complete(
    engine: &Arc<Engine>,
    uri: &Url,
    text: &str,
    cursor: Position,
    trigger_character: Option<String>,
) -> Result<Option<CompletionResponse>, CompilerFault> {
    let Some(probe) = synthesize(text, cursor) else {
        debug!(line = cursor.line, "cursor outside the buffer");
        return Ok(None);
    };

    let compiled = engine.compile_blocking(probe.candidate_text).await?;
    let CompilationResult::Success {
        host_source,
        source_map,
    } = compiled.as_ref()
    else {
        debug!("probe buffer does not compile");
        return Ok(None);
    };

    let Some(host_line) = dialect_to_host(source_map, probe.probe_position) else {
        debug!(probe = ?probe.probe_position, "probe has no host mapping");
        return Ok(None);
    };
    let Some((host_text, position)) = emulate(host_source, host_line, &probe.current_line) else {
        return Ok(None);
    };
    let Some(virtual_uri) = engine.documents().publish(uri, host_text) else {
        warn!(%uri, "cannot build a virtual document uri");
        return Ok(None);
    };

    let request = ForwardedCompletion {
        uri: virtual_uri,
        position,
        trigger_character,
    };
    match engine.host().complete(request).await {
        Ok(response) => Ok(response.map(|r| normalize(r, cursor))),
        Err(e) => {
            warn!(error = %e, "host completion failed");
            Ok(None)
        }
    }
}

/// Rewrite item edits, which arrive in host coordinates, onto the dialect
/// cursor.
pub fn normalize(response: CompletionResponse, cursor: Position) -> CompletionResponse {
    match response {
        CompletionResponse::Array(items) => CompletionResponse::Array(
            items.into_iter().map(|item| normalize_item(item, cursor)).collect(),
        ),
        CompletionResponse::List(list) => CompletionResponse::List(CompletionList {
            is_incomplete: list.is_incomplete,
            items: list
                .items
                .into_iter()
                .map(|item| normalize_item(item, cursor))
                .collect(),
        }),
    }
}

fn normalize_item(mut item: CompletionItem, cursor: Position) -> CompletionItem {
    item.text_edit = item.text_edit.map(|edit| match edit {
        CompletionTextEdit::Edit(edit) => {
            let start = Position::new(cursor.line, cursor.character.saturating_sub(1));
            CompletionTextEdit::Edit(TextEdit {
                range: Range::new(start, cursor),
                new_text: edit.new_text,
            })
        }
        CompletionTextEdit::InsertAndReplace(edit) => {
            let at_cursor = Range::new(cursor, cursor);
            CompletionTextEdit::InsertAndReplace(InsertReplaceEdit {
                new_text: edit.new_text,
                insert: at_cursor,
                replace: at_cursor,
            })
        }
    });
    item
}
