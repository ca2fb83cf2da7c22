//! Definition and hover by forwarding the raw dialect buffer.
//!
//! The host server reads the dialect text as if it were JavaScript, so
//! positions go out and come back unchanged. Host failures yield `None`.

use std::sync::Arc;

use tower_lsp::lsp_types::{GotoDefinitionResponse, Hover, Position, Url};
use tracing::warn;

use super::Engine;
use crate::host::ForwardedPosition;

pub async fn definition(
    engine: &Arc<Engine>,
    uri: &Url,
    text: String,
    position: Position,
) -> Option<GotoDefinitionResponse> {
    let request = forwarded(uri, text, position);
    engine
        .host()
        .definition(request)
        .await
        .unwrap_or_else(|e| {
            warn!(%uri, error = %e, "host definition failed");
            None
        })
}

pub async fn hover(
    engine: &Arc<Engine>,
    uri: &Url,
    text: String,
    position: Position,
) -> Option<Hover> {
    let request = forwarded(uri, text, position);
    engine.host().hover(request).await.unwrap_or_else(|e| {
        warn!(%uri, error = %e, "host hover failed");
        None
    })
}

fn forwarded(uri: &Url, text: String, position: Position) -> ForwardedPosition {
    ForwardedPosition {
        uri: uri.clone(),
        text,
        position,
    }
}
