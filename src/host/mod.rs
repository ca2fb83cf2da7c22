//! The host-language service.
//!
//! Completion requests are forwarded, at an emulated cursor, to a regular
//! JavaScript language server reading the synthesized virtual document.
//! Definition and hover requests go to the same server with the raw dialect
//! buffer presented as JavaScript. [`HostServer`] is the production
//! implementation: it spawns the server and speaks LSP to it over stdio.

pub mod codec;
mod server;

pub use server::HostServer;

use std::time::Duration;

use thiserror::Error;
use tower_lsp::lsp_types::{CompletionResponse, GotoDefinitionResponse, Hover, Position, Url};

/// Failures of an external host-language tool (language server or
/// verifier). Recovered by yielding no results for the cycle.
#[derive(Debug, Error)]
pub enum HostServiceError {
    #[error("cannot start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to the host service: {0}")]
    Io(#[from] std::io::Error),

    #[error("host service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("host service sent an unexpected message: {0}")]
    Protocol(String),

    #[error("host service error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("host service connection closed")]
    Closed,
}

impl From<serde_json::Error> for HostServiceError {
    fn from(e: serde_json::Error) -> Self {
        HostServiceError::Protocol(e.to_string())
    }
}

/// A completion request aimed at a virtual document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardedCompletion {
    pub uri: Url,
    pub position: Position,
    pub trigger_character: Option<String>,
}

/// A position request carrying the document text it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardedPosition {
    pub uri: Url,
    pub text: String,
    pub position: Position,
}

#[tower_lsp::async_trait]
pub trait HostService: Send + Sync {
    async fn complete(
        &self,
        request: ForwardedCompletion,
    ) -> Result<Option<CompletionResponse>, HostServiceError>;

    async fn definition(
        &self,
        _request: ForwardedPosition,
    ) -> Result<Option<GotoDefinitionResponse>, HostServiceError> {
        Ok(None)
    }

    async fn hover(&self, _request: ForwardedPosition) -> Result<Option<Hover>, HostServiceError> {
        Ok(None)
    }

    /// Release the underlying service, if any.
    async fn shutdown(&self) {}
}
