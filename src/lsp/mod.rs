//! Brewline Language Server Protocol implementation.
//!
//! Provides diagnostics (dialect syntax errors plus host type errors mapped
//! back onto dialect lines), plus completion, definition and hover forwarded
//! to the host language server. Synthesized host buffers are served through the custom
//! `brewline/virtualDocument` request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use serde::Deserialize;
use serde_json::Value;
use tower_lsp::jsonrpc::{Error, ErrorCode, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::pipeline::{self, DiagnosticSink, DocumentSession, Engine};

pub const VIRTUAL_DOCUMENT_METHOD: &str = "brewline/virtualDocument";

/// Characters after which the editor should ask for completions.
const TRIGGER_CHARACTERS: [&str; 2] = [".", "\""];

pub struct BrewlineLsp {
    client: Client,
    base_config: Config,
    engine: OnceLock<Arc<Engine>>,
    sessions: Mutex<HashMap<Url, Arc<DocumentSession>>>,
}

/// Publishes through the editor connection.
struct ClientSink {
    client: Client,
}

#[tower_lsp::async_trait]
impl DiagnosticSink for ClientSink {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        let diagnostics = diagnostics.iter().map(Diagnostic::to_lsp).collect();
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    async fn report_fault(&self, uri: Url, message: String) {
        self.client
            .log_message(MessageType::ERROR, format!("{}: {}", uri, message))
            .await;
    }
}

#[derive(Debug, Deserialize)]
pub struct VirtualDocumentParams {
    pub uri: Url,
}

impl BrewlineLsp {
    pub fn new(client: Client, base_config: Config) -> Self {
        Self {
            client,
            base_config,
            engine: OnceLock::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn engine(&self) -> Option<&Arc<Engine>> {
        self.engine.get()
    }

    fn session(&self, uri: &Url, engine: &Engine) -> Arc<DocumentSession> {
        let mut sessions = self.sessions.lock().unwrap();
        Arc::clone(
            sessions
                .entry(uri.clone())
                .or_insert_with(|| Arc::new(DocumentSession::new(uri.clone(), engine.config()))),
        )
    }

    /// Current text of an open document.
    fn text_of(&self, uri: &Url) -> Option<String> {
        let session = self.sessions.lock().unwrap().get(uri).cloned();
        session.map(|s| s.text())
    }

    fn edit(&self, uri: Url, text: String) {
        let Some(engine) = self.engine() else {
            warn!(%uri, "edit before initialize");
            return;
        };
        let session = self.session(&uri, engine);
        pipeline::on_edit(engine, &session, text);
    }

    /// Handler for `brewline/virtualDocument`.
    pub async fn virtual_document(&self, params: VirtualDocumentParams) -> Result<Option<String>> {
        Ok(self
            .engine()
            .and_then(|engine| engine.documents().resolve(&params.uri)))
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for BrewlineLsp {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let options = params.initialization_options.unwrap_or(Value::Null);
        let config = self
            .base_config
            .merge_json(&options)
            .map_err(|e| Error::invalid_params(e.to_string()))?;
        debug!(?config, "effective configuration");

        let sink = Arc::new(ClientSink {
            client: self.client.clone(),
        });
        if self
            .engine
            .set(Arc::new(Engine::with_toolchain(config, sink)))
            .is_err()
        {
            warn!("initialize received twice; keeping the first configuration");
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                    ),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "brewline".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("brewline initialized");
        self.client
            .log_message(MessageType::INFO, "brewline initialized")
            .await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.edit(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().last() {
            self.edit(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let session = self.sessions.lock().unwrap().remove(&uri);
        if let Some(session) = session {
            session.close();
        }
        if let Some(engine) = self.engine() {
            engine.sink().clear(uri).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let Some(engine) = self.engine() else {
            return Ok(None);
        };
        let position = params.text_document_position;
        let uri = position.text_document.uri;
        let Some(text) = self.text_of(&uri) else {
            return Ok(None);
        };
        let trigger = params.context.and_then(|c| c.trigger_character);

        pipeline::complete(engine, &uri, &text, position.position, trigger)
            .await
            .map_err(|fault| {
                error!(%uri, error = %fault, "dialect compiler fault during completion");
                Error {
                    code: ErrorCode::InternalError,
                    message: fault.to_string().into(),
                    data: None,
                }
            })
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        let (Some(engine), Some(text)) = (self.engine(), self.text_of(&uri)) else {
            return Ok(None);
        };
        Ok(pipeline::definition(engine, &uri, text, position.position).await)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        let (Some(engine), Some(text)) = (self.engine(), self.text_of(&uri)) else {
            return Ok(None);
        };
        Ok(pipeline::hover(engine, &uri, text, position.position).await)
    }

    async fn shutdown(&self) -> Result<()> {
        let sessions: Vec<_> = self.sessions.lock().unwrap().drain().collect();
        for (_, session) in sessions {
            session.close();
        }
        if let Some(engine) = self.engine() {
            engine.shutdown().await;
        }
        Ok(())
    }
}

/// Start the LSP server on stdin/stdout.
pub async fn run_server(config: Config) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(|client| BrewlineLsp::new(client, config))
        .custom_method(VIRTUAL_DOCUMENT_METHOD, BrewlineLsp::virtual_document)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
