//! LSP client for the host language server.
//!
//! The server is spawned lazily on the first completion request and
//! restarted on the next request if it has died. Two tasks own its pipes: a
//! writer draining an unbounded channel into stdin, and a reader routing
//! responses to the request that is waiting for them. Requests the server
//! sends us (`workspace/configuration`, progress tokens, ...) get a `null`
//! result so the server never stalls waiting on the client.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tower_lsp::lsp_types::{
    ClientCapabilities, CompletionClientCapabilities, CompletionContext, CompletionItemCapability,
    CompletionParams, CompletionResponse, CompletionTriggerKind, DidChangeTextDocumentParams,
    DidOpenTextDocumentParams, GotoDefinitionResponse, Hover, InitializeParams,
    TextDocumentClientCapabilities, TextDocumentContentChangeEvent, TextDocumentIdentifier,
    TextDocumentItem, TextDocumentPositionParams, Url, VersionedTextDocumentIdentifier,
};
use tracing::{debug, info, trace, warn};

use super::codec;
use super::{ForwardedCompletion, ForwardedPosition, HostService, HostServiceError};
use crate::config::CommandConfig;
use crate::vdoc::VirtualDocuments;

const LANGUAGE_ID: &str = "javascript";

type Reply = Result<Value, HostServiceError>;
type Pending = Arc<Mutex<HashMap<i64, oneshot::Sender<Reply>>>>;

pub struct HostServer {
    command: CommandConfig,
    timeout: Duration,
    documents: Arc<VirtualDocuments>,
    connection: tokio::sync::Mutex<Option<Connection>>,
}

struct Connection {
    child: Child,
    outgoing: mpsc::UnboundedSender<Value>,
    pending: Pending,
    next_id: i64,
    versions: HashMap<Url, i32>,
}

impl Connection {
    fn send(&self, message: Value) -> Result<(), HostServiceError> {
        self.outgoing
            .send(message)
            .map_err(|_| HostServiceError::Closed)
    }

    fn notify(&self, method: &str, params: Value) -> Result<(), HostServiceError> {
        self.send(codec::notification(method, params))
    }

    fn request(&mut self, method: &str, params: Value) -> Result<PendingReply, HostServiceError> {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);
        if let Err(e) = self.send(codec::request(id, method, params)) {
            self.pending.lock().unwrap().remove(&id);
            return Err(e);
        }
        Ok(PendingReply {
            id,
            rx,
            pending: Arc::clone(&self.pending),
            outgoing: self.outgoing.clone(),
        })
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Push the full text of a virtual document: `didOpen` the first time,
    /// a whole-document `didChange` afterwards.
    fn sync_document(&mut self, uri: &Url, text: String) -> Result<(), HostServiceError> {
        match self.versions.get_mut(uri) {
            Some(version) => {
                *version += 1;
                let params = DidChangeTextDocumentParams {
                    text_document: VersionedTextDocumentIdentifier::new(uri.clone(), *version),
                    content_changes: vec![TextDocumentContentChangeEvent {
                        range: None,
                        range_length: None,
                        text,
                    }],
                };
                self.notify("textDocument/didChange", serde_json::to_value(params)?)
            }
            None => {
                self.versions.insert(uri.clone(), 1);
                let params = DidOpenTextDocumentParams {
                    text_document: TextDocumentItem::new(
                        uri.clone(),
                        LANGUAGE_ID.to_string(),
                        1,
                        text,
                    ),
                };
                self.notify("textDocument/didOpen", serde_json::to_value(params)?)
            }
        }
    }
}

/// A request in flight. Waiting is bounded; on expiry the request is
/// forgotten and the server is asked to cancel it.
struct PendingReply {
    id: i64,
    rx: oneshot::Receiver<Reply>,
    pending: Pending,
    outgoing: mpsc::UnboundedSender<Value>,
}

impl PendingReply {
    async fn wait(self, timeout: Duration) -> Reply {
        match tokio::time::timeout(timeout, self.rx).await {
            Err(_) => {
                self.pending.lock().unwrap().remove(&self.id);
                let params = serde_json::json!({ "id": self.id });
                let _ = self.outgoing.send(codec::notification("$/cancelRequest", params));
                Err(HostServiceError::Timeout(timeout))
            }
            Ok(Err(_)) => Err(HostServiceError::Closed),
            Ok(Ok(reply)) => reply,
        }
    }
}

impl HostServer {
    pub fn new(
        command: CommandConfig,
        timeout: Duration,
        documents: Arc<VirtualDocuments>,
    ) -> Self {
        Self {
            command,
            timeout,
            documents,
            connection: tokio::sync::Mutex::new(None),
        }
    }

    /// Sync `text` as the content of `uri`, send `method` and wait for the
    /// answer. Spawns (or respawns) the server first if needed.
    async fn send_request(
        &self,
        uri: &Url,
        text: String,
        method: &str,
        params: Value,
    ) -> Result<Value, HostServiceError> {
        let reply = {
            let mut guard = self.connection.lock().await;
            if !guard.as_mut().is_some_and(|c| c.is_alive()) {
                *guard = Some(self.spawn().await?);
            }
            let connection = guard.as_mut().ok_or(HostServiceError::Closed)?;
            connection.sync_document(uri, text)?;
            connection.request(method, params)?
        };
        reply.wait(self.timeout).await
    }

    async fn spawn(&self) -> Result<Connection, HostServiceError> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostServiceError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;
        let mut stdin = child.stdin.take().ok_or(HostServiceError::Closed)?;
        let stdout = child.stdout.take().ok_or(HostServiceError::Closed)?;

        let (outgoing, mut queue) = mpsc::unbounded_channel::<Value>();
        tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                if let Err(e) = codec::write_message(&mut stdin, &message).await {
                    warn!(error = %e, "writing to host language server failed");
                    break;
                }
            }
        });

        let pending: Pending = Arc::default();
        tokio::spawn(read_loop(
            BufReader::new(stdout),
            Arc::clone(&pending),
            outgoing.clone(),
        ));

        let mut connection = Connection {
            child,
            outgoing,
            pending,
            next_id: 1,
            versions: HashMap::new(),
        };

        let params = InitializeParams {
            process_id: Some(std::process::id()),
            capabilities: client_capabilities(),
            ..Default::default()
        };
        let reply = connection.request("initialize", serde_json::to_value(params)?)?;
        reply.wait(self.timeout).await?;
        connection.notify("initialized", serde_json::json!({}))?;
        info!(program = %self.command.program, "host language server started");
        Ok(connection)
    }
}

fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            completion: Some(CompletionClientCapabilities {
                completion_item: Some(CompletionItemCapability {
                    insert_replace_support: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn completion_params(request: &ForwardedCompletion) -> CompletionParams {
    let context = match &request.trigger_character {
        Some(c) => CompletionContext {
            trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
            trigger_character: Some(c.clone()),
        },
        None => CompletionContext {
            trigger_kind: CompletionTriggerKind::INVOKED,
            trigger_character: None,
        },
    };
    CompletionParams {
        text_document_position: TextDocumentPositionParams::new(
            TextDocumentIdentifier::new(request.uri.clone()),
            request.position,
        ),
        work_done_progress_params: Default::default(),
        partial_result_params: Default::default(),
        context: Some(context),
    }
}

fn position_params(request: &ForwardedPosition) -> TextDocumentPositionParams {
    TextDocumentPositionParams::new(
        TextDocumentIdentifier::new(request.uri.clone()),
        request.position,
    )
}

#[tower_lsp::async_trait]
impl HostService for HostServer {
    async fn complete(
        &self,
        request: ForwardedCompletion,
    ) -> Result<Option<CompletionResponse>, HostServiceError> {
        let text = self.documents.resolve(&request.uri).ok_or_else(|| {
            HostServiceError::Protocol(format!("no virtual document for {}", request.uri))
        })?;

        let params = serde_json::to_value(completion_params(&request))?;
        let value = self
            .send_request(&request.uri, text, "textDocument/completion", params)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn definition(
        &self,
        request: ForwardedPosition,
    ) -> Result<Option<GotoDefinitionResponse>, HostServiceError> {
        let params = serde_json::to_value(position_params(&request))?;
        let value = self
            .send_request(&request.uri, request.text, "textDocument/definition", params)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn hover(&self, request: ForwardedPosition) -> Result<Option<Hover>, HostServiceError> {
        let params = serde_json::to_value(position_params(&request))?;
        let value = self
            .send_request(&request.uri, request.text, "textDocument/hover", params)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn shutdown(&self) {
        let Some(mut connection) = self.connection.lock().await.take() else {
            return;
        };
        if let Ok(reply) = connection.request("shutdown", Value::Null) {
            let _ = reply.wait(self.timeout).await;
        }
        let _ = connection.notify("exit", Value::Null);
        if tokio::time::timeout(Duration::from_millis(500), connection.child.wait())
            .await
            .is_err()
        {
            let _ = connection.child.kill().await;
        }
        debug!("host language server stopped");
    }
}

async fn read_loop<R>(mut reader: R, pending: Pending, outgoing: mpsc::UnboundedSender<Value>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match codec::read_message(&mut reader).await {
            Ok(Some(message)) => dispatch(message, &pending, &outgoing),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "host language server stream failed");
                break;
            }
        }
    }
    for (_, waiter) in pending.lock().unwrap().drain() {
        let _ = waiter.send(Err(HostServiceError::Closed));
    }
}

/// Route one incoming message: responses wake their waiter, server
/// requests get a `null` result, notifications are dropped.
fn dispatch(message: Value, pending: &Pending, outgoing: &mpsc::UnboundedSender<Value>) {
    let id = message.get("id").filter(|id| !id.is_null()).cloned();
    let method = message.get("method").and_then(Value::as_str);

    match (id, method) {
        (Some(id), Some(method)) => {
            trace!(method, "answering host server request with null");
            let _ = outgoing.send(codec::response(id, Value::Null));
        }
        (Some(id), None) => {
            let Some(id) = id.as_i64() else {
                warn!(%id, "response with a non-numeric id");
                return;
            };
            let Some(waiter) = pending.lock().unwrap().remove(&id) else {
                trace!(id, "response for a request nobody waits on");
                return;
            };
            let reply = match message.get("error") {
                Some(error) => Err(HostServiceError::Server {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                }),
                None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
            };
            let _ = waiter.send(reply);
        }
        (None, Some(method)) => trace!(method, "host server notification"),
        (None, None) => warn!("host server sent a message with neither id nor method"),
    }
}
