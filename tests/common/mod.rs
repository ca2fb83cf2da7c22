//! In-memory stand-ins for the external toolchain.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use brewline::compiler::{CompilationResult, CompilerFault, DialectCompiler};
use brewline::diagnostic::{Diagnostic, Origin};
use brewline::host::{ForwardedCompletion, ForwardedPosition, HostService, HostServiceError};
use brewline::pipeline::{DiagnosticSink, DocumentSession, Engine};
use brewline::sourcemap::{ColumnMapping, LineMap, SourceMap};
use brewline::vdoc::VirtualDocuments;
use brewline::verifier::{HostDiagnostic, Verifier};
use brewline::Config;
use tower_lsp::lsp_types::{CompletionResponse, GotoDefinitionResponse, Hover, Position, Range, Url};

/// Toy dialect compiler.
///
/// Emits `var names;` and a blank line, then one host line per non-blank
/// dialect line (`trimmed;`), mapping host column 0 to the first
/// non-whitespace column of the dialect line. A line with an odd number of
/// `"` is a syntax error at its last quote.
#[derive(Default)]
pub struct FakeCompiler {
    calls: Mutex<Vec<String>>,
    fault: Mutex<bool>,
}

impl FakeCompiler {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_with_fault(&self) {
        *self.fault.lock().unwrap() = true;
    }
}

impl DialectCompiler for FakeCompiler {
    fn compile(&self, source: &str) -> Result<CompilationResult, CompilerFault> {
        self.calls.lock().unwrap().push(source.to_string());
        if *self.fault.lock().unwrap() {
            return Err(CompilerFault::Crashed {
                status: "exit status: 3".to_string(),
                stderr: "compiler exploded".to_string(),
            });
        }

        let mut host = vec!["var names;".to_string(), String::new()];
        let mut lines = vec![LineMap::default(), LineMap::default()];
        for (i, line) in source.split('\n').enumerate() {
            let line = line.trim_end_matches('\r');
            if line.matches('"').count() % 2 == 1 {
                let col = line.rfind('"').unwrap_or(0) as u32;
                let range = Range::new(
                    Position::new(i as u32, col),
                    Position::new(i as u32, col + 1),
                );
                return Ok(CompilationResult::Failure {
                    diagnostics: vec![Diagnostic::error(
                        "missing \"".to_string(),
                        range,
                        Origin::Compiler,
                    )],
                });
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let indent = (line.len() - line.trim_start().len()) as u32;
            host.push(format!("{};", trimmed));
            lines.push(LineMap {
                columns: vec![ColumnMapping {
                    host_column: 0,
                    dialect_line: i as u32,
                    dialect_column: indent,
                }],
            });
        }
        Ok(CompilationResult::success(
            host.join("\n"),
            SourceMap::from_lines(lines),
        ))
    }
}

/// Verifier answering with a fixed list.
#[derive(Default)]
pub struct FakeVerifier {
    calls: Mutex<Vec<String>>,
    answer: Mutex<Vec<HostDiagnostic>>,
    unavailable: Mutex<bool>,
}

impl FakeVerifier {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn answer(&self, found: Vec<HostDiagnostic>) {
        *self.answer.lock().unwrap() = found;
    }

    pub fn go_down(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

#[tower_lsp::async_trait]
impl Verifier for FakeVerifier {
    async fn verify(&self, host_source: &str) -> Result<Vec<HostDiagnostic>, HostServiceError> {
        self.calls.lock().unwrap().push(host_source.to_string());
        if *self.unavailable.lock().unwrap() {
            return Err(HostServiceError::Closed);
        }
        Ok(self.answer.lock().unwrap().clone())
    }
}

/// What the fake host service saw for one request.
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub request: ForwardedCompletion,
    /// Virtual document text at the time of the request.
    pub text: Option<String>,
}

pub struct FakeHost {
    documents: Arc<VirtualDocuments>,
    seen: Mutex<Vec<SeenRequest>>,
    lookups: Mutex<Vec<(&'static str, ForwardedPosition)>>,
    response: Mutex<Option<CompletionResponse>>,
    definition: Mutex<Option<GotoDefinitionResponse>>,
    hover: Mutex<Option<Hover>>,
    unavailable: Mutex<bool>,
}

impl FakeHost {
    pub fn new(documents: Arc<VirtualDocuments>) -> Self {
        Self {
            documents,
            seen: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
            response: Mutex::new(None),
            definition: Mutex::new(None),
            hover: Mutex::new(None),
            unavailable: Mutex::new(false),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Definition and hover requests, tagged with the method name.
    pub fn lookups(&self) -> Vec<(&'static str, ForwardedPosition)> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn respond_with(&self, response: CompletionResponse) {
        *self.response.lock().unwrap() = Some(response);
    }

    pub fn define_as(&self, response: GotoDefinitionResponse) {
        *self.definition.lock().unwrap() = Some(response);
    }

    pub fn hover_with(&self, hover: Hover) {
        *self.hover.lock().unwrap() = Some(hover);
    }

    fn lookup(
        &self,
        method: &'static str,
        request: ForwardedPosition,
    ) -> Result<(), HostServiceError> {
        self.lookups.lock().unwrap().push((method, request));
        if *self.unavailable.lock().unwrap() {
            return Err(HostServiceError::Closed);
        }
        Ok(())
    }

    pub fn go_down(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

#[tower_lsp::async_trait]
impl HostService for FakeHost {
    async fn complete(
        &self,
        request: ForwardedCompletion,
    ) -> Result<Option<CompletionResponse>, HostServiceError> {
        let text = self.documents.resolve(&request.uri);
        self.seen.lock().unwrap().push(SeenRequest { request, text });
        if *self.unavailable.lock().unwrap() {
            return Err(HostServiceError::Timeout(std::time::Duration::from_secs(5)));
        }
        Ok(self.response.lock().unwrap().clone())
    }

    async fn definition(
        &self,
        request: ForwardedPosition,
    ) -> Result<Option<GotoDefinitionResponse>, HostServiceError> {
        self.lookup("definition", request)?;
        Ok(self.definition.lock().unwrap().clone())
    }

    async fn hover(&self, request: ForwardedPosition) -> Result<Option<Hover>, HostServiceError> {
        self.lookup("hover", request)?;
        Ok(self.hover.lock().unwrap().clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Publish(Url, Vec<Diagnostic>),
    Clear(Url),
    Fault(Url, String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Diagnostics most recently published, if any publish happened.
    pub fn last_published(&self) -> Option<Vec<Diagnostic>> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Publish(_, diagnostics) => Some(diagnostics),
            _ => None,
        })
    }
}

#[tower_lsp::async_trait]
impl DiagnosticSink for RecordingSink {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Publish(uri, diagnostics));
    }

    async fn clear(&self, uri: Url) {
        self.events.lock().unwrap().push(SinkEvent::Clear(uri));
    }

    async fn report_fault(&self, uri: Url, message: String) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Fault(uri, message));
    }
}

/// An engine wired to fakes, with handles on every fake.
pub struct Harness {
    pub engine: Arc<Engine>,
    pub compiler: Arc<FakeCompiler>,
    pub verifier: Arc<FakeVerifier>,
    pub host: Arc<FakeHost>,
    pub sink: Arc<RecordingSink>,
    pub documents: Arc<VirtualDocuments>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let documents = Arc::new(VirtualDocuments::new());
        let compiler = Arc::new(FakeCompiler::default());
        let verifier = Arc::new(FakeVerifier::default());
        let host = Arc::new(FakeHost::new(Arc::clone(&documents)));
        let sink = Arc::new(RecordingSink::default());
        let engine = Arc::new(Engine::new(
            config,
            compiler.clone(),
            verifier.clone(),
            host.clone(),
            sink.clone(),
            Arc::clone(&documents),
        ));
        Self {
            engine,
            compiler,
            verifier,
            host,
            sink,
            documents,
        }
    }

    pub fn session(&self) -> Arc<DocumentSession> {
        Arc::new(DocumentSession::new(doc_uri(), self.engine.config()))
    }
}

pub fn doc_uri() -> Url {
    Url::parse("file:///work/app.coffee").unwrap()
}
