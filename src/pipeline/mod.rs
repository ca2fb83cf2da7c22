//! Orchestration: compile → verify → map → publish, plus completion and
//! navigation forwarding.
//!
//! The [`Engine`] owns everything shared between documents: the adapters,
//! both caches and the virtual-document registry. Each open buffer has a
//! [`DocumentSession`] holding its text, generation counter and settle
//! timers. Pipelines take both explicitly; nothing lives in globals.

pub mod completion;
pub mod debounce;
pub mod diagnostics;
pub mod navigation;
pub mod session;

pub use completion::complete;
pub use debounce::Debouncer;
pub use diagnostics::{map_host_diagnostics, on_edit};
pub use navigation::{definition, hover};
pub use session::{DocumentSession, Phase};

use std::sync::Arc;

use tower_lsp::lsp_types::Url;
use tracing::debug;

use crate::cache::{FingerprintCache, COMPILE_NAMESPACE, VERIFY_NAMESPACE};
use crate::compiler::{CoffeeCompiler, CompilationResult, CompilerFault, DialectCompiler};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::host::{HostServer, HostService, HostServiceError};
use crate::vdoc::VirtualDocuments;
use crate::verifier::{HostDiagnostic, TscVerifier, Verifier};

/// Where finished diagnostics go. `publish` replaces everything previously
/// published for the URI.
#[tower_lsp::async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>);

    async fn clear(&self, uri: Url) {
        self.publish(uri, Vec::new()).await;
    }

    /// A compile cycle was aborted by a compiler fault. Nothing is published
    /// for it; this only gives the sink a chance to tell the user.
    async fn report_fault(&self, _uri: Url, _message: String) {}
}

pub struct Engine {
    config: Config,
    compiler: Arc<dyn DialectCompiler>,
    verifier: Arc<dyn Verifier>,
    host: Arc<dyn HostService>,
    sink: Arc<dyn DiagnosticSink>,
    documents: Arc<VirtualDocuments>,
    compile_cache: FingerprintCache<CompilationResult>,
    verify_cache: FingerprintCache<Vec<HostDiagnostic>>,
}

impl Engine {
    pub fn new(
        config: Config,
        compiler: Arc<dyn DialectCompiler>,
        verifier: Arc<dyn Verifier>,
        host: Arc<dyn HostService>,
        sink: Arc<dyn DiagnosticSink>,
        documents: Arc<VirtualDocuments>,
    ) -> Self {
        let ttl = config.cache_ttl();
        Self {
            config,
            compiler,
            verifier,
            host,
            sink,
            documents,
            compile_cache: FingerprintCache::new(COMPILE_NAMESPACE, ttl),
            verify_cache: FingerprintCache::new(VERIFY_NAMESPACE, ttl),
        }
    }

    /// Engine wired to the real toolchain named in `config`.
    pub fn with_toolchain(config: Config, sink: Arc<dyn DiagnosticSink>) -> Self {
        let documents = Arc::new(VirtualDocuments::new());
        let compiler = Arc::new(CoffeeCompiler::new(config.compiler.clone()));
        let verifier = Arc::new(TscVerifier::new(
            config.verifier.clone(),
            config.verify_timeout(),
        ));
        let host = Arc::new(HostServer::new(
            config.host_server.clone(),
            config.host_timeout(),
            Arc::clone(&documents),
        ));
        Self::new(config, compiler, verifier, host, sink, documents)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &Arc<VirtualDocuments> {
        &self.documents
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    pub fn host(&self) -> &Arc<dyn HostService> {
        &self.host
    }

    /// Compile through the cache. Faults are never cached.
    pub fn compile(&self, text: &str) -> Result<Arc<CompilationResult>, CompilerFault> {
        if let Some(hit) = self.compile_cache.get(text) {
            debug!("compile cache hit");
            return Ok(hit);
        }
        debug!("compile cache miss");
        let result = self.compiler.compile(text)?;
        Ok(self.compile_cache.put(text, result))
    }

    /// [`Engine::compile`] on the blocking pool, for use from async code.
    pub async fn compile_blocking(
        self: &Arc<Self>,
        text: String,
    ) -> Result<Arc<CompilationResult>, CompilerFault> {
        let engine = Arc::clone(self);
        match tokio::task::spawn_blocking(move || engine.compile(&text)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(CompilerFault::Io(std::io::Error::other(e.to_string()))),
        }
    }

    /// Verify through the cache. Errors are never cached.
    pub async fn verify(
        &self,
        host_source: &str,
    ) -> Result<Arc<Vec<HostDiagnostic>>, HostServiceError> {
        if let Some(hit) = self.verify_cache.get(host_source) {
            debug!("verify cache hit");
            return Ok(hit);
        }
        debug!("verify cache miss");
        let diagnostics = self.verifier.verify(host_source).await?;
        Ok(self.verify_cache.put(host_source, diagnostics))
    }

    /// Stop external services.
    pub async fn shutdown(&self) {
        self.host.shutdown().await;
    }
}
