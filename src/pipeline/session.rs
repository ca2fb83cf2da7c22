//! Per-buffer state for the diagnostic pipeline.

use std::future::Future;
use std::sync::Mutex;

use tower_lsp::lsp_types::Url;

use super::debounce::Debouncer;
use crate::config::Config;

/// Where the diagnostic pipeline stands for one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Waiting out the compile settle period.
    Debouncing,
    CompilingDialect,
    /// The dialect compile reported a syntax error; nothing further runs.
    FailedDialect,
    /// Compiled; waiting for or running host verification.
    CompilingHostVerify,
    Mapping,
    Published,
}

pub struct DocumentSession {
    uri: Url,
    inner: Mutex<SessionState>,
}

struct SessionState {
    text: String,
    generation: u64,
    phase: Phase,
    compile_timer: Debouncer,
    verify_timer: Debouncer,
}

impl DocumentSession {
    pub fn new(uri: Url, config: &Config) -> Self {
        Self {
            uri,
            inner: Mutex::new(SessionState {
                text: String::new(),
                generation: 0,
                phase: Phase::Idle,
                compile_timer: Debouncer::new(config.compile_debounce()),
                verify_timer: Debouncer::new(config.verify_debounce()),
            }),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn text(&self) -> String {
        self.inner.lock().unwrap().text.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().unwrap().generation
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().unwrap().phase
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().unwrap().generation == generation
    }

    /// Record a new buffer text. Bumps the generation, drops any pending
    /// verify timer and returns the new generation.
    pub fn begin_edit(&self, text: String) -> u64 {
        let mut state = self.inner.lock().unwrap();
        state.text = text;
        state.generation += 1;
        state.verify_timer.cancel();
        state.phase = Phase::Debouncing;
        state.generation
    }

    /// Move to `phase` if `generation` is still current.
    pub fn advance(&self, generation: u64, phase: Phase) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state.generation != generation {
            return false;
        }
        state.phase = phase;
        true
    }

    /// Like [`DocumentSession::advance`], also handing back the text that
    /// `generation` refers to.
    pub fn advance_with_text(&self, generation: u64, phase: Phase) -> Option<String> {
        let mut state = self.inner.lock().unwrap();
        if state.generation != generation {
            return None;
        }
        state.phase = phase;
        Some(state.text.clone())
    }

    /// (Re)arm the compile timer with `job`.
    pub fn schedule_compile<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.lock().unwrap().compile_timer.schedule(job);
    }

    /// Arm the verify timer with `job` unless `generation` went stale.
    pub fn schedule_verify<F>(&self, generation: u64, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.inner.lock().unwrap();
        if state.generation != generation {
            return false;
        }
        state.verify_timer.schedule(job);
        true
    }

    /// Cancel both timers and invalidate in-flight runs.
    pub fn close(&self) {
        let mut state = self.inner.lock().unwrap();
        state.compile_timer.cancel();
        state.verify_timer.cancel();
        state.generation += 1;
        state.phase = Phase::Idle;
    }
}
