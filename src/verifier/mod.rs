//! Host-language verification of compiled output.
//!
//! A [`Verifier`] type-checks a whole host text and reports what it found
//! in host coordinates. Turning those into dialect diagnostics is the
//! mapper's job, not the verifier's.

mod tsc;

pub use tsc::{parse_tsc_output, TscVerifier};

use crate::host::HostServiceError;

/// One problem reported by the host checker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostDiagnostic {
    pub message: String,
    /// 0-based host line. `None` for whole-program errors (bad flags,
    /// missing lib files) that carry no location.
    pub line: Option<u32>,
}

#[tower_lsp::async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, host_source: &str) -> Result<Vec<HostDiagnostic>, HostServiceError>;
}
