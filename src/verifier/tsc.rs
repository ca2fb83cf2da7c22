use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{HostDiagnostic, Verifier};
use crate::config::CommandConfig;
use crate::host::HostServiceError;

/// Name of the single file the session rewrites on every run.
const MANAGED_FILE: &str = "brewline-verify.ts";

/// Messages about unresolvable imports are noise: the managed file lives in
/// a scratch directory with no `node_modules`.
const IGNORED_PREFIX: &str = "Cannot find module";

/// `file(line,col): error TS2339: message`
static LOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)\((\d+),(\d+)\): (?:error|warning) TS\d+: (.*)$").unwrap()
});

/// `error TS5023: message`
static GLOBAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:error|warning) TS\d+: (.*)$").unwrap());

/// Verifier backed by the `tsc` command line.
///
/// The session is a scratch directory created on first use; its managed
/// file is overwritten with the full host text before each run. Runs are
/// serialized so two documents never race on the same file.
pub struct TscVerifier {
    command: CommandConfig,
    timeout: Duration,
    session: tokio::sync::Mutex<Option<TempDir>>,
}

impl TscVerifier {
    pub fn new(command: CommandConfig, timeout: Duration) -> Self {
        Self {
            command,
            timeout,
            session: tokio::sync::Mutex::new(None),
        }
    }
}

#[tower_lsp::async_trait]
impl Verifier for TscVerifier {
    async fn verify(&self, host_source: &str) -> Result<Vec<HostDiagnostic>, HostServiceError> {
        let mut session = self.session.lock().await;
        let dir = match session.take() {
            Some(dir) => dir,
            None => {
                let dir = tempfile::Builder::new().prefix("brewline-").tempdir()?;
                debug!(path = %dir.path().display(), "verifier session created");
                dir
            }
        };
        let dir = session.insert(dir);
        let path = dir.path().join(MANAGED_FILE);
        tokio::fs::write(&path, host_source).await?;

        let run = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(&path)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| HostServiceError::Timeout(self.timeout))?
            .map_err(|source| HostServiceError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = parse_tsc_output(&stdout);
        trace!(
            status = %output.status,
            count = diagnostics.len(),
            "verifier finished"
        );

        // tsc exits 1 or 2 when it reports errors; anything else with
        // nothing parsed is a broken installation, not a clean program.
        let reported_errors = matches!(output.status.code(), Some(1) | Some(2));
        if !output.status.success() && !reported_errors {
            return Err(HostServiceError::Protocol(format!(
                "verifier exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if reported_errors && diagnostics.is_empty() && !mentions_ignored(&stdout) {
            let detail = if stdout.trim().is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                stdout.into_owned()
            };
            return Err(HostServiceError::Protocol(format!(
                "verifier failed without diagnostics: {}",
                detail.trim()
            )));
        }
        Ok(diagnostics)
    }
}

fn mentions_ignored(stdout: &str) -> bool {
    stdout.contains(IGNORED_PREFIX)
}

/// Parse `tsc --pretty false` output into host diagnostics.
///
/// Only the head of a chained message is kept; indented continuation lines
/// are skipped. Errors located in some other file (a lib or a referenced
/// declaration) have no meaningful host line and come back with `line: None`.
pub fn parse_tsc_output(stdout: &str) -> Vec<HostDiagnostic> {
    let mut diagnostics = Vec::new();
    for line in stdout.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let line = line.trim_end();
        if let Some(caps) = LOCATED.captures(line) {
            let message = caps[4].to_string();
            if message.starts_with(IGNORED_PREFIX) {
                continue;
            }
            let in_managed_file = caps[1].ends_with(MANAGED_FILE);
            let host_line = caps[2]
                .parse::<u32>()
                .ok()
                .map(|l| l.saturating_sub(1))
                .filter(|_| in_managed_file);
            diagnostics.push(HostDiagnostic {
                message,
                line: host_line,
            });
        } else if let Some(caps) = GLOBAL.captures(line) {
            let message = caps[1].to_string();
            if message.starts_with(IGNORED_PREFIX) {
                continue;
            }
            diagnostics.push(HostDiagnostic {
                message,
                line: None,
            });
        }
    }
    diagnostics
}
