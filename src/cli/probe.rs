use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use tower_lsp::lsp_types::Position;

use brewline::compiler::{CoffeeCompiler, CompilationResult, DialectCompiler};
use brewline::mapper::dialect_to_host;
use brewline::synthesize::{emulate, synthesize};
use brewline::Config;

use super::read_source;

#[derive(Args)]
pub struct ProbeArgs {
    /// Input .coffee file
    pub input: PathBuf,
    /// Cursor line (0-based)
    #[arg(long)]
    pub line: u32,
    /// Cursor column in UTF-16 units (0-based)
    #[arg(long)]
    pub column: u32,
}

/// Show the host buffer and cursor a completion request at the given
/// position would be forwarded with.
pub fn cmd_probe(args: ProbeArgs, config: Config) -> anyhow::Result<()> {
    let source = read_source(&args.input)?;
    let cursor = Position::new(args.line, args.column);

    let Some(probe) = synthesize(&source, cursor) else {
        bail!("line {} is past the end of '{}'", args.line, args.input.display());
    };
    let (host_source, source_map) =
        match CoffeeCompiler::new(config.compiler).compile(&probe.candidate_text)? {
            CompilationResult::Success {
                host_source,
                source_map,
            } => (host_source, source_map),
            CompilationResult::Failure { diagnostics } => {
                let reason = diagnostics
                    .first()
                    .map(|d| d.message.clone())
                    .unwrap_or_default();
                bail!("probe buffer does not compile: {}", reason);
            }
        };
    let Some(host_line) = dialect_to_host(&source_map, probe.probe_position) else {
        bail!(
            "probe at {}:{} has no host mapping",
            probe.probe_position.line,
            probe.probe_position.character
        );
    };
    let Some((host_text, emulated)) = emulate(&host_source, host_line, &probe.current_line) else {
        bail!("host line {} is out of range", host_line);
    };

    println!("{}", host_text);
    eprintln!(
        "cursor: dialect {}:{} -> host {}:{}",
        cursor.line, cursor.character, emulated.line, emulated.character
    );
    Ok(())
}
