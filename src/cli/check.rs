use std::path::PathBuf;
use std::process;

use clap::Args;
use tracing::warn;

use brewline::compiler::{CoffeeCompiler, CompilationResult, DialectCompiler};
use brewline::diagnostic::render_diagnostics;
use brewline::pipeline::map_host_diagnostics;
use brewline::verifier::{TscVerifier, Verifier};
use brewline::Config;

use super::read_source;

#[derive(Args)]
pub struct CheckArgs {
    /// Input .coffee file
    pub input: PathBuf,
    /// Stop after the dialect compile
    #[arg(long)]
    pub no_verify: bool,
}

pub fn cmd_check(args: CheckArgs, config: Config) -> anyhow::Result<()> {
    let source = read_source(&args.input)?;
    let filename = args.input.display().to_string();

    let compiled = CoffeeCompiler::new(config.compiler.clone()).compile(&source)?;
    let diagnostics = match compiled {
        CompilationResult::Failure { diagnostics } => diagnostics,
        CompilationResult::Success { .. } if args.no_verify || !config.verify => Vec::new(),
        CompilationResult::Success {
            host_source,
            source_map,
        } => {
            let verifier = TscVerifier::new(config.verifier.clone(), config.verify_timeout());
            let rt = tokio::runtime::Runtime::new()?;
            match rt.block_on(verifier.verify(&host_source)) {
                Ok(found) => map_host_diagnostics(&source_map, &found, &source),
                Err(e) => {
                    warn!(error = %e, "host verification failed");
                    Vec::new()
                }
            }
        }
    };

    if diagnostics.is_empty() {
        eprintln!("OK: {}", args.input.display());
        return Ok(());
    }
    render_diagnostics(&diagnostics, &filename, &source)?;
    process::exit(1);
}
