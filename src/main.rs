mod cli;

use clap::{Parser, Subcommand};

use cli::check::{cmd_check, CheckArgs};
use cli::compile::{cmd_compile, CompileArgs};
use cli::probe::{cmd_probe, ProbeArgs};
use cli::ConfigArgs;

#[derive(Parser)]
#[command(
    name = "brewline",
    version,
    about = "CoffeeScript diagnostics and completion through the JavaScript toolchain"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
    /// Log at debug level (BREWLINE_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the language server on stdin/stdout
    Lsp,
    /// Compile a .coffee file and print the JavaScript
    Compile(CompileArgs),
    /// Report syntax and type errors for a .coffee file
    Check(CheckArgs),
    /// Show the host buffer a completion at a position would use
    Probe(ProbeArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    brewline::logging::init(cli.verbose)?;
    let config = cli.config.resolve()?;

    match cli.command {
        Command::Lsp => cmd_lsp(config),
        Command::Compile(args) => cmd_compile(args, config),
        Command::Check(args) => cmd_check(args, config),
        Command::Probe(args) => cmd_probe(args, config),
    }
}

// --- brewline lsp ---

fn cmd_lsp(config: brewline::Config) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(brewline::lsp::run_server(config));
    Ok(())
}
