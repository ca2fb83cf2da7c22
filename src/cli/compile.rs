use std::path::PathBuf;
use std::process;

use brewline::compiler::{CoffeeCompiler, CompilationResult, DialectCompiler};
use brewline::diagnostic::render_diagnostics;
use brewline::Config;
use clap::Args;

use super::read_source;

#[derive(Args)]
pub struct CompileArgs {
    /// Input .coffee file
    pub input: PathBuf,
    /// Also print the per-line source map
    #[arg(long)]
    pub map: bool,
}

pub fn cmd_compile(args: CompileArgs, config: Config) -> anyhow::Result<()> {
    let source = read_source(&args.input)?;
    let filename = args.input.display().to_string();

    match CoffeeCompiler::new(config.compiler).compile(&source)? {
        CompilationResult::Success {
            host_source,
            source_map,
        } => {
            println!("{}", host_source);
            if args.map {
                println!("\n// source map (host line: host col->dialect line:col)");
                print!("{}", source_map.render());
            }
            Ok(())
        }
        CompilationResult::Failure { diagnostics } => {
            render_diagnostics(&diagnostics, &filename, &source)?;
            process::exit(1);
        }
    }
}
