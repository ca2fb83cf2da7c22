//! Language server entry point for editors that expect a dedicated binary.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    brewline::logging::init(false)?;
    brewline::lsp::run_server(brewline::Config::default()).await;
    Ok(())
}
