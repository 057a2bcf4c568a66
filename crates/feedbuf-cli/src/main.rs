//! CLI entry point.
//!
//! Wiring happens in `bootstrap`; this file only parses arguments and
//! dispatches to handlers.

use clap::Parser;

use feedbuf_cli::{Cli, CliConfig, Commands, bootstrap, handlers, init_logging, load_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CliConfig::resolve(cli.config.as_deref(), cli.cache_dir)?;
    let ctx = bootstrap(config)?;

    match cli.command {
        Commands::Walk(args) => handlers::walk::execute(&ctx, &args).await?,
        Commands::Cache { command } => handlers::cache::execute(&ctx, &command).await?,
    }

    Ok(())
}
