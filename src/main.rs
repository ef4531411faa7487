use clap::Parser;
use livewatch::cli::commands::{self, init, serve};
use livewatch::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => init::run_init(config, force),
        Commands::Config => init::run_config(&commands::load_settings(config)?),
        Commands::Serve(args) => serve::run(args, commands::load_settings(config)?).await,
    }
}
