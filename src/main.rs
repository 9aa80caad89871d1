use beacon::cli::{check, run, CheckCommand, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // reqwest and tungstenite both pull in rustls; pin one process-wide provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Check(CheckCommand::Config(arg)) => check::execute_config(&arg.config),
        Commands::Check(CheckCommand::Connection(arg)) => {
            check::execute_connection(&arg.config).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
