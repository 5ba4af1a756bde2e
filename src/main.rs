use clap::Parser;
use tracing_subscriber::EnvFilter;

use opsbot::cli::{Cli, CliCommand, run_doctor_command, run_repl, run_serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // REPL output goes to the terminal, so keep the logs quieter there.
    let default_filter = match cli.command {
        CliCommand::Repl { .. } => "opsbot=warn",
        _ => "opsbot=info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        CliCommand::Serve {
            host,
            port,
            db_path,
        } => run_serve(host, port, db_path).await,
        CliCommand::Repl {
            message,
            user,
            db_path,
        } => run_repl(message, user, db_path).await,
        CliCommand::Doctor => run_doctor_command().await,
    }
}
