//! pgmig CLI - Command-line interface for pgmig.

use pgmig_cli::cli::Cli;
use pgmig_cli::commands;
use pgmig_cli::config::Context;
use pgmig_cli::error::CliResult;
use pgmig_cli::{logging, output};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Variables already set in the environment win over .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    if let Err(e) = run(&cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> CliResult<()> {
    let context = Context::load(cli.config.as_deref())?;
    tracing::debug!(
        command = %cli.cmd,
        database = %context.database.redacted_url(),
        "Resolved configuration"
    );
    commands::run(cli, &context).await
}
