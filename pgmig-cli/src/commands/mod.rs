//! CLI command implementations.

pub mod create;
pub mod init;
pub mod migrate;
pub mod seed;

use pgmig_migrate::Direction;

use crate::cli::{Cli, CommandName};
use crate::config::Context;
use crate::error::CliResult;

use self::migrate::MigrateCommand;
use self::seed::SeedOptions;

/// Run the command selected on the command line
pub async fn run(cli: &Cli, context: &Context) -> CliResult<()> {
    match cli.cmd {
        CommandName::Init => init::run(context, &seed_options(cli)).await,
        CommandName::Seed => seed::run(context, &seed_options(cli)).await.map(|_| ()),
        CommandName::Create => create::run(context, cli.migration_name()).await,
        _ => match single_migration(cli) {
            Some((name, direction)) => migrate::apply_single(context, name, direction).await,
            None => migrate::run(context, migrate_command(cli)).await,
        },
    }
}

fn seed_options(cli: &Cli) -> SeedOptions {
    SeedOptions {
        env: cli.env.clone(),
        seed_file: cli.seed_file.clone(),
    }
}

/// `up --name` and `down --name` run one file outside version tracking.
fn single_migration(cli: &Cli) -> Option<(&str, Direction)> {
    let direction = match cli.cmd {
        CommandName::Up => Direction::Up,
        CommandName::Down => Direction::Down,
        _ => return None,
    };
    cli.migration_name().map(|name| (name, direction))
}

fn migrate_command(cli: &Cli) -> MigrateCommand {
    match cli.cmd {
        CommandName::Down => MigrateCommand::Down,
        CommandName::Steps => MigrateCommand::Steps(cli.steps),
        CommandName::Force => MigrateCommand::Force(cli.force),
        CommandName::Version => MigrateCommand::Version,
        _ => MigrateCommand::Up,
    }
}
