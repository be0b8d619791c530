mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Command};
use libmgit_core::MgitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "MGIT_LOG";

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_command(cli: &Cli) -> Result<(), MgitError> {
    match &cli.command {
        Command::Init => commands::init::run(cli),
        Command::Commit { message, allow_empty } => commands::commit::run(cli, message, *allow_empty),
        Command::Log { max_count } => commands::log::run(cli, *max_count),
        Command::Show { revision } => commands::show::run(cli, revision),
        Command::Verify => commands::verify::run(cli),
        Command::RevParse { revision } => commands::rev_parse::run(cli, revision),
        Command::Reconstruct { from } => commands::reconstruct::run(cli, from.as_deref()),
        Command::Mappings { cmd } => commands::mappings::run(cli, cmd.clone()),
        Command::Config { global, list, key, value } => {
            commands::config::run(cli, *global, *list, key.as_deref(), value.as_deref())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run_command(&cli) {
        output::output_error(&cli, &e);
        std::process::exit(e.exit_code());
    }
}
