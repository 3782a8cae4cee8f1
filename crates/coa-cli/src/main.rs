//! COA collector CLI - fetch, prepare, execute and upload consumption analytics SQL

use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::common::{self, ExitCode};
use commands::{archive, execute, fetch, prepare, run, upload};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = common::init_logging(&cli.global) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }

    let result = match &cli.command {
        cli::Commands::Fetch(args) => fetch::execute(args, &cli.global).await,
        cli::Commands::Prepare(args) => prepare::execute(args, &cli.global).await,
        cli::Commands::Execute(args) => execute::execute(args, &cli.global).await,
        cli::Commands::Upload(args) => upload::execute(args, &cli.global).await,
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
        cli::Commands::Archive(args) => archive::execute(args, &cli.global).await,
    };

    let code = match result {
        Ok(()) => 0,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => *code,
            None => {
                let message = common::redact(&format!("{:#}", err));
                log::error!("{}", message);
                eprintln!("Error: {}", message);
                1
            }
        },
    };
    log::logger().flush();
    if code != 0 {
        std::process::exit(code);
    }
}
