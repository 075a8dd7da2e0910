mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_from(wild::args_os());

    match cli.command {
        Commands::Create(args) => commands::create(args)?,
        Commands::Add(args) => commands::add(args)?,
        Commands::List(args) => commands::list(args)?,
        Commands::Extract(args) => commands::extract(args)?,
        Commands::Info(args) => commands::info(args)?,
        Commands::Pfi(args) => commands::pfi(args)?,
    };

    Ok(())
}
