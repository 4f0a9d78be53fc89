mod cli;
pub mod core;
pub mod errors;
mod handlers;
mod ui;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::errors::CliError;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// 顶层分发:每个子命令交给对应的处理器。
fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Inspect { path, preview } => handlers::inspect::handle_inspect(&path, preview),
        Commands::Hash {
            path,
            check,
            force,
            write,
        } => handlers::hash::handle_hash(&path, check, force, write),
        Commands::Rename { path, apply } => handlers::rename::handle_rename(&path, apply),
        Commands::Unpack {
            path,
            list,
            destination,
            force,
        } => handlers::unpack::handle_unpack(&path, list, destination, force),
        Commands::Serialize {
            path,
            content,
            pretty,
            output,
        } => handlers::serialize::handle_serialize(&path, content, pretty, output),
    }
}
