//! Treegraft Command-Line Tool
//!
//! Clones, imports and exports record trees stored in a sled database.

mod commands;
mod config;
mod error;
mod formatter;

use clap::Parser;
use config::Args;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("treegraft=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = commands::run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
