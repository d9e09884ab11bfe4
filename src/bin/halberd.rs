//! Halberd CLI binary.

use std::process;

use clap::Parser;
use halberd::cli::{HalberdArgs, execute_command};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = HalberdArgs::parse();

    // RUST_LOG takes precedence over -v/-q.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("halberd={}", args.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
