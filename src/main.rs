use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use peggy::cli::{self, args::PeggyArgs};

fn main() {
    let filter = EnvFilter::try_from_env("PEGGY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = PeggyArgs::parse();
    if let Err(report) = cli::run(args) {
        eprintln!("{:?}", report);
        process::exit(1);
    }
}
