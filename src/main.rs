use std::process;

use clap::Parser;
use gitguard::Cli;

#[tokio::main]
async fn main() {
    // Stdout carries the serialized report, so logs go to stderr.
    // RUST_LOG overrides the default "warn" filter.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = Cli::parse().execute().await {
        // Alternate formatting prints the whole context chain.
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
