//! protoc plugin entry point: reads a `CodeGeneratorRequest` from stdin and writes the
//! `CodeGeneratorResponse` to stdout.

use std::io::{Read, Write};

use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the plugin response, logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RESTY_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    let output = resty_gen::run(&input)?;
    std::io::stdout().write_all(&output)?;
    Ok(())
}
