// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use igpack2npm::{Convertor, SqliteStore, StdinPrompt};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "igpack2npm")]
#[command(author, version, about = "Convert legacy FHIR validator packs to npm-style packages", long_about = None)]
struct Cli {
    /// Directories to scan recursively for validator.pack files
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Path to the identity cache database
    #[arg(short, long, default_value = "igpack-cache.db")]
    cache: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = SqliteStore::open(&cli.cache)
        .with_context(|| format!("opening identity cache at {}", cli.cache.display()))?;
    let mut convertor = Convertor::new(store, StdinPrompt);
    convertor.run(&cli.roots);

    println!("Finished");
    println!("Paths:");
    for path in convertor.package_paths() {
        println!("{}", path.display());
    }
    Ok(())
}
