use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use livepreview::{write_manifests, LivePreviewConfig};
use tracing_subscriber::EnvFilter;

/// Build-time tooling for live preview
#[derive(Parser, Debug)]
#[command(name = "livepreview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the type-path manifest of every configured repository
    Manifest {
        /// Preview configuration file
        #[arg(short, long, default_value = "preview.yaml")]
        config: PathBuf,

        /// Output directory, usually the site's public folder
        #[arg(short, long, default_value = "public")]
        out: PathBuf,
    },

    /// Load and validate a configuration file
    Check {
        #[arg(short, long, default_value = "preview.yaml")]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match Cli::parse().command {
        Command::Manifest { config, out } => {
            let config = LivePreviewConfig::from_file(&config)?;
            for files in write_manifests(&config, &out)? {
                println!("{} -> {}", files.pointer.display(), files.manifest.display());
            }
        }
        Command::Check { config } => {
            let loaded = LivePreviewConfig::from_file(&config)?;
            loaded.registry()?;
            println!(
                "{}: {} repositories ok",
                config.display(),
                loaded.repositories.len()
            );
        }
    }
    Ok(())
}
