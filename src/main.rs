use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assetref::commands;

#[derive(Parser)]
#[command(name = "assetref", about = "Asset reference resolution and indexing")]
struct Cli {
    /// Workspace root directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the workspace and print the asset inventory
    Scan,
    /// List every reference site for one resource
    Refs {
        /// Resource path, absolute or workspace-relative
        resource: PathBuf,
    },
    /// List assets no source file references
    Unused,
    /// Resolve the asset reference at FILE:LINE:COLUMN
    Resolve {
        /// Position as FILE:LINE:COLUMN (1-based)
        position: String,
    },
    /// Watch the workspace and keep the index current
    Watch,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, assetref::error::Error> {
    match &cli.command {
        Commands::Scan => {
            commands::scan(&cli.root)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Refs { resource } => commands::refs(&cli.root, resource),
        Commands::Unused => commands::unused(&cli.root),
        Commands::Resolve { position } => {
            let (file, line, column) = commands::parse_position(position)?;
            commands::resolve(&cli.root, &file, line, column)
        }
        Commands::Watch => {
            commands::watch(&cli.root)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
