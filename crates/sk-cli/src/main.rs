//! Terminal front end for the Skirmish turn-based combat engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "skirmish",
    about = "Skirmish: turn-based grid combat in the terminal",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an arena and list its actors
    Show {
        /// Arena layout file (default: the built-in arena)
        #[arg(short, long)]
        map: Option<PathBuf>,
    },

    /// Detect nearby enemies and fight them automatically
    Simulate {
        /// Arena layout file (default: the built-in arena)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// RNG seed for damage variance
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Give up after this many host ticks
        #[arg(long, default_value = "10000")]
        max_ticks: u64,

        /// JSON file overriding combat settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the whole combat log
        #[arg(short, long)]
        verbose: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fight an encounter interactively, one command per line on stdin
    Play {
        /// Arena layout file (default: the built-in arena)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// RNG seed for damage variance
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Show { map } => commands::show::run(map.as_deref()),
        Commands::Simulate {
            map,
            seed,
            max_ticks,
            config,
            verbose,
            json,
        } => commands::simulate::run(
            map.as_deref(),
            seed,
            max_ticks,
            config.as_deref(),
            verbose,
            json,
        ),
        Commands::Play { map, seed } => commands::play::run(map.as_deref(), seed),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
