//! Tilepaint CLI - render and pick vector tile imagery from the command line.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilepaint::logging::{init_logging, LogConfig};

use commands::common::SourceArgs;
use commands::pick::PickArgs;
use commands::render::RenderArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilepaint", version, about = "Render vector data to raster map tiles")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render one tile to a PNG file
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Zoom level
        #[arg(short)]
        z: u8,

        /// Tile column
        #[arg(short)]
        x: u32,

        /// Tile row
        #[arg(short)]
        y: u32,

        /// Output edge length in pixels
        #[arg(long, default_value_t = 256)]
        size: u32,

        /// Output PNG path
        #[arg(long, default_value = "tile.png")]
        out: PathBuf,
    },

    /// Print the features under a point as JSON
    Pick {
        #[command(flatten)]
        source: SourceArgs,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Zoom level
        #[arg(long)]
        zoom: u8,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let directive = if cli.verbose {
        "tilepaint=debug,tilepaint_cli=debug"
    } else {
        "tilepaint=info,tilepaint_cli=info"
    };
    let mut log_config = LogConfig::default().with_directive(directive);
    if let Some(dir) = cli.log_dir {
        log_config = log_config.with_directory(dir);
    }
    let _guard = init_logging(log_config)?;

    match cli.command {
        Commands::Render {
            source,
            z,
            x,
            y,
            size,
            out,
        } => {
            commands::render::run(RenderArgs {
                source,
                z,
                x,
                y,
                size,
                out,
            })
            .await
        }
        Commands::Pick {
            source,
            lon,
            lat,
            zoom,
        } => {
            commands::pick::run(PickArgs {
                source,
                lon,
                lat,
                zoom,
            })
            .await
        }
    }
}
