//! Render command - rasterize one tile to a PNG file.

use std::path::PathBuf;

use tilepaint::coord::TileCoord;
use tilepaint::render::RasterTile;
use tracing::info;

use super::common::{build_provider, SourceArgs};
use crate::error::CliError;

/// Arguments for the render command.
pub struct RenderArgs {
    pub source: SourceArgs,
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub out: PathBuf,
}

/// Run the render command.
pub async fn run(args: RenderArgs) -> Result<(), CliError> {
    let tiles = 1u64 << args.z.min(31);
    if args.x as u64 >= tiles || args.y as u64 >= tiles {
        return Err(CliError::Config(format!(
            "tile {}/{}/{} is outside the {}x{} grid at zoom {}",
            args.z, args.x, args.y, tiles, tiles, args.z
        )));
    }

    let provider = build_provider(&args.source, args.size)?;
    let coord = TileCoord::new(args.z, args.x, args.y);

    let mut surface =
        RasterTile::new(args.size, args.size).map_err(|e| CliError::Render(e.to_string()))?;
    let stats = provider.render_tile(coord, &mut surface).await;

    let png = surface.to_png().map_err(|e| CliError::Render(e.to_string()))?;
    std::fs::write(&args.out, &png)?;

    match stats {
        Some(stats) => {
            info!(
                tile = %coord,
                features = stats.features,
                labels = stats.labels,
                painted = surface.painted_pixels(),
                "Tile rendered"
            );
            println!(
                "Wrote {} ({} features, {} labels)",
                args.out.display(),
                stats.features,
                stats.labels
            );
        }
        None => println!("Wrote blank tile {} (data unavailable)", args.out.display()),
    }
    Ok(())
}
