//! Pick command - print the features under a point as JSON.

use serde_json::Value;
use tilepaint::coord::{LonLat, WebMercatorTilingScheme};

use super::common::{build_provider, SourceArgs};
use crate::error::CliError;

/// Arguments for the pick command.
pub struct PickArgs {
    pub source: SourceArgs,
    pub lon: f64,
    pub lat: f64,
    pub zoom: u8,
}

/// Run the pick command.
pub async fn run(args: PickArgs) -> Result<(), CliError> {
    let provider = build_provider(&args.source, 256)?;
    let tile = WebMercatorTilingScheme::new()
        .position_to_tile_xy(LonLat::new(args.lon, args.lat), args.zoom)
        .ok_or_else(|| {
            CliError::Config(format!(
                "position {}, {} is outside the tiling scheme",
                args.lon, args.lat
            ))
        })?;

    // Pre-tiled picks only see cached data, so load the tile first.
    if provider.source().is_pretiled() {
        provider.request_image(tile.x, tile.y, tile.z).await;
    }

    let features = provider
        .pick_features(tile.x, tile.y, tile.z, args.lon, args.lat)
        .await;
    let json = Value::Array(features.iter().map(|f| f.to_json()).collect());
    let text = serde_json::to_string_pretty(&json).map_err(std::io::Error::from)?;
    println!("{}", text);
    Ok(())
}
