//! Provider-level error types.

use thiserror::Error;

use crate::source::SourceError;
use crate::vt::TileIndexError;

/// Configuration errors raised while constructing a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Covering the rectangle at the minimum level needs too many tiles.
    #[error(
        "The imagery provider's rectangle and minimum level indicate that {tiles} tiles \
         would need to be loaded at level {level}; at most {max} are allowed"
    )]
    TooManyTiles { tiles: u64, level: u8, max: u64 },

    /// The zoom range is empty or beyond the supported maximum.
    #[error("Invalid zoom range {min}..={max}")]
    InvalidZoomRange { min: u8, max: u8 },

    /// The requested raster size is zero.
    #[error("Invalid tile size {0}")]
    InvalidTileSize(u32),

    /// The default HTTP client could not be created.
    #[error("HTTP client unavailable: {0}")]
    Client(#[from] SourceError),

    /// Tile index options are out of range.
    #[error(transparent)]
    TileIndex(#[from] TileIndexError),
}

/// Errors raised while rendering one tile.
///
/// These never leave [`crate::provider::ImageryProvider::request_image`];
/// a failed render yields a blank tile.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tile data could not be obtained.
    #[error("Tile data unavailable: {0}")]
    Source(#[from] SourceError),

    /// The drawing surface could not be allocated.
    #[error("Cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_tiles_message() {
        let err = ProviderError::TooManyTiles {
            tiles: 9,
            level: 3,
            max: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("9 tiles"));
        assert!(msg.contains("level 3"));
    }

    #[test]
    fn test_render_error_from_source() {
        let err: RenderError = SourceError::NotFound("a".to_string()).into();
        assert!(matches!(err, RenderError::Source(_)));
    }
}
