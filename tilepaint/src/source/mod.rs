//! Tile sources.
//!
//! A tile source turns a tile coordinate into renderer-ready features. Three
//! concrete sources exist:
//!
//! - [`PmtilesSource`]: random-access reads from a PMTiles v3 archive
//! - [`ZxySource`]: a `{z}/{x}/{y}` templated Mapbox Vector Tile endpoint
//! - [`GeoJsonSource`]: on-demand vector tiling of a GeoJSON document
//!
//! The [`selector`] module classifies a polymorphic data descriptor into one
//! of them.
//!
//! # Dyn Compatibility
//!
//! [`TileSource`] returns boxed futures so sources can be held as
//! `Arc<dyn TileSource>` by the display cache.

mod geojson;
mod http;
mod mvt;
mod pmtiles;
pub mod selector;
mod zxy;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::coord::TileCoord;
use crate::tile::LayerMap;

pub use self::geojson::GeoJsonSource;
pub use http::{AsyncHttpClient, ReqwestClient};
pub use mvt::decode_mvt;
pub use pmtiles::PmtilesSource;
pub use selector::{ConcreteSource, DataDescriptor};
pub use zxy::ZxySource;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised while fetching or decoding tile data.
///
/// Payloads are strings so that one failure can be cloned to every caller
/// waiting on a shared resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The request could not be sent or the body could not be read.
    #[error("Request failed: {0}")]
    Fetch(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The document is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The archive is malformed or uses an unsupported feature.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A tile payload could not be decompressed or decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The vector tile index could not be built.
    #[error("Tile index error: {0}")]
    Index(String),
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e.to_string())
    }
}

/// A source of vector tile data.
///
/// # Arguments (for `get`)
///
/// * `coord` - The tile to fetch
/// * `tile_size` - Edge length in pixels that feature coordinates are scaled to
///
/// An empty [`LayerMap`] means the tile has no data; that is not an error.
pub trait TileSource: Send + Sync {
    fn get(&self, coord: TileCoord, tile_size: u32) -> BoxFuture<'_, Result<LayerMap, SourceError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::Http {
            status: 500,
            url: "https://example.com/a.geojson".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500 from https://example.com/a.geojson");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SourceError = io.into();
        assert!(matches!(err, SourceError::Io(msg) if msg.contains("missing")));
    }
}
