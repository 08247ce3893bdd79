//! Templated `{z}/{x}/{y}` vector tile endpoint.

use std::sync::Arc;

use tracing::{instrument, trace};

use super::http::AsyncHttpClient;
use super::mvt::{decode_mvt, gunzip_if_needed};
use super::{BoxFuture, SourceError, TileSource};
use crate::coord::TileCoord;
use crate::tile::LayerMap;

/// Tile source reading MVT tiles from a URL template.
///
/// The placeholders `{z}`, `{x}` and `{y}` are substituted per request. A
/// missing tile (404) is treated as empty.
pub struct ZxySource {
    template: String,
    client: Arc<dyn AsyncHttpClient>,
}

impl ZxySource {
    pub fn new(template: impl Into<String>, client: Arc<dyn AsyncHttpClient>) -> Self {
        Self {
            template: template.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.template
    }

    /// Substitutes the tile coordinate into the template.
    pub fn tile_url(&self, coord: TileCoord) -> String {
        self.template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }

    /// Fetches and decodes a tile.
    #[instrument(skip(self), fields(template = %self.template))]
    pub async fn get_tile(&self, coord: TileCoord, tile_size: u32) -> Result<LayerMap, SourceError> {
        let url = self.tile_url(coord);
        let body = match self.client.get(&url).await {
            Ok(body) => body,
            Err(SourceError::NotFound(_)) => {
                trace!(%url, "Tile not found, treating as empty");
                return Ok(LayerMap::new());
            }
            Err(e) => return Err(e),
        };
        decode_mvt(gunzip_if_needed(&body)?, tile_size)
    }
}

impl std::fmt::Debug for ZxySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZxySource")
            .field("template", &self.template)
            .finish()
    }
}

impl TileSource for ZxySource {
    fn get(&self, coord: TileCoord, tile_size: u32) -> BoxFuture<'_, Result<LayerMap, SourceError>> {
        Box::pin(self.get_tile(coord, tile_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockAsyncHttpClient;

    #[test]
    fn test_tile_url_substitution() {
        let client = Arc::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let source = ZxySource::new("https://tiles.example.com/{z}/{x}/{y}.mvt", client);
        assert_eq!(
            source.tile_url(TileCoord::new(3, 5, 2)),
            "https://tiles.example.com/3/5/2.mvt"
        );
    }

    #[tokio::test]
    async fn test_not_found_is_empty() {
        let client = Arc::new(MockAsyncHttpClient::new(Err(SourceError::NotFound(
            "x".to_string(),
        ))));
        let source = ZxySource::new("https://tiles.example.com/{z}/{x}/{y}.mvt", client);
        let layers = source.get_tile(TileCoord::new(1, 0, 0), 1024).await.unwrap();
        assert!(layers.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let client = Arc::new(MockAsyncHttpClient::new(Err(SourceError::Http {
            status: 503,
            url: "u".to_string(),
        })));
        let source = ZxySource::new("https://tiles.example.com/{z}/{x}/{y}.mvt", client);
        let result = source.get_tile(TileCoord::new(1, 0, 0), 1024).await;
        assert!(matches!(result, Err(SourceError::Http { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_tile() {
        let client = Arc::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let source = ZxySource::new("https://tiles.example.com/{z}/{x}/{y}.mvt", client);
        assert!(source.get_tile(TileCoord::new(0, 0, 0), 1024).await.unwrap().is_empty());
    }
}
