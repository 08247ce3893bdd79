//! GeoJSON tile source with on-demand vector tiling.
//!
//! The document is resolved (fetched and parsed, or taken from memory) and
//! tiled exactly once per source. Concurrent callers that arrive before
//! resolution completes all await the same in-flight future; a failed
//! resolution is remembered and returned to every later caller.
//!
//! # Example
//!
//! ```ignore
//! let source = GeoJsonSource::from_url("https://example.com/parks.geojson", client);
//! let layers = source.get(TileCoord::new(4, 8, 5), 256).await?;
//! let parks = layers.get(GEOJSON_LAYER_NAME);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use super::http::AsyncHttpClient;
use super::{BoxFuture, SourceError, TileSource};
use crate::collection::FeatureCollection;
use crate::config::GEOJSON_LAYER_NAME;
use crate::coord::TileCoord;
use crate::tile::{LayerMap, RenderFeature};
use crate::vt::{TileIndexOptions, VectorTileIndex};

/// A resolved document and its tile index.
#[derive(Debug)]
pub struct ResolvedGeoJson {
    pub collection: Arc<FeatureCollection>,
    pub index: VectorTileIndex,
}

type Resolution = Shared<BoxFuture<'static, Result<Arc<ResolvedGeoJson>, SourceError>>>;

enum Origin {
    Url {
        url: String,
        client: Arc<dyn AsyncHttpClient>,
    },
    Collection(Arc<FeatureCollection>),
}

/// Tile source over a GeoJSON document.
pub struct GeoJsonSource {
    origin: Origin,
    options: TileIndexOptions,
    /// In-flight or finished resolution. Never cleared once set.
    resolution: Mutex<Option<Resolution>>,
    resolutions_started: Arc<AtomicUsize>,
}

impl GeoJsonSource {
    /// Creates a source that fetches `url` on first use.
    pub fn from_url(url: impl Into<String>, client: Arc<dyn AsyncHttpClient>) -> Self {
        Self::new(
            Origin::Url {
                url: url.into(),
                client,
            },
            TileIndexOptions::default(),
        )
    }

    /// Creates a source over an in-memory collection.
    pub fn from_collection(collection: impl Into<Arc<FeatureCollection>>) -> Self {
        Self::new(Origin::Collection(collection.into()), TileIndexOptions::default())
    }

    /// Replaces the tiling options. Only effective before first use.
    pub fn with_index_options(mut self, options: TileIndexOptions) -> Self {
        self.options = options;
        self
    }

    pub fn index_options(&self) -> &TileIndexOptions {
        &self.options
    }

    fn new(origin: Origin, options: TileIndexOptions) -> Self {
        Self {
            origin,
            options,
            resolution: Mutex::new(None),
            resolutions_started: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The location this source was created from, if any.
    pub fn url(&self) -> Option<&str> {
        match &self.origin {
            Origin::Url { url, .. } => Some(url),
            Origin::Collection(_) => None,
        }
    }

    /// Number of times resolution (fetch, parse and tiling) has started.
    ///
    /// At most one for the lifetime of the source.
    pub fn resolution_count(&self) -> usize {
        self.resolutions_started.load(Ordering::SeqCst)
    }

    /// Returns the collection if resolution has already succeeded.
    pub fn collection(&self) -> Option<Arc<FeatureCollection>> {
        let slot = self.resolution.lock();
        slot.as_ref()
            .and_then(|r| r.peek())
            .and_then(|r| r.as_ref().ok())
            .map(|resolved| Arc::clone(&resolved.collection))
    }

    /// Resolves the document and tile index, sharing one in-flight attempt
    /// between all callers.
    pub async fn resolve(&self) -> Result<Arc<ResolvedGeoJson>, SourceError> {
        let resolution = {
            let mut slot = self.resolution.lock();
            slot.get_or_insert_with(|| self.start_resolution()).clone()
        };
        resolution.await
    }

    fn start_resolution(&self) -> Resolution {
        let started = Arc::clone(&self.resolutions_started);
        let options = self.options.clone();

        let fetch: BoxFuture<'static, Result<Arc<FeatureCollection>, SourceError>> =
            match &self.origin {
                Origin::Collection(collection) => {
                    let collection = Arc::clone(collection);
                    Box::pin(async move { Ok(collection) })
                }
                Origin::Url { url, client } => {
                    let url = url.clone();
                    let client = Arc::clone(client);
                    Box::pin(async move { fetch_collection(&url, client.as_ref()).await })
                }
            };

        let future: BoxFuture<'static, Result<Arc<ResolvedGeoJson>, SourceError>> =
            Box::pin(async move {
                started.fetch_add(1, Ordering::SeqCst);

                let collection = fetch.await.map_err(|e| {
                    warn!(error = %e, "GeoJSON resolution failed");
                    e
                })?;

                let index = VectorTileIndex::build(&collection, options)
                    .map_err(|e| SourceError::Index(e.to_string()))?;

                debug!(
                    features = collection.len(),
                    tiles = index.tile_count(),
                    "GeoJSON source resolved"
                );

                Ok(Arc::new(ResolvedGeoJson { collection, index }))
            });

        future.shared()
    }

    /// Fetches the tile at `coord` with coordinates scaled to `tile_size`.
    ///
    /// All features are placed in the single [`GEOJSON_LAYER_NAME`] layer;
    /// a tile without features yields an empty map.
    pub async fn get_tile(&self, coord: TileCoord, tile_size: u32) -> Result<LayerMap, SourceError> {
        let resolved = self.resolve().await?;

        let Some(tile) = resolved.index.get_tile(coord.z, coord.x, coord.y) else {
            return Ok(LayerMap::new());
        };

        let scale = tile_size as f64 / resolved.index.options().extent as f64;
        let features: Vec<RenderFeature> = tile
            .features
            .iter()
            .filter_map(|f| {
                let rings = f
                    .geometry
                    .iter()
                    .map(|ring| ring.iter().map(|&[x, y]| (x as f64, y as f64)));
                RenderFeature::from_scaled(f.geom_type, rings, scale, Arc::clone(&f.tags))
            })
            .collect();

        let mut layers = LayerMap::new();
        if !features.is_empty() {
            layers.insert(GEOJSON_LAYER_NAME.to_string(), features);
        }
        Ok(layers)
    }
}

impl std::fmt::Debug for GeoJsonSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoJsonSource")
            .field("url", &self.url())
            .field("resolutions", &self.resolution_count())
            .finish()
    }
}

impl TileSource for GeoJsonSource {
    fn get(&self, coord: TileCoord, tile_size: u32) -> BoxFuture<'_, Result<LayerMap, SourceError>> {
        Box::pin(self.get_tile(coord, tile_size))
    }
}

#[instrument(skip(client))]
async fn fetch_collection(
    url: &str,
    client: &dyn AsyncHttpClient,
) -> Result<Arc<FeatureCollection>, SourceError> {
    let body = client.get(url).await?;
    let collection = FeatureCollection::from_json_slice(&body)?;
    debug!(features = collection.len(), "Fetched GeoJSON");
    Ok(Arc::new(collection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockAsyncHttpClient;
    use crate::tile::GeomType;

    const POINTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "origin"},
             "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}},
            {"type": "Feature", "properties": {"name": "east"},
             "geometry": {"type": "LineString", "coordinates": [[10.0, 10.0], [20.0, 15.0]]}}
        ]
    }"#;

    fn has_geom_type(layers: &LayerMap, geom_type: GeomType) -> bool {
        layers
            .values()
            .flatten()
            .any(|f| f.geom_type == geom_type)
    }

    fn mock(body: &str) -> Arc<MockAsyncHttpClient> {
        Arc::new(MockAsyncHttpClient::new(Ok(body.as_bytes().to_vec())))
    }

    #[tokio::test]
    async fn test_get_root_tile_scales_to_tile_size() {
        let client = mock(POINTS);
        let source = GeoJsonSource::from_url("https://example.com/a.geojson", client.clone());

        let layers = source.get_tile(TileCoord::new(0, 0, 0), 256).await.unwrap();
        let features = &layers[GEOJSON_LAYER_NAME];
        assert_eq!(features.len(), 2);

        let point = features
            .iter()
            .find(|f| f.geom_type == GeomType::Point)
            .unwrap();
        assert_eq!(point.geom[0][0].x, 128.0);
        assert_eq!(point.geom[0][0].y, 128.0);
        assert_eq!(point.bbox.min_x, point.bbox.max_x);
        assert!(has_geom_type(&layers, GeomType::Line));
    }

    #[tokio::test]
    async fn test_resolution_happens_once() {
        let client = mock(POINTS);
        let source = GeoJsonSource::from_url("https://example.com/a.geojson", client.clone());

        let (a, b, c) = tokio::join!(
            source.get_tile(TileCoord::new(0, 0, 0), 256),
            source.get_tile(TileCoord::new(1, 1, 0), 256),
            source.get_tile(TileCoord::new(1, 0, 1), 256),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(client.request_count(), 1);
        assert_eq!(source.resolution_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_retried() {
        let client = Arc::new(MockAsyncHttpClient::new(Err(SourceError::Http {
            status: 500,
            url: "https://example.com/a.geojson".to_string(),
        })));
        let source = GeoJsonSource::from_url("https://example.com/a.geojson", client.clone());

        let first = source.get_tile(TileCoord::new(0, 0, 0), 256).await;
        let second = source.get_tile(TileCoord::new(0, 0, 0), 256).await;
        assert_eq!(first, second);
        assert!(matches!(first, Err(SourceError::Http { status: 500, .. })));
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_tile_is_empty_map() {
        let source = GeoJsonSource::from_collection(
            FeatureCollection::from_json_slice(POINTS.as_bytes()).unwrap(),
        );
        // Far south-west of both features.
        let layers = source.get_tile(TileCoord::new(6, 0, 63), 256).await.unwrap();
        assert!(layers.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_collection_available_after_resolve() {
        let source = GeoJsonSource::from_collection(
            FeatureCollection::from_json_slice(POINTS.as_bytes()).unwrap(),
        );
        assert!(source.collection().is_none());
        source.resolve().await.unwrap();
        assert_eq!(source.collection().unwrap().len(), 2);
        assert_eq!(source.url(), None);
    }

    #[tokio::test]
    async fn test_non_geojson_document_yields_no_features() {
        let source = GeoJsonSource::from_url("https://example.com/a.json", mock(r#"{"a": 1}"#));
        let layers = source.get_tile(TileCoord::new(0, 0, 0), 256).await.unwrap();
        assert!(layers.is_empty());
    }
}
