//! Imagery provider facade.
//!
//! [`ImageryProvider`] is what a tiling host talks to. It owns one concrete
//! tile source, chosen once at construction from a [`DataDescriptor`], and
//! exposes two operations per tile:
//!
//! - [`ImageryProvider::request_image`] rasterizes a tile with the paint and
//!   label rules
//! - [`ImageryProvider::pick_features`] resolves a click to feature infos
//!
//! # Architecture
//!
//! ```text
//! DataDescriptor ──► selector::resolve ──► ConcreteSource
//!                                              │
//!                 ┌────────────────────────────┴──────────────┐
//!                 ▼                                           ▼
//!        GeoJsonSource::get_tile                    View::get_display_tile
//!                 │                                           │
//!                 └──────────► PreparedTile ◄─────────────────┘
//!                                   │
//!                  Labelers (per zoom, locked) ──► paint ──► RasterTile
//! ```
//!
//! Render and pick failures never escape: a failed render leaves a blank
//! tile and a failed pick returns no features. Only construction can fail.
//!
//! # Example
//!
//! ```ignore
//! let options = ProviderOptions::default().with_paint_rules(rules);
//! let provider = ImageryProvider::new("https://example.com/parks.geojson", options)?;
//! let tile = provider.request_image(3, 2, 3).await;
//! ```

mod options;

pub use options::{CloneOverrides, PickPostProcessor, ProviderOptions};

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::collection::FEATURE_ID_PROP;
use crate::config::{
    GEOJSON_LAYER_NAME, HIGHLIGHT_LINE_WIDTH, LAYER_NAME_PROP, MAX_TILES_AT_MIN_LEVEL,
    TILE_BUFFER, TILE_SIZE,
};
use crate::coord::{GeoRect, LonLat, TileCoord, WebMercatorTilingScheme, MAX_ZOOM};
use crate::error::{ProviderError, RenderError};
use crate::pick::{self, FeatureInfo};
use crate::render::{paint, Labelers, PaintStats, RasterTile};
use crate::source::{selector, AsyncHttpClient, ConcreteSource, DataDescriptor, ReqwestClient};
use crate::style::{Color, LineSymbolizer, Rule};
use crate::tile::{Bbox, Point, PreparedTile, RenderFeature};
use crate::view::{PickedFeature, View};

/// Rasterizing, pickable imagery over one vector data source.
pub struct ImageryProvider {
    source: ConcreteSource,
    /// Display cache and view; present for pre-tiled sources only.
    view: Option<Arc<View>>,
    options: ProviderOptions,
    rectangle: GeoRect,
    tiling_scheme: WebMercatorTilingScheme,
    labelers: Labelers,
}

impl ImageryProvider {
    /// Creates a provider fetching through a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the options are invalid, the minimum
    /// level would need more than four tiles to cover the rectangle, or the
    /// HTTP client cannot be created.
    pub fn new(
        data: impl Into<DataDescriptor>,
        options: ProviderOptions,
    ) -> Result<Self, ProviderError> {
        let client: Arc<dyn AsyncHttpClient> = Arc::new(ReqwestClient::new()?);
        Self::with_client(data, options, client)
    }

    /// Creates a provider with an explicit HTTP client.
    ///
    /// # Arguments
    ///
    /// * `data` - URL, in-memory collection or pre-built source
    /// * `options` - Zoom range, rectangle and style rules
    /// * `client` - Client used by URL-backed sources
    pub fn with_client(
        data: impl Into<DataDescriptor>,
        options: ProviderOptions,
        client: Arc<dyn AsyncHttpClient>,
    ) -> Result<Self, ProviderError> {
        let tiling_scheme = WebMercatorTilingScheme::new();
        let rectangle = validate(&options, &tiling_scheme)?;

        let source = selector::resolve(data.into(), client);
        if let ConcreteSource::GeoJson(geojson) = &source {
            geojson.index_options().validate()?;
        }
        let view = build_view(&source, &options);

        debug!(
            source = source.kind(),
            minimum_level = options.minimum_level,
            maximum_level = options.maximum_level,
            native_zoom = options.native_zoom(),
            tile_size = options.tile_size,
            paint_rules = options.paint_rules.len(),
            label_rules = options.label_rules.len(),
            "Imagery provider created"
        );

        Ok(Self {
            source,
            view,
            options,
            rectangle,
            tiling_scheme,
            labelers: Labelers::new(),
        })
    }

    pub fn source(&self) -> &ConcreteSource {
        &self.source
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// The configured rectangle clipped to the tiling scheme.
    pub fn rectangle(&self) -> GeoRect {
        self.rectangle
    }

    pub fn tiling_scheme(&self) -> &WebMercatorTilingScheme {
        &self.tiling_scheme
    }

    pub fn minimum_level(&self) -> u8 {
        self.options.minimum_level
    }

    pub fn maximum_level(&self) -> u8 {
        self.options.maximum_level
    }

    /// Output raster edge length in pixels.
    pub fn tile_size(&self) -> u32 {
        self.options.tile_size
    }

    pub fn credit(&self) -> Option<&str> {
        self.options.credit.as_deref()
    }

    /// Per-tile attributions. Vector sources carry none.
    pub fn tile_credits(&self, _x: u32, _y: u32, _level: u8) -> Vec<String> {
        Vec::new()
    }

    /// Per-zoom label indices placed so far.
    pub fn labelers(&self) -> &Labelers {
        &self.labelers
    }

    /// Renders the tile at (`x`, `y`, `level`) into a new surface.
    ///
    /// Returns `None` only when the surface cannot be allocated. A tile
    /// whose data cannot be loaded comes back blank.
    pub async fn request_image(&self, x: u32, y: u32, level: u8) -> Option<RasterTile> {
        let size = self.options.tile_size;
        let mut surface = match RasterTile::new(size, size) {
            Ok(surface) => surface,
            Err(e) => {
                warn!(error = %e, "Cannot create tile surface");
                return None;
            }
        };
        self.render_tile(TileCoord::new(level, x, y), &mut surface).await;
        Some(surface)
    }

    /// Draws the tile at `coord` into a caller-owned surface of any size.
    ///
    /// The surface is cleared first. Errors are logged and leave the
    /// surface blank; `None` is returned in that case.
    pub async fn render_tile(&self, coord: TileCoord, surface: &mut RasterTile) -> Option<PaintStats> {
        surface.clear();
        match self.try_render_tile(coord, surface).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(tile = %coord, error = %e, "Tile render failed");
                surface.clear();
                None
            }
        }
    }

    #[instrument(skip(self, surface), fields(tile = %coord))]
    async fn try_render_tile(
        &self,
        coord: TileCoord,
        surface: &mut RasterTile,
    ) -> Result<PaintStats, RenderError> {
        let tile = match (&self.source, &self.view) {
            (ConcreteSource::GeoJson(source), _) => {
                let data = source.get_tile(coord, TILE_SIZE).await?;
                PreparedTile::for_display_tile(coord, data, TILE_SIZE)
            }
            (_, Some(view)) => view.get_display_tile(coord).await?,
            (_, None) => return Ok(PaintStats::default()),
        };

        let tile_px = TILE_SIZE as f64;
        let origin = Point::new(coord.x as f64 * tile_px, coord.y as f64 * tile_px);
        let bbox = Bbox::new(
            origin.x - TILE_BUFFER,
            origin.y - TILE_BUFFER,
            origin.x + tile_px + TILE_BUFFER,
            origin.y + tile_px + TILE_BUFFER,
        );
        let base = surface.base_transform();

        // Registration and painting form one critical section per zoom.
        let index = self.labelers.index(coord.z);
        let mut labels = index.lock();
        let placed = labels.add_tile(&tile, &self.options.label_rules);

        let stats = paint(
            surface.pixmap_mut(),
            base,
            coord.z,
            std::slice::from_ref(&tile),
            Some(&*labels),
            &self.options.paint_rules,
            bbox,
            origin,
        );

        debug!(
            features = stats.features,
            culled = stats.culled,
            labels = stats.labels,
            placed,
            "Tile rendered"
        );
        Ok(stats)
    }

    /// Returns the features under (`lon`, `lat`) in degrees.
    ///
    /// Pre-tiled sources are queried through the display cache; only
    /// features with properties on a layer some rule draws are returned.
    /// GeoJSON sources are intersected with a buffered circle. The
    /// configured post-processing hook runs last.
    #[instrument(skip(self))]
    pub async fn pick_features(
        &self,
        _x: u32,
        _y: u32,
        level: u8,
        lon: f64,
        lat: f64,
    ) -> Vec<FeatureInfo> {
        let infos = match (&self.source, &self.view) {
            (ConcreteSource::GeoJson(source), _) => match source.resolve().await {
                Ok(resolved) => pick::pick_features(&resolved.collection, lon, lat, level),
                Err(e) => {
                    warn!(error = %e, "GeoJSON unavailable for picking");
                    Vec::new()
                }
            },
            (_, Some(view)) => {
                let hits = view.query_features(lon, lat, level as f64).await;
                self.visible_infos(hits, LonLat::new(lon, lat))
            }
            (_, None) => Vec::new(),
        };

        debug!(picked = infos.len(), "Features picked");

        match &self.options.post_process {
            Some(hook) => hook(infos).await,
            None => infos,
        }
    }

    fn visible_infos(&self, hits: Vec<PickedFeature>, position: LonLat) -> Vec<FeatureInfo> {
        let rendered: HashSet<&str> = self
            .options
            .paint_rules
            .iter()
            .map(|r| r.data_layer.as_str())
            .chain(self.options.label_rules.iter().map(|r| r.data_layer.as_str()))
            .collect();

        hits.into_iter()
            .filter(|hit| !hit.feature.props.is_empty())
            .filter(|hit| rendered.contains(hit.layer_name.as_str()))
            .map(|hit| {
                let mut properties = serde_json::Map::new();
                properties.insert(
                    LAYER_NAME_PROP.to_string(),
                    Value::String(hit.layer_name.clone()),
                );
                for (key, value) in hit.feature.props.iter() {
                    properties.insert(key.clone(), value.clone());
                }
                FeatureInfo::new(properties, Some(hit.layer_name)).with_position(position)
            })
            .collect()
    }

    /// Creates a provider sharing this one's source with some options
    /// replaced.
    ///
    /// Tiled GeoJSON data and cached pre-tiled data are shared, not copied.
    /// The view is rebuilt only when the native zoom changes. Label
    /// placement starts empty.
    pub fn clone_with(&self, overrides: CloneOverrides) -> Result<Self, ProviderError> {
        let options = overrides.apply(&self.options);
        let rectangle = validate(&options, &self.tiling_scheme)?;

        let view = match &self.view {
            Some(view) if view.max_data_level() == options.native_zoom() => Some(Arc::clone(view)),
            _ => build_view(&self.source, &options),
        };

        Ok(Self {
            source: self.source.clone(),
            view,
            options,
            rectangle,
            tiling_scheme: self.tiling_scheme,
            labelers: Labelers::new(),
        })
    }

    /// Creates a provider that outlines only `feature`.
    ///
    /// The feature is matched by id on its source layer: `_id_` on the
    /// GeoJSON layer, or the configured id property on the layer recorded
    /// in `__LAYERNAME` for pre-tiled sources. Returns `None` if the id or
    /// layer is missing.
    pub fn create_highlight_provider(&self, feature: &FeatureInfo, color: Color) -> Option<Self> {
        let (id_property, layer) = match &self.source {
            ConcreteSource::GeoJson(_) => {
                (FEATURE_ID_PROP.to_string(), Some(GEOJSON_LAYER_NAME.to_string()))
            }
            _ => (
                self.options.id_property.clone(),
                feature
                    .properties
                    .get(LAYER_NAME_PROP)
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
        };

        let id = feature
            .properties
            .get(&id_property)
            .filter(|v| !v.is_null())?
            .clone();
        let layer = layer?;

        let rule = Rule::new(layer, LineSymbolizer::new(color, HIGHLIGHT_LINE_WIDTH)).with_filter(
            move |_z: u8, f: &RenderFeature| f.props.get(&id_property) == Some(&id),
        );

        let overrides = CloneOverrides::default()
            .with_paint_rules(vec![rule])
            .with_label_rules(Vec::new());
        match self.clone_with(overrides) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "Cannot create highlight provider");
                None
            }
        }
    }
}

impl std::fmt::Debug for ImageryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageryProvider")
            .field("source", &self.source)
            .field("options", &self.options)
            .field("rectangle", &self.rectangle)
            .field("zooms_labelled", &self.labelers.zoom_count())
            .finish()
    }
}

/// Checks the options and returns the effective rectangle.
fn validate(
    options: &ProviderOptions,
    tiling_scheme: &WebMercatorTilingScheme,
) -> Result<GeoRect, ProviderError> {
    if options.minimum_level > options.maximum_level
        || options.maximum_level > MAX_ZOOM
        || options.native_zoom() > MAX_ZOOM
    {
        return Err(ProviderError::InvalidZoomRange {
            min: options.minimum_level,
            max: options.maximum_level,
        });
    }
    if options.tile_size == 0 {
        return Err(ProviderError::InvalidTileSize(options.tile_size));
    }

    let scheme = tiling_scheme.rectangle();
    let rectangle = options.rectangle.intersection(&scheme).unwrap_or(scheme);

    let level = options.minimum_level;
    let sw = tiling_scheme.position_to_tile_xy(rectangle.southwest(), level);
    let ne = tiling_scheme.position_to_tile_xy(rectangle.northeast(), level);
    if let (Some(sw), Some(ne)) = (sw, ne) {
        let columns = (ne.x as i64 - sw.x as i64).unsigned_abs() + 1;
        let rows = (ne.y as i64 - sw.y as i64).unsigned_abs() + 1;
        let tiles = columns * rows;
        if tiles > MAX_TILES_AT_MIN_LEVEL {
            return Err(ProviderError::TooManyTiles {
                tiles,
                level,
                max: MAX_TILES_AT_MIN_LEVEL,
            });
        }
    }

    Ok(rectangle)
}

fn build_view(source: &ConcreteSource, options: &ProviderOptions) -> Option<Arc<View>> {
    source
        .is_pretiled()
        .then(|| Arc::new(View::new(source.as_tile_source(), options.native_zoom())))
}
