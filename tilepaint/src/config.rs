//! Fixed parameters of the tiling, rendering and picking pipeline.

/// Layer name under which all GeoJSON features are tiled.
pub const GEOJSON_LAYER_NAME: &str = "layer";

/// Property added to picked pre-tiled features naming their source layer.
pub const LAYER_NAME_PROP: &str = "__LAYERNAME";

/// Default feature id property for pre-tiled sources.
pub const DEFAULT_ID_PROPERTY: &str = "FID";

/// Logical edge length of a display tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Margin around a display tile within which features are still painted.
pub const TILE_BUFFER: f64 = 64.0;

/// Integer coordinate extent of one vector tile edge.
pub const VECTOR_TILE_EXTENT: u32 = 4096;

/// Deepest zoom the GeoJSON tile index produces.
pub const GEOJSON_MAX_ZOOM: u8 = 24;

/// Edge length in pixels of a data tile held by the display cache.
pub const DATA_TILE_SIZE: u32 = 1024;

/// Zoom difference between a display tile and the data tile covering it.
pub const LEVEL_DIFF: u8 = 2;

/// Number of data tiles kept by the display cache.
pub const DISPLAY_CACHE_CAPACITY: u64 = 64;

/// Screen tolerance of geometric picking.
pub const PICK_TOLERANCE_PX: f64 = 10.0;

/// Ground resolution at zoom 0 on the equator, in metres per pixel.
pub const METERS_PER_PIXEL_EQUATOR: f64 = 156543.0;

/// Most tiles a provider may need to cover its rectangle at minimum zoom.
pub const MAX_TILES_AT_MIN_LEVEL: u64 = 4;

/// Width of the highlight outline.
pub const HIGHLIGHT_LINE_WIDTH: f32 = 4.0;
