//! Provider construction options.

use std::fmt;
use std::sync::Arc;

use crate::config::{DEFAULT_ID_PROPERTY, TILE_SIZE};
use crate::coord::{GeoRect, MAX_ZOOM};
use crate::pick::FeatureInfo;
use crate::source::BoxFuture;
use crate::style::{LabelRule, PaintRule};

/// Hook applied to picked features before they are returned.
pub type PickPostProcessor =
    Arc<dyn Fn(Vec<FeatureInfo>) -> BoxFuture<'static, Vec<FeatureInfo>> + Send + Sync>;

/// Options for [`super::ImageryProvider`].
///
/// # Example
///
/// ```ignore
/// let options = ProviderOptions::default()
///     .with_zoom_range(0, 18)
///     .with_paint_rules(rules)
///     .with_id_property("id");
/// ```
#[derive(Clone)]
pub struct ProviderOptions {
    pub minimum_level: u8,
    pub maximum_level: u8,
    /// Deepest level the source holds; deeper levels are overzoomed.
    /// Defaults to `maximum_level`.
    pub maximum_native_zoom: Option<u8>,
    pub rectangle: GeoRect,
    pub id_property: String,
    pub tile_size: u32,
    pub paint_rules: Vec<PaintRule>,
    pub label_rules: Vec<LabelRule>,
    pub credit: Option<String>,
    pub post_process: Option<PickPostProcessor>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            minimum_level: 0,
            maximum_level: MAX_ZOOM,
            maximum_native_zoom: None,
            rectangle: GeoRect::WORLD,
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            tile_size: TILE_SIZE,
            paint_rules: Vec::new(),
            label_rules: Vec::new(),
            credit: None,
            post_process: None,
        }
    }
}

impl ProviderOptions {
    pub fn with_zoom_range(mut self, minimum_level: u8, maximum_level: u8) -> Self {
        self.minimum_level = minimum_level;
        self.maximum_level = maximum_level;
        self
    }

    pub fn with_maximum_native_zoom(mut self, zoom: u8) -> Self {
        self.maximum_native_zoom = Some(zoom);
        self
    }

    pub fn with_rectangle(mut self, rectangle: GeoRect) -> Self {
        self.rectangle = rectangle;
        self
    }

    pub fn with_id_property(mut self, id_property: impl Into<String>) -> Self {
        self.id_property = id_property.into();
        self
    }

    /// Sets the requested raster size in pixels.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_paint_rules(mut self, rules: Vec<PaintRule>) -> Self {
        self.paint_rules = rules;
        self
    }

    pub fn with_label_rules(mut self, rules: Vec<LabelRule>) -> Self {
        self.label_rules = rules;
        self
    }

    pub fn with_credit(mut self, credit: impl Into<String>) -> Self {
        self.credit = Some(credit.into());
        self
    }

    /// Sets an async hook run on every pick result.
    pub fn with_post_process<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<FeatureInfo>) -> BoxFuture<'static, Vec<FeatureInfo>> + Send + Sync + 'static,
    {
        self.post_process = Some(Arc::new(hook));
        self
    }

    /// Effective deepest native zoom.
    pub fn native_zoom(&self) -> u8 {
        self.maximum_native_zoom.unwrap_or(self.maximum_level)
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("minimum_level", &self.minimum_level)
            .field("maximum_level", &self.maximum_level)
            .field("maximum_native_zoom", &self.maximum_native_zoom)
            .field("rectangle", &self.rectangle)
            .field("id_property", &self.id_property)
            .field("tile_size", &self.tile_size)
            .field("paint_rules", &self.paint_rules.len())
            .field("label_rules", &self.label_rules.len())
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}

/// Overrides for [`super::ImageryProvider::clone_with`]. Unset fields keep
/// the original provider's values.
#[derive(Default, Clone)]
pub struct CloneOverrides {
    pub paint_rules: Option<Vec<PaintRule>>,
    pub label_rules: Option<Vec<LabelRule>>,
    pub minimum_level: Option<u8>,
    pub maximum_level: Option<u8>,
    pub maximum_native_zoom: Option<u8>,
    pub rectangle: Option<GeoRect>,
    pub id_property: Option<String>,
    pub credit: Option<String>,
}

impl CloneOverrides {
    pub fn with_paint_rules(mut self, rules: Vec<PaintRule>) -> Self {
        self.paint_rules = Some(rules);
        self
    }

    pub fn with_label_rules(mut self, rules: Vec<LabelRule>) -> Self {
        self.label_rules = Some(rules);
        self
    }

    pub fn with_rectangle(mut self, rectangle: GeoRect) -> Self {
        self.rectangle = Some(rectangle);
        self
    }

    pub fn with_zoom_range(mut self, minimum_level: u8, maximum_level: u8) -> Self {
        self.minimum_level = Some(minimum_level);
        self.maximum_level = Some(maximum_level);
        self
    }

    /// Applies the overrides on top of `base`.
    pub fn apply(self, base: &ProviderOptions) -> ProviderOptions {
        let mut options = base.clone();
        if let Some(rules) = self.paint_rules {
            options.paint_rules = rules;
        }
        if let Some(rules) = self.label_rules {
            options.label_rules = rules;
        }
        if let Some(level) = self.minimum_level {
            options.minimum_level = level;
        }
        if let Some(level) = self.maximum_level {
            options.maximum_level = level;
        }
        if let Some(zoom) = self.maximum_native_zoom {
            options.maximum_native_zoom = Some(zoom);
        }
        if let Some(rectangle) = self.rectangle {
            options.rectangle = rectangle;
        }
        if let Some(id_property) = self.id_property {
            options.id_property = id_property;
        }
        if let Some(credit) = self.credit {
            options.credit = Some(credit);
        }
        options
    }
}
