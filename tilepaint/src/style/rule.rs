//! Ordered paint and label rules.

use std::fmt;
use std::sync::Arc;

use super::symbolizer::{LabelSymbolizer, PaintSymbolizer};
use crate::tile::RenderFeature;

/// Per-feature predicate receiving the display zoom and the feature.
pub type FeatureFilter = Arc<dyn Fn(u8, &RenderFeature) -> bool + Send + Sync>;

/// A style rule targeting one data layer.
///
/// Rule order matters: paint rules later in a list draw over earlier ones,
/// and label rules earlier in a list win label collisions.
#[derive(Clone)]
pub struct Rule<S> {
    pub data_layer: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub filter: Option<FeatureFilter>,
    pub symbolizer: S,
}

pub type PaintRule = Rule<PaintSymbolizer>;
pub type LabelRule = Rule<LabelSymbolizer>;

impl<S> Rule<S> {
    /// Creates a rule applying at every zoom to every feature of `data_layer`.
    pub fn new(data_layer: impl Into<String>, symbolizer: impl Into<S>) -> Self {
        Self {
            data_layer: data_layer.into(),
            min_zoom: 0,
            max_zoom: u8::MAX,
            filter: None,
            symbolizer: symbolizer.into(),
        }
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(u8, &RenderFeature) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    #[inline]
    pub fn applies_at_zoom(&self, z: u8) -> bool {
        z >= self.min_zoom && z <= self.max_zoom
    }

    #[inline]
    pub fn accepts(&self, z: u8, feature: &RenderFeature) -> bool {
        self.filter.as_ref().map_or(true, |f| f(z, feature))
    }
}

impl<S: fmt::Debug> fmt::Debug for Rule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("data_layer", &self.data_layer)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .field("symbolizer", &self.symbolizer)
            .finish()
    }
}
