//! GeoJSON feature collections.
//!
//! Any GeoJSON document (a FeatureCollection, a single Feature or a bare
//! Geometry) is normalized into a [`FeatureCollection`] of
//! [`SourceFeature`]s holding `geo` geometries. Each feature is given a
//! stable id property and a lazily computed bounding box used by picking.

use std::sync::{Arc, OnceLock};

use geo::{BoundingRect, Coord, Geometry, Rect};
use geojson::GeoJson;
use tracing::debug;

use crate::source::SourceError;
use crate::tile::Properties;

/// Property holding the stable feature id assigned to GeoJSON features.
pub const FEATURE_ID_PROP: &str = "_id_";

/// A feature from a GeoJSON source, in geographic coordinates (degrees).
#[derive(Debug)]
pub struct SourceFeature {
    geometry: Option<Geometry<f64>>,
    properties: Arc<Properties>,
    bbox: OnceLock<Option<Rect<f64>>>,
}

impl SourceFeature {
    /// Creates a feature. The bounding box is computed on first use.
    pub fn new(geometry: Option<Geometry<f64>>, properties: Properties) -> Self {
        Self {
            geometry,
            properties: Arc::new(properties),
            bbox: OnceLock::new(),
        }
    }

    /// Creates a feature with a precomputed bounding box.
    pub fn with_bbox(
        geometry: Option<Geometry<f64>>,
        properties: Properties,
        bbox: Option<Rect<f64>>,
    ) -> Self {
        let feature = Self::new(geometry, properties);
        let _ = feature.bbox.set(bbox);
        feature
    }

    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    /// Bounding box of the geometry, computed once and cached.
    pub fn bbox(&self) -> Option<Rect<f64>> {
        *self
            .bbox
            .get_or_init(|| self.geometry.as_ref().and_then(|g| g.bounding_rect()))
    }
}

/// An ordered, immutable collection of features.
#[derive(Debug, Default)]
pub struct FeatureCollection {
    features: Vec<SourceFeature>,
    bbox: Option<Rect<f64>>,
}

impl FeatureCollection {
    pub fn new(features: Vec<SourceFeature>) -> Self {
        Self {
            features,
            bbox: None,
        }
    }

    /// An empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &[SourceFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Precomputed bounding box of the whole collection, if the document had one.
    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    /// Normalizes a parsed GeoJSON document into a feature collection.
    ///
    /// Features whose geometry cannot be represented are kept with no
    /// geometry; they are never tiled or picked. Every feature receives a
    /// [`FEATURE_ID_PROP`] property (its index) unless it already has one.
    pub fn from_geojson(geojson: GeoJson) -> Self {
        let (features, bbox) = match geojson {
            GeoJson::FeatureCollection(fc) => (fc.features, fc.bbox),
            GeoJson::Feature(feature) => (vec![feature], None),
            GeoJson::Geometry(geometry) => (
                vec![geojson::Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: None,
                    properties: None,
                    foreign_members: None,
                }],
                None,
            ),
        };

        let features = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| convert_feature(index, feature))
            .collect();

        Self {
            features,
            bbox: bbox.as_deref().and_then(rect_from_bbox),
        }
    }

    /// Parses JSON bytes into a feature collection.
    ///
    /// Invalid JSON is an error. Valid JSON that is not GeoJSON yields an
    /// empty collection.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SourceError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| SourceError::Parse(e.to_string()))?;

        match GeoJson::from_json_value(value) {
            Ok(geojson) => Ok(Self::from_geojson(geojson)),
            Err(e) => {
                debug!(error = %e, "Document is not GeoJSON, using empty collection");
                Ok(Self::empty())
            }
        }
    }
}

impl From<GeoJson> for FeatureCollection {
    fn from(geojson: GeoJson) -> Self {
        Self::from_geojson(geojson)
    }
}

impl From<geojson::FeatureCollection> for FeatureCollection {
    fn from(collection: geojson::FeatureCollection) -> Self {
        Self::from_geojson(GeoJson::FeatureCollection(collection))
    }
}

fn convert_feature(index: usize, feature: geojson::Feature) -> SourceFeature {
    let mut properties = feature.properties.unwrap_or_default();
    properties
        .entry(FEATURE_ID_PROP.to_string())
        .or_insert_with(|| serde_json::Value::from(index));

    let geometry = feature
        .geometry
        .and_then(|g| match Geometry::<f64>::try_from(g.value) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                debug!(index, error = %e, "Dropping unsupported feature geometry");
                None
            }
        });

    match feature.bbox.as_deref().and_then(rect_from_bbox) {
        Some(bbox) => SourceFeature::with_bbox(geometry, properties, Some(bbox)),
        None => SourceFeature::new(geometry, properties),
    }
}

fn rect_from_bbox(bbox: &[f64]) -> Option<Rect<f64>> {
    match bbox {
        [min_x, min_y, max_x, max_y] => Some(Rect::new(
            Coord { x: *min_x, y: *min_y },
            Coord { x: *max_x, y: *max_y },
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_collection_normalized() {
        let json = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "a"}, "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                {"type": "Feature", "properties": {"_id_": 99}, "geometry": {"type": "LineString", "coordinates": [[0, 0], [3, 4]]}}
            ]
        }"#;

        let collection = FeatureCollection::from_json_slice(json).unwrap();
        assert_eq!(collection.len(), 2);

        let first = &collection.features()[0];
        assert_eq!(first.properties()[FEATURE_ID_PROP], serde_json::json!(0));
        assert_eq!(first.properties()["name"], serde_json::json!("a"));

        let second = &collection.features()[1];
        assert_eq!(second.properties()[FEATURE_ID_PROP], serde_json::json!(99));
        let bbox = second.bbox().unwrap();
        assert_eq!(bbox.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(bbox.max(), Coord { x: 3.0, y: 4.0 });
    }

    #[test]
    fn test_single_geometry_wrapped() {
        let json = br#"{"type": "Point", "coordinates": [5.0, 6.0]}"#;
        let collection = FeatureCollection::from_json_slice(json).unwrap();
        assert_eq!(collection.len(), 1);
        assert!(collection.features()[0].geometry().is_some());
    }

    #[test]
    fn test_non_geojson_is_empty() {
        let collection = FeatureCollection::from_json_slice(br#"{"hello": "world"}"#).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let result = FeatureCollection::from_json_slice(b"{not json");
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_precomputed_bbox_used() {
        let json = br#"{"type": "Feature", "bbox": [-1, -1, 1, 1], "properties": null,
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}"#;
        let collection = FeatureCollection::from_json_slice(json).unwrap();
        let bbox = collection.features()[0].bbox().unwrap();
        assert_eq!(bbox.min(), Coord { x: -1.0, y: -1.0 });
    }
}
