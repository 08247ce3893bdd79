//! Mapbox Vector Tile decoding.

use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use geo::Geometry;
use mvt_reader::feature::Value as MvtValue;
use mvt_reader::Reader;
use serde_json::Value;

use super::SourceError;
use crate::tile::{GeomType, LayerMap, Properties, RenderFeature};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompresses gzip payloads, passing anything else through.
pub(crate) fn gunzip_if_needed(data: &[u8]) -> Result<Vec<u8>, SourceError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(data.to_vec());
    }

    let mut decoder = GzDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| SourceError::Decode(format!("gzip: {}", e)))?;
    Ok(decoded)
}

/// Decodes an uncompressed MVT payload into render features.
///
/// Coordinates are scaled from each layer's own extent to `tile_size`
/// pixels. Layers without features are omitted; features with empty or
/// unsupported geometry are skipped.
pub fn decode_mvt(data: Vec<u8>, tile_size: u32) -> Result<LayerMap, SourceError> {
    if data.is_empty() {
        return Ok(LayerMap::new());
    }

    let reader =
        Reader::new(data).map_err(|e| SourceError::Decode(format!("vector tile: {}", e)))?;
    let layers = reader
        .get_layer_metadata()
        .map_err(|e| SourceError::Decode(format!("layer metadata: {}", e)))?;

    let mut out = LayerMap::new();

    for layer in layers {
        let features = reader
            .get_features(layer.layer_index)
            .map_err(|e| SourceError::Decode(format!("layer {}: {}", layer.name, e)))?;

        let extent = if layer.extent == 0 { 4096 } else { layer.extent };
        let scale = tile_size as f64 / extent as f64;

        let converted: Vec<RenderFeature> = features
            .into_iter()
            .filter_map(|feature| {
                let props = Arc::new(convert_properties(feature.properties));
                let (geom_type, rings) = geometry_rings(&feature.geometry)?;
                RenderFeature::from_scaled(geom_type, rings, scale, props)
            })
            .collect();

        if !converted.is_empty() {
            out.entry(layer.name).or_default().extend(converted);
        }
    }

    Ok(out)
}

fn convert_properties(
    properties: Option<std::collections::HashMap<String, MvtValue>>,
) -> Properties {
    properties
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, convert_value(value)))
        .collect()
}

#[allow(unreachable_patterns)]
fn convert_value(value: MvtValue) -> Value {
    match value {
        MvtValue::String(s) => Value::String(s),
        MvtValue::Float(f) => Value::from(f as f64),
        MvtValue::Double(d) => Value::from(d),
        MvtValue::Int(i) => Value::from(i),
        MvtValue::UInt(u) => Value::from(u),
        MvtValue::SInt(i) => Value::from(i),
        MvtValue::Bool(b) => Value::Bool(b),
        _ => Value::Null,
    }
}

type Rings = Vec<Vec<(f64, f64)>>;

fn geometry_rings(geometry: &Geometry<f32>) -> Option<(GeomType, Rings)> {
    let line = |ls: &geo::LineString<f32>| -> Vec<(f64, f64)> {
        ls.coords().map(|c| (c.x as f64, c.y as f64)).collect()
    };
    let polygon_rings = |p: &geo::Polygon<f32>| -> Rings {
        std::iter::once(p.exterior())
            .chain(p.interiors())
            .map(line)
            .collect()
    };

    match geometry {
        Geometry::Point(p) => Some((GeomType::Point, vec![vec![(p.x() as f64, p.y() as f64)]])),
        Geometry::MultiPoint(mp) => Some((
            GeomType::Point,
            vec![mp.iter().map(|p| (p.x() as f64, p.y() as f64)).collect()],
        )),
        Geometry::Line(l) => Some((
            GeomType::Line,
            vec![vec![
                (l.start.x as f64, l.start.y as f64),
                (l.end.x as f64, l.end.y as f64),
            ]],
        )),
        Geometry::LineString(ls) => Some((GeomType::Line, vec![line(ls)])),
        Geometry::MultiLineString(mls) => Some((GeomType::Line, mls.iter().map(line).collect())),
        Geometry::Polygon(p) => Some((GeomType::Polygon, polygon_rings(p))),
        Geometry::MultiPolygon(mp) => Some((
            GeomType::Polygon,
            mp.iter().flat_map(polygon_rings).collect(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_gunzip_passthrough() {
        let data = vec![1, 2, 3];
        assert_eq!(gunzip_if_needed(&data).unwrap(), data);
    }

    #[test]
    fn test_gunzip_detects_magic() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello tiles").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(gunzip_if_needed(&compressed).unwrap(), b"hello tiles");
    }

    #[test]
    fn test_empty_payload_is_empty_tile() {
        assert!(decode_mvt(Vec::new(), 256).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_payload_is_decode_error() {
        let result = decode_mvt(vec![0xff, 0xff, 0xff, 0xff], 256);
        assert!(matches!(result, Err(SourceError::Decode(_))));
    }

    #[test]
    fn test_polygon_rings_flattened() {
        let poly = geo::polygon![
            exterior: [(x: 0.0f32, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 3.0, y: 2.0), (x: 3.0, y: 3.0), (x: 2.0, y: 2.0)]],
        ];
        let (geom_type, rings) = geometry_rings(&Geometry::Polygon(poly)).unwrap();
        assert_eq!(geom_type, GeomType::Polygon);
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(convert_value(MvtValue::String("a".into())), Value::from("a"));
        assert_eq!(convert_value(MvtValue::Int(-3)), Value::from(-3));
        assert_eq!(convert_value(MvtValue::Bool(true)), Value::Bool(true));
    }
}
