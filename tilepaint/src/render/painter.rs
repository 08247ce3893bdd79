//! Paints prepared tiles and placed labels onto a surface.

use tiny_skia::{Pixmap, Transform};

use super::draw::draw_feature;
use super::labeler::LabelIndex;
use crate::style::PaintRule;
use crate::tile::{Bbox, Point, PreparedTile};

/// Counters from one paint call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintStats {
    pub features: usize,
    pub culled: usize,
    pub labels: usize,
}

/// Paints `tiles` with `rules`, then the labels intersecting `bbox`.
///
/// # Arguments
///
/// * `pixmap` - Target surface
/// * `base` - Transform from logical tile space to surface pixels
/// * `z` - Display zoom
/// * `tiles` - Prepared tiles; geometry in data tile pixels
/// * `labels` - Placed labels for this zoom, if any
/// * `rules` - Paint rules in drawing order
/// * `bbox` - World pixel area to draw, including the tile buffer
/// * `origin` - World pixel position of the display tile's corner
#[allow(clippy::too_many_arguments)]
pub fn paint(
    pixmap: &mut Pixmap,
    base: Transform,
    z: u8,
    tiles: &[PreparedTile],
    labels: Option<&LabelIndex>,
    rules: &[PaintRule],
    bbox: Bbox,
    origin: Point,
) -> PaintStats {
    let mut stats = PaintStats::default();

    for tile in tiles {
        let po = tile.origin;
        let ps = tile.scale;
        let transform = base.pre_translate((po.x - origin.x) as f32, (po.y - origin.y) as f32);

        for rule in rules {
            if !rule.applies_at_zoom(z) {
                continue;
            }
            let Some(features) = tile.data.get(&rule.data_layer) else {
                continue;
            };

            for feature in features {
                let fbox = Bbox::new(
                    feature.bbox.min_x * ps + po.x,
                    feature.bbox.min_y * ps + po.y,
                    feature.bbox.max_x * ps + po.x,
                    feature.bbox.max_y * ps + po.y,
                );
                if !fbox.intersects(&bbox) {
                    stats.culled += 1;
                    continue;
                }
                if !rule.accepts(z, feature) {
                    continue;
                }

                if ps == 1.0 {
                    draw_feature(pixmap, &rule.symbolizer, feature.geom_type, &feature.geom, transform);
                } else {
                    let geom = feature.scaled_geom(ps);
                    draw_feature(pixmap, &rule.symbolizer, feature.geom_type, &geom, transform);
                }
                stats.features += 1;
            }
        }
    }

    if let Some(index) = labels {
        for label in index.search(&bbox) {
            let transform = base.pre_translate(
                (label.anchor.x - origin.x) as f32,
                (label.anchor.y - origin.y) as f32,
            );
            label.draw(pixmap, transform);
            stats.labels += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::style::{FillSymbolizer, Rule};
    use crate::tile::{GeomType, LayerMap, Properties, RenderFeature};
    use std::sync::Arc;
    use tiny_skia::Color;

    fn square_tile(min: f64, max: f64, scale: f64, origin: Point) -> PreparedTile {
        let feature = RenderFeature::from_scaled(
            GeomType::Polygon,
            vec![vec![(min, min), (max, min), (max, max), (min, max), (min, min)]],
            1.0,
            Arc::new(Properties::new()),
        )
        .unwrap();
        let mut layers = LayerMap::new();
        layers.insert("land".to_string(), vec![feature]);
        PreparedTile {
            data: Arc::new(layers),
            z: 0,
            data_tile: TileCoord::new(0, 0, 0),
            scale,
            origin,
            dim: 256.0,
        }
    }

    fn rules() -> Vec<PaintRule> {
        vec![Rule::new("land", FillSymbolizer::new(Color::BLACK))]
    }

    fn alpha(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn test_paints_with_tile_offset() {
        let mut pixmap = Pixmap::new(256, 256).unwrap();
        // Display tile 1/1/0 has origin (256, 0); data tile 0/0/0 spans 512.
        let tile = square_tile(300.0, 400.0, 1.0, Point::new(0.0, 0.0));
        let origin = Point::new(256.0, 0.0);
        let bbox = Bbox::new(256.0, 0.0, 512.0, 256.0).expand(64.0);

        let stats = paint(&mut pixmap, Transform::identity(), 1, &[tile], None, &rules(), bbox, origin);
        assert_eq!(stats.features, 1);
        assert_eq!(alpha(&pixmap, 100, 100), 255);
        assert_eq!(alpha(&pixmap, 10, 10), 0);
    }

    #[test]
    fn test_culls_outside_buffered_bbox() {
        let mut pixmap = Pixmap::new(256, 256).unwrap();
        let tile = square_tile(0.0, 10.0, 1.0, Point::new(0.0, 0.0));
        let bbox = Bbox::new(512.0, 512.0, 768.0, 768.0).expand(64.0);
        let stats = paint(
            &mut pixmap,
            Transform::identity(),
            2,
            &[tile],
            None,
            &rules(),
            bbox,
            Point::new(512.0, 512.0),
        );
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.features, 0);
    }

    #[test]
    fn test_scaled_tile_geometry() {
        let mut pixmap = Pixmap::new(256, 256).unwrap();
        // Data at quarter scale: 0..400 maps to 0..100.
        let tile = square_tile(0.0, 400.0, 0.25, Point::new(0.0, 0.0));
        let bbox = Bbox::new(0.0, 0.0, 256.0, 256.0).expand(64.0);
        paint(&mut pixmap, Transform::identity(), 0, &[tile], None, &rules(), bbox, Point::new(0.0, 0.0));
        assert_eq!(alpha(&pixmap, 50, 50), 255);
        assert_eq!(alpha(&pixmap, 150, 150), 0);
    }
}
