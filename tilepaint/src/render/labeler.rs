//! Label placement shared across tiles of one zoom level.
//!
//! Labels are placed once per data tile and zoom, in world pixel space, and
//! reused by every display tile that overlaps them. Placement is
//! collision-checked against an R-tree of already placed label boxes; the
//! first label to claim a spot keeps it, so rule order (and then tile
//! arrival order) decides conflicts.
//!
//! # Concurrency
//!
//! Each zoom level has its own index behind a mutex. Callers hold the lock
//! across registering a tile and painting from the index so that renders at
//! one zoom see a consistent set of labels; different zoom levels never
//! contend.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rstar::{RTree, RTreeObject, AABB};
use tiny_skia::{Pixmap, Transform};
use tracing::trace;

use super::draw::draw_circle;
use super::text::{draw_text, measure};
use crate::coord::TileCoord;
use crate::style::{CircleSymbolizer, LabelRule, LabelSymbolizer, TextSymbolizer};
use crate::tile::{Bbox, GeomType, Point, PreparedTile, RenderFeature};

/// What to draw for a placed label.
#[derive(Debug, Clone)]
pub enum LabelDraw {
    Text {
        text: String,
        symbolizer: TextSymbolizer,
    },
    Marker(CircleSymbolizer),
}

/// A placed label in world pixels at its zoom level.
#[derive(Debug, Clone)]
pub struct Label {
    pub anchor: Point,
    pub bboxes: Vec<Bbox>,
    pub draw: LabelDraw,
}

impl Label {
    /// Draws the label with `transform` already translated to its anchor.
    pub fn draw(&self, pixmap: &mut Pixmap, transform: Transform) {
        match &self.draw {
            LabelDraw::Text { text, symbolizer } => {
                draw_text(pixmap, symbolizer, text, Point::new(0.0, 0.0), transform)
            }
            LabelDraw::Marker(symbolizer) => {
                draw_circle(pixmap, symbolizer, Point::new(0.0, 0.0), transform)
            }
        }
    }
}

struct IndexedBox {
    envelope: AABB<[f64; 2]>,
    label: usize,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn aabb(b: &Bbox) -> AABB<[f64; 2]> {
    AABB::from_corners([b.min_x, b.min_y], [b.max_x, b.max_y])
}

/// Placed labels of one zoom level.
pub struct LabelIndex {
    z: u8,
    tree: RTree<IndexedBox>,
    labels: Vec<Label>,
    registered: HashSet<TileCoord>,
}

impl LabelIndex {
    pub fn new(z: u8) -> Self {
        Self {
            z,
            tree: RTree::new(),
            labels: Vec::new(),
            registered: HashSet::new(),
        }
    }

    pub fn zoom(&self) -> u8 {
        self.z
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether labels of this data tile have been placed.
    pub fn has_tile(&self, data_tile: TileCoord) -> bool {
        self.registered.contains(&data_tile)
    }

    /// Whether any box collides with a placed label.
    pub fn collides(&self, bboxes: &[Bbox]) -> bool {
        bboxes.iter().any(|b| {
            self.tree
                .locate_in_envelope_intersecting(&aabb(b))
                .next()
                .is_some()
        })
    }

    /// Places a label unless it collides. Returns whether it was placed.
    pub fn insert(&mut self, label: Label) -> bool {
        if label.bboxes.is_empty() || self.collides(&label.bboxes) {
            return false;
        }
        let idx = self.labels.len();
        for b in &label.bboxes {
            self.tree.insert(IndexedBox {
                envelope: aabb(b),
                label: idx,
            });
        }
        self.labels.push(label);
        true
    }

    /// Labels with a box intersecting `bbox`, in placement order.
    pub fn search(&self, bbox: &Bbox) -> Vec<&Label> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&aabb(bbox))
            .map(|b| b.label)
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter().map(|i| &self.labels[i]).collect()
    }

    /// Places labels for a tile's features, once per data tile.
    ///
    /// Returns the number of labels placed.
    pub fn add_tile(&mut self, tile: &PreparedTile, rules: &[LabelRule]) -> usize {
        if !self.registered.insert(tile.data_tile) {
            return 0;
        }

        let mut placed = 0;
        for rule in rules {
            if !rule.applies_at_zoom(self.z) {
                continue;
            }
            let Some(features) = tile.data.get(&rule.data_layer) else {
                continue;
            };
            for feature in features {
                if !rule.accepts(self.z, feature) {
                    continue;
                }
                let Some(label) = place(&rule.symbolizer, feature, tile.scale, tile.origin) else {
                    continue;
                };
                if self.insert(label) {
                    placed += 1;
                }
            }
        }

        trace!(z = self.z, data_tile = %tile.data_tile, placed, "Placed labels");
        placed
    }
}

impl std::fmt::Debug for LabelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelIndex")
            .field("z", &self.z)
            .field("labels", &self.labels.len())
            .field("tiles", &self.registered.len())
            .finish()
    }
}

/// Label anchor in world pixels: the first point of point features, the
/// middle vertex of lines, the bbox centre of polygons.
fn anchor(feature: &RenderFeature, scale: f64, origin: Point) -> Option<Point> {
    let local = match feature.geom_type {
        GeomType::Point => *feature.geom.first()?.first()?,
        GeomType::Line => {
            let line = feature.geom.first()?;
            *line.get(line.len() / 2)?
        }
        GeomType::Polygon => feature.bbox.center(),
    };
    Some(Point::new(
        local.x * scale + origin.x,
        local.y * scale + origin.y,
    ))
}

fn place(
    symbolizer: &LabelSymbolizer,
    feature: &RenderFeature,
    scale: f64,
    origin: Point,
) -> Option<Label> {
    let anchor = anchor(feature, scale, origin)?;
    match symbolizer {
        LabelSymbolizer::Text(s) => {
            let text = match feature.props.get(&s.property)? {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => return None,
                other => other.to_string(),
            };
            if text.is_empty() {
                return None;
            }
            let extent = measure(&s.font, s.size, &text);
            let half_w = extent.width as f64 / 2.0;
            let half_h = extent.height() as f64 / 2.0;
            Some(Label {
                anchor,
                bboxes: vec![Bbox::new(
                    anchor.x - half_w,
                    anchor.y - half_h,
                    anchor.x + half_w,
                    anchor.y + half_h,
                )],
                draw: LabelDraw::Text {
                    text,
                    symbolizer: s.clone(),
                },
            })
        }
        LabelSymbolizer::Marker(s) => {
            let r = (s.radius + s.stroke.map_or(0.0, |_| s.width / 2.0)) as f64;
            Some(Label {
                anchor,
                bboxes: vec![Bbox::new(anchor.x - r, anchor.y - r, anchor.x + r, anchor.y + r)],
                draw: LabelDraw::Marker(s.clone()),
            })
        }
    }
}

/// Label indices of all visited zoom levels.
#[derive(Debug, Default)]
pub struct Labelers {
    by_zoom: DashMap<u8, Arc<Mutex<LabelIndex>>>,
}

impl Labelers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index for zoom `z`, created on first use.
    pub fn index(&self, z: u8) -> Arc<Mutex<LabelIndex>> {
        Arc::clone(
            self.by_zoom
                .entry(z)
                .or_insert_with(|| Arc::new(Mutex::new(LabelIndex::new(z))))
                .value(),
        )
    }

    /// Number of zoom levels with an index.
    pub fn zoom_count(&self) -> usize {
        self.by_zoom.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Rule;
    use crate::tile::{LayerMap, Properties};
    use tiny_skia::Color;

    fn marker_rule(layer: &str, radius: f32) -> LabelRule {
        Rule::new(
            layer,
            LabelSymbolizer::Marker(CircleSymbolizer::new(radius, Color::BLACK)),
        )
    }

    fn point(x: f64, y: f64) -> RenderFeature {
        RenderFeature::from_scaled(
            GeomType::Point,
            vec![vec![(x, y)]],
            1.0,
            Arc::new(Properties::new()),
        )
        .unwrap()
    }

    fn tile(features: Vec<RenderFeature>, data_tile: TileCoord) -> PreparedTile {
        let mut layers = LayerMap::new();
        layers.insert("pois".to_string(), features);
        PreparedTile::for_display_tile(data_tile, layers, 256)
    }

    #[test]
    fn test_collisions_rejected() {
        let mut index = LabelIndex::new(3);
        let t = tile(
            vec![point(10.0, 10.0), point(12.0, 12.0), point(100.0, 100.0)],
            TileCoord::new(3, 0, 0),
        );
        let placed = index.add_tile(&t, &[marker_rule("pois", 4.0)]);
        assert_eq!(placed, 2);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_tile_registered_once() {
        let mut index = LabelIndex::new(3);
        let t = tile(vec![point(10.0, 10.0)], TileCoord::new(3, 1, 1));
        assert_eq!(index.add_tile(&t, &[marker_rule("pois", 2.0)]), 1);
        assert_eq!(index.add_tile(&t, &[marker_rule("pois", 2.0)]), 0);
        assert!(index.has_tile(TileCoord::new(3, 1, 1)));
        // Anchor is in world pixels: origin (256, 256) plus the local point.
        let found = index.search(&Bbox::new(260.0, 260.0, 270.0, 270.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].anchor, Point::new(266.0, 266.0));
    }

    #[test]
    fn test_rule_order_and_zoom() {
        let mut index = LabelIndex::new(3);
        let t = tile(vec![point(10.0, 10.0)], TileCoord::new(3, 0, 0));
        let rules = vec![
            marker_rule("pois", 2.0).with_zoom_range(5, 10),
            marker_rule("other", 2.0),
            marker_rule("pois", 6.0),
            marker_rule("pois", 2.0),
        ];
        assert_eq!(index.add_tile(&t, &rules), 1);
        let found = index.search(&Bbox::new(0.0, 0.0, 50.0, 50.0));
        assert!(matches!(&found[0].draw, LabelDraw::Marker(s) if s.radius == 6.0));
    }

    #[test]
    fn test_labelers_share_index_per_zoom() {
        let labelers = Labelers::new();
        let a = labelers.index(4);
        let b = labelers.index(4);
        assert!(Arc::ptr_eq(&a, &b));
        labelers.index(5);
        assert_eq!(labelers.zoom_count(), 2);
    }
}
