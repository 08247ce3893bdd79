//! Drawing of paint symbolizers with tiny-skia.

use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::style::{
    with_opacity, CircleSymbolizer, FillSymbolizer, LineSymbolizer, PaintSymbolizer,
};
use crate::tile::{GeomType, Point};

/// Draws one feature's geometry with a paint symbolizer.
///
/// `geom` is in the coordinate space `transform` maps to pixels.
pub fn draw_feature(
    pixmap: &mut Pixmap,
    symbolizer: &PaintSymbolizer,
    geom_type: GeomType,
    geom: &[Vec<Point>],
    transform: Transform,
) {
    match symbolizer {
        PaintSymbolizer::Fill(s) if geom_type == GeomType::Polygon => {
            draw_fill(pixmap, s, geom, transform)
        }
        PaintSymbolizer::Fill(_) => {}
        PaintSymbolizer::Line(s) => {
            if geom_type != GeomType::Point {
                draw_line(pixmap, s, geom, geom_type == GeomType::Polygon, transform)
            }
        }
        PaintSymbolizer::Circle(s) => {
            for p in geom.iter().flatten() {
                draw_circle(pixmap, s, *p, transform);
            }
        }
    }
}

fn paint(color: tiny_skia::Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Builds one path from all rings, closing them for polygons.
pub(crate) fn rings_path(geom: &[Vec<Point>], close: bool) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for ring in geom {
        let mut points = ring.iter();
        let Some(first) = points.next() else {
            continue;
        };
        pb.move_to(first.x as f32, first.y as f32);
        for p in points {
            pb.line_to(p.x as f32, p.y as f32);
        }
        if close {
            pb.close();
        }
    }
    pb.finish()
}

fn draw_fill(pixmap: &mut Pixmap, s: &FillSymbolizer, geom: &[Vec<Point>], transform: Transform) {
    let Some(path) = rings_path(geom, true) else {
        return;
    };
    pixmap.fill_path(
        &path,
        &paint(with_opacity(s.fill, s.opacity)),
        FillRule::EvenOdd,
        transform,
        None,
    );
    if let Some(stroke) = s.stroke {
        let style = Stroke {
            width: s.width,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &path,
            &paint(with_opacity(stroke, s.opacity)),
            &style,
            transform,
            None,
        );
    }
}

fn draw_line(
    pixmap: &mut Pixmap,
    s: &LineSymbolizer,
    geom: &[Vec<Point>],
    close: bool,
    transform: Transform,
) {
    let Some(path) = rings_path(geom, close) else {
        return;
    };
    let style = Stroke {
        width: s.width,
        line_cap: s.cap,
        line_join: s.join,
        ..Stroke::default()
    };
    pixmap.stroke_path(
        &path,
        &paint(with_opacity(s.color, s.opacity)),
        &style,
        transform,
        None,
    );
}

/// Draws a circle centred on `center`.
pub(crate) fn draw_circle(
    pixmap: &mut Pixmap,
    s: &CircleSymbolizer,
    center: Point,
    transform: Transform,
) {
    let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, s.radius) else {
        return;
    };
    pixmap.fill_path(&path, &paint(s.fill), FillRule::Winding, transform, None);
    if let Some(stroke) = s.stroke {
        let style = Stroke {
            width: s.width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint(stroke), &style, transform, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    fn square(min: f64, max: f64) -> Vec<Point> {
        vec![
            Point::new(min, min),
            Point::new(max, min),
            Point::new(max, max),
            Point::new(min, max),
        ]
    }

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn test_fill_polygon_with_hole() {
        let mut pixmap = Pixmap::new(32, 32).unwrap();
        let symbolizer = PaintSymbolizer::Fill(FillSymbolizer::new(Color::BLACK));
        let geom = vec![square(2.0, 30.0), square(12.0, 20.0)];
        draw_feature(&mut pixmap, &symbolizer, GeomType::Polygon, &geom, Transform::identity());

        assert_eq!(alpha_at(&pixmap, 5, 5), 255);
        assert_eq!(alpha_at(&pixmap, 16, 16), 0);
        assert_eq!(alpha_at(&pixmap, 31, 31), 0);
    }

    #[test]
    fn test_fill_ignores_lines() {
        let mut pixmap = Pixmap::new(16, 16).unwrap();
        let symbolizer = PaintSymbolizer::Fill(FillSymbolizer::new(Color::BLACK));
        let geom = vec![vec![Point::new(0.0, 0.0), Point::new(16.0, 16.0)]];
        draw_feature(&mut pixmap, &symbolizer, GeomType::Line, &geom, Transform::identity());
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_line_respects_transform() {
        let mut pixmap = Pixmap::new(32, 32).unwrap();
        let symbolizer = PaintSymbolizer::Line(LineSymbolizer::new(Color::BLACK, 2.0));
        let geom = vec![vec![Point::new(0.0, 4.0), Point::new(8.0, 4.0)]];
        draw_feature(
            &mut pixmap,
            &symbolizer,
            GeomType::Line,
            &geom,
            Transform::from_scale(4.0, 4.0),
        );
        assert!(alpha_at(&pixmap, 16, 16) > 0);
        assert_eq!(alpha_at(&pixmap, 16, 4), 0);
    }

    #[test]
    fn test_circle_at_points() {
        let mut pixmap = Pixmap::new(32, 32).unwrap();
        let symbolizer = PaintSymbolizer::Circle(CircleSymbolizer::new(3.0, Color::BLACK));
        let geom = vec![vec![Point::new(8.0, 8.0), Point::new(24.0, 24.0)]];
        draw_feature(&mut pixmap, &symbolizer, GeomType::Point, &geom, Transform::identity());
        assert!(alpha_at(&pixmap, 8, 8) > 0);
        assert!(alpha_at(&pixmap, 24, 24) > 0);
        assert_eq!(alpha_at(&pixmap, 16, 16), 0);
    }
}
