//! Text measurement and glyph rasterization with ab_glyph.

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8, Transform};

use crate::style::TextSymbolizer;
use crate::tile::Point;

/// Size of a laid out line of text in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl TextExtent {
    pub fn height(&self) -> f32 {
        self.ascent - self.descent
    }
}

/// Measures `text` at `size` pixels.
pub fn measure(font: &FontArc, size: f32, text: &str) -> TextExtent {
    let scaled = font.as_scaled(PxScale::from(size));
    TextExtent {
        width: line_width(&scaled, text),
        ascent: scaled.ascent(),
        descent: scaled.descent(),
    }
}

/// Draws `text` centred on `center` (logical units), halo first.
pub fn draw_text(
    pixmap: &mut Pixmap,
    symbolizer: &TextSymbolizer,
    text: &str,
    center: Point,
    transform: Transform,
) {
    let (cx, cy) = map_point(transform, center);
    let scale = PxScale {
        x: symbolizer.size * transform.sx.abs(),
        y: symbolizer.size * transform.sy.abs(),
    };

    if let Some(halo) = symbolizer.halo {
        let r = halo.width * transform.sy.abs();
        for (dx, dy) in [
            (-1.0, -1.0),
            (0.0, -1.0),
            (1.0, -1.0),
            (-1.0, 0.0),
            (1.0, 0.0),
            (-1.0, 1.0),
            (0.0, 1.0),
            (1.0, 1.0),
        ] {
            draw_glyphs(
                pixmap,
                &symbolizer.font,
                scale,
                text,
                (cx + dx * r, cy + dy * r),
                halo.color,
            );
        }
    }
    draw_glyphs(pixmap, &symbolizer.font, scale, text, (cx, cy), symbolizer.fill);
}

fn line_width<F: Font>(scaled: &impl ScaleFont<F>, text: &str) -> f32 {
    let mut width = 0.0;
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

fn map_point(t: Transform, p: Point) -> (f32, f32) {
    let (x, y) = (p.x as f32, p.y as f32);
    (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
}

fn draw_glyphs(
    pixmap: &mut Pixmap,
    font: &FontArc,
    scale: PxScale,
    text: &str,
    center: (f32, f32),
    color: Color,
) {
    let scaled = font.as_scaled(scale);
    let width = line_width(&scaled, text);

    let mut caret = center.0 - width / 2.0;
    let baseline = center.1 + (scaled.ascent() + scaled.descent()) / 2.0;
    let mut previous = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|x, y, coverage| {
            blend(
                pixmap,
                bounds.min.x as i32 + x as i32,
                bounds.min.y as i32 + y as i32,
                color,
                coverage,
            );
        });
    }
}

/// Source-over blend of `color` at `coverage` into one pixel.
fn blend(pixmap: &mut Pixmap, x: i32, y: i32, color: Color, coverage: f32) {
    let (w, h) = (pixmap.width() as i32, pixmap.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let a = color.alpha() * coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }

    let idx = (y * w + x) as usize;
    let pixels = pixmap.pixels_mut();
    let dst = pixels[idx];
    let inv = 1.0 - a;

    let out_a = (a * 255.0 + dst.alpha() as f32 * inv).round().min(255.0);
    let channel = |src: f32, dst: u8| (src * a * 255.0 + dst as f32 * inv).round().min(out_a) as u8;

    if let Some(c) = PremultipliedColorU8::from_rgba(
        channel(color.red(), dst.red()),
        channel(color.green(), dst.green()),
        channel(color.blue(), dst.blue()),
        out_a as u8,
    ) {
        pixels[idx] = c;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_over_transparent() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        blend(&mut pixmap, 1, 1, Color::from_rgba8(255, 0, 0, 255), 1.0);
        let p = pixmap.pixel(1, 1).unwrap();
        assert_eq!((p.red(), p.alpha()), (255, 255));

        blend(&mut pixmap, 0, 0, Color::from_rgba8(0, 0, 255, 255), 0.5);
        let p = pixmap.pixel(0, 0).unwrap();
        assert_eq!(p.alpha(), 128);
        assert!(p.blue() <= p.alpha());
    }

    #[test]
    fn test_blend_out_of_bounds_ignored() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        blend(&mut pixmap, -1, 0, Color::BLACK, 1.0);
        blend(&mut pixmap, 2, 0, Color::BLACK, 1.0);
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_map_point() {
        let t = Transform::from_scale(2.0, 2.0).pre_translate(10.0, 0.0);
        assert_eq!(map_point(t, Point::new(1.0, 3.0)), (22.0, 6.0));
    }
}
