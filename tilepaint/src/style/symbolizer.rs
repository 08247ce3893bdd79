//! Symbolizers: how a matched feature is drawn.

use std::fmt;

use ab_glyph::FontArc;
use tiny_skia::{Color, LineCap, LineJoin};

/// Fills polygons, optionally outlining them.
#[derive(Debug, Clone, PartialEq)]
pub struct FillSymbolizer {
    pub fill: Color,
    pub opacity: f32,
    pub stroke: Option<Color>,
    pub width: f32,
}

impl FillSymbolizer {
    pub fn new(fill: Color) -> Self {
        Self {
            fill,
            opacity: 1.0,
            stroke: None,
            width: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_stroke(mut self, stroke: Color, width: f32) -> Self {
        self.stroke = Some(stroke);
        self.width = width;
        self
    }
}

/// Strokes lines and polygon outlines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSymbolizer {
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl LineSymbolizer {
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            opacity: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }
}

/// Draws a circle at every point.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleSymbolizer {
    pub radius: f32,
    pub fill: Color,
    pub stroke: Option<Color>,
    pub width: f32,
}

impl CircleSymbolizer {
    pub fn new(radius: f32, fill: Color) -> Self {
        Self {
            radius,
            fill,
            stroke: None,
            width: 1.0,
        }
    }

    pub fn with_stroke(mut self, stroke: Color, width: f32) -> Self {
        self.stroke = Some(stroke);
        self.width = width;
        self
    }
}

/// Symbolizer of a paint rule.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintSymbolizer {
    Fill(FillSymbolizer),
    Line(LineSymbolizer),
    Circle(CircleSymbolizer),
}

impl From<FillSymbolizer> for PaintSymbolizer {
    fn from(s: FillSymbolizer) -> Self {
        PaintSymbolizer::Fill(s)
    }
}

impl From<LineSymbolizer> for PaintSymbolizer {
    fn from(s: LineSymbolizer) -> Self {
        PaintSymbolizer::Line(s)
    }
}

impl From<CircleSymbolizer> for PaintSymbolizer {
    fn from(s: CircleSymbolizer) -> Self {
        PaintSymbolizer::Circle(s)
    }
}

/// Outline drawn behind text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halo {
    pub color: Color,
    pub width: f32,
}

/// Draws the value of a feature property as text.
#[derive(Clone)]
pub struct TextSymbolizer {
    pub font: FontArc,
    pub property: String,
    pub size: f32,
    pub fill: Color,
    pub halo: Option<Halo>,
}

impl TextSymbolizer {
    pub fn new(font: FontArc, property: impl Into<String>, size: f32, fill: Color) -> Self {
        Self {
            font,
            property: property.into(),
            size,
            fill,
            halo: None,
        }
    }

    pub fn with_halo(mut self, color: Color, width: f32) -> Self {
        self.halo = Some(Halo { color, width });
        self
    }
}

impl fmt::Debug for TextSymbolizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSymbolizer")
            .field("property", &self.property)
            .field("size", &self.size)
            .field("fill", &self.fill)
            .field("halo", &self.halo)
            .finish_non_exhaustive()
    }
}

/// Symbolizer of a label rule.
#[derive(Debug, Clone)]
pub enum LabelSymbolizer {
    Text(TextSymbolizer),
    Marker(CircleSymbolizer),
}

impl From<TextSymbolizer> for LabelSymbolizer {
    fn from(s: TextSymbolizer) -> Self {
        LabelSymbolizer::Text(s)
    }
}

impl From<CircleSymbolizer> for LabelSymbolizer {
    fn from(s: CircleSymbolizer) -> Self {
        LabelSymbolizer::Marker(s)
    }
}

/// Returns `color` with its alpha multiplied by `opacity`.
pub fn with_opacity(color: Color, opacity: f32) -> Color {
    let mut c = color;
    c.set_alpha((color.alpha() * opacity).clamp(0.0, 1.0));
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let fill = FillSymbolizer::new(Color::WHITE)
            .with_opacity(0.5)
            .with_stroke(Color::BLACK, 2.0);
        assert_eq!(fill.stroke, Some(Color::BLACK));
        assert_eq!(fill.width, 2.0);

        let line = LineSymbolizer::new(Color::BLACK, 3.0).with_cap(LineCap::Round);
        assert_eq!(line.cap, LineCap::Round);
        assert!(matches!(PaintSymbolizer::from(line), PaintSymbolizer::Line(_)));
    }

    #[test]
    fn test_with_opacity() {
        let c = with_opacity(Color::from_rgba8(255, 0, 0, 255), 0.25);
        assert!((c.alpha() - 0.25).abs() < 1e-6);
        assert_eq!(c.red(), 1.0);
    }
}
