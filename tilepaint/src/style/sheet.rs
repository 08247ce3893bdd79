//! Declarative style sheets loaded from JSON.
//!
//! # Format
//!
//! ```json
//! {
//!   "paint": [
//!     {"data_layer": "water", "symbolizer": {"type": "fill", "fill": "#a0c8f0"}},
//!     {"data_layer": "roads", "min_zoom": 6, "filter": {"kind": "major"},
//!      "symbolizer": {"type": "line", "color": "#ffffff", "width": 2}}
//!   ],
//!   "labels": [
//!     {"data_layer": "places", "symbolizer": {"type": "text", "property": "name",
//!      "fill": "#333333", "halo": "#ffffffcc"}}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use ab_glyph::FontArc;
use serde::Deserialize;
use thiserror::Error;
use tiny_skia::{Color, LineCap};

use super::rule::{LabelRule, PaintRule, Rule};
use super::symbolizer::{
    CircleSymbolizer, FillSymbolizer, LabelSymbolizer, LineSymbolizer, PaintSymbolizer,
    TextSymbolizer,
};

/// Errors raised while loading a style sheet.
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("Failed to read style: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid style JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid color '{0}'")]
    Color(String),

    /// A text rule needs a font but none was supplied.
    #[error("Text rule for layer '{0}' requires a font")]
    MissingFont(String),
}

/// A JSON style sheet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleSheet {
    #[serde(default)]
    pub paint: Vec<RuleDef<PaintDef>>,
    #[serde(default)]
    pub labels: Vec<RuleDef<LabelDef>>,
}

/// One rule entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef<S> {
    pub data_layer: String,
    #[serde(default)]
    pub min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// Property values that must all match.
    #[serde(default)]
    pub filter: BTreeMap<String, serde_json::Value>,
    pub symbolizer: S,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaintDef {
    Fill {
        fill: String,
        #[serde(default = "one")]
        opacity: f32,
        stroke: Option<String>,
        #[serde(default = "one")]
        width: f32,
    },
    Line {
        color: String,
        #[serde(default = "one")]
        width: f32,
        #[serde(default = "one")]
        opacity: f32,
        #[serde(default)]
        round: bool,
    },
    Circle {
        radius: f32,
        fill: String,
        stroke: Option<String>,
        #[serde(default = "one")]
        width: f32,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LabelDef {
    Text {
        property: String,
        #[serde(default = "default_text_size")]
        size: f32,
        fill: String,
        halo: Option<String>,
        #[serde(default = "default_halo_width")]
        halo_width: f32,
    },
    Marker {
        radius: f32,
        fill: String,
        stroke: Option<String>,
        #[serde(default = "one")]
        width: f32,
    },
}

fn default_max_zoom() -> u8 {
    u8::MAX
}

fn one() -> f32 {
    1.0
}

fn default_text_size() -> f32 {
    12.0
}

fn default_halo_width() -> f32 {
    2.0
}

impl StyleSheet {
    pub fn from_json_str(json: &str) -> Result<Self, StyleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Builds the paint rules in declared order.
    pub fn paint_rules(&self) -> Result<Vec<PaintRule>, StyleError> {
        self.paint
            .iter()
            .map(|def| {
                let symbolizer = match &def.symbolizer {
                    PaintDef::Fill {
                        fill,
                        opacity,
                        stroke,
                        width,
                    } => {
                        let mut s = FillSymbolizer::new(parse_color(fill)?).with_opacity(*opacity);
                        if let Some(stroke) = stroke {
                            s = s.with_stroke(parse_color(stroke)?, *width);
                        }
                        PaintSymbolizer::Fill(s)
                    }
                    PaintDef::Line {
                        color,
                        width,
                        opacity,
                        round,
                    } => {
                        let mut s = LineSymbolizer::new(parse_color(color)?, *width)
                            .with_opacity(*opacity);
                        if *round {
                            s = s.with_cap(LineCap::Round);
                        }
                        PaintSymbolizer::Line(s)
                    }
                    PaintDef::Circle {
                        radius,
                        fill,
                        stroke,
                        width,
                    } => PaintSymbolizer::Circle(circle(*radius, fill, stroke.as_deref(), *width)?),
                };
                Ok(apply_def(def, symbolizer))
            })
            .collect()
    }

    /// Builds the label rules in declared order.
    ///
    /// Text rules use `font`; a sheet with text rules and no font fails.
    pub fn label_rules(&self, font: Option<&FontArc>) -> Result<Vec<LabelRule>, StyleError> {
        self.labels
            .iter()
            .map(|def| {
                let symbolizer = match &def.symbolizer {
                    LabelDef::Text {
                        property,
                        size,
                        fill,
                        halo,
                        halo_width,
                    } => {
                        let font = font
                            .cloned()
                            .ok_or_else(|| StyleError::MissingFont(def.data_layer.clone()))?;
                        let mut s =
                            TextSymbolizer::new(font, property.clone(), *size, parse_color(fill)?);
                        if let Some(halo) = halo {
                            s = s.with_halo(parse_color(halo)?, *halo_width);
                        }
                        LabelSymbolizer::Text(s)
                    }
                    LabelDef::Marker {
                        radius,
                        fill,
                        stroke,
                        width,
                    } => LabelSymbolizer::Marker(circle(*radius, fill, stroke.as_deref(), *width)?),
                };
                Ok(apply_def(def, symbolizer))
            })
            .collect()
    }

    /// Names of all data layers referenced by any rule.
    pub fn data_layers(&self) -> Vec<&str> {
        let mut layers: Vec<&str> = self
            .paint
            .iter()
            .map(|r| r.data_layer.as_str())
            .chain(self.labels.iter().map(|r| r.data_layer.as_str()))
            .collect();
        layers.sort_unstable();
        layers.dedup();
        layers
    }
}

fn circle(
    radius: f32,
    fill: &str,
    stroke: Option<&str>,
    width: f32,
) -> Result<CircleSymbolizer, StyleError> {
    let mut s = CircleSymbolizer::new(radius, parse_color(fill)?);
    if let Some(stroke) = stroke {
        s = s.with_stroke(parse_color(stroke)?, width);
    }
    Ok(s)
}

fn apply_def<D, S>(def: &RuleDef<D>, symbolizer: S) -> Rule<S> {
    let mut rule = Rule::<S> {
        data_layer: def.data_layer.clone(),
        min_zoom: def.min_zoom,
        max_zoom: def.max_zoom,
        filter: None,
        symbolizer,
    };
    if !def.filter.is_empty() {
        let wanted = def.filter.clone();
        rule = rule.with_filter(move |_, feature| {
            wanted
                .iter()
                .all(|(key, value)| feature.props.get(key) == Some(value))
        });
    }
    rule
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(s: &str) -> Result<Color, StyleError> {
    let err = || StyleError::Color(s.to_string());
    let hex = s.strip_prefix('#').ok_or_else(err)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(err());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).map_err(|_| err());

    match hex.len() {
        3 => Ok(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        6 => Ok(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Ok(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => Err(err()),
    }
}
