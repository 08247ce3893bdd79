//! Style rules and symbolizers.
//!
//! A provider holds two ordered lists: paint rules, drawn in order onto the
//! tile, and label rules, placed once per zoom level by the labeler. Rules
//! can be built in code or loaded from a JSON [`StyleSheet`].

mod rule;
mod sheet;
mod symbolizer;

pub use rule::{FeatureFilter, LabelRule, PaintRule, Rule};
pub use sheet::{parse_color, LabelDef, PaintDef, RuleDef, StyleError, StyleSheet};
pub use symbolizer::{
    with_opacity, CircleSymbolizer, FillSymbolizer, Halo, LabelSymbolizer, LineSymbolizer,
    PaintSymbolizer, TextSymbolizer,
};

pub use tiny_skia::Color;
