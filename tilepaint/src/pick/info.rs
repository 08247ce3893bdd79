//! Feature information surfaced to the host.

use geo::Geometry;
use serde_json::{json, Value};

use crate::coord::LonLat;
use crate::tile::Properties;

/// One picked feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    pub properties: Properties,
    pub layer_name: Option<String>,
    pub position: Option<LonLat>,
    pub name: Option<String>,
    /// HTML table of the properties.
    pub description: Option<String>,
    /// Source geometry, for GeoJSON picks.
    pub geometry: Option<Geometry<f64>>,
}

impl FeatureInfo {
    /// Creates feature info, deriving the name and description from
    /// `properties`.
    pub fn new(properties: Properties, layer_name: Option<String>) -> Self {
        let name = name_from_properties(&properties);
        let description = Some(description_from_properties(&properties));
        Self {
            properties,
            layer_name,
            position: None,
            name,
            description,
            geometry: None,
        }
    }

    pub fn with_position(mut self, position: LonLat) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry<f64>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// JSON form for display and export. Geometry is written as GeoJSON.
    pub fn to_json(&self) -> Value {
        let geometry = self
            .geometry
            .as_ref()
            .map(|g| {
                serde_json::to_value(geojson::Geometry::new(geojson::Value::from(g)))
                    .unwrap_or(Value::Null)
            })
            .unwrap_or(Value::Null);
        json!({
            "layer": self.layer_name,
            "name": self.name,
            "position": self.position.map(|p| json!([p.lon, p.lat])),
            "properties": self.properties,
            "geometry": geometry,
        })
    }
}

/// Picks the property that best serves as a display name.
///
/// Precedence: a key equal to `name`, then `title`, then a key containing
/// `name`, then one containing `title`; all case-insensitive. Empty and
/// null values are skipped.
pub fn name_from_properties(properties: &Properties) -> Option<String> {
    let mut best: Option<(u8, &Value)> = None;
    for (key, value) in properties {
        if is_empty(value) {
            continue;
        }
        let lower = key.to_lowercase();
        let rank = if lower == "name" {
            1
        } else if lower == "title" {
            2
        } else if lower.contains("name") {
            3
        } else if lower.contains("title") {
            4
        } else {
            continue;
        };
        if best.map_or(true, |(r, _)| rank < r) {
            best = Some((rank, value));
        }
    }
    best.map(|(_, value)| display_value(value))
}

/// Renders properties as an HTML table; nested objects become nested tables.
pub fn description_from_properties(properties: &Properties) -> String {
    let mut html = String::from("<table class=\"cesium-infoBox-defaultTable\">");
    for (key, value) in properties {
        if value.is_null() {
            continue;
        }
        html.push_str("<tr><th>");
        html.push_str(&escape(key));
        html.push_str("</th><td>");
        match value {
            Value::Object(nested) => html.push_str(&description_from_properties(nested)),
            other => html.push_str(&escape(&display_value(other))),
        }
        html.push_str("</td></tr>");
    }
    html.push_str("</table>");
    html
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        _ => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
