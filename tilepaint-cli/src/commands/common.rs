//! Common arguments and helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use clap::Args;
use tilepaint::provider::{ImageryProvider, ProviderOptions};
use tilepaint::style::StyleSheet;
use tracing::info;

use crate::error::CliError;

/// Data and style arguments used by every command.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// PMTiles archive, {z}/{x}/{y} endpoint, or GeoJSON file/URL
    #[arg(long)]
    pub data: String,

    /// JSON style sheet with paint and label rules
    #[arg(long)]
    pub style: PathBuf,

    /// TrueType/OpenType font for text labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Deepest zoom stored in a pre-tiled source
    #[arg(long)]
    pub max_native_zoom: Option<u8>,

    /// Property holding feature ids in pre-tiled sources
    #[arg(long)]
    pub id_property: Option<String>,
}

/// Load a font file.
pub fn load_font(path: &Path) -> Result<FontArc, CliError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CliError::Font(format!("{}: {}", path.display(), e)))?;
    FontArc::try_from_vec(bytes).map_err(|e| CliError::Font(format!("{}: {}", path.display(), e)))
}

/// Build a provider from the shared arguments.
///
/// The zoom range is opened fully so that any requested tile renders.
pub fn build_provider(args: &SourceArgs, tile_size: u32) -> Result<ImageryProvider, CliError> {
    let sheet = StyleSheet::load(&args.style)?;
    let font = args.font.as_deref().map(load_font).transpose()?;

    let paint_rules = sheet.paint_rules()?;
    let label_rules = sheet.label_rules(font.as_ref())?;
    info!(
        style = %args.style.display(),
        paint_rules = paint_rules.len(),
        label_rules = label_rules.len(),
        layers = ?sheet.data_layers(),
        "Loaded style sheet"
    );

    let mut options = ProviderOptions::default()
        .with_tile_size(tile_size)
        .with_paint_rules(paint_rules)
        .with_label_rules(label_rules);
    if let Some(zoom) = args.max_native_zoom {
        options = options.with_maximum_native_zoom(zoom);
    }
    if let Some(id) = &args.id_property {
        options = options.with_id_property(id.clone());
    }

    Ok(ImageryProvider::new(args.data.as_str(), options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(style: PathBuf) -> SourceArgs {
        SourceArgs {
            data: "parks.geojson".to_string(),
            style,
            font: None,
            max_native_zoom: Some(12),
            id_property: Some("id".to_string()),
        }
    }

    #[test]
    fn test_build_provider_from_style_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"paint": [{{"data_layer": "layer", "symbolizer": {{"type": "fill", "fill": "#336699"}}}}]}}"##
        )
        .unwrap();

        let provider = build_provider(&args(file.path().to_path_buf()), 512).unwrap();
        assert_eq!(provider.tile_size(), 512);
        assert_eq!(provider.options().paint_rules.len(), 1);
        assert_eq!(provider.options().id_property, "id");
        assert_eq!(provider.source().kind(), "geojson");
    }

    #[test]
    fn test_missing_style_is_error() {
        let result = build_provider(&args(PathBuf::from("/nonexistent/style.json")), 256);
        assert!(matches!(result, Err(CliError::Style(_))));
    }

    #[test]
    fn test_bad_font_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a font").unwrap();
        assert!(matches!(load_font(file.path()), Err(CliError::Font(_))));
    }
}
