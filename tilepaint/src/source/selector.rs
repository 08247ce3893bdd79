//! Classifies a data descriptor into a concrete tile source.
//!
//! Classification looks only at the descriptor's shape and suffix; nothing
//! is fetched here.
//!
//! | Descriptor                              | Source            |
//! |-----------------------------------------|-------------------|
//! | pre-built [`ConcreteSource`]            | passed through    |
//! | string ending in `.pmtiles`             | [`PmtilesSource`] |
//! | string ending in `.json` / `.geojson`   | [`GeoJsonSource`] |
//! | any other string                        | [`ZxySource`]     |
//! | in-memory [`FeatureCollection`]         | [`GeoJsonSource`] |

use std::sync::Arc;

use tracing::debug;

use super::http::AsyncHttpClient;
use super::{GeoJsonSource, PmtilesSource, TileSource, ZxySource};
use crate::collection::FeatureCollection;

/// Polymorphic input describing where tile data comes from.
#[derive(Debug, Clone)]
pub enum DataDescriptor {
    /// A location classified by its suffix.
    Url(String),
    /// An already loaded document.
    Collection(Arc<FeatureCollection>),
    /// A source that was built elsewhere.
    Source(ConcreteSource),
}

impl From<&str> for DataDescriptor {
    fn from(url: &str) -> Self {
        DataDescriptor::Url(url.to_string())
    }
}

impl From<String> for DataDescriptor {
    fn from(url: String) -> Self {
        DataDescriptor::Url(url)
    }
}

impl From<FeatureCollection> for DataDescriptor {
    fn from(collection: FeatureCollection) -> Self {
        DataDescriptor::Collection(Arc::new(collection))
    }
}

impl From<ConcreteSource> for DataDescriptor {
    fn from(source: ConcreteSource) -> Self {
        DataDescriptor::Source(source)
    }
}

/// One of the three supported source kinds.
///
/// Cloning shares the underlying source.
#[derive(Debug, Clone)]
pub enum ConcreteSource {
    Archive(Arc<PmtilesSource>),
    Endpoint(Arc<ZxySource>),
    GeoJson(Arc<GeoJsonSource>),
}

impl ConcreteSource {
    /// The source as a generic tile source.
    pub fn as_tile_source(&self) -> Arc<dyn TileSource> {
        match self {
            ConcreteSource::Archive(s) => Arc::clone(s) as Arc<dyn TileSource>,
            ConcreteSource::Endpoint(s) => Arc::clone(s) as Arc<dyn TileSource>,
            ConcreteSource::GeoJson(s) => Arc::clone(s) as Arc<dyn TileSource>,
        }
    }

    /// Whether tiles come pre-tiled and go through the display cache.
    pub fn is_pretiled(&self) -> bool {
        !matches!(self, ConcreteSource::GeoJson(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConcreteSource::Archive(_) => "archive",
            ConcreteSource::Endpoint(_) => "endpoint",
            ConcreteSource::GeoJson(_) => "geojson",
        }
    }
}

/// Resolves a descriptor into a concrete source.
///
/// # Arguments
///
/// * `descriptor` - What to load
/// * `client` - Client used by URL-backed sources
pub fn resolve(descriptor: DataDescriptor, client: Arc<dyn AsyncHttpClient>) -> ConcreteSource {
    let source = match descriptor {
        DataDescriptor::Source(source) => source,
        DataDescriptor::Url(url) => {
            let path = strip_query(&url);
            if path.ends_with(".pmtiles") {
                ConcreteSource::Archive(Arc::new(PmtilesSource::new(url, client)))
            } else if path.ends_with(".json") || path.ends_with(".geojson") {
                ConcreteSource::GeoJson(Arc::new(GeoJsonSource::from_url(url, client)))
            } else {
                ConcreteSource::Endpoint(Arc::new(ZxySource::new(url, client)))
            }
        }
        DataDescriptor::Collection(collection) => {
            ConcreteSource::GeoJson(Arc::new(GeoJsonSource::from_collection(collection)))
        }
    };

    debug!(kind = source.kind(), "Selected tile source");
    source
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockAsyncHttpClient;

    fn client() -> Arc<dyn AsyncHttpClient> {
        Arc::new(MockAsyncHttpClient::new(Ok(Vec::new())))
    }

    #[test]
    fn test_archive_suffix() {
        let source = resolve("https://example.com/world.pmtiles".into(), client());
        assert!(matches!(source, ConcreteSource::Archive(_)));
        assert!(source.is_pretiled());
    }

    #[test]
    fn test_geojson_suffixes() {
        for url in ["foo.geojson", "https://example.com/a.json", "a.geojson?v=2"] {
            let source = resolve(url.into(), client());
            assert!(matches!(source, ConcreteSource::GeoJson(_)), "{}", url);
        }
    }

    #[test]
    fn test_other_strings_are_endpoints() {
        let source = resolve("https://x/{z}/{x}/{y}.pbf".into(), client());
        match source {
            ConcreteSource::Endpoint(s) => assert_eq!(s.url(), "https://x/{z}/{x}/{y}.pbf"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_collection_wrapped_without_fetch() {
        let mock = Arc::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let source = resolve(FeatureCollection::empty().into(), mock.clone());
        assert!(matches!(source, ConcreteSource::GeoJson(ref s) if s.url().is_none()));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_prebuilt_source_passes_through() {
        let built = Arc::new(ZxySource::new("https://x/{z}/{x}/{y}.mvt", client()));
        let source = resolve(ConcreteSource::Endpoint(Arc::clone(&built)).into(), client());
        match source {
            ConcreteSource::Endpoint(s) => assert!(Arc::ptr_eq(&s, &built)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
