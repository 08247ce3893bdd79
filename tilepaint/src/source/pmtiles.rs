//! PMTiles v3 archive source.
//!
//! Reads tiles from a single-file archive through range requests. The
//! header and root directory are fetched once; leaf directories are kept in
//! a small LRU cache.
//!
//! # Layout
//!
//! ```text
//! ┌────────────┬───────────────┬──────────┬─────────────┬───────────┐
//! │ header     │ root          │ metadata │ leaf        │ tile      │
//! │ (127 bytes)│ directory     │ (JSON)   │ directories │ data      │
//! └────────────┴───────────────┴──────────┴─────────────┴───────────┘
//! ```
//!
//! Directories map Hilbert-ordered tile ids to byte ranges in the tile data
//! section (entries with a run length) or to leaf directories (run length 0).

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use flate2::read::GzDecoder;
use moka::future::Cache;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, trace};
use varint_rs::VarintReader;

use super::http::AsyncHttpClient;
use super::mvt::decode_mvt;
use super::{BoxFuture, SourceError, TileSource};
use crate::coord::TileCoord;
use crate::tile::LayerMap;

pub(crate) const HEADER_SIZE: u64 = 127;
const MAGIC: &[u8; 7] = b"PMTiles";
const ARCHIVE_VERSION: u8 = 3;
const MAX_DIRECTORY_DEPTH: usize = 4;
// Deepest zoom whose tile ids fit in a u64.
const MAX_ARCHIVE_ZOOM: u8 = 31;
const LEAF_CACHE_CAPACITY: u64 = 64;

/// Compression codes used for directories and tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Unknown,
    None,
    Gzip,
    Brotli,
    Zstd,
}

impl From<u8> for Compression {
    fn from(code: u8) -> Self {
        match code {
            1 => Compression::None,
            2 => Compression::Gzip,
            3 => Compression::Brotli,
            4 => Compression::Zstd,
            _ => Compression::Unknown,
        }
    }
}

/// Archive header fields needed for reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub root_offset: u64,
    pub root_length: u64,
    pub metadata_offset: u64,
    pub metadata_length: u64,
    pub leaf_offset: u64,
    pub leaf_length: u64,
    pub data_offset: u64,
    pub data_length: u64,
    pub internal_compression: Compression,
    pub tile_compression: Compression,
    pub tile_type: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Header {
    /// Parses the fixed-size header.
    pub fn parse(buf: &[u8]) -> Result<Self, SourceError> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(SourceError::Archive(format!(
                "header too short: {} bytes",
                buf.len()
            )));
        }
        if &buf[0..7] != MAGIC {
            return Err(SourceError::Archive("invalid PMTiles magic".to_string()));
        }
        if buf[7] != ARCHIVE_VERSION {
            return Err(SourceError::Archive(format!(
                "unsupported PMTiles version {}",
                buf[7]
            )));
        }

        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[at..at + 8]);
            u64::from_le_bytes(bytes)
        };

        Ok(Self {
            root_offset: u64_at(8),
            root_length: u64_at(16),
            metadata_offset: u64_at(24),
            metadata_length: u64_at(32),
            leaf_offset: u64_at(40),
            leaf_length: u64_at(48),
            data_offset: u64_at(56),
            data_length: u64_at(64),
            internal_compression: Compression::from(buf[97]),
            tile_compression: Compression::from(buf[98]),
            tile_type: buf[99],
            min_zoom: buf[100],
            max_zoom: buf[101],
        })
    }
}

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tile_id: u64,
    pub offset: u64,
    pub length: u32,
    pub run_length: u32,
}

/// Computes the Hilbert tile id of a tile.
///
/// Ids count every tile of the shallower zoom levels first, then walk the
/// level along a Hilbert curve starting at x = 0, y = 0 and moving down
/// (1/0/0, 1/0/1, 1/1/1, 1/1/0).
pub fn tile_id(coord: TileCoord) -> u64 {
    if coord.z == 0 {
        return 0;
    }
    let n = 1u64 << coord.z;
    let base = (n * n - 1) / 3;

    let (mut x, mut y) = (coord.x as u64, coord.y as u64);
    let mut d = 0u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from((x & s) > 0);
        let ry = u64::from((y & s) > 0);
        d += s * s * ((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                x = n - 1 - x;
                y = n - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    base + d
}

/// Decodes a (decompressed) directory.
pub fn decode_directory(mut data: &[u8]) -> Result<Vec<Entry>, SourceError> {
    let err = |e: std::io::Error| SourceError::Archive(format!("directory: {}", e));
    let overflow = || SourceError::Archive("directory: value overflow".to_string());

    let count = data.read_usize_varint().map_err(err)?;
    // Each entry takes at least four varint bytes.
    if count > data.len() / 4 {
        return Err(SourceError::Archive(format!(
            "directory: {} entries in {} bytes",
            count,
            data.len()
        )));
    }
    let mut entries = vec![
        Entry {
            tile_id: 0,
            offset: 0,
            length: 0,
            run_length: 0,
        };
        count
    ];

    let mut last_id = 0u64;
    for entry in entries.iter_mut() {
        last_id = last_id
            .checked_add(data.read_u64_varint().map_err(err)?)
            .ok_or_else(overflow)?;
        entry.tile_id = last_id;
    }
    for entry in entries.iter_mut() {
        entry.run_length = data.read_u32_varint().map_err(err)?;
    }
    for entry in entries.iter_mut() {
        entry.length = data.read_u32_varint().map_err(err)?;
    }
    for i in 0..entries.len() {
        let raw = data.read_u64_varint().map_err(err)?;
        entries[i].offset = if raw == 0 {
            let prev = i
                .checked_sub(1)
                .map(|p| entries[p])
                .ok_or_else(|| SourceError::Archive("first entry has no offset".to_string()))?;
            prev.offset
                .checked_add(prev.length as u64)
                .ok_or_else(overflow)?
        } else {
            raw - 1
        };
    }

    Ok(entries)
}

/// Finds the entry covering `tile_id`.
pub fn find_entry(entries: &[Entry], tile_id: u64) -> Option<Entry> {
    match entries.binary_search_by_key(&tile_id, |e| e.tile_id) {
        Ok(i) => Some(entries[i]),
        Err(0) => None,
        Err(i) => {
            let candidate = entries[i - 1];
            if candidate.run_length == 0
                || tile_id - candidate.tile_id < candidate.run_length as u64
            {
                Some(candidate)
            } else {
                None
            }
        }
    }
}

/// Decompresses a directory or tile payload.
pub(crate) fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>, SourceError> {
    match compression {
        Compression::None | Compression::Unknown => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut decoded = Vec::new();
            GzDecoder::new(data)
                .read_to_end(&mut decoded)
                .map_err(|e| SourceError::Decode(format!("gzip: {}", e)))?;
            Ok(decoded)
        }
        Compression::Brotli => {
            let mut decoded = Vec::new();
            brotli::Decompressor::new(data, 4096)
                .read_to_end(&mut decoded)
                .map_err(|e| SourceError::Decode(format!("brotli: {}", e)))?;
            Ok(decoded)
        }
        Compression::Zstd => Err(SourceError::Archive(
            "zstd compression is not supported".to_string(),
        )),
    }
}

fn section_offset(section: u64, offset: u64) -> Result<u64, SourceError> {
    section
        .checked_add(offset)
        .ok_or_else(|| SourceError::Archive(format!("entry offset {} out of range", offset)))
}

#[derive(Debug)]
struct ArchiveRoot {
    header: Header,
    root: Arc<Vec<Entry>>,
}

/// Tile source reading a PMTiles v3 archive.
pub struct PmtilesSource {
    url: String,
    client: Arc<dyn AsyncHttpClient>,
    root: OnceCell<Arc<ArchiveRoot>>,
    leaves: Cache<(u64, u64), Arc<Vec<Entry>>>,
}

impl PmtilesSource {
    /// Creates a source for the archive at `url` (HTTP or local path).
    pub fn new(url: impl Into<String>, client: Arc<dyn AsyncHttpClient>) -> Self {
        Self {
            url: url.into(),
            client,
            root: OnceCell::new(),
            leaves: Cache::builder().max_capacity(LEAF_CACHE_CAPACITY).build(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the archive header, fetching it on first use.
    pub async fn header(&self) -> Result<Header, SourceError> {
        Ok(self.archive_root().await?.header.clone())
    }

    async fn archive_root(&self) -> Result<Arc<ArchiveRoot>, SourceError> {
        self.root
            .get_or_try_init(|| async {
                let buf = self.client.get_range(&self.url, 0, HEADER_SIZE).await?;
                let header = Header::parse(&buf)?;
                let root = self
                    .read_directory(&header, header.root_offset, header.root_length)
                    .await?;
                debug!(
                    url = %self.url,
                    entries = root.len(),
                    min_zoom = header.min_zoom,
                    max_zoom = header.max_zoom,
                    "Opened PMTiles archive"
                );
                Ok(Arc::new(ArchiveRoot {
                    header,
                    root: Arc::new(root),
                }))
            })
            .await
            .cloned()
    }

    async fn read_directory(
        &self,
        header: &Header,
        offset: u64,
        length: u64,
    ) -> Result<Vec<Entry>, SourceError> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let raw = self.client.get_range(&self.url, offset, length).await?;
        decode_directory(&decompress(&raw, header.internal_compression)?)
    }

    async fn leaf_directory(
        &self,
        header: &Header,
        offset: u64,
        length: u64,
    ) -> Result<Arc<Vec<Entry>>, SourceError> {
        self.leaves
            .try_get_with((offset, length), async {
                self.read_directory(header, offset, length).await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Reads the raw (decompressed) payload of a tile.
    ///
    /// Returns `None` when the archive has no such tile.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn tile_bytes(&self, coord: TileCoord) -> Result<Option<Vec<u8>>, SourceError> {
        let archive = self.archive_root().await?;
        let header = &archive.header;

        if coord.z < header.min_zoom
            || coord.z > header.max_zoom
            || coord.z > MAX_ARCHIVE_ZOOM
        {
            return Ok(None);
        }

        let id = tile_id(coord);
        let mut directory = Arc::clone(&archive.root);

        for depth in 0..MAX_DIRECTORY_DEPTH {
            let Some(entry) = find_entry(&directory, id) else {
                return Ok(None);
            };

            if entry.run_length > 0 {
                let offset = section_offset(header.data_offset, entry.offset)?;
                let raw: Bytes = self
                    .client
                    .get_range(&self.url, offset, entry.length as u64)
                    .await?;
                trace!(depth, bytes = raw.len(), "Read tile");
                return decompress(&raw, header.tile_compression).map(Some);
            }

            let offset = section_offset(header.leaf_offset, entry.offset)?;
            directory = self
                .leaf_directory(header, offset, entry.length as u64)
                .await?;
        }

        Err(SourceError::Archive(
            "maximum directory depth exceeded".to_string(),
        ))
    }

    /// Fetches and decodes a tile.
    pub async fn get_tile(&self, coord: TileCoord, tile_size: u32) -> Result<LayerMap, SourceError> {
        match self.tile_bytes(coord).await? {
            Some(bytes) => {
                let tile_type = self.archive_root().await?.header.tile_type;
                if tile_type != 1 {
                    return Err(SourceError::Archive(format!(
                        "tile type {} is not a vector tile",
                        tile_type
                    )));
                }
                decode_mvt(bytes, tile_size)
            }
            None => Ok(LayerMap::new()),
        }
    }
}

impl std::fmt::Debug for PmtilesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PmtilesSource")
            .field("url", &self.url)
            .field("opened", &self.root.initialized())
            .finish()
    }
}

impl TileSource for PmtilesSource {
    fn get(&self, coord: TileCoord, tile_size: u32) -> BoxFuture<'_, Result<LayerMap, SourceError>> {
        Box::pin(self.get_tile(coord, tile_size))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::MockAsyncHttpClient;
    use std::io::Write;
    use varint_rs::VarintWriter;

    pub(crate) fn encode_directory(entries: &[Entry]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_usize_varint(entries.len()).unwrap();
        let mut last = 0u64;
        for e in entries {
            buf.write_u64_varint(e.tile_id - last).unwrap();
            last = e.tile_id;
        }
        for e in entries {
            buf.write_u32_varint(e.run_length).unwrap();
        }
        for e in entries {
            buf.write_u32_varint(e.length).unwrap();
        }
        for (i, e) in entries.iter().enumerate() {
            let contiguous = i > 0 && {
                let prev = &entries[i - 1];
                e.offset == prev.offset + prev.length as u64
            };
            buf.write_u64_varint(if contiguous { 0 } else { e.offset + 1 })
                .unwrap();
        }
        buf
    }

    fn compress(data: &[u8], compression: Compression) -> Vec<u8> {
        match compression {
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data).unwrap();
                encoder.finish().unwrap()
            }
            Compression::Brotli => {
                let mut out = Vec::new();
                {
                    let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
                    writer.write_all(data).unwrap();
                }
                out
            }
            _ => data.to_vec(),
        }
    }

    fn compression_code(compression: Compression) -> u8 {
        match compression {
            Compression::Gzip => 2,
            Compression::Brotli => 3,
            Compression::Zstd => 4,
            _ => 1,
        }
    }

    /// Lays out header, root directory, leaf directories and tile data.
    fn write_archive(
        root: &[u8],
        leaves: &[u8],
        data: &[u8],
        compression: Compression,
        tile_type: u8,
        max_zoom: u8,
    ) -> Vec<u8> {
        let root_offset = HEADER_SIZE;
        let leaf_offset = root_offset + root.len() as u64;
        let data_offset = leaf_offset + leaves.len() as u64;
        let code = compression_code(compression);

        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.push(ARCHIVE_VERSION);
        for v in [
            root_offset,
            root.len() as u64,
            data_offset + data.len() as u64,
            0,
            leaf_offset,
            leaves.len() as u64,
            data_offset,
            data.len() as u64,
            0,
            0,
            0,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&[1, code, code, tile_type, 0, max_zoom]);
        buf.resize(HEADER_SIZE as usize, 0);
        buf.extend_from_slice(root);
        buf.extend_from_slice(leaves);
        buf.extend_from_slice(data);
        buf
    }

    /// Builds an archive holding the given tiles.
    ///
    /// Consecutive ids with identical payloads share one entry with a run
    /// length. With `leaf_size`, the entries are split into leaf directories
    /// of that many entries each and the root only points at the leaves.
    pub(crate) fn build_archive_with(
        tiles: &[(TileCoord, Vec<u8>)],
        tile_type: u8,
        compression: Compression,
        leaf_size: Option<usize>,
    ) -> Vec<u8> {
        let mut sorted: Vec<(u64, &Vec<u8>)> =
            tiles.iter().map(|(c, d)| (tile_id(*c), d)).collect();
        sorted.sort_by_key(|(id, _)| *id);

        let mut data = Vec::new();
        let mut entries: Vec<Entry> = Vec::new();
        let mut last_payload: Option<&Vec<u8>> = None;
        for (id, bytes) in sorted {
            if let (Some(prev), Some(last)) = (entries.last_mut(), last_payload) {
                if prev.tile_id + prev.run_length as u64 == id && last == bytes {
                    prev.run_length += 1;
                    continue;
                }
            }
            let payload = compress(bytes, compression);
            entries.push(Entry {
                tile_id: id,
                offset: data.len() as u64,
                length: payload.len() as u32,
                run_length: 1,
            });
            data.extend_from_slice(&payload);
            last_payload = Some(bytes);
        }

        let mut leaves = Vec::new();
        let root_entries = match leaf_size {
            None => entries,
            Some(size) => entries
                .chunks(size)
                .map(|chunk| {
                    let leaf = compress(&encode_directory(chunk), compression);
                    let pointer = Entry {
                        tile_id: chunk[0].tile_id,
                        offset: leaves.len() as u64,
                        length: leaf.len() as u32,
                        run_length: 0,
                    };
                    leaves.extend_from_slice(&leaf);
                    pointer
                })
                .collect(),
        };

        let root = compress(&encode_directory(&root_entries), compression);
        let max_zoom = tiles.iter().map(|(c, _)| c.z).max().unwrap_or(0);
        write_archive(&root, &leaves, &data, compression, tile_type, max_zoom)
    }

    /// Builds an uncompressed single-directory archive.
    pub(crate) fn build_archive(tiles: &[(TileCoord, Vec<u8>)], tile_type: u8) -> Vec<u8> {
        build_archive_with(tiles, tile_type, Compression::None, None)
    }

    fn pyramid() -> Vec<(TileCoord, Vec<u8>)> {
        vec![
            (TileCoord::new(0, 0, 0), b"z0".to_vec()),
            (TileCoord::new(1, 0, 0), b"nw".to_vec()),
            (TileCoord::new(1, 0, 1), b"sw".to_vec()),
            (TileCoord::new(1, 1, 1), b"se".to_vec()),
            (TileCoord::new(1, 1, 0), b"ne".to_vec()),
            (TileCoord::new(2, 0, 0), b"z2".to_vec()),
        ]
    }

    #[test]
    fn test_tile_ids() {
        assert_eq!(tile_id(TileCoord::new(0, 0, 0)), 0);
        assert_eq!(tile_id(TileCoord::new(1, 0, 0)), 1);
        assert_eq!(tile_id(TileCoord::new(1, 0, 1)), 2);
        assert_eq!(tile_id(TileCoord::new(1, 1, 1)), 3);
        assert_eq!(tile_id(TileCoord::new(1, 1, 0)), 4);
        assert_eq!(tile_id(TileCoord::new(2, 0, 0)), 5);
        assert_eq!(tile_id(TileCoord::new(2, 1, 0)), 6);
        assert_eq!(tile_id(TileCoord::new(2, 0, 1)), 8);
        assert_eq!(tile_id(TileCoord::new(2, 3, 0)), 20);
        assert_eq!(tile_id(TileCoord::new(3, 0, 0)), 21);
        assert_eq!(tile_id(TileCoord::new(3, 3, 5)), 49);
        assert_eq!(tile_id(TileCoord::new(3, 7, 0)), 84);
        assert_eq!(tile_id(TileCoord::new(12, 3423, 1763)), 19_078_479);
    }

    #[test]
    fn test_tile_ids_fill_each_level() {
        for z in 1..=4u8 {
            let n = 1u32 << z;
            let mut ids: Vec<u64> = (0..n)
                .flat_map(|x| (0..n).map(move |y| tile_id(TileCoord::new(z, x, y))))
                .collect();
            ids.sort();
            let base = ((1u64 << (2 * z)) - 1) / 3;
            let expected: Vec<u64> = (base..base + (n as u64 * n as u64)).collect();
            assert_eq!(ids, expected, "zoom {}", z);
        }
    }

    #[test]
    fn test_directory_decode() {
        let entries = vec![
            Entry { tile_id: 0, offset: 0, length: 10, run_length: 1 },
            Entry { tile_id: 1, offset: 10, length: 5, run_length: 3 },
            Entry { tile_id: 7, offset: 100, length: 20, run_length: 0 },
        ];
        let decoded = decode_directory(&encode_directory(&entries)).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_find_entry_run_length() {
        let entries = vec![
            Entry { tile_id: 1, offset: 0, length: 10, run_length: 3 },
            Entry { tile_id: 10, offset: 10, length: 10, run_length: 0 },
        ];
        assert_eq!(find_entry(&entries, 0), None);
        assert_eq!(find_entry(&entries, 3).map(|e| e.tile_id), Some(1));
        assert_eq!(find_entry(&entries, 4), None);
        // Leaf pointers cover everything after them.
        assert_eq!(find_entry(&entries, 500).map(|e| e.tile_id), Some(10));
    }

    #[test]
    fn test_bad_magic() {
        let buf = vec![0u8; HEADER_SIZE as usize];
        assert!(matches!(Header::parse(&buf), Err(SourceError::Archive(_))));
    }

    #[tokio::test]
    async fn test_read_tiles_from_archive() {
        let archive = build_archive(
            &[
                (TileCoord::new(0, 0, 0), b"root".to_vec()),
                (TileCoord::new(1, 1, 0), b"ne".to_vec()),
            ],
            1,
        );
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("https://example.com/a.pmtiles", client.clone());

        let header = source.header().await.unwrap();
        assert_eq!(header.max_zoom, 1);
        assert_eq!(header.tile_compression, Compression::None);

        assert_eq!(
            source.tile_bytes(TileCoord::new(1, 1, 0)).await.unwrap(),
            Some(b"ne".to_vec())
        );
        assert_eq!(source.tile_bytes(TileCoord::new(1, 0, 0)).await.unwrap(), None);
        assert_eq!(source.tile_bytes(TileCoord::new(5, 0, 0)).await.unwrap(), None);

        // Header, root directory and one tile; misses need no reads.
        assert_eq!(client.request_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_tile_is_empty_layer_map() {
        let archive = build_archive(&[(TileCoord::new(0, 0, 0), Vec::new())], 1);
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);
        let layers = source.get_tile(TileCoord::new(1, 0, 0), 1024).await.unwrap();
        assert!(layers.is_empty());
    }

    #[tokio::test]
    async fn test_raster_archive_rejected() {
        let archive = build_archive(&[(TileCoord::new(0, 0, 0), b"png".to_vec())], 2);
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);
        let result = source.get_tile(TileCoord::new(0, 0, 0), 1024).await;
        assert!(matches!(result, Err(SourceError::Archive(_))));
    }

    #[test]
    fn test_consecutive_ids_are_neighbours() {
        let z = 3u8;
        let n = 1u32 << z;
        let base = tile_id(TileCoord::new(z, 0, 0));
        let mut by_id = vec![(0u32, 0u32); (n * n) as usize];
        for x in 0..n {
            for y in 0..n {
                by_id[(tile_id(TileCoord::new(z, x, y)) - base) as usize] = (x, y);
            }
        }
        for pair in by_id.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert_eq!(a.0.abs_diff(b.0) + a.1.abs_diff(b.1), 1, "{:?} -> {:?}", a, b);
        }
    }

    #[test]
    fn test_huge_entry_count_rejected() {
        // Varint 2^42 followed by nothing.
        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(decode_directory(&data), Err(SourceError::Archive(_))));

        // A count that needs more bytes than remain.
        let mut data = Vec::new();
        data.write_usize_varint(3).unwrap();
        data.extend_from_slice(&[0; 8]);
        assert!(matches!(decode_directory(&data), Err(SourceError::Archive(_))));
    }

    #[test]
    fn test_tile_id_overflow_rejected() {
        let mut data = Vec::new();
        data.write_usize_varint(2).unwrap();
        data.write_u64_varint(u64::MAX).unwrap();
        data.write_u64_varint(1).unwrap();
        for v in [1u32, 1, 1, 1] {
            data.write_u32_varint(v).unwrap();
        }
        data.write_u64_varint(1).unwrap();
        data.write_u64_varint(0).unwrap();
        assert!(matches!(decode_directory(&data), Err(SourceError::Archive(_))));
    }

    #[tokio::test]
    async fn test_malformed_root_directory_is_an_error() {
        let root = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let archive = write_archive(&root, &[], b"", Compression::None, 1, 4);
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);
        let result = source.get_tile(TileCoord::new(1, 0, 0), 256).await;
        assert!(matches!(result, Err(SourceError::Archive(_))));
    }

    #[tokio::test]
    async fn test_entry_offset_overflow_is_an_error() {
        let root = encode_directory(&[Entry {
            tile_id: 0,
            offset: u64::MAX - 10,
            length: 4,
            run_length: 1,
        }]);
        let archive = write_archive(&root, &[], b"", Compression::None, 1, 0);
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);
        let result = source.tile_bytes(TileCoord::new(0, 0, 0)).await;
        assert!(matches!(result, Err(SourceError::Archive(_))));
    }

    #[tokio::test]
    async fn test_read_through_leaf_directories() {
        let archive = build_archive_with(&pyramid(), 1, Compression::None, Some(2));
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client.clone());

        assert_eq!(
            source.tile_bytes(TileCoord::new(1, 1, 1)).await.unwrap(),
            Some(b"se".to_vec())
        );
        // Header, root, leaf and tile.
        assert_eq!(client.request_count(), 4);

        // Same leaf: only the tile is read.
        assert_eq!(
            source.tile_bytes(TileCoord::new(1, 0, 1)).await.unwrap(),
            Some(b"sw".to_vec())
        );
        assert_eq!(client.request_count(), 5);

        assert_eq!(
            source.tile_bytes(TileCoord::new(2, 0, 0)).await.unwrap(),
            Some(b"z2".to_vec())
        );
        assert_eq!(
            source.tile_bytes(TileCoord::new(0, 0, 0)).await.unwrap(),
            Some(b"z0".to_vec())
        );
        // Covered by the last leaf pointer but absent from the leaf.
        assert_eq!(source.tile_bytes(TileCoord::new(2, 1, 0)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_length_entries_share_payload() {
        let tiles: Vec<(TileCoord, Vec<u8>)> = [(0, 0), (0, 1), (1, 1), (1, 0)]
            .into_iter()
            .map(|(x, y)| (TileCoord::new(1, x, y), b"ocean".to_vec()))
            .chain(std::iter::once((TileCoord::new(2, 0, 0), b"land".to_vec())))
            .collect();
        let archive = build_archive(&tiles, 1);

        // One run of four plus one single entry.
        let header = Header::parse(&archive).unwrap();
        let start = header.root_offset as usize;
        let root = decode_directory(&archive[start..start + header.root_length as usize]).unwrap();
        assert_eq!(root.len(), 2);
        assert_eq!(root[0].tile_id, 1);
        assert_eq!(root[0].run_length, 4);

        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);
        for (coord, _) in &tiles[..4] {
            assert_eq!(
                source.tile_bytes(*coord).await.unwrap(),
                Some(b"ocean".to_vec())
            );
        }
        assert_eq!(
            source.tile_bytes(TileCoord::new(2, 0, 0)).await.unwrap(),
            Some(b"land".to_vec())
        );
        assert_eq!(source.tile_bytes(TileCoord::new(2, 1, 0)).await.unwrap(), None);
    }

    async fn assert_compressed_archive_reads(compression: Compression) {
        let archive = build_archive_with(&pyramid(), 1, compression, Some(3));
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);

        let header = source.header().await.unwrap();
        assert_eq!(header.internal_compression, compression);
        assert_eq!(header.tile_compression, compression);

        for (coord, payload) in pyramid() {
            assert_eq!(
                source.tile_bytes(coord).await.unwrap(),
                Some(payload),
                "{:?} {}",
                compression,
                coord
            );
        }
    }

    #[tokio::test]
    async fn test_gzip_archive() {
        assert_compressed_archive_reads(Compression::Gzip).await;
    }

    #[tokio::test]
    async fn test_brotli_archive() {
        assert_compressed_archive_reads(Compression::Brotli).await;
    }

    #[tokio::test]
    async fn test_root_directory_shared_between_reads() {
        let archive = build_archive(&pyramid(), 1);
        let client = Arc::new(MockAsyncHttpClient::new(Ok(archive)));
        let source = PmtilesSource::new("a.pmtiles", client);

        let first = source.archive_root().await.unwrap();
        source.tile_bytes(TileCoord::new(1, 0, 0)).await.unwrap();
        let second = source.archive_root().await.unwrap();
        assert!(Arc::ptr_eq(&first.root, &second.root));
        assert_eq!(first.root.len(), pyramid().len());
    }

    #[test]
    fn test_zstd_rejected() {
        assert!(matches!(
            decompress(b"", Compression::Zstd),
            Err(SourceError::Archive(_))
        ));
    }
}
