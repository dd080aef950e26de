//! Exhaustive L2 index and its on-disk snapshot.
//!
//! Distances are squared Euclidean. A search always returns exactly `top_k`
//! (label, distance) pairs; slots beyond the number of stored vectors carry
//! label `-1` and distance `+inf`.
//!
//! Snapshot layout (little-endian):
//!
//! ```text
//! magic "DSIX" | version u32 | dimensions u32 | rows u64
//! model_len u32 | model utf-8 | metadata sha-256 [32]
//! rows * dimensions f32
//! ```
//!
//! The digest binds a snapshot to the exact `index.meta.json` bytes written
//! next to it, so a torn pair is detected on load. Uploads only touch the
//! metadata store (`meta.json`), never the pair.

use crate::config::StoreLayout;
use crate::metadata::MetadataStore;
use crate::persist::write_atomic;
use crate::types::DocumentRecord;
use docsim_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs;

/// Snapshot file magic.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"DSIX";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Label of an empty result slot.
pub const EMPTY_LABEL: i64 = -1;

/// Flat (brute-force) index over fixed-dimension vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

/// Parallel arrays returned by [`FlatIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors {
    pub labels: Vec<i64>,
    pub distances: Vec<f32>,
}

impl FlatIndex {
    /// Build from a matrix in one shot. Every row must have `dimensions` entries.
    pub fn from_rows(dimensions: usize, rows: &[Vec<f32>]) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Index("Index dimensions must be greater than zero".to_string()));
        }

        let mut data = Vec::with_capacity(rows.len() * dimensions);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimensions {
                return Err(AppError::Index(format!(
                    "Row {} has {} dimensions, expected {}",
                    i,
                    row.len(),
                    dimensions
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self { dimensions, data })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector at `row`.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// The `top_k` nearest rows to `query`, closest first.
    ///
    /// Equal distances are ordered by row number.
    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<Neighbors> {
        if query.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(row, vector)| (squared_l2(query, vector), row))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(top_k);

        let mut labels = Vec::with_capacity(top_k);
        let mut distances = Vec::with_capacity(top_k);
        for (distance, row) in scored {
            labels.push(row as i64);
            distances.push(distance);
        }
        while labels.len() < top_k {
            labels.push(EMPTY_LABEL);
            distances.push(f32::INFINITY);
        }

        Ok(Neighbors { labels, distances })
    }
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for i in 0..4 {
            let d = ca[i] - cb[i];
            acc[i] += d * d;
        }
    }

    acc.iter().sum::<f32>() + tail
}

/// SHA-256 of metadata file bytes.
pub fn metadata_digest(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

/// An index together with what it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub index: FlatIndex,
    /// Embedding model the vectors came from
    pub model: String,
    /// Digest of the paired metadata bytes
    pub metadata_digest: [u8; 32],
}

impl IndexSnapshot {
    /// Serialize to the snapshot file format.
    pub fn encode(&self) -> Vec<u8> {
        let model = self.model.as_bytes();
        let mut out = Vec::with_capacity(56 + model.len() + self.index.data.len() * 4);

        out.extend_from_slice(SNAPSHOT_MAGIC);
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.index.dimensions as u32).to_le_bytes());
        out.extend_from_slice(&(self.index.len() as u64).to_le_bytes());
        out.extend_from_slice(&(model.len() as u32).to_le_bytes());
        out.extend_from_slice(model);
        out.extend_from_slice(&self.metadata_digest);
        for value in &self.index.data {
            out.extend_from_slice(&value.to_le_bytes());
        }

        out
    }

    /// Parse a snapshot file.
    pub fn decode(bytes: &[u8]) -> AppResult<Self> {
        let mut reader = Reader { bytes, pos: 0 };

        if reader.take(4)? != SNAPSHOT_MAGIC {
            return Err(AppError::Index("Not a docsim index snapshot".to_string()));
        }

        let version = reader.u32()?;
        if version != SNAPSHOT_VERSION {
            return Err(AppError::Index(format!(
                "Unsupported snapshot version {} (expected {})",
                version, SNAPSHOT_VERSION
            )));
        }

        let dimensions = reader.u32()? as usize;
        if dimensions == 0 {
            return Err(AppError::Index("Snapshot has zero dimensions".to_string()));
        }
        let rows = usize::try_from(reader.u64()?)
            .map_err(|_| AppError::Index("Snapshot row count overflows".to_string()))?;
        let model_len = reader.u32()? as usize;
        let model = String::from_utf8(reader.take(model_len)?.to_vec())
            .map_err(|_| AppError::Index("Snapshot model name is not UTF-8".to_string()))?;

        let mut metadata_digest = [0u8; 32];
        metadata_digest.copy_from_slice(reader.take(32)?);

        let expected = rows
            .checked_mul(dimensions)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| AppError::Index("Snapshot size overflows".to_string()))?;
        let body = reader.take(expected)?;
        if reader.pos != bytes.len() {
            return Err(AppError::Index(format!(
                "Snapshot has {} trailing bytes",
                bytes.len() - reader.pos
            )));
        }

        let data = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self {
            index: FlatIndex { dimensions, data },
            model,
            metadata_digest,
        })
    }

    /// Persist `index` and `records` as the served pair: index first, then
    /// the row copy.
    ///
    /// Both writes are temp-file-then-rename with fsync. The snapshot header
    /// carries the digest of the row bytes written second. The metadata
    /// store is not touched.
    pub fn write_pair(
        layout: &StoreLayout,
        index: FlatIndex,
        model: &str,
        records: &[DocumentRecord],
    ) -> AppResult<IndexSnapshot> {
        if index.len() != records.len() {
            return Err(AppError::Index(format!(
                "Refusing to write {} vectors with {} metadata rows",
                index.len(),
                records.len()
            )));
        }

        let metadata_bytes = MetadataStore::encode(records)?;
        let snapshot = IndexSnapshot {
            index,
            model: model.to_string(),
            metadata_digest: metadata_digest(&metadata_bytes),
        };

        write_atomic(&layout.index_path(), &snapshot.encode())?;
        write_atomic(&layout.index_metadata_path(), &metadata_bytes)?;

        Ok(snapshot)
    }

    /// Load and cross-check the served pair.
    ///
    /// Returns `None` when no index has been built yet. A snapshot whose
    /// digest or row count disagrees with its row copy is an error.
    pub fn read_pair(layout: &StoreLayout) -> AppResult<Option<(IndexSnapshot, Vec<DocumentRecord>)>> {
        let index_path = layout.index_path();
        if !index_path.exists() {
            return Ok(None);
        }

        let snapshot = Self::decode(&fs::read(&index_path)?)?;

        let rows_path = layout.index_metadata_path();
        if !rows_path.exists() {
            return Err(AppError::Index(format!(
                "Index snapshot {:?} has no row file next to it",
                index_path
            )));
        }

        let metadata_bytes = fs::read(&rows_path)?;
        if metadata_digest(&metadata_bytes) != snapshot.metadata_digest {
            return Err(AppError::Index(format!(
                "Index snapshot {:?} was not built from {:?}; rebuild the index",
                index_path, rows_path
            )));
        }

        let records = MetadataStore::decode(&metadata_bytes)?;
        if records.len() != snapshot.index.len() {
            return Err(AppError::Index(format!(
                "Index has {} vectors but {} rows",
                snapshot.index.len(),
                records.len()
            )));
        }

        Ok(Some((snapshot, records)))
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> AppResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| AppError::Index("Snapshot is truncated".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> AppResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> AppResult<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }
}
