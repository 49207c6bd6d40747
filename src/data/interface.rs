//! Definition of the interface for accessing chunked and feature collections.

use serde::{Deserialize, Serialize};

use crate::chunks::ChunkId;
use crate::data::error::Error;
use crate::region::Region;

/// A value as found in storage.
///
/// Depending on how a collection was loaded, scores come back as doubles, floats, integers or
/// even strings.  Consumers convert with `StoredValue::to_f32()` instead of inspecting types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl StoredValue {
    /// Normalize to `f32`; non-numeric text and nulls yield `None`.
    pub fn to_f32(&self) -> Option<f32> {
        match self {
            StoredValue::Null => None,
            StoredValue::Int(value) => Some(*value as f32),
            StoredValue::Float(value) => Some(*value as f32),
            StoredValue::Text(value) => value.trim().parse::<f32>().ok(),
        }
    }
}

impl From<f64> for StoredValue {
    fn from(value: f64) -> Self {
        StoredValue::Float(value)
    }
}

impl From<i64> for StoredValue {
    fn from(value: i64) -> Self {
        StoredValue::Int(value)
    }
}

impl From<Option<f64>> for StoredValue {
    fn from(value: Option<f64>) -> Self {
        value.map(StoredValue::Float).unwrap_or(StoredValue::Null)
    }
}

/// One stored chunk of positional data.
///
/// ```text
/// chromosome | 1
/// start      | 2000
/// end        | 3999
/// chunk_ids  | {1_1_2k}
/// source     | phastCons
/// values     | [0.012, 0.011, ...]
/// sequence   |
/// ```
///
/// Score collections fill `values`, the genome sequence collection fills `sequence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chromosome: String,
    /// First position of the chunk (1-based).
    pub start: i64,
    /// Last position of the chunk (1-based, inclusive).
    pub end: i64,
    /// Chunk keys the record is stored under, e.g., `"1_1_2k"`.
    #[serde(default)]
    pub chunk_ids: Vec<String>,
    /// Track name, e.g., `"phastCons"`, `None` for single-track collections.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<StoredValue>>,
    #[serde(default)]
    pub sequence: Option<String>,
}

/// A feature with a position, e.g., a gene or a variant, as used for binning.
///
/// ```text
/// chromosome | 13
/// start      | 32315474
/// end        | 32400266
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
}

/// Filter for fetching the chunks of one region.
///
/// Selects records stored under any of `chunk_ids` that overlap `[start, end]`, optionally
/// limited to the given sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkQuery {
    pub chromosome: String,
    pub chunk_ids: Vec<String>,
    pub start: i64,
    pub end: i64,
    pub sources: Option<Vec<String>>,
}

impl ChunkQuery {
    /// Build the query for `region` given its overlapping chunk ids.
    pub fn new(region: &Region, chunk_ids: &[ChunkId], sources: Option<&[String]>) -> Self {
        Self {
            chromosome: region.chromosome.clone(),
            chunk_ids: chunk_ids.iter().map(|id| id.to_string()).collect(),
            start: region.start,
            end: region.end,
            sources: sources.map(|sources| sources.to_vec()),
        }
    }

    /// Whether `record` satisfies this query.
    pub fn matches(&self, record: &ChunkRecord) -> bool {
        record.chromosome == self.chromosome
            && record.end >= self.start
            && record.start <= self.end
            && record
                .chunk_ids
                .iter()
                .any(|chunk_id| self.chunk_ids.contains(chunk_id))
            && match (&self.sources, &record.source) {
                (None, _) => true,
                (Some(sources), Some(source)) => sources.contains(source),
                (Some(_), None) => false,
            }
    }
}

/// One row of a group-by over feature start positions.
///
/// The bin key is what the store computed, which may be a float subject to rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinCountRow {
    pub bin: f64,
    pub count: u64,
}

/// Interface for data providers.
pub trait Provider {
    /// Return the data version, e.g., `"v5.2"`.
    fn data_version(&self) -> &str;

    /// Fetch chunk records for a batch of queries against one collection.
    ///
    /// Returns one list per query, in the order of `queries`.  The order of records within a list
    /// is not specified.
    ///
    /// # Arguments
    ///
    /// * `collection` -- name of the chunked collection, e.g., `"conservation"`
    /// * `queries` -- one query per requested region
    fn fetch_chunks(
        &self,
        collection: &str,
        queries: &[ChunkQuery],
    ) -> Result<Vec<Vec<ChunkRecord>>, Error>;

    /// Count the features of `collection` overlapping `region`, grouped by the absolute bin of
    /// their start position.
    ///
    /// # Arguments
    ///
    /// * `collection` -- name of the feature collection, e.g., `"gene"`
    /// * `region` -- region to count features in
    /// * `interval_size` -- bin width, positive
    fn count_features_by_bin(
        &self,
        collection: &str,
        region: &Region,
        interval_size: i64,
    ) -> Result<Vec<BinCountRow>, Error>;
}
