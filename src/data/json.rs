//! In-memory provider loaded from JSON files or built from records.
//!
//! Files may be plain or gzip-compressed JSON (`.json.gz`) in the format of `models::Container`.
//! Chunks and features are indexed per collection and chromosome in interval trees.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;

use crate::chunks::{chunk_index, chunk_sequence, GENOME_SEQUENCE_COLLECTION};
use crate::data::error::Error;
use crate::data::interface::{self, BinCountRow, ChunkQuery, ChunkRecord, FeatureRecord};
use crate::region::Region;

/// Data version reported if none of the loaded files carries one.
pub static DEFAULT_DATA_VERSION: &str = "in-memory";

/// Configuration for the `data::json::Provider`.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Config {
    /// Paths to the (optionally gzip-ed) JSON files to load.
    pub json_paths: Vec<String>,
}

pub mod models {
    //! Data structures for (de-)serialization as found in the JSON files.

    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};

    use crate::chunks::DEFAULT_CHUNK_SIZE;
    use crate::data::interface::{ChunkRecord, FeatureRecord};

    fn default_contig_chunk_size() -> i64 {
        DEFAULT_CHUNK_SIZE
    }

    /// Top-level container of one file.
    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Container {
        #[serde(default)]
        pub data_version: Option<String>,
        /// Chunk records by collection name.
        #[serde(default)]
        pub chunks: IndexMap<String, Vec<ChunkRecord>>,
        /// Feature records by collection name.
        #[serde(default)]
        pub features: IndexMap<String, Vec<FeatureRecord>>,
        /// Full contig sequences by chromosome, chunked into the genome sequence collection.
        #[serde(default)]
        pub contigs: IndexMap<String, String>,
        #[serde(default = "default_contig_chunk_size")]
        pub contig_chunk_size: i64,
    }
}

/// Type alias for interval trees; the data is the index into the collection's records.
type IntervalTree = ArrayBackedIntervalTree<i64, usize>;

/// Records of one collection with one interval tree per chromosome.
struct Collection<T> {
    records: Vec<T>,
    interval_trees: HashMap<String, IntervalTree>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            interval_trees: HashMap::new(),
        }
    }
}

/// Access to the location of a record.
trait Located {
    fn chromosome(&self) -> &str;
    fn start(&self) -> i64;
    fn end(&self) -> i64;
}

impl Located for ChunkRecord {
    fn chromosome(&self) -> &str {
        &self.chromosome
    }
    fn start(&self) -> i64 {
        self.start
    }
    fn end(&self) -> i64 {
        self.end
    }
}

impl Located for FeatureRecord {
    fn chromosome(&self) -> &str {
        &self.chromosome
    }
    fn start(&self) -> i64 {
        self.start
    }
    fn end(&self) -> i64 {
        self.end
    }
}

impl<T: Located> Collection<T> {
    fn extend(&mut self, records: Vec<T>) {
        self.records.extend(records);
        self.build_interval_trees();
    }

    fn build_interval_trees(&mut self) {
        let mut result: HashMap<String, IntervalTree> = HashMap::new();
        for (idx, record) in self.records.iter().enumerate() {
            if record.end() < record.start() {
                log::warn!(
                    "skipping inverted record {}:{}-{}",
                    record.chromosome(),
                    record.start(),
                    record.end()
                );
                continue;
            }
            result
                .entry(record.chromosome().to_string())
                .or_insert_with(IntervalTree::new)
                .insert(record.start()..(record.end() + 1), idx);
        }
        for tree in result.values_mut() {
            tree.index();
        }
        self.interval_trees = result;
    }

    /// Records on `chromosome` overlapping `[start, end]`, in load order.
    fn overlapping(&self, chromosome: &str, start: i64, end: i64) -> Vec<&T> {
        if end < start {
            return Vec::new();
        }
        let Some(tree) = self.interval_trees.get(chromosome) else {
            return Vec::new();
        };
        let mut idxs = tree
            .find(start..(end + 1))
            .into_iter()
            .map(|entry| *entry.data())
            .collect::<Vec<_>>();
        idxs.sort_unstable();
        idxs.into_iter().map(|idx| &self.records[idx]).collect()
    }
}

/// Provider answering from data held in memory.
///
/// Use `Provider::with_config()` to load JSON files, or start from `Provider::default()` and add
/// records with the `with_*()` builder methods.
pub struct Provider {
    data_version: String,
    chunks: HashMap<String, Collection<ChunkRecord>>,
    features: HashMap<String, Collection<FeatureRecord>>,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            data_version: DEFAULT_DATA_VERSION.to_string(),
            chunks: HashMap::new(),
            features: HashMap::new(),
        }
    }
}

impl Provider {
    /// Load all files given in `config`.
    pub fn with_config(config: &Config) -> Result<Self, Error> {
        let mut result = Self::default();
        for json_path in &config.json_paths {
            result = result.with_container(Self::load(json_path)?)?;
        }

        log::debug!(
            "json::Provider -- #chunk collections = {}, #feature collections = {}",
            result.chunks.len(),
            result.features.len()
        );

        Ok(result)
    }

    fn load(json_path: &str) -> Result<models::Container, Error> {
        log::debug!("Loading chunks and features from {:?}", json_path);
        let start = Instant::now();
        let file = std::fs::File::open(json_path)
            .map_err(|_e| Error::JsonOpen(json_path.to_string()))?;
        let container: models::Container = if json_path.ends_with(".gz") {
            serde_json::from_reader(flate2::bufread::GzDecoder::new(std::io::BufReader::new(
                file,
            )))
            .map_err(|_e| Error::JsonParse(json_path.to_string()))?
        } else {
            serde_json::from_reader(std::io::BufReader::new(file))
                .map_err(|_e| Error::JsonParse(json_path.to_string()))?
        };
        log::debug!(
            "loading / deserializing {} chunk collections, {} feature collections and {} contigs took {:?}",
            container.chunks.len(),
            container.features.len(),
            container.contigs.len(),
            start.elapsed()
        );
        Ok(container)
    }

    /// Add the contents of a deserialized container.
    pub fn with_container(mut self, container: models::Container) -> Result<Self, Error> {
        let start = Instant::now();
        if let Some(data_version) = container.data_version {
            self.data_version = data_version;
        }
        for (collection, records) in container.chunks {
            self = self.with_chunks(&collection, records);
        }
        for (collection, records) in container.features {
            self = self.with_features(&collection, records);
        }
        for (chromosome, sequence) in container.contigs {
            self = self.with_contig(&chromosome, &sequence, container.contig_chunk_size)?;
        }
        log::debug!("Built interval trees in {:?}", start.elapsed());
        Ok(self)
    }

    /// Add chunk records to `collection`.
    pub fn with_chunks(mut self, collection: &str, records: Vec<ChunkRecord>) -> Self {
        self.chunks
            .entry(collection.to_string())
            .or_default()
            .extend(records);
        self
    }

    /// Add feature records to `collection`.
    pub fn with_features(mut self, collection: &str, records: Vec<FeatureRecord>) -> Self {
        self.features
            .entry(collection.to_string())
            .or_default()
            .extend(records);
        self
    }

    /// Chunk a full contig sequence into the genome sequence collection.
    pub fn with_contig(
        self,
        chromosome: &str,
        sequence: &str,
        chunk_size: i64,
    ) -> Result<Self, Error> {
        let records = chunk_sequence(chromosome, sequence, chunk_size).map_err(|_e| {
            Error::InvalidChunkSize(GENOME_SEQUENCE_COLLECTION.to_string(), chunk_size)
        })?;
        Ok(self.with_chunks(GENOME_SEQUENCE_COLLECTION, records))
    }
}

impl interface::Provider for Provider {
    fn data_version(&self) -> &str {
        &self.data_version
    }

    fn fetch_chunks(
        &self,
        collection: &str,
        queries: &[ChunkQuery],
    ) -> Result<Vec<Vec<ChunkRecord>>, Error> {
        let chunks = self
            .chunks
            .get(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        Ok(queries
            .iter()
            .map(|query| {
                chunks
                    .overlapping(&query.chromosome, query.start, query.end)
                    .into_iter()
                    .filter(|record| query.matches(record))
                    .cloned()
                    .collect()
            })
            .collect())
    }

    fn count_features_by_bin(
        &self,
        collection: &str,
        region: &Region,
        interval_size: i64,
    ) -> Result<Vec<BinCountRow>, Error> {
        if interval_size <= 0 {
            return Err(Error::InvalidIntervalSize(interval_size));
        }
        let features = self
            .features
            .get(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
        for feature in features.overlapping(&region.chromosome, region.start, region.end) {
            let bin = chunk_index(feature.start, interval_size)
                .map_err(|_e| Error::InvalidIntervalSize(interval_size))?;
            *counts.entry(bin).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(bin, count)| BinCountRow {
                bin: bin as f64,
                count,
            })
            .collect())
    }
}


// <LICENSE>
// Copyright 2023 hgvs-rs Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
// </LICENSE>
