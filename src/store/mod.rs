//! Access to per-position data stored in fixed-size chunks.
//!
//! `ChunkedRegionStore` computes the chunks overlapping the requested regions, fetches them in
//! one batch from a `Provider` and stitches them back into one array per region and source.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;

use crate::chunks::{self, resolve_chunk_ids, DEFAULT_CHUNK_SIZE, GENOME_SEQUENCE_COLLECTION};
use crate::data::interface::{ChunkQuery, ChunkRecord, Provider};
use crate::options::QueryOptions;
use crate::region::Region;

pub mod reconstruct;
pub mod sequence;

pub use crate::store::error::Error;
pub use crate::store::reconstruct::{reconstruct, Chunk, ReconstructedRegion, DEFAULT_SOURCE};
pub use crate::store::sequence::GenomeSequence;

mod error {
    /// Error type for chunked region queries.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("invalid region")]
        InvalidRegion(#[from] crate::chunks::Error),
        #[error("storage unavailable")]
        StorageUnavailable(#[from] crate::data::error::Error),
        #[error("storage returned {1} result lists for {0} queries")]
        ResultCountMismatch(usize, usize),
    }
}

/// Name of the conservation score collection.
pub const CONSERVATION_COLLECTION: &str = "conservation";

/// Maximal span of conservation queries, longer regions are truncated.
pub const CONSERVATION_MAX_REGION_SPAN: i64 = 10_000;

/// Configuration for `ChunkedRegionStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Name of the chunked collection to query.
    pub collection: String,
    /// Chunk size the collection was loaded with.
    pub chunk_size: i64,
    /// Maximal `end - start` of a queried region, `None` for no limit.
    pub max_region_span: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection: CONSERVATION_COLLECTION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_region_span: Some(CONSERVATION_MAX_REGION_SPAN),
        }
    }
}

impl Config {
    /// Configuration for the genome sequence collection.
    pub fn genome_sequence() -> Self {
        Self {
            collection: GENOME_SEQUENCE_COLLECTION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_region_span: None,
        }
    }

    /// Apply the caller-side region policy.
    ///
    /// Inverted regions are rejected.  Positions below 1 are clamped to 1 and the end is truncated
    /// to `start + max_region_span` if the region is longer than allowed.
    pub fn prepare_region(&self, region: &Region) -> Result<Region, Error> {
        if region.start > region.end {
            return Err(Error::InvalidRegion(chunks::Error::InvalidRegion(format!(
                "{}:{}-{} has start after end",
                region.chromosome, region.start, region.end
            ))));
        }
        let start = region.start.max(1);
        let mut end = region.end.max(1);
        if let Some(max_span) = self.max_region_span {
            if end - start > max_span {
                log::debug!(
                    "truncating {}:{}-{} to maximal span of {}",
                    region.chromosome,
                    start,
                    end,
                    max_span
                );
                end = start + max_span;
            }
        }
        Ok(Region::new(region.chromosome.clone(), start, end))
    }
}

/// The stitched scores of one requested region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionScores {
    /// The region after clamping and truncation.
    pub region: Region,
    /// Stitched values by source, empty if nothing was found.
    pub results: IndexMap<String, ReconstructedRegion<f32>>,
}

/// A single score at one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub position: i64,
    pub source: String,
    pub value: f32,
}

/// Convert a score chunk record, skipping records without values.
fn score_chunk(record: &ChunkRecord) -> Option<Chunk<f32>> {
    let Some(values) = record.values.as_ref() else {
        log::warn!(
            "skipping chunk {}:{}-{} without values",
            record.chromosome,
            record.start,
            record.end
        );
        return None;
    };
    Some(Chunk {
        source: record.source.clone(),
        start: record.start,
        values: values.iter().map(|value| value.to_f32()).collect(),
    })
}

/// Chunked access to a collection of per-position data.
pub struct ChunkedRegionStore {
    config: Config,
    provider: Arc<dyn Provider + Send + Sync>,
}

impl std::fmt::Debug for ChunkedRegionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedRegionStore")
            .field("config", &self.config)
            .field("provider", &"...")
            .finish()
    }
}

impl ChunkedRegionStore {
    /// Construct new store from config and provider.
    pub fn new(config: Config, provider: Arc<dyn Provider + Send + Sync>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the chunk records overlapping each of `regions`.
    ///
    /// The regions must already be clamped.  All regions are sent to the provider as one batch;
    /// the result holds one record list per region in input order.
    ///
    /// # Arguments
    ///
    /// * `regions` -- regions to fetch chunks for
    /// * `chunk_size` -- overrides the configured chunk size
    /// * `sources` -- limit to chunks of these sources
    pub fn fetch_chunks(
        &self,
        regions: &[Region],
        chunk_size: Option<i64>,
        sources: Option<&[String]>,
    ) -> Result<Vec<Vec<ChunkRecord>>, Error> {
        let chunk_size = chunk_size.unwrap_or(self.config.chunk_size);
        let queries = regions
            .iter()
            .map(|region| {
                let chunk_ids = resolve_chunk_ids(region, chunk_size)?;
                Ok(ChunkQuery::new(region, &chunk_ids, sources))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let start = Instant::now();
        let results = self
            .provider
            .fetch_chunks(&self.config.collection, &queries)?;
        log::debug!(
            "fetching {} chunk queries from {} took {:?}",
            queries.len(),
            &self.config.collection,
            start.elapsed()
        );

        if results.len() != queries.len() {
            return Err(Error::ResultCountMismatch(queries.len(), results.len()));
        }
        Ok(results)
    }

    /// Stitch the scores of `regions`, one entry per region in input order.
    ///
    /// Regions are clamped and truncated as configured before querying.  Regions without any
    /// chunk yield an entry with empty `results`.
    pub fn resolve_for_regions(
        &self,
        regions: &[Region],
        chunk_size: Option<i64>,
        sources: Option<&[String]>,
    ) -> Result<Vec<RegionScores>, Error> {
        let regions = regions
            .iter()
            .map(|region| self.config.prepare_region(region))
            .collect::<Result<Vec<_>, Error>>()?;
        let records = self.fetch_chunks(&regions, chunk_size, sources)?;

        Ok(regions
            .into_iter()
            .zip(records)
            .map(|(region, records)| {
                let results = reconstruct(&region, records.iter().filter_map(score_chunk));
                RegionScores { region, results }
            })
            .collect())
    }

    /// Like `resolve_for_regions()` but with chunk size and sources from query options.
    pub fn resolve_with_options(
        &self,
        regions: &[Region],
        options: &QueryOptions,
    ) -> Result<Vec<RegionScores>, Error> {
        self.resolve_for_regions(regions, options.chunk_size, options.sources.as_deref())
    }

    /// The set scores of each region as flat list, one list per region in input order.
    ///
    /// Scores are grouped by source name, and ordered by position within one source.
    pub fn scores_for_regions(
        &self,
        regions: &[Region],
        chunk_size: Option<i64>,
        sources: Option<&[String]>,
    ) -> Result<Vec<Vec<Score>>, Error> {
        Ok(self
            .resolve_for_regions(regions, chunk_size, sources)?
            .into_iter()
            .map(|scores| {
                scores
                    .results
                    .into_values()
                    .flat_map(|stitched| {
                        let start = stitched.start;
                        let source = stitched.source;
                        stitched
                            .values
                            .into_iter()
                            .enumerate()
                            .filter_map(move |(i, value)| {
                                value.map(|value| Score {
                                    position: start + i as i64,
                                    source: source.clone(),
                                    value,
                                })
                            })
                    })
                    .collect()
            })
            .collect())
    }
}
