//! Stitching of per-chunk value arrays into one array per source.

use indexmap::IndexMap;
use serde::Serialize;

use crate::region::Region;

/// Source key used for chunks that do not carry a source, e.g., the genome sequence.
pub const DEFAULT_SOURCE: &str = "default";

/// The values of one chunk as used for stitching.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<V> {
    /// Track of the chunk, `None` for single-track collections.
    pub source: Option<String>,
    /// Genomic position of `values[0]`.
    pub start: i64,
    pub values: Vec<Option<V>>,
}

/// Values of one source over exactly the requested region.
///
/// `values[i]` holds the value at position `start + i`, or `None` if no chunk covered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructedRegion<V> {
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub source: String,
    pub values: Vec<Option<V>>,
}

impl<V> ReconstructedRegion<V> {
    fn empty(region: &Region, source: String) -> Self {
        let mut values = Vec::with_capacity(region.len());
        values.resize_with(region.len(), || None);
        Self {
            chromosome: region.chromosome.clone(),
            start: region.start,
            end: region.end,
            source,
            values,
        }
    }

    /// The value at the genomic `position`, if set.
    pub fn value_at(&self, position: i64) -> Option<&V> {
        if position < self.start {
            return None;
        }
        self.values
            .get((position - self.start) as usize)
            .and_then(Option::as_ref)
    }

    /// Whether every position of the region received a value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Stitch `chunks` into one array per source covering exactly `region`.
///
/// Chunks may be given in any order and may extend beyond the region on either side; only the
/// overlapping part of each chunk is visited.  Where chunks of one source overlap, the chunk
/// processed last wins.  Sources without any chunk do not show up in the result, which is sorted
/// by source name.
pub fn reconstruct<V, I>(region: &Region, chunks: I) -> IndexMap<String, ReconstructedRegion<V>>
where
    I: IntoIterator<Item = Chunk<V>>,
{
    let mut result: IndexMap<String, ReconstructedRegion<V>> = IndexMap::new();

    for chunk in chunks {
        let source = chunk
            .source
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        let target = result
            .entry(source)
            .or_insert_with_key(|source| ReconstructedRegion::empty(region, source.clone()));

        let offset = (region.start - chunk.start).max(0) as usize;
        log::trace!(
            "copying chunk at {}:{} into {} from offset {}",
            region.chromosome,
            chunk.start,
            region,
            offset
        );
        for (pos, value) in chunk.values.into_iter().enumerate().skip(offset) {
            let position = chunk.start + pos as i64;
            if position > region.end {
                break;
            }
            if let Some(slot) = target.values.get_mut((position - region.start) as usize) {
                *slot = value;
            }
        }
    }

    result.sort_keys();
    result
}
