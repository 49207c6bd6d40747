//! Chunk identifiers and the arithmetic mapping positions to fixed-size chunks.
//!
//! Positional data is stored in chunks of `chunk_size` positions.  The chunk of a position is
//! `position / chunk_size` and chunk `i` covers `[i * chunk_size, i * chunk_size + chunk_size - 1]`.
//! Each stored chunk carries its identifier in the form `"{chromosome}_{index}_{size}k"`.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::interface::ChunkRecord;
use crate::region::Region;

pub use crate::chunks::error::Error;

mod error {
    /// Error type for chunk computations.
    #[derive(thiserror::Error, Debug, PartialEq)]
    pub enum Error {
        #[error("invalid region: {0}")]
        InvalidRegion(String),
        #[error("could not parse chunk id from {0:?}")]
        InvalidChunkId(String),
    }
}

/// Default chunk size of the conservation, genome sequence and regulatory collections.
pub const DEFAULT_CHUNK_SIZE: i64 = 2000;

/// Name of the genome sequence collection.
pub const GENOME_SEQUENCE_COLLECTION: &str = "genome_sequence";

/// Identifier of one storage chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId {
    pub chromosome: String,
    pub index: i64,
    pub chunk_size: i64,
}

impl ChunkId {
    pub fn new(chromosome: impl Into<String>, index: i64, chunk_size: i64) -> Self {
        Self {
            chromosome: chromosome.into(),
            index,
            chunk_size,
        }
    }

    /// First position covered by this chunk.
    pub fn start(&self) -> i64 {
        self.index * self.chunk_size
    }

    /// Last position covered by this chunk.
    pub fn end(&self) -> i64 {
        self.index * self.chunk_size + self.chunk_size - 1
    }
}

/// Renders the key stored in the `chunk_ids` field of chunk records.
///
/// Note that the size suffix is given in kbp so sizes below 1000 all render as `"0k"`.
impl Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}k",
            self.chromosome,
            self.index,
            self.chunk_size / 1000
        )
    }
}

impl FromStr for ChunkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidChunkId(s.to_string());
        // Chromosome names may contain underscores (e.g., `HSCHR6_MHC_COX`), so split from the right.
        let mut parts = s.rsplitn(3, '_');
        let size = parts.next().ok_or_else(invalid)?;
        let index = parts.next().ok_or_else(invalid)?;
        let chromosome = parts.next().filter(|c| !c.is_empty()).ok_or_else(invalid)?;
        let size = size
            .strip_suffix('k')
            .and_then(|size| size.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        let index = index.parse::<i64>().map_err(|_e| invalid())?;
        Ok(Self::new(chromosome, index, size * 1000))
    }
}

fn check_size(chunk_size: i64) -> Result<(), Error> {
    if chunk_size <= 0 {
        Err(Error::InvalidRegion(format!(
            "chunk size must be positive but is {}",
            chunk_size
        )))
    } else {
        Ok(())
    }
}

/// Check that `region` is usable for chunk arithmetic.
///
/// The region must not be inverted and must start at position 1 or later; clamping of lower
/// positions is left to the caller.
pub fn check_region(region: &Region) -> Result<(), Error> {
    if region.start > region.end {
        Err(Error::InvalidRegion(format!(
            "start is greater than end in {}",
            region
        )))
    } else if region.start < 1 {
        Err(Error::InvalidRegion(format!(
            "start must be at least 1 in {}",
            region
        )))
    } else {
        Ok(())
    }
}

/// Index of the chunk containing `position`.
pub fn chunk_index(position: i64, chunk_size: i64) -> Result<i64, Error> {
    check_size(chunk_size)?;
    Ok(position / chunk_size)
}

/// Compute the ids of all chunks overlapping `region`, in ascending order.
///
/// # Arguments
///
/// * `region` -- region with `1 <= start <= end`
/// * `chunk_size` -- positive chunk size
pub fn resolve_chunk_ids(region: &Region, chunk_size: i64) -> Result<Vec<ChunkId>, Error> {
    check_size(chunk_size)?;
    check_region(region)?;

    let start_index = region.start / chunk_size;
    let end_index = region.end / chunk_size;
    if start_index == end_index {
        Ok(vec![ChunkId::new(
            region.chromosome.clone(),
            start_index,
            chunk_size,
        )])
    } else {
        Ok((start_index..=end_index)
            .map(|index| ChunkId::new(region.chromosome.clone(), index, chunk_size))
            .collect())
    }
}

/// First and last position of chunk `index` of a chromosome in the genome sequence collection.
///
/// Unlike the general layout, the first chunk starts at position 1 and thus holds one nucleotide
/// less than the chunk size.
pub fn sequence_chunk_span(index: i64, chunk_size: i64) -> (i64, i64) {
    if index == 0 {
        (1, chunk_size - 1)
    } else {
        (index * chunk_size, index * chunk_size + chunk_size - 1)
    }
}

/// Split the full `sequence` of a chromosome into chunk records of the genome sequence
/// collection.
pub fn chunk_sequence(
    chromosome: &str,
    sequence: &str,
    chunk_size: i64,
) -> Result<Vec<ChunkRecord>, Error> {
    if chunk_size < 2 {
        return Err(Error::InvalidRegion(format!(
            "sequence chunk size must be at least 2 but is {}",
            chunk_size
        )));
    }

    let bytes = sequence.as_bytes();
    let length = bytes.len() as i64;
    let mut result = Vec::new();
    let mut index = 0;
    loop {
        let (start, end) = sequence_chunk_span(index, chunk_size);
        if start > length {
            break;
        }
        let end = end.min(length);
        result.push(ChunkRecord {
            chromosome: chromosome.to_string(),
            start,
            end,
            chunk_ids: vec![ChunkId::new(chromosome, index, chunk_size).to_string()],
            source: None,
            values: None,
            sequence: Some(
                String::from_utf8_lossy(&bytes[(start - 1) as usize..end as usize]).into_owned(),
            ),
        });
        index += 1;
    }

    Ok(result)
}
