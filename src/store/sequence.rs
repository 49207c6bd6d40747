//! Genome sequence access on top of the chunked store.
//!
//! The genome sequence collection uses the common chunk layout with one exception: the first
//! chunk of each chromosome starts at position 1 rather than 0 and thus holds one nucleotide less
//! than the chunk size.  The layout lives in `chunks::sequence_chunk_span()` and is used by the
//! sequence path only.

use serde::Serialize;

use crate::data::interface::ChunkRecord;
use crate::options::QueryOptions;
use crate::region::{Region, Strand};
use crate::sequences::revcomp_bytes;
use crate::store::reconstruct::{reconstruct, Chunk};
use crate::store::{ChunkedRegionStore, Error};

pub use crate::chunks::{chunk_sequence, sequence_chunk_span, GENOME_SEQUENCE_COLLECTION};

/// Character used for positions not covered by any chunk.
pub const UNKNOWN_NUCLEOTIDE: u8 = b'N';

/// Sequence of a region on the requested strand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenomeSequence {
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// The sequence, read 5' to 3' on `strand`.
    pub sequence: String,
}

fn sequence_chunk(record: &ChunkRecord, chunk_size: i64) -> Option<Chunk<u8>> {
    let Some(sequence) = record.sequence.as_ref() else {
        log::warn!(
            "skipping sequence chunk {}:{}-{} without sequence",
            record.chromosome,
            record.start,
            record.end
        );
        return None;
    };

    let (expected_start, _) = sequence_chunk_span(record.start / chunk_size, chunk_size);
    if record.start != expected_start {
        log::warn!(
            "sequence chunk {}:{}-{} does not start at expected position {}",
            record.chromosome,
            record.start,
            record.end,
            expected_start
        );
    }

    Some(Chunk {
        source: None,
        start: record.start,
        values: sequence.bytes().map(Some).collect(),
    })
}

fn assemble(
    region: Region,
    records: &[ChunkRecord],
    chunk_size: i64,
    strand: Strand,
) -> Option<GenomeSequence> {
    let chunks = records
        .iter()
        .filter_map(|record| sequence_chunk(record, chunk_size));
    let (_, stitched) = reconstruct(&region, chunks).pop()?;

    let mut bytes = stitched
        .values
        .into_iter()
        .map(|nt| nt.unwrap_or(UNKNOWN_NUCLEOTIDE))
        .collect::<Vec<_>>();
    if strand == Strand::Reverse {
        bytes = revcomp_bytes(&bytes);
    }

    Some(GenomeSequence {
        chromosome: region.chromosome,
        start: region.start,
        end: region.end,
        strand,
        sequence: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Genome sequence queries.
impl ChunkedRegionStore {
    /// Fetch the sequences of `regions`, one entry per region in input order.
    ///
    /// An entry is `None` if no chunk was found for its region.
    ///
    /// # Arguments
    ///
    /// * `regions` -- regions to fetch the sequence of
    /// * `chunk_size` -- overrides the configured chunk size
    /// * `strand` -- strand to return the sequence on
    pub fn sequences(
        &self,
        regions: &[Region],
        chunk_size: Option<i64>,
        strand: Strand,
    ) -> Result<Vec<Option<GenomeSequence>>, Error> {
        let regions = regions
            .iter()
            .map(|region| self.config().prepare_region(region))
            .collect::<Result<Vec<_>, _>>()?;
        let chunk_size = chunk_size.unwrap_or(self.config().chunk_size);
        let records = self.fetch_chunks(&regions, Some(chunk_size), None)?;

        Ok(regions
            .into_iter()
            .zip(records)
            .map(|(region, records)| assemble(region, &records, chunk_size, strand))
            .collect())
    }

    /// Fetch the sequence of a single region.
    pub fn sequence(
        &self,
        region: &Region,
        chunk_size: Option<i64>,
        strand: Strand,
    ) -> Result<Option<GenomeSequence>, Error> {
        Ok(self
            .sequences(std::slice::from_ref(region), chunk_size, strand)?
            .into_iter()
            .next()
            .flatten())
    }

    /// Like `sequences()` but with chunk size and strand taken from query options.
    pub fn sequences_with_options(
        &self,
        regions: &[Region],
        options: &QueryOptions,
    ) -> Result<Vec<Option<GenomeSequence>>, Error> {
        self.sequences(regions, options.chunk_size, options.strand)
    }
}
