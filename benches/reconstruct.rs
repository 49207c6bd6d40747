use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use region_store::{
    data::{
        interface::{ChunkRecord, StoredValue},
        json,
    },
    region::{Region, Strand},
    store::{reconstruct, Chunk, ChunkedRegionStore, Config},
};

lazy_static::lazy_static! {
    /// Five score chunks of 2000 positions each, for two sources.
    static ref CHUNKS: Vec<Chunk<f32>> = {
        let mut result = Vec::new();
        for source in ["gerp", "phastCons"] {
            for index in 0..5 {
                let start = index * 2000;
                result.push(Chunk {
                    source: Some(source.to_string()),
                    start,
                    values: (0..2000).map(|i| Some(i as f32 / 2000.0)).collect(),
                });
            }
        }
        result
    };

    /// 1 Mbp of synthetic sequence.
    static ref SEQUENCE: String = "ACGTTGCAAC".repeat(100_000);
}

fn score_records() -> Vec<ChunkRecord> {
    CHUNKS
        .iter()
        .map(|chunk| ChunkRecord {
            chromosome: "1".to_string(),
            start: chunk.start,
            end: chunk.start + 1999,
            chunk_ids: vec![format!("1_{}_2k", chunk.start / 2000)],
            source: chunk.source.clone(),
            values: Some(
                chunk
                    .values
                    .iter()
                    .map(|value| StoredValue::from(value.map(f64::from)))
                    .collect(),
            ),
            sequence: None,
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let region = Region::new("1", 1500, 9500);
    c.bench_function("reconstruct 8 kbp x 2 sources", |b| {
        b.iter(|| reconstruct(&region, CHUNKS.iter().cloned()))
    });

    let store = ChunkedRegionStore::new(
        Config::default(),
        Arc::new(json::Provider::default().with_chunks("conservation", score_records())),
    );
    let regions = vec![Region::new("1", 1, 4000), Region::new("1", 3500, 9999)];
    c.bench_function("resolve_for_regions conservation", |b| {
        b.iter(|| store.resolve_for_regions(&regions, None, None).unwrap())
    });

    let provider = json::Provider::default()
        .with_contig("1", &SEQUENCE, 2000)
        .unwrap();
    let store = ChunkedRegionStore::new(Config::genome_sequence(), Arc::new(provider));
    let region = Region::new("1", 100_000, 150_000);
    c.bench_function("sequence 50 kbp reverse", |b| {
        b.iter(|| store.sequence(&region, None, Strand::Reverse).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
