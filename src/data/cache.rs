//! Caching decorator for providers.

use std::sync::Arc;

use quick_cache::sync::Cache;

use crate::data::error::Error;
use crate::data::interface::{self, BinCountRow, ChunkQuery, ChunkRecord};
use crate::region::Region;

/// Configuration for the `data::cache::Provider`.
#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    /// Maximal number of cached query answers.
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

type CacheKey = (String, ChunkQuery);

/// Provider that caches the answers to chunk queries of an inner provider.
///
/// Only queries missing from the cache are passed on, still as one batch.  Feature counts are
/// not cached.
pub struct Provider {
    inner: Arc<dyn interface::Provider + Send + Sync>,
    chunks: Cache<CacheKey, Vec<ChunkRecord>>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("inner", &"...")
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl Provider {
    pub fn new(config: &Config, inner: Arc<dyn interface::Provider + Send + Sync>) -> Self {
        Self {
            inner,
            chunks: Cache::new(config.capacity),
        }
    }
}

impl interface::Provider for Provider {
    fn data_version(&self) -> &str {
        self.inner.data_version()
    }

    fn fetch_chunks(
        &self,
        collection: &str,
        queries: &[ChunkQuery],
    ) -> Result<Vec<Vec<ChunkRecord>>, Error> {
        let keys = queries
            .iter()
            .map(|query| (collection.to_string(), query.clone()))
            .collect::<Vec<_>>();
        let mut result = keys
            .iter()
            .map(|key| self.chunks.get(key))
            .collect::<Vec<_>>();

        let missing = result
            .iter()
            .enumerate()
            .filter(|(_, records)| records.is_none())
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        log::trace!(
            "{} of {} chunk queries on {} answered from cache",
            queries.len() - missing.len(),
            queries.len(),
            collection
        );
        if missing.is_empty() {
            return Ok(result.into_iter().flatten().collect());
        }

        let missing_queries = missing
            .iter()
            .map(|idx| queries[*idx].clone())
            .collect::<Vec<_>>();
        let fetched = self.inner.fetch_chunks(collection, &missing_queries)?;
        if fetched.len() != missing_queries.len() {
            return Err(Error::ResultCountMismatch(
                missing_queries.len(),
                fetched.len(),
            ));
        }
        for (idx, records) in missing.into_iter().zip(fetched) {
            self.chunks.insert(keys[idx].clone(), records.clone());
            result[idx] = Some(records);
        }

        result
            .into_iter()
            .map(|records| records.ok_or_else(|| Error::ResultCountMismatch(queries.len(), 0)))
            .collect()
    }

    fn count_features_by_bin(
        &self,
        collection: &str,
        region: &Region,
        interval_size: i64,
    ) -> Result<Vec<BinCountRow>, Error> {
        self.inner
            .count_features_by_bin(collection, region, interval_size)
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::{Config, Provider};
    use crate::chunks::ChunkId;
    use crate::data::error::Error;
    use crate::data::interface::{self, BinCountRow, ChunkQuery, ChunkRecord, Provider as _};
    use crate::region::Region;

    /// Provider answering each query with one record and counting the queries it sees.
    #[derive(Default)]
    struct CountingProvider {
        queries: AtomicUsize,
        batches: AtomicUsize,
    }

    impl interface::Provider for CountingProvider {
        fn data_version(&self) -> &str {
            "counting"
        }

        fn fetch_chunks(
            &self,
            _collection: &str,
            queries: &[ChunkQuery],
        ) -> Result<Vec<Vec<ChunkRecord>>, Error> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.queries.fetch_add(queries.len(), Ordering::SeqCst);
            Ok(queries
                .iter()
                .map(|query| {
                    vec![ChunkRecord {
                        chromosome: query.chromosome.clone(),
                        start: query.start,
                        end: query.end,
                        chunk_ids: query.chunk_ids.clone(),
                        source: None,
                        values: Some(vec![]),
                        sequence: None,
                    }]
                })
                .collect())
        }

        fn count_features_by_bin(
            &self,
            _collection: &str,
            _region: &Region,
            _interval_size: i64,
        ) -> Result<Vec<BinCountRow>, Error> {
            Ok(vec![BinCountRow { bin: 0.0, count: 1 }])
        }
    }

    /// Provider answering only the first query of each batch.
    struct ShortProvider;

    impl interface::Provider for ShortProvider {
        fn data_version(&self) -> &str {
            "short"
        }

        fn fetch_chunks(
            &self,
            collection: &str,
            queries: &[ChunkQuery],
        ) -> Result<Vec<Vec<ChunkRecord>>, Error> {
            let mut result = CountingProvider::default().fetch_chunks(collection, queries)?;
            result.truncate(1);
            Ok(result)
        }

        fn count_features_by_bin(
            &self,
            _collection: &str,
            _region: &Region,
            _interval_size: i64,
        ) -> Result<Vec<BinCountRow>, Error> {
            Ok(vec![])
        }
    }

    fn query(start: i64) -> ChunkQuery {
        let region = Region::new("1", start, start + 10);
        ChunkQuery::new(&region, &[ChunkId::new("1", start / 2000, 2000)], None)
    }

    #[test]
    fn caches_per_query() -> Result<(), Error> {
        let inner = Arc::new(CountingProvider::default());
        let provider = Provider::new(&Config::default(), inner.clone());

        let first = provider.fetch_chunks("conservation", &[query(1), query(5000)])?;
        let second = provider.fetch_chunks("conservation", &[query(5000), query(9000), query(1)])?;

        assert_eq!(first.len(), 2);
        assert_eq!(
            second.iter().map(|r| r[0].start).collect::<Vec<_>>(),
            vec![5000, 9000, 1]
        );
        assert_eq!(inner.queries.load(Ordering::SeqCst), 3);
        assert_eq!(inner.batches.load(Ordering::SeqCst), 2);

        provider.fetch_chunks("conservation", &[query(9000), query(1)])?;
        assert_eq!(inner.batches.load(Ordering::SeqCst), 2);

        Ok(())
    }

    #[test]
    fn collections_are_separate() -> Result<(), Error> {
        let inner = Arc::new(CountingProvider::default());
        let provider = Provider::new(&Config::default(), inner.clone());

        provider.fetch_chunks("conservation", &[query(1)])?;
        provider.fetch_chunks("regulatory", &[query(1)])?;

        assert_eq!(inner.queries.load(Ordering::SeqCst), 2);

        Ok(())
    }

    #[test]
    fn short_answer_is_an_error() -> Result<(), Error> {
        let provider = Provider::new(&Config::default(), Arc::new(ShortProvider));

        assert!(matches!(
            provider.fetch_chunks("conservation", &[query(1), query(5000), query(9000)]),
            Err(Error::ResultCountMismatch(3, 1))
        ));
        // nothing of the failed batch is cached
        assert!(matches!(
            provider.fetch_chunks("conservation", &[query(5000), query(1)]),
            Err(Error::ResultCountMismatch(2, 1))
        ));
        assert_eq!(provider.fetch_chunks("conservation", &[query(1)])?.len(), 1);

        Ok(())
    }

    #[test]
    fn passes_through() -> Result<(), Error> {
        let provider = Provider::new(
            &Config::default(),
            Arc::new(CountingProvider::default()),
        );

        assert_eq!(provider.data_version(), "counting");
        assert_eq!(
            provider.count_features_by_bin("gene", &Region::new("1", 1, 10), 10)?,
            vec![BinCountRow { bin: 0.0, count: 1 }]
        );

        Ok(())
    }
}
