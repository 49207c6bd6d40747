//! Interval frequencies: feature counts per fixed-width bin, e.g., for histogram tracks.

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use serde::Serialize;

use crate::chunks::check_region;
use crate::data::interface::Provider;
use crate::options::QueryOptions;
use crate::region::Region;

pub use crate::binning::error::Error;

mod error {
    /// Error type for interval frequency computation.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("invalid region: {0}")]
        InvalidRegion(String),
        #[error("storage unavailable")]
        StorageUnavailable(#[from] crate::data::error::Error),
    }

    impl From<crate::chunks::Error> for Error {
        fn from(value: crate::chunks::Error) -> Self {
            Error::InvalidRegion(value.to_string())
        }
    }
}

/// Bin width used if none or a non-positive one is given.
pub const DEFAULT_INTERVAL_SIZE: i64 = 50_000;

/// Configuration for the `IntervalFrequencyBinner`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub default_interval_size: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_interval_size: DEFAULT_INTERVAL_SIZE,
        }
    }
}

/// Feature count of one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalBin {
    pub chromosome: String,
    /// Absolute bin index, i.e., `start / interval_size`.
    pub index: i64,
    pub start: i64,
    pub end: i64,
    pub raw_count: u64,
    /// `ln(raw_count)`, or `0` for empty bins.
    pub normalized_count: f64,
}

fn check_interval_size(interval_size: i64) -> Result<(), Error> {
    if interval_size <= 0 {
        Err(Error::InvalidRegion(format!(
            "interval size must be positive but is {}",
            interval_size
        )))
    } else {
        Ok(())
    }
}

/// Index of the bin containing `position`, counted from `region_start`.
pub fn compute_bin_index(
    position: i64,
    region_start: i64,
    interval_size: i64,
) -> Result<i64, Error> {
    check_interval_size(interval_size)?;
    Ok((position - region_start) / interval_size)
}

/// Expand grouped counts into the dense, ascending list of bins covering `region`.
///
/// `grouped_counts` holds `(absolute bin index, count)` pairs in any order; counts of repeated
/// indices are summed and indices outside the region's bins are dropped.  Bins without a count
/// are reported with zero.
pub fn aggregate<I>(
    region: &Region,
    interval_size: i64,
    grouped_counts: I,
) -> Result<Vec<IntervalBin>, Error>
where
    I: IntoIterator<Item = (i64, u64)>,
{
    check_interval_size(interval_size)?;
    check_region(region)?;

    let mut counts: AHashMap<i64, u64> = AHashMap::new();
    for (index, count) in grouped_counts {
        *counts.entry(index).or_default() += count;
    }

    let first_bin = region.start / interval_size;
    let last_bin = region.end / interval_size;
    Ok((first_bin..=last_bin)
        .map(|index| {
            let raw_count = counts.get(&index).copied().unwrap_or_default();
            IntervalBin {
                chromosome: region.chromosome.clone(),
                index,
                start: (index * interval_size).max(1),
                end: index * interval_size + interval_size - 1,
                raw_count,
                normalized_count: if raw_count > 0 {
                    (raw_count as f64).ln()
                } else {
                    0.0
                },
            }
        })
        .collect())
}

/// Computes interval frequencies from the store-side group-by of a `Provider`.
pub struct IntervalFrequencyBinner {
    config: Config,
    provider: Arc<dyn Provider + Send + Sync>,
}

impl std::fmt::Debug for IntervalFrequencyBinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalFrequencyBinner")
            .field("config", &self.config)
            .field("provider", &"...")
            .finish()
    }
}

impl IntervalFrequencyBinner {
    pub fn new(config: Config, provider: Arc<dyn Provider + Send + Sync>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Count the features of `collection` per bin of `region`.
    ///
    /// # Arguments
    ///
    /// * `collection` -- name of the feature collection, e.g., `"gene"`
    /// * `region` -- region to compute frequencies for
    /// * `interval_size` -- bin width, the configured default if `None` or not positive
    pub fn interval_frequencies(
        &self,
        collection: &str,
        region: &Region,
        interval_size: Option<i64>,
    ) -> Result<Vec<IntervalBin>, Error> {
        let interval_size = interval_size
            .filter(|size| *size > 0)
            .unwrap_or(self.config.default_interval_size);
        check_interval_size(interval_size)?;
        check_region(region)?;

        let start = Instant::now();
        let rows = self
            .provider
            .count_features_by_bin(collection, region, interval_size)?;
        log::debug!(
            "counting {} in {} by bins of {} took {:?}",
            collection,
            region,
            interval_size,
            start.elapsed()
        );

        aggregate(
            region,
            interval_size,
            rows.into_iter().map(|row| (row.bin.round() as i64, row.count)),
        )
    }

    /// Like `interval_frequencies()` but with the bin width from query options.
    pub fn interval_frequencies_with_options(
        &self,
        collection: &str,
        region: &Region,
        options: &QueryOptions,
    ) -> Result<Vec<IntervalBin>, Error> {
        self.interval_frequencies(collection, region, options.interval_size)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{
        aggregate, compute_bin_index, Config, Error, IntervalBin, IntervalFrequencyBinner,
    };
    use crate::data::error::Error as DataError;
    use crate::data::interface::{self, BinCountRow, ChunkQuery, ChunkRecord, FeatureRecord};
    use crate::data::json;
    use crate::options::QueryOptions;
    use crate::region::Region;

    fn bin(index: i64, start: i64, end: i64, raw_count: u64) -> IntervalBin {
        IntervalBin {
            chromosome: "1".to_string(),
            index,
            start,
            end,
            raw_count,
            normalized_count: if raw_count > 0 {
                (raw_count as f64).ln()
            } else {
                0.0
            },
        }
    }

    #[rstest]
    #[case(100, 100, 10, 0)]
    #[case(109, 100, 10, 0)]
    #[case(110, 100, 10, 1)]
    #[case(125_000, 0, 50_000, 2)]
    fn bin_index(
        #[case] position: i64,
        #[case] region_start: i64,
        #[case] interval_size: i64,
        #[case] expected: i64,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(compute_bin_index(position, region_start, interval_size)?, expected);

        Ok(())
    }

    #[test_log::test]
    fn bin_index_invalid() {
        assert!(matches!(compute_bin_index(1, 1, 0), Err(Error::InvalidRegion(_))));
    }

    #[test_log::test]
    fn middle_bin_only() -> Result<(), anyhow::Error> {
        let region = Region::new("1", 100, 129);

        let result = aggregate(&region, 10, vec![(11, 4)])?;

        assert_eq!(
            result,
            vec![bin(10, 100, 109, 0), bin(11, 110, 119, 4), bin(12, 120, 129, 0)]
        );
        assert_eq!(result[1].normalized_count, 4f64.ln());

        Ok(())
    }

    #[test_log::test]
    fn first_bin_starts_at_one() -> Result<(), anyhow::Error> {
        let result = aggregate(&Region::new("1", 1, 25), 10, vec![(0, 1), (2, 3)])?;

        assert_eq!(
            result,
            vec![bin(0, 1, 9, 1), bin(1, 10, 19, 0), bin(2, 20, 29, 3)]
        );
        assert_eq!(result[0].normalized_count, 0.0);

        Ok(())
    }

    #[test_log::test]
    fn duplicates_are_summed_and_foreign_bins_dropped() -> Result<(), anyhow::Error> {
        let result = aggregate(
            &Region::new("1", 20, 39),
            10,
            vec![(3, 1), (2, 2), (3, 5), (7, 100)],
        )?;

        assert_eq!(result, vec![bin(2, 20, 29, 2), bin(3, 30, 39, 6)]);

        Ok(())
    }

    #[test_log::test]
    fn aggregate_is_idempotent() -> Result<(), anyhow::Error> {
        let region = Region::new("1", 1, 200_000);
        let counts = vec![(0, 3), (3, 7), (1, 1)];

        let first = aggregate(&region, 50_000, counts.clone())?;
        let second = aggregate(&region, 50_000, counts)?;

        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        assert_eq!(
            first.iter().map(|bin| bin.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );

        Ok(())
    }

    #[test_log::test]
    fn aggregate_invalid() {
        let run = |region: Region, interval_size: i64| {
            aggregate(&region, interval_size, Vec::<(i64, u64)>::new())
        };

        assert!(run(Region::new("1", 20, 10), 10).is_err());
        assert!(run(Region::new("1", 0, 10), 10).is_err());
        assert!(run(Region::new("1", 1, 10), 0).is_err());
    }

    fn build_binner() -> IntervalFrequencyBinner {
        let features = vec![(5, 8), (12, 14), (15, 40), (18, 19), (95, 120)]
            .into_iter()
            .map(|(start, end)| FeatureRecord {
                chromosome: "1".to_string(),
                start,
                end,
            })
            .collect();
        let provider = json::Provider::default().with_features("gene", features);
        IntervalFrequencyBinner::new(Config::default(), Arc::new(provider))
    }

    #[test_log::test]
    fn interval_frequencies() -> Result<(), anyhow::Error> {
        let binner = build_binner();

        let result = binner.interval_frequencies("gene", &Region::new("1", 10, 39), Some(10))?;

        assert_eq!(
            result,
            vec![bin(1, 10, 19, 3), bin(2, 20, 29, 0), bin(3, 30, 39, 0)]
        );

        Ok(())
    }

    #[rstest]
    #[case(None)]
    #[case(Some(0))]
    #[case(Some(-10))]
    fn interval_frequencies_default_size(
        #[case] interval_size: Option<i64>,
    ) -> Result<(), anyhow::Error> {
        let binner = build_binner();

        let result =
            binner.interval_frequencies("gene", &Region::new("1", 1, 100), interval_size)?;

        assert_eq!(result, vec![bin(0, 1, 49_999, 5)]);

        Ok(())
    }

    #[test_log::test]
    fn interval_frequencies_with_options() -> Result<(), anyhow::Error> {
        let binner = build_binner();
        let options = QueryOptions::from_pairs([("intervalSize", "100")])?;

        let result =
            binner.interval_frequencies_with_options("gene", &Region::new("1", 1, 199), &options)?;

        assert_eq!(result, vec![bin(0, 1, 99, 5), bin(1, 100, 199, 0)]);

        Ok(())
    }

    /// Provider returning fixed rows with float bin keys.
    struct FloatBinProvider;

    impl interface::Provider for FloatBinProvider {
        fn data_version(&self) -> &str {
            "float"
        }

        fn fetch_chunks(
            &self,
            _collection: &str,
            queries: &[ChunkQuery],
        ) -> Result<Vec<Vec<ChunkRecord>>, DataError> {
            Ok(vec![Vec::new(); queries.len()])
        }

        fn count_features_by_bin(
            &self,
            _collection: &str,
            _region: &Region,
            _interval_size: i64,
        ) -> Result<Vec<BinCountRow>, DataError> {
            Ok(vec![
                BinCountRow {
                    bin: 0.9999999,
                    count: 2,
                },
                BinCountRow { bin: 1.0, count: 1 },
                BinCountRow {
                    bin: 2.0000001,
                    count: 5,
                },
            ])
        }
    }

    #[test_log::test]
    fn float_bin_keys_are_rounded() -> Result<(), anyhow::Error> {
        let binner = IntervalFrequencyBinner::new(Config::default(), Arc::new(FloatBinProvider));

        let result =
            binner.interval_frequencies("variation", &Region::new("1", 10, 29), Some(10))?;

        assert_eq!(result, vec![bin(1, 10, 19, 3), bin(2, 20, 29, 5)]);

        Ok(())
    }

    #[test_log::test]
    fn interval_frequencies_unknown_collection() {
        let binner = build_binner();

        assert!(matches!(
            binner.interval_frequencies("variation", &Region::new("1", 1, 10), None),
            Err(Error::StorageUnavailable(DataError::UnknownCollection(_)))
        ));
    }
}
