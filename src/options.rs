//! Per-query options passed through from callers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::region::Strand;

pub use crate::options::error::Error;

mod error {
    /// Error type for query options.
    #[derive(thiserror::Error, Debug, PartialEq)]
    pub enum Error {
        #[error("option {0} must be an integer but is {1:?}")]
        InvalidInteger(String, String),
        #[error("invalid strand option")]
        InvalidStrand(#[from] crate::region::Error),
    }
}

/// Options of one query.
///
/// Unset values fall back to the configuration of the store or binner answering the query.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Overrides the chunk size of the queried collection.
    pub chunk_size: Option<i64>,
    /// Overrides the bin width of interval frequency queries.
    pub interval_size: Option<i64>,
    /// Limits score queries to these sources.
    pub sources: Option<Vec<String>>,
    /// Strand of sequence queries.
    pub strand: Strand,
}

fn parse_integer(key: &str, value: &str) -> Result<i64, Error> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_e| Error::InvalidInteger(key.to_string(), value.to_string()))
}

impl QueryOptions {
    /// Build options from key/value pairs, e.g., the query string of a request.
    ///
    /// Recognized keys are `chunkSize`, `intervalSize`, `source` (comma separated) and `strand`,
    /// all other keys are ignored.  Later pairs override earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut result = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "chunkSize" => result.chunk_size = Some(parse_integer(key, value)?),
                "intervalSize" => result.interval_size = Some(parse_integer(key, value)?),
                "source" => {
                    let sources = value
                        .split(',')
                        .map(str::trim)
                        .filter(|source| !source.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>();
                    result.sources = if sources.is_empty() {
                        None
                    } else {
                        Some(sources)
                    };
                }
                "strand" => result.strand = value.parse()?,
                _ => log::trace!("ignoring query option {}", key),
            }
        }
        Ok(result)
    }
}

impl TryFrom<&IndexMap<String, String>> for QueryOptions {
    type Error = Error;

    fn try_from(value: &IndexMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_pairs(value)
    }
}
