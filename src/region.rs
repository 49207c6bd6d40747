//! Genomic regions and strands as passed in by callers.

use std::fmt::Display;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::take_till1,
    character::complete::char,
    combinator::{all_consuming, map, opt},
    sequence::{preceded, separated_pair},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};

pub use crate::region::error::Error;

mod error {
    /// Error type for parsing regions and strands.
    #[derive(thiserror::Error, Debug, PartialEq)]
    pub enum Error {
        #[error("could not parse region from {0:?}")]
        InvalidRegionString(String),
        #[error("invalid strand {0:?}, expected one of 1, +, -1, -")]
        InvalidStrand(String),
    }
}

/// End used for a region given by chromosome name only, e.g., `"22"`.
pub const WHOLE_CHROMOSOME_END: i64 = i32::MAX as i64;

/// A genomic region with 1-based, inclusive coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
}

impl Region {
    pub fn new(chromosome: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
        }
    }

    /// Number of positions covered by the region, `0` for inverted regions.
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a comma-separated list of regions, e.g., `"1:100-200,2:5000"`.
    pub fn parse_list(value: &str) -> Result<Vec<Region>, Error> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Region::from_str)
            .collect()
    }
}

fn position(input: &str) -> IResult<&str, i64> {
    nom::character::complete::i64(input)
}

fn chromosome(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ':' || c == ',' || c.is_whitespace()).parse(input)
}

fn span(input: &str) -> IResult<&str, (i64, i64)> {
    alt((
        separated_pair(position, char('-'), position),
        map(position, |pos| (pos, pos)),
    ))
    .parse(input)
}

fn region(input: &str) -> IResult<&str, Region> {
    map(
        (chromosome, opt(preceded(char(':'), span))),
        |(chromosome, span)| {
            let (start, end) = span.unwrap_or((1, WHOLE_CHROMOSOME_END));
            Region::new(chromosome, start, end)
        },
    )
    .parse(input)
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(region)
            .parse(s.trim())
            .map(|(_, region)| region)
            .map_err(|_e| Error::InvalidRegionString(s.to_string()))
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// Strand of a sequence request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl FromStr for Strand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "+" => Ok(Strand::Forward),
            "-1" | "-" => Ok(Strand::Reverse),
            _ => Err(Error::InvalidStrand(s.to_string())),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "1"),
            Strand::Reverse => write!(f, "-1"),
        }
    }
}
