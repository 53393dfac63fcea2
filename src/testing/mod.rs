use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

pub mod correction;
pub mod effect;
pub mod inference;

/// Significance strategy used to compare a test distribution against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Draws-without-replacement model; requires test counts within the reference
    Hypergeometric,
    /// Exact 2x2 contingency tables; valid for any non-negative counts
    FisherExact,
}

/// Column-wise reduction applied to the reference rows of the distribution matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
    Median,
}

/// Alternative hypothesis for a single exact test.
#[derive(Debug, Clone, Copy)]
pub enum Alternative {
    TwoSided,
    Less,
    Greater,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Hypergeometric => "hypergeometric",
            Method::FisherExact => "fisher-exact",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hypergeometric" => Ok(Method::Hypergeometric),
            "fisher-exact" => Ok(Method::FisherExact),
            _ => Err(anyhow!(
                "'{}' is not a known significance method (expected one of: hypergeometric, fisher-exact)",
                s
            )),
        }
    }
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            "median" => Ok(Aggregation::Median),
            _ => Err(anyhow!(
                "'{}' is not a known aggregation (expected one of: sum, mean, median)",
                s
            )),
        }
    }
}
