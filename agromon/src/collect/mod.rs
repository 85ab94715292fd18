pub mod financial;
pub mod global_variables;
pub mod http;
pub mod imagery;
pub mod satellite;
pub mod weather;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::geo_core::DateRange;

/// Result of a successful query: either data, or a valid query that matched nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    Observed(T),
    NoData,
}

impl<T> Outcome<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Outcome::NoData)
    }

    pub fn observed(self) -> Option<T> {
        match self {
            Outcome::Observed(value) => Some(value),
            Outcome::NoData => None,
        }
    }
}

/// Outcome of the imagery collectors
pub type CollectOutcome = Outcome<Observation>;

/// A collector's value for one region and period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Single index, e.g. mean NDVI
    Index {
        name: String,
        period: DateRange,
        value: f64,
        images: usize,
    },
    /// Named weather variables mapped to their regional means
    Variables {
        period: DateRange,
        values: BTreeMap<String, f64>,
        images: usize,
    },
}

impl Observation {
    pub fn period(&self) -> DateRange {
        match self {
            Observation::Index { period, .. } | Observation::Variables { period, .. } => *period,
        }
    }

    /// Look up a scalar by name: the index name, or a variable name
    pub fn get(&self, key: &str) -> Option<f64> {
        match self {
            Observation::Index { name, value, .. } => (name == key).then_some(*value),
            Observation::Variables { values, .. } => values.get(key).copied(),
        }
    }
}
