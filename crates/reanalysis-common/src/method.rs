//! Reduction methods, value predicates and existence semantics.
//!
//! These are closed enumerations parsed once at the query boundary; the
//! pipeline below never compares method names as strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, RasterResult};

/// How a group of cells or time steps is reduced to one value.
///
/// Every method skips `NaN`; a group holding only `NaN` reduces to `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    #[default]
    Mean,
    Max,
    Min,
}

impl AggregationMethod {
    /// Reduce values, accumulating in `f64`.
    pub fn reduce_f64<I>(self, values: I) -> f64
    where
        I: IntoIterator,
        I::Item: Into<f64>,
    {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;

        for v in values {
            let v: f64 = v.into();
            if v.is_nan() {
                continue;
            }
            sum += v;
            count += 1;
            max = max.max(v);
            min = min.min(v);
        }

        if count == 0 {
            return f64::NAN;
        }

        match self {
            Self::Mean => sum / count as f64,
            Self::Max => max,
            Self::Min => min,
        }
    }

    /// Reduce values to an `f32` cell value.
    pub fn reduce<I>(self, values: I) -> f32
    where
        I: IntoIterator<Item = f32>,
    {
        self.reduce_f64(values) as f32
    }

    /// Parse the value of a named parameter, so errors say which one was wrong.
    pub fn parse_param(param: &str, value: &str) -> RasterResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            _ => Err(RasterError::invalid_parameter(param, value)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

impl FromStr for AggregationMethod {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_param("aggregation_method", s)
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied between a cell value and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "!=")]
    Ne,
}

impl Predicate {
    /// Evaluate `value <op> threshold`. `NaN` never matches.
    pub fn matches(&self, value: f32, threshold: f32) -> bool {
        if value.is_nan() {
            return false;
        }
        match self {
            Self::Eq => value == threshold,
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Ge => value >= threshold,
            Self::Le => value <= threshold,
            Self::Ne => value != threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Ne => "!=",
        }
    }
}

impl FromStr for Predicate {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Self::Eq),
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Ge),
            "<=" => Ok(Self::Le),
            "!=" => Ok(Self::Ne),
            _ => Err(RasterError::invalid_parameter("criteria_predicate", s)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate paired with its threshold, e.g. `> 273.15`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub predicate: Predicate,
    pub threshold: f32,
}

impl Criteria {
    pub fn new(predicate: Predicate, threshold: f32) -> Self {
        Self {
            predicate,
            threshold,
        }
    }

    pub fn matches(&self, value: f32) -> bool {
        self.predicate.matches(value, self.threshold)
    }
}

/// Existence semantics when collapsing an axis of a criteria result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnyOrAll {
    Any,
    All,
}

impl AnyOrAll {
    /// Collapse flags along an axis.
    ///
    /// An empty axis is `false` for both variants so that `All` stays a
    /// subset of `Any`.
    pub fn collapse<I>(self, flags: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut seen = false;
        for flag in flags {
            seen = true;
            match (self, flag) {
                (Self::Any, true) => return true,
                (Self::All, false) => return false,
                _ => {}
            }
        }
        match self {
            Self::Any => false,
            Self::All => seen,
        }
    }
}

impl FromStr for AnyOrAll {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            _ => Err(RasterError::invalid_parameter("any_or_all", s)),
        }
    }
}
