//! Pluggable per-candidate measurements.
//!
//! A [`Measurement`] turns a [`Sequence`] into a typed [`Value`] and maps that
//! value onto a score. Measurements are instantiated by name through a
//! [`MeasurementRegistry`] and grouped, with weights, into an
//! [`AttributeVector`].

pub mod builtin;
pub mod registry;
pub mod vector;

pub use registry::{MeasurementFactory, MeasurementRegistry};
pub use vector::AttributeVector;

use crate::bio::Sequence;
use crate::OligoError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Float,
    Integer,
    String,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Float => "float",
            ValueType::Integer => "integer",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
        };
        write!(f, "{}", s)
    }
}

/// A computed measurement value carrying its own type tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Integer(_) => ValueType::Integer,
            Value::String(_) => ValueType::String,
            Value::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Numeric view; integers widen to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// Running population statistics (Welford)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = Some(self.min.map_or(x, |m| m.min(x)));
        self.max = Some(self.max.map_or(x, |m| m.max(x)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Standard score of `x`, or `None` while the population is degenerate
    pub fn z_score(&self, x: f64) -> Option<f64> {
        let sd = self.std_dev();
        if self.count < 2 || sd == 0.0 {
            None
        } else {
            Some((x - self.mean) / sd)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A named computation over a candidate sequence.
///
/// Implementations must be deterministic: `compute` is called once per
/// candidate and the resulting value may be persisted and scored later by a
/// fresh instance of the same measurement.
pub trait Measurement: Send {
    /// Registry name (compared case-insensitively)
    fn name(&self) -> &str;

    fn value_type(&self) -> ValueType;

    fn compute(&self, sequence: &Sequence) -> Value;

    /// Map a value onto a score, nominally in `[0, 1]`
    fn score(&self, value: &Value) -> f64;

    /// Configure from a string key/value pair
    fn set_parameter(&mut self, key: &str, _value: &str) -> Result<(), OligoError> {
        Err(OligoError::Config(format!(
            "measurement '{}' has no parameter '{}'",
            self.name(),
            key
        )))
    }

    /// Feed the running population statistics
    fn add_to_stats(&mut self, _value: &Value) {}

    fn statistics(&self) -> Option<&RunningStats> {
        None
    }

    fn reset_stats(&mut self) {}
}
