//! Candidate filters and filter chains.
//!
//! A [`Filter`] is a predicate over a subject: a raw [`Sequence`] before
//! measurement, or an [`AttributeVector`] after. Filters are configured with
//! string key/value pairs, initialized exactly once, then asked to accept
//! candidates one at a time.

pub mod basic;
pub mod orf;
pub mod redundancy;
pub mod registry;

pub use basic::{AlphabetFilter, BooleanFilter, MaskFilter, RangeFilter};
pub use orf::OrfFilter;
pub use redundancy::RedundancyFilter;
pub use registry::FilterRegistry;

use crate::bio::Sequence;
use crate::measure::{AttributeVector, Value};
use crate::resources::ResourceCache;
use crate::OligoError;
use serde::{Deserialize, Serialize};

pub trait Filter<S: ?Sized>: Send {
    fn name(&self) -> &str;

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError>;

    /// Resolve resources and check required parameters; runs once
    fn init(&mut self, _resources: &ResourceCache) -> Result<(), OligoError> {
        Ok(())
    }

    /// Measurements this filter reads, checked before any candidate is seen
    fn required_measurements(&self) -> Vec<String> {
        Vec::new()
    }

    fn accept(&mut self, subject: &mut S) -> Result<bool, OligoError>;
}

pub type SequenceFilter = dyn Filter<Sequence>;
pub type MeasurementFilter = dyn Filter<AttributeVector>;

/// Lazily resolved, cached position of a measurement in an attribute vector
#[derive(Debug, Clone)]
pub struct MeasurementSlot {
    name: String,
    index: Option<usize>,
}

impl MeasurementSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.index = None;
    }

    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn resolve(&mut self, vector: &AttributeVector) -> Result<usize, OligoError> {
        if let Some(idx) = self.index {
            return Ok(idx);
        }
        let idx = vector.index_of(&self.name).ok_or_else(|| {
            OligoError::Config(format!(
                "measurement '{}' is not part of the attribute vector",
                self.name
            ))
        })?;
        self.index = Some(idx);
        Ok(idx)
    }

    pub fn value<'a>(&mut self, vector: &'a AttributeVector) -> Result<&'a Value, OligoError> {
        let idx = self.resolve(vector)?;
        vector.value(idx).ok_or_else(|| {
            OligoError::Other(format!("no value for measurement '{}'", self.name))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub name: String,
    pub rejected: u64,
}

/// Ordered filters; the first rejection short-circuits
pub struct FilterChain<S: ?Sized> {
    filters: Vec<Box<dyn Filter<S>>>,
    rejected: Vec<u64>,
    seen: u64,
    initialized: bool,
}

impl<S: ?Sized> Default for FilterChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> FilterChain<S> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            rejected: Vec::new(),
            seen: 0,
            initialized: false,
        }
    }

    pub fn push(&mut self, filter: Box<dyn Filter<S>>) {
        self.filters.push(filter);
        self.rejected.push(0);
        self.initialized = false;
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn required_measurements(&self) -> Vec<String> {
        self.filters
            .iter()
            .flat_map(|f| f.required_measurements())
            .collect()
    }

    pub fn init(&mut self, resources: &ResourceCache) -> Result<(), OligoError> {
        if self.initialized {
            return Err(OligoError::Other(
                "filter chain initialized twice".to_string(),
            ));
        }
        for filter in &mut self.filters {
            filter.init(resources)?;
        }
        self.initialized = true;
        Ok(())
    }

    pub fn accept_all(&mut self, subject: &mut S) -> Result<bool, OligoError> {
        if !self.initialized {
            return Err(OligoError::Other(
                "filter chain used before init".to_string(),
            ));
        }

        self.seen += 1;
        for (idx, filter) in self.filters.iter_mut().enumerate() {
            if !filter.accept(subject)? {
                self.rejected[idx] += 1;
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn accepted(&self) -> u64 {
        self.seen - self.rejected.iter().sum::<u64>()
    }

    pub fn stats(&self) -> Vec<FilterStats> {
        self.filters
            .iter()
            .zip(&self.rejected)
            .map(|(f, &rejected)| FilterStats {
                name: f.name().to_string(),
                rejected,
            })
            .collect()
    }
}

/// Check that every measurement a chain reads is present in `vector`
pub fn check_required<S: ?Sized>(
    chain: &FilterChain<S>,
    vector: &AttributeVector,
) -> Result<(), OligoError> {
    for name in chain.required_measurements() {
        if vector.index_of(&name).is_none() {
            return Err(OligoError::Config(format!(
                "filter requires measurement '{}', which is not configured",
                name
            )));
        }
    }
    Ok(())
}
