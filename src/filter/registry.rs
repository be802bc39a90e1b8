use crate::bio::Sequence;
use crate::core::config::FilterSpec;
use crate::filter::{
    AlphabetFilter, BooleanFilter, FilterChain, MaskFilter, MeasurementFilter, OrfFilter,
    RangeFilter, RedundancyFilter, SequenceFilter,
};
use crate::measure::AttributeVector;
use crate::OligoError;
use indexmap::IndexMap;

pub type SequenceFilterFactory = Box<dyn Fn() -> Box<SequenceFilter> + Send + Sync>;
pub type MeasurementFilterFactory =
    Box<dyn Fn() -> Box<MeasurementFilter> + Send + Sync>;

/// Name-keyed factories for both filter kinds
#[derive(Default)]
pub struct FilterRegistry {
    sequence: IndexMap<String, SequenceFilterFactory>,
    measurement: IndexMap<String, MeasurementFilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_sequence(AlphabetFilter::NAME, || Box::new(AlphabetFilter::default()));
        registry.register_sequence(MaskFilter::NAME, || Box::new(MaskFilter::default()));
        registry.register_sequence(RedundancyFilter::NAME, || Box::new(RedundancyFilter::new()));

        registry.register_measurement(BooleanFilter::NAME, || Box::new(BooleanFilter::default()));
        registry.register_measurement(RangeFilter::NAME, || Box::new(RangeFilter::default()));
        registry.register_measurement(OrfFilter::NAME, || Box::new(OrfFilter::new()));
        registry.register_measurement(RedundancyFilter::NAME, || {
            Box::new(RedundancyFilter::new())
        });
        registry
    }

    pub fn register_sequence<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<SequenceFilter> + Send + Sync + 'static,
    {
        self.sequence
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn register_measurement<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<MeasurementFilter> + Send + Sync + 'static,
    {
        self.measurement
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn sequence_filters(&self) -> impl Iterator<Item = &str> {
        self.sequence.keys().map(String::as_str)
    }

    pub fn measurement_filters(&self) -> impl Iterator<Item = &str> {
        self.measurement.keys().map(String::as_str)
    }

    pub fn create_sequence(&self, name: &str) -> Result<Box<SequenceFilter>, OligoError> {
        let factory = self
            .sequence
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| OligoError::Config(format!("unknown sequence filter: {}", name)))?;
        Ok(factory())
    }

    pub fn create_measurement(
        &self,
        name: &str,
    ) -> Result<Box<MeasurementFilter>, OligoError> {
        let factory = self
            .measurement
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| OligoError::Config(format!("unknown measurement filter: {}", name)))?;
        Ok(factory())
    }

    pub fn sequence_chain(&self, specs: &[FilterSpec]) -> Result<FilterChain<Sequence>, OligoError> {
        let mut chain = FilterChain::new();
        for spec in specs {
            let mut filter = self.create_sequence(&spec.name)?;
            for (key, value) in &spec.params {
                filter.set_parameter(key, value)?;
            }
            chain.push(filter);
        }
        Ok(chain)
    }

    pub fn measurement_chain(
        &self,
        specs: &[FilterSpec],
    ) -> Result<FilterChain<AttributeVector>, OligoError> {
        let mut chain = FilterChain::new();
        for spec in specs {
            let mut filter = self.create_measurement(&spec.name)?;
            for (key, value) in &spec.params {
                filter.set_parameter(key, value)?;
            }
            chain.push(filter);
        }
        Ok(chain)
    }
}
