use crate::measure::{builtin, Measurement};
use crate::OligoError;
use indexmap::IndexMap;
use std::collections::BTreeMap;

pub type MeasurementFactory = Box<dyn Fn() -> Box<dyn Measurement> + Send + Sync>;

/// Name -> factory table for measurement types.
///
/// Built once at startup and passed by reference into every pipeline stage.
/// Names are stored lowercase, so lookups are case-insensitive.
#[derive(Default)]
pub struct MeasurementRegistry {
    factories: IndexMap<String, MeasurementFactory>,
}

impl MeasurementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in measurement
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Measurement> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Instantiate a fresh measurement
    pub fn create(&self, name: &str) -> Result<Box<dyn Measurement>, OligoError> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| OligoError::Config(format!("unknown measurement: {}", name)))?;
        Ok(factory())
    }

    /// Instantiate and configure a measurement
    pub fn build(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Box<dyn Measurement>, OligoError> {
        let mut measurement = self.create(name)?;
        for (key, value) in params {
            measurement.set_parameter(key, value)?;
        }
        Ok(measurement)
    }
}
