use crate::bio::Sequence;
use crate::core::config::MeasurementSpec;
use crate::measure::{Measurement, MeasurementRegistry, Value};
use crate::OligoError;
use std::collections::HashMap;
use tracing::warn;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Per-candidate attribute vector.
///
/// Holds an ordered list of measurements, an index-aligned array of computed
/// values and a weight per measurement. One instance is reused across all
/// candidates of a run: `bind` a sequence, `compute`, then `score` or persist.
pub struct AttributeVector {
    id: i64,
    sequence: Option<Sequence>,
    measurements: Vec<Box<dyn Measurement>>,
    weights: Vec<f64>,
    values: Vec<Value>,
    index: HashMap<String, usize>,
}

impl Default for AttributeVector {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeVector {
    pub fn new() -> Self {
        Self {
            id: 0,
            sequence: None,
            measurements: Vec::new(),
            weights: Vec::new(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a vector from configured measurement specs
    pub fn from_specs(
        registry: &MeasurementRegistry,
        specs: &[MeasurementSpec],
    ) -> Result<Self, OligoError> {
        let mut vector = Self::new();
        for spec in specs {
            let measurement = registry.build(&spec.name, &spec.params)?;
            vector.add_measurement(measurement, spec.weight)?;
        }
        if !specs.is_empty() && !vector.is_weight_sum_one() {
            warn!(
                "Measurement weights sum to {:.4}, expected 1.0",
                vector.weight_sum()
            );
        }
        Ok(vector)
    }

    /// Build a vector from an ordered list of names with unit weights
    pub fn from_names<S: AsRef<str>>(
        registry: &MeasurementRegistry,
        names: &[S],
    ) -> Result<Self, OligoError> {
        let mut vector = Self::new();
        for name in names {
            vector.add_measurement(registry.create(name.as_ref())?, 1.0)?;
        }
        Ok(vector)
    }

    pub fn add_measurement(
        &mut self,
        measurement: Box<dyn Measurement>,
        weight: f64,
    ) -> Result<usize, OligoError> {
        let key = measurement.name().to_ascii_lowercase();
        if self.index.contains_key(&key) {
            return Err(OligoError::Config(format!(
                "measurement '{}' added twice",
                measurement.name()
            )));
        }

        let idx = self.measurements.len();
        self.index.insert(key, idx);
        self.measurements.push(measurement);
        self.weights.push(weight);
        self.values.push(Value::default());
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    /// Bind the candidate that the next `compute` runs against
    pub fn bind(&mut self, sequence: Sequence) {
        self.id = sequence.id;
        self.sequence = Some(sequence);
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn take_sequence(&mut self) -> Option<Sequence> {
        self.sequence.take()
    }

    /// Position of a measurement, case-insensitive
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn names(&self) -> Vec<String> {
        self.measurements
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    pub fn measurement(&self, idx: usize) -> Option<&dyn Measurement> {
        self.measurements.get(idx).map(|m| m.as_ref())
    }

    pub fn weight(&self, idx: usize) -> Option<f64> {
        self.weights.get(idx).copied()
    }

    pub fn set_weight(&mut self, name: &str, weight: f64) -> Result<(), OligoError> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| OligoError::Config(format!("unknown measurement: {}", name)))?;
        self.weights[idx] = weight;
        Ok(())
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Validation helper; a mismatch is never fatal
    pub fn is_weight_sum_one(&self) -> bool {
        (self.weight_sum() - 1.0).abs() < WEIGHT_TOLERANCE
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.index_of(name).and_then(|idx| self.values.get(idx))
    }

    /// Replace the whole value array, keeping the measurement list.
    ///
    /// Values must line up with the measurements in count and type.
    pub fn set_values(&mut self, values: Vec<Value>) -> Result<(), OligoError> {
        if values.len() != self.measurements.len() {
            return Err(OligoError::Parse(format!(
                "record {} has {} values, expected {}",
                self.id,
                values.len(),
                self.measurements.len()
            )));
        }
        for (value, measurement) in values.iter().zip(&self.measurements) {
            if value.value_type() != measurement.value_type() {
                return Err(OligoError::Parse(format!(
                    "record {}: '{}' holds a {} value, expected {}",
                    self.id,
                    measurement.name(),
                    value.value_type(),
                    measurement.value_type()
                )));
            }
        }
        self.values = values;
        Ok(())
    }

    /// Run every measurement against the bound sequence
    pub fn compute(&mut self, collect_stats: bool) -> Result<(), OligoError> {
        let sequence = self.sequence.as_ref().ok_or_else(|| {
            OligoError::Other("compute called without a bound sequence".to_string())
        })?;

        for (slot, measurement) in self.values.iter_mut().zip(&self.measurements) {
            *slot = measurement.compute(sequence);
        }
        if collect_stats {
            self.accumulate_stats();
        }
        Ok(())
    }

    /// Feed the current values into each measurement's statistics
    pub fn accumulate_stats(&mut self) {
        for (measurement, value) in self.measurements.iter_mut().zip(&self.values) {
            measurement.add_to_stats(value);
        }
    }

    pub fn reset_stats(&mut self) {
        for measurement in &mut self.measurements {
            measurement.reset_stats();
        }
    }

    /// Weighted sum of per-measurement scores
    pub fn score(&self) -> f64 {
        self.measurements
            .iter()
            .zip(&self.weights)
            .zip(&self.values)
            .map(|((m, w), v)| w * m.score(v))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::ValueType;

    struct Fixed {
        name: String,
        score: f64,
    }

    impl Measurement for Fixed {
        fn name(&self) -> &str {
            &self.name
        }

        fn value_type(&self) -> ValueType {
            ValueType::Float
        }

        fn compute(&self, sequence: &Sequence) -> Value {
            Value::Float(sequence.len() as f64)
        }

        fn score(&self, _value: &Value) -> f64 {
            self.score
        }
    }

    fn fixed(name: &str, score: f64) -> Box<dyn Measurement> {
        Box::new(Fixed {
            name: name.to_string(),
            score,
        })
    }

    #[test]
    fn test_score_aggregation() {
        let mut vector = AttributeVector::new();
        vector.add_measurement(fixed("a", 0.2), 0.5).unwrap();
        vector.add_measurement(fixed("b", 0.5), 0.25).unwrap();
        vector.add_measurement(fixed("c", 0.3), 0.25).unwrap();

        assert!(vector.is_weight_sum_one());
        assert!((vector.score() - 0.275).abs() < 1e-12);
    }

    #[test]
    fn test_index_of_case_insensitive() {
        let mut vector = AttributeVector::new();
        vector.add_measurement(fixed("GcContent", 0.0), 1.0).unwrap();
        assert_eq!(vector.index_of("gccontent"), Some(0));
        assert_eq!(vector.index_of("GCCONTENT"), Some(0));
        assert_eq!(vector.index_of("missing"), None);
    }

    #[test]
    fn test_duplicate_measurement_rejected() {
        let mut vector = AttributeVector::new();
        vector.add_measurement(fixed("a", 0.0), 1.0).unwrap();
        assert!(vector.add_measurement(fixed("A", 0.0), 1.0).is_err());
    }

    #[test]
    fn test_compute_requires_sequence() {
        let mut vector = AttributeVector::new();
        vector.add_measurement(fixed("a", 0.0), 1.0).unwrap();
        assert!(vector.compute(false).is_err());

        vector.bind(Sequence::new(7, "x", b"ACG".to_vec()));
        vector.compute(false).unwrap();
        assert_eq!(vector.id(), 7);
        assert_eq!(vector.values(), &[Value::Float(3.0)]);
    }

    #[test]
    fn test_set_values_checks_shape() {
        let mut vector = AttributeVector::new();
        vector.add_measurement(fixed("a", 0.0), 1.0).unwrap();
        assert!(vector.set_values(vec![]).is_err());
        assert!(vector.set_values(vec![Value::Integer(1)]).is_err());
        vector.set_values(vec![Value::Float(2.5)]).unwrap();
        assert_eq!(vector.value_by_name("A"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_weight_sum_mismatch_is_not_fatal() {
        let mut vector = AttributeVector::new();
        vector.add_measurement(fixed("a", 1.0), 0.7).unwrap();
        vector.add_measurement(fixed("b", 1.0), 0.7).unwrap();
        assert!(!vector.is_weight_sum_one());
        assert!((vector.score() - 1.4).abs() < 1e-12);
    }
}
