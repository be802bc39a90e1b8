//! Reference measurement plugins.
//!
//! These are deliberately simple: they exist so a pipeline can be configured
//! end to end. Domain-grade scoring (melting temperature and the like) plugs
//! in through the same [`Measurement`] trait.

use crate::bio::Sequence;
use crate::measure::{Measurement, MeasurementRegistry, RunningStats, Value, ValueType};
use crate::utils::params::{parse_param, unknown_param};
use crate::OligoError;

pub fn register_all(registry: &mut MeasurementRegistry) {
    registry.register(NameMeasurement::NAME, || Box::new(NameMeasurement));
    registry.register(LengthMeasurement::NAME, || {
        Box::new(LengthMeasurement::default())
    });
    registry.register(GcContent::NAME, || Box::new(GcContent::default()));
    registry.register(Complexity::NAME, || Box::new(Complexity));
    registry.register(Homopolymer::NAME, || Box::new(Homopolymer::default()));
    registry.register(Masked::NAME, || Box::new(Masked));
}

/// The candidate's name, persisted so later stages can recover coordinates
pub struct NameMeasurement;

impl NameMeasurement {
    pub const NAME: &'static str = "name";
}

impl Measurement for NameMeasurement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn compute(&self, sequence: &Sequence) -> Value {
        Value::String(sequence.name.clone())
    }

    fn score(&self, _value: &Value) -> f64 {
        0.0
    }
}

/// Candidate length; scored by distance to an optional target length
#[derive(Default)]
pub struct LengthMeasurement {
    target: Option<f64>,
}

impl LengthMeasurement {
    pub const NAME: &'static str = "length";
}

impl Measurement for LengthMeasurement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn value_type(&self) -> ValueType {
        ValueType::Integer
    }

    fn compute(&self, sequence: &Sequence) -> Value {
        Value::Integer(sequence.len() as i64)
    }

    fn score(&self, value: &Value) -> f64 {
        match (self.target, value.as_f64()) {
            (Some(target), Some(len)) if target > 0.0 => {
                (1.0 - (len - target).abs() / target).max(0.0)
            }
            _ => 1.0,
        }
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "target" => {
                self.target = Some(parse_param(Self::NAME, key, value)?);
                Ok(())
            }
            _ => Err(unknown_param(Self::NAME, key)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GcScoring {
    Target,
    ZScore,
}

/// GC fraction of the candidate
pub struct GcContent {
    target: f64,
    scoring: GcScoring,
    stats: RunningStats,
}

impl GcContent {
    pub const NAME: &'static str = "gc";

    fn target_score(&self, gc: f64) -> f64 {
        let span = self.target.max(1.0 - self.target);
        if span == 0.0 {
            return 1.0;
        }
        (1.0 - (gc - self.target).abs() / span).clamp(0.0, 1.0)
    }
}

impl Default for GcContent {
    fn default() -> Self {
        Self {
            target: 0.5,
            scoring: GcScoring::Target,
            stats: RunningStats::new(),
        }
    }
}

pub fn gc_fraction(letters: &[u8]) -> f64 {
    if letters.is_empty() {
        return 0.0;
    }
    let gc = letters
        .iter()
        .filter(|&&b| matches!(b, b'G' | b'C' | b'g' | b'c'))
        .count();
    gc as f64 / letters.len() as f64
}

impl Measurement for GcContent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn value_type(&self) -> ValueType {
        ValueType::Float
    }

    fn compute(&self, sequence: &Sequence) -> Value {
        Value::Float(gc_fraction(&sequence.letters))
    }

    fn score(&self, value: &Value) -> f64 {
        let gc = match value.as_f64() {
            Some(gc) => gc,
            None => return 0.0,
        };
        match self.scoring {
            GcScoring::Target => self.target_score(gc),
            GcScoring::ZScore => match self.stats.z_score(gc) {
                Some(z) => 1.0 / (1.0 + z.abs()),
                None => self.target_score(gc),
            },
        }
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "target" => {
                let target: f64 = parse_param(Self::NAME, key, value)?;
                if !(0.0..=1.0).contains(&target) {
                    return Err(OligoError::Config(format!(
                        "gc: target {} outside [0, 1]",
                        target
                    )));
                }
                self.target = target;
            }
            "scoring" => {
                self.scoring = match value.to_ascii_lowercase().as_str() {
                    "target" => GcScoring::Target,
                    "zscore" | "z-score" => GcScoring::ZScore,
                    other => {
                        return Err(OligoError::Config(format!(
                            "gc: unknown scoring mode '{}'",
                            other
                        )))
                    }
                };
            }
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        Ok(())
    }

    fn add_to_stats(&mut self, value: &Value) {
        if let Some(gc) = value.as_f64() {
            self.stats.push(gc);
        }
    }

    fn statistics(&self) -> Option<&RunningStats> {
        Some(&self.stats)
    }

    fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

/// Shannon entropy of the base composition, normalized to `[0, 1]`
pub struct Complexity;

impl Complexity {
    pub const NAME: &'static str = "complexity";
}

pub fn shannon_complexity(letters: &[u8]) -> f64 {
    let mut counts = [0usize; 4];
    for &b in letters {
        match b.to_ascii_uppercase() {
            b'A' => counts[0] += 1,
            b'C' => counts[1] += 1,
            b'G' => counts[2] += 1,
            b'T' => counts[3] += 1,
            _ => {}
        }
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let entropy: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    entropy / 2.0
}

impl Measurement for Complexity {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn value_type(&self) -> ValueType {
        ValueType::Float
    }

    fn compute(&self, sequence: &Sequence) -> Value {
        Value::Float(shannon_complexity(&sequence.letters))
    }

    fn score(&self, value: &Value) -> f64 {
        value.as_f64().unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

/// Longest run of a single base
pub struct Homopolymer {
    max_run: i64,
}

impl Homopolymer {
    pub const NAME: &'static str = "homopolymer";
}

impl Default for Homopolymer {
    fn default() -> Self {
        Self { max_run: 4 }
    }
}

pub fn longest_run(letters: &[u8]) -> usize {
    let mut best = 0;
    let mut run = 0;
    let mut prev = None;
    for &b in letters {
        let b = b.to_ascii_uppercase();
        if Some(b) == prev {
            run += 1;
        } else {
            run = 1;
            prev = Some(b);
        }
        best = best.max(run);
    }
    best
}

impl Measurement for Homopolymer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn value_type(&self) -> ValueType {
        ValueType::Integer
    }

    fn compute(&self, sequence: &Sequence) -> Value {
        Value::Integer(longest_run(&sequence.letters) as i64)
    }

    fn score(&self, value: &Value) -> f64 {
        match value {
            Value::Integer(run) if *run > self.max_run => self.max_run as f64 / *run as f64,
            Value::Integer(_) => 1.0,
            _ => 0.0,
        }
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "max_run" => {
                self.max_run = parse_param(Self::NAME, key, value)?;
                Ok(())
            }
            _ => Err(unknown_param(Self::NAME, key)),
        }
    }
}

/// True when the candidate contains soft-masked (lowercase) letters.
///
/// Sequence filters run before measurement, so a `mask` filter that
/// uppercases letters (its default) leaves this always false. Set
/// `uppercase = "false"` on that filter to keep the soft-masking visible.
pub struct Masked;

impl Masked {
    pub const NAME: &'static str = "masked";
}

impl Measurement for Masked {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn value_type(&self) -> ValueType {
        ValueType::Boolean
    }

    fn compute(&self, sequence: &Sequence) -> Value {
        Value::Boolean(sequence.letters.iter().any(|b| b.is_ascii_lowercase()))
    }

    fn score(&self, value: &Value) -> f64 {
        match value.as_bool() {
            Some(false) => 1.0,
            _ => 0.0,
        }
    }
}
