//! General-purpose filters over measurement values and raw letters.

use crate::bio::Sequence;
use crate::filter::{Filter, MeasurementSlot};
use crate::measure::{AttributeVector, Value};
use crate::resources::ResourceCache;
use crate::utils::params::{missing_param, parse_bool, parse_param, unknown_param};
use crate::OligoError;

/// Accepts when a boolean measurement equals the expected value
pub struct BooleanFilter {
    slot: MeasurementSlot,
    expected: bool,
}

impl BooleanFilter {
    pub const NAME: &'static str = "boolean";

    pub fn new(measurement: &str, expected: bool) -> Self {
        Self {
            slot: MeasurementSlot::new(measurement),
            expected,
        }
    }
}

impl Default for BooleanFilter {
    fn default() -> Self {
        Self::new("", true)
    }
}

impl Filter<AttributeVector> for BooleanFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "measurement" => self.slot.set_name(value.trim().to_ascii_lowercase()),
            "value" => self.expected = parse_bool(Self::NAME, key, value)?,
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        Ok(())
    }

    fn init(&mut self, _resources: &ResourceCache) -> Result<(), OligoError> {
        if !self.slot.is_set() {
            return Err(missing_param(Self::NAME, "measurement"));
        }
        Ok(())
    }

    fn required_measurements(&self) -> Vec<String> {
        if self.slot.is_set() {
            vec![self.slot.name().to_string()]
        } else {
            Vec::new()
        }
    }

    fn accept(&mut self, vector: &mut AttributeVector) -> Result<bool, OligoError> {
        match self.slot.value(vector)? {
            Value::Boolean(b) => Ok(*b == self.expected),
            other => Err(OligoError::Config(format!(
                "boolean filter: measurement '{}' is {}, not boolean",
                self.slot.name(),
                other.value_type()
            ))),
        }
    }
}

/// Accepts when a numeric measurement lies in `[min, max]`
pub struct RangeFilter {
    slot: MeasurementSlot,
    min: f64,
    max: f64,
}

impl RangeFilter {
    pub const NAME: &'static str = "range";

    pub fn new(measurement: &str, min: f64, max: f64) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        Self {
            slot: MeasurementSlot::new(measurement),
            min,
            max,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self::new("", f64::NEG_INFINITY, f64::INFINITY)
    }
}

impl Filter<AttributeVector> for RangeFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "measurement" => self.slot.set_name(value.trim().to_ascii_lowercase()),
            "min" => self.min = parse_param(Self::NAME, key, value)?,
            "max" => self.max = parse_param(Self::NAME, key, value)?,
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        Ok(())
    }

    fn init(&mut self, _resources: &ResourceCache) -> Result<(), OligoError> {
        if !self.slot.is_set() {
            return Err(missing_param(Self::NAME, "measurement"));
        }
        if self.min > self.max {
            std::mem::swap(&mut self.min, &mut self.max);
        }
        Ok(())
    }

    fn required_measurements(&self) -> Vec<String> {
        if self.slot.is_set() {
            vec![self.slot.name().to_string()]
        } else {
            Vec::new()
        }
    }

    fn accept(&mut self, vector: &mut AttributeVector) -> Result<bool, OligoError> {
        let value = self.slot.value(vector)?;
        let v = value.as_f64().ok_or_else(|| {
            OligoError::Config(format!(
                "range filter: measurement '{}' is {}, not numeric",
                self.slot.name(),
                value.value_type()
            ))
        })?;
        Ok(self.min <= v && v <= self.max)
    }
}

fn symbol_set(symbols: &str, case_sensitive: bool) -> [bool; 256] {
    let mut set = [false; 256];
    for b in symbols.bytes() {
        set[b as usize] = true;
        if !case_sensitive {
            set[b.to_ascii_uppercase() as usize] = true;
            set[b.to_ascii_lowercase() as usize] = true;
        }
    }
    set
}

/// Accepts when every letter belongs to an allowed set
pub struct AlphabetFilter {
    allowed: String,
    case_sensitive: bool,
    set: [bool; 256],
}

impl AlphabetFilter {
    pub const NAME: &'static str = "alphabet";

    pub fn new(allowed: &str) -> Self {
        Self {
            allowed: allowed.to_string(),
            case_sensitive: false,
            set: symbol_set(allowed, false),
        }
    }
}

impl Default for AlphabetFilter {
    fn default() -> Self {
        Self::new("ACGT")
    }
}

impl Filter<Sequence> for AlphabetFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "allowed" => self.allowed = value.trim().to_string(),
            "case_sensitive" => self.case_sensitive = parse_bool(Self::NAME, key, value)?,
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        self.set = symbol_set(&self.allowed, self.case_sensitive);
        Ok(())
    }

    fn accept(&mut self, sequence: &mut Sequence) -> Result<bool, OligoError> {
        Ok(sequence.letters.iter().all(|&b| self.set[b as usize]))
    }
}

/// Uppercases soft-masked letters in place, then rejects candidates that
/// still contain a forbidden symbol
pub struct MaskFilter {
    reject: [bool; 256],
    uppercase: bool,
}

impl MaskFilter {
    pub const NAME: &'static str = "mask";

    pub fn new(reject: &str) -> Self {
        Self {
            reject: symbol_set(reject, false),
            uppercase: true,
        }
    }
}

impl Default for MaskFilter {
    fn default() -> Self {
        Self::new("N")
    }
}

impl Filter<Sequence> for MaskFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "reject" => self.reject = symbol_set(value.trim(), false),
            "uppercase" => self.uppercase = parse_bool(Self::NAME, key, value)?,
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        Ok(())
    }

    fn accept(&mut self, sequence: &mut Sequence) -> Result<bool, OligoError> {
        if self.uppercase {
            sequence.letters.make_ascii_uppercase();
        }
        Ok(!sequence.letters.iter().any(|&b| self.reject[b as usize]))
    }
}
