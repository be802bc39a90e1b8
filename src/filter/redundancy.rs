//! Uniqueness filter backed by aligner results.
//!
//! Usable before measurement (on the candidate's sequence name) or after it
//! (on the persisted `name` value). Each instance owns its own
//! [`RedundancyIndex`], so parallel units never share a cache.

use crate::bio::Sequence;
use crate::filter::{Filter, MeasurementSlot};
use crate::measure::builtin::NameMeasurement;
use crate::measure::AttributeVector;
use crate::resources::alignment::DEFAULT_RESULTS_SUFFIX;
use crate::resources::{RedundancyIndex, ResourceCache};
use crate::utils::params::{missing_param, parse_param, unknown_param};
use crate::OligoError;
use std::path::PathBuf;

pub struct RedundancyFilter {
    dir: Option<PathBuf>,
    suffix: String,
    name_offset: u64,
    slot: MeasurementSlot,
    index: Option<RedundancyIndex>,
}

impl RedundancyFilter {
    pub const NAME: &'static str = "redundancy";

    pub fn new() -> Self {
        Self {
            dir: None,
            suffix: DEFAULT_RESULTS_SUFFIX.to_string(),
            name_offset: 0,
            slot: MeasurementSlot::new(NameMeasurement::NAME),
            index: None,
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Chromosome reparses caused by out-of-order input
    pub fn reloads(&self) -> usize {
        self.index.as_ref().map_or(0, |index| index.reloads())
    }

    fn configure(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "dir" => self.dir = Some(PathBuf::from(value.trim())),
            "suffix" => self.suffix = value.trim().to_string(),
            "name_offset" => self.name_offset = parse_param(Self::NAME, key, value)?,
            "measurement" => self.slot.set_name(value.trim().to_ascii_lowercase()),
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), OligoError> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| missing_param(Self::NAME, "dir"))?;
        if !dir.is_dir() {
            return Err(OligoError::Config(format!(
                "redundancy: alignment results directory not found: {}",
                dir.display()
            )));
        }
        self.index = Some(
            RedundancyIndex::new(dir)
                .with_suffix(self.suffix.clone())
                .with_name_offset(self.name_offset),
        );
        Ok(())
    }

    fn index(&mut self) -> Result<&mut RedundancyIndex, OligoError> {
        self.index
            .as_mut()
            .ok_or_else(|| OligoError::Other("redundancy filter used before init".to_string()))
    }
}

impl Default for RedundancyFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter<Sequence> for RedundancyFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        self.configure(key, value)
    }

    fn init(&mut self, _resources: &ResourceCache) -> Result<(), OligoError> {
        self.prepare()
    }

    fn accept(&mut self, sequence: &mut Sequence) -> Result<bool, OligoError> {
        self.index()?.accept(sequence)
    }
}

impl Filter<AttributeVector> for RedundancyFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        self.configure(key, value)
    }

    fn init(&mut self, _resources: &ResourceCache) -> Result<(), OligoError> {
        self.prepare()
    }

    fn required_measurements(&self) -> Vec<String> {
        vec![self.slot.name().to_string()]
    }

    fn accept(&mut self, vector: &mut AttributeVector) -> Result<bool, OligoError> {
        let value = self.slot.value(vector)?;
        let name = value
            .as_str()
            .ok_or_else(|| {
                OligoError::Config(format!(
                    "redundancy: measurement '{}' does not hold candidate names",
                    self.slot.name()
                ))
            })?
            .to_string();
        self.index()?.accept_name(&name)
    }
}
