//! ORF-overlap filter.
//!
//! Recovers a candidate's coordinates from its persisted `name` value and
//! asks a per-instance [`OrfSweep`] whether an annotated ORF contains it.
//! Candidates must reach the filter in non-decreasing start order per
//! chromosome, which the generator's output already guarantees.

use crate::bio::SubseqName;
use crate::filter::{Filter, MeasurementSlot};
use crate::measure::builtin::NameMeasurement;
use crate::measure::AttributeVector;
use crate::resources::{Eviction, OrfSweep, ResourceCache};
use crate::utils::params::{missing_param, parse_param, unknown_param};
use crate::OligoError;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrfMode {
    /// Keep candidates fully contained in an ORF
    Inside,
    /// Keep candidates outside every ORF
    Outside,
}

pub struct OrfFilter {
    file: Option<PathBuf>,
    offset: u64,
    eviction: Eviction,
    mode: OrfMode,
    slot: MeasurementSlot,
    sweep: Option<OrfSweep>,
    hits: u64,
}

impl OrfFilter {
    pub const NAME: &'static str = "orf";

    pub fn new() -> Self {
        Self {
            file: None,
            offset: 0,
            eviction: Eviction::default(),
            mode: OrfMode::Inside,
            slot: MeasurementSlot::new(NameMeasurement::NAME),
            sweep: None,
            hits: 0,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn mode(&self) -> OrfMode {
        self.mode
    }

    /// Candidates found inside an ORF so far
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

impl Default for OrfFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter<AttributeVector> for OrfFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_parameter(&mut self, key: &str, value: &str) -> Result<(), OligoError> {
        match key {
            "file" => self.file = Some(PathBuf::from(value.trim())),
            "offset" => self.offset = parse_param(Self::NAME, key, value)?,
            "eviction" => {
                self.eviction = match value.trim().to_ascii_lowercase().as_str() {
                    "start" => Eviction::QueryStart,
                    "end" => Eviction::QueryEnd,
                    other => {
                        return Err(OligoError::Config(format!(
                            "orf: eviction must be 'start' or 'end', got '{}'",
                            other
                        )))
                    }
                }
            }
            "mode" => {
                self.mode = match value.trim().to_ascii_lowercase().as_str() {
                    "inside" => OrfMode::Inside,
                    "outside" => OrfMode::Outside,
                    other => {
                        return Err(OligoError::Config(format!(
                            "orf: mode must be 'inside' or 'outside', got '{}'",
                            other
                        )))
                    }
                }
            }
            "measurement" => self.slot.set_name(value.trim().to_ascii_lowercase()),
            _ => return Err(unknown_param(Self::NAME, key)),
        }
        Ok(())
    }

    fn init(&mut self, resources: &ResourceCache) -> Result<(), OligoError> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| missing_param(Self::NAME, "file"))?;
        let annotations = resources.orf_annotations(file, self.offset)?;
        self.sweep = Some(OrfSweep::new(annotations).with_eviction(self.eviction));
        Ok(())
    }

    fn required_measurements(&self) -> Vec<String> {
        vec![self.slot.name().to_string()]
    }

    fn accept(&mut self, vector: &mut AttributeVector) -> Result<bool, OligoError> {
        let name = self.slot.value(vector)?;
        let name = name.as_str().ok_or_else(|| {
            OligoError::Config(format!(
                "orf: measurement '{}' does not hold candidate names",
                self.slot.name()
            ))
        })?;
        let subseq = SubseqName::parse(name)?;

        let sweep = self
            .sweep
            .as_mut()
            .ok_or_else(|| OligoError::Other("orf filter used before init".to_string()))?;
        let inside = sweep
            .get_orf(&subseq.chromosome, subseq.start, subseq.length)
            .is_some();
        if inside {
            self.hits += 1;
        }

        Ok(match self.mode {
            OrfMode::Inside => inside,
            OrfMode::Outside => !inside,
        })
    }
}
