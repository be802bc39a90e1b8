use crate::bio::DEFAULT_LINE_WIDTH;
use crate::core::generator::WindowSpec;
use crate::utils::params::parse_bool;
use crate::OligoError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowSpec,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
    pub selection: SelectionConfig,
    pub measurements: Vec<MeasurementSpec>,
    pub sequence_filters: Vec<FilterSpec>,
    pub measurement_filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Letters per line in candidate FASTA files
    pub line_width: usize,
    /// Write a JSON run report next to the outputs
    pub write_report: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Concurrent chromosome units (0 = all cores)
    pub threads: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Window step for per-window selection; defaults to the window size
    pub step: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSpec {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_weight() -> f64 {
    1.0
}

impl MeasurementSpec {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl FilterSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            write_report: true,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { threads: 0 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowSpec::default(),
            output: OutputConfig::default(),
            performance: PerformanceConfig::default(),
            selection: SelectionConfig::default(),
            measurements: vec![
                // Carried so later stages can recover coordinates
                MeasurementSpec::new("name", 0.0),
                MeasurementSpec::new("gc", 0.5),
                MeasurementSpec::new("complexity", 0.3),
                MeasurementSpec::new("homopolymer", 0.2),
            ],
            sequence_filters: vec![FilterSpec::new("mask")],
            measurement_filters: Vec::new(),
        }
    }
}

impl Config {
    /// Check invariants that do not need the registries
    pub fn validate(&self) -> Result<(), OligoError> {
        self.window.validate()?;

        if self.output.line_width == 0 {
            return Err(OligoError::Config(
                "output.line_width must be positive".to_string(),
            ));
        }
        if self.selection.step == Some(0) {
            return Err(OligoError::Config(
                "selection.step must be positive".to_string(),
            ));
        }
        for spec in &self.measurements {
            if !spec.weight.is_finite() {
                return Err(OligoError::Config(format!(
                    "measurement '{}' has a non-finite weight",
                    spec.name
                )));
            }
        }

        if self.masking_hidden() {
            warn!(
                "The 'masked' measurement follows a 'mask' filter that uppercases letters; \
                 it will always be false"
            );
        }

        let sum: f64 = self.measurements.iter().map(|m| m.weight).sum();
        if !self.measurements.is_empty() && (sum - 1.0).abs() > 1e-9 {
            warn!("Measurement weights sum to {:.4}, expected 1.0", sum);
        }
        Ok(())
    }

    /// True when a sequence filter erases the soft-masking that the
    /// `masked` measurement reads
    pub fn masking_hidden(&self) -> bool {
        let measured = self
            .measurements
            .iter()
            .any(|m| m.name.eq_ignore_ascii_case("masked"));
        let uppercased = self.sequence_filters.iter().any(|f| {
            f.name.eq_ignore_ascii_case("mask")
                && f.params
                    .get("uppercase")
                    .map_or(true, |v| parse_bool("mask", "uppercase", v).unwrap_or(true))
        });
        measured && uppercased
    }

    /// Selection step, falling back to the window size
    pub fn selection_step(&self) -> u64 {
        self.selection.step.unwrap_or(self.window.size.max(1) as u64)
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, OligoError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| OligoError::Config(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), OligoError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| OligoError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
