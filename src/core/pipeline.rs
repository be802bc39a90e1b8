//! End-to-end candidate processing.
//!
//! A run generates candidates for every chromosome of a genome, then hands
//! each chromosome to an independent [`ChromosomeUnit`] that measures,
//! filters and selects. Units share only read-only state: the registries,
//! the configuration and the [`ResourceCache`]. Each owns its own attribute
//! vector, filter instances and resource cursors.
//!
//! Output layout under the run directory:
//!
//! ```text
//! candidates/<chromosome>.fa
//! measurements/<chromosome>.olgm
//! filtered/<chromosome>.olgm
//! selected/<chromosome>.tsv
//! chromosomes.json
//! report.json
//! ```

use crate::bio::{FastaReader, Sequence};
use crate::core::config::{Config, MeasurementSpec};
use crate::core::generator::{CandidateGenerator, FastaDirSink};
use crate::core::selector::{select_file, write_selections};
use crate::filter::{check_required, FilterChain, FilterRegistry, FilterStats};
use crate::measure::{AttributeVector, MeasurementRegistry};
use crate::resources::ResourceCache;
use crate::storage::{save_json, MeasurementReader, MeasurementWriter};
use crate::utils::parallel::run_bounded;
use crate::OligoError;
use indexmap::IndexMap;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

pub const CANDIDATES_DIR: &str = "candidates";
pub const MEASUREMENTS_DIR: &str = "measurements";
pub const FILTERED_DIR: &str = "filtered";
pub const SELECTED_DIR: &str = "selected";
pub const CHROMOSOMES_FILE: &str = "chromosomes.json";
pub const REPORT_FILE: &str = "report.json";
pub const MEASUREMENT_EXT: &str = "olgm";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageCounts {
    pub read: u64,
    pub written: u64,
    pub filters: Vec<FilterStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub chromosome: String,
    pub measure: StageCounts,
    pub filter: StageCounts,
    pub selected: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub version: String,
    pub min_size: usize,
    pub max_size: usize,
    pub chromosomes: IndexMap<String, u64>,
    pub generated: u64,
    pub units: Vec<UnitReport>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn measured(&self) -> u64 {
        self.units.iter().map(|u| u.measure.written).sum()
    }

    pub fn filtered(&self) -> u64 {
        self.units.iter().map(|u| u.filter.written).sum()
    }

    pub fn selected(&self) -> u64 {
        self.units.iter().map(|u| u.selected).sum()
    }
}

/// Measure every candidate of a FASTA file that passes the sequence filters
pub fn measure_file(
    input: &Path,
    output: &Path,
    registry: &MeasurementRegistry,
    specs: &[MeasurementSpec],
    chain: &mut FilterChain<Sequence>,
    resources: &ResourceCache,
) -> Result<StageCounts, OligoError> {
    let mut vector = AttributeVector::from_specs(registry, specs)?;
    if vector.is_empty() {
        return Err(OligoError::Config("no measurements configured".to_string()));
    }
    chain.init(resources)?;

    let mut reader = FastaReader::open(input)?;
    let mut writer = MeasurementWriter::for_vector(output, &vector)?;
    let mut counts = StageCounts::default();

    while let Some(mut sequence) = reader.next_record()? {
        counts.read += 1;
        if !chain.accept_all(&mut sequence)? {
            continue;
        }
        vector.bind(sequence);
        vector.compute(false)?;
        writer.write(&vector)?;
        counts.written += 1;
    }

    writer.close()?;
    counts.filters = chain.stats();
    debug!(
        "{}: measured {} of {} candidates",
        input.display(),
        counts.written,
        counts.read
    );
    Ok(counts)
}

/// Copy the records of a measurement file that pass the measurement filters
pub fn filter_file(
    input: &Path,
    output: &Path,
    registry: &MeasurementRegistry,
    specs: &[MeasurementSpec],
    chain: &mut FilterChain<AttributeVector>,
    resources: &ResourceCache,
) -> Result<StageCounts, OligoError> {
    let mut reader = MeasurementReader::open(input, registry)?.with_specs(specs);
    let mut vector = reader.new_vector()?;
    check_required(chain, &vector)?;
    chain.init(resources)?;

    let mut writer = MeasurementWriter::for_vector(output, &vector)?;
    let mut counts = StageCounts::default();

    while reader.next_into(&mut vector)? {
        counts.read += 1;
        if chain.accept_all(&mut vector)? {
            writer.write(&vector)?;
            counts.written += 1;
        }
    }

    writer.close()?;
    counts.filters = chain.stats();
    debug!(
        "{}: kept {} of {} measured candidates",
        input.display(),
        counts.written,
        counts.read
    );
    Ok(counts)
}

fn file_stem_for(chromosome: &str) -> String {
    chromosome.replace(['/', '\\'], "_")
}

pub struct Pipeline {
    config: Config,
    measurements: MeasurementRegistry,
    filters: FilterRegistry,
    resources: ResourceCache,
    out_dir: PathBuf,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new<P: AsRef<Path>>(config: Config, out_dir: P) -> Result<Self, OligoError> {
        Self::with_registries(
            config,
            MeasurementRegistry::with_builtins(),
            FilterRegistry::with_builtins(),
            out_dir,
        )
    }

    pub fn with_registries<P: AsRef<Path>>(
        config: Config,
        measurements: MeasurementRegistry,
        filters: FilterRegistry,
        out_dir: P,
    ) -> Result<Self, OligoError> {
        config.validate()?;
        let pipeline = Self {
            config,
            measurements,
            filters,
            resources: ResourceCache::new(),
            out_dir: out_dir.as_ref().to_path_buf(),
            progress: None,
        };
        pipeline.check_stages()?;
        Ok(pipeline)
    }

    /// Tick a progress bar once per finished chromosome
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn measurement_registry(&self) -> &MeasurementRegistry {
        &self.measurements
    }

    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    /// Build and initialize every configured stage once, so unknown names,
    /// missing parameters and missing resources surface before any work
    fn check_stages(&self) -> Result<(), OligoError> {
        let vector = AttributeVector::from_specs(&self.measurements, &self.config.measurements)?;
        let mut sequence_chain = self.filters.sequence_chain(&self.config.sequence_filters)?;
        sequence_chain.init(&self.resources)?;

        let mut measurement_chain = self
            .filters
            .measurement_chain(&self.config.measurement_filters)?;
        check_required(&measurement_chain, &vector)?;
        measurement_chain.init(&self.resources)
    }

    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.out_dir.join(stage)
    }

    /// Write candidate FASTA files and the chromosome length map
    pub fn generate(&self, genome: &Path) -> Result<(IndexMap<String, u64>, u64), OligoError> {
        let dir = self.stage_dir(CANDIDATES_DIR);
        let mut generator = CandidateGenerator::new(self.config.window)?;
        let mut sink = FastaDirSink::new(&dir)?.with_line_width(self.config.output.line_width);
        let lengths = generator.generate_file(genome, &mut sink)?;
        save_json(self.out_dir.join(CHROMOSOMES_FILE), &lengths)?;
        Ok((lengths, generator.emitted()))
    }

    /// Units for every chromosome in the length map, in map order
    pub fn units_for(&self, lengths: &IndexMap<String, u64>) -> Vec<ChromosomeUnit<'_>> {
        let dir = self.stage_dir(CANDIDATES_DIR);
        lengths
            .keys()
            .map(|chromosome| {
                let path = FastaDirSink::candidate_path(&dir, chromosome);
                self.unit(chromosome, path)
            })
            .collect()
    }

    pub fn unit(&self, chromosome: &str, candidates: PathBuf) -> ChromosomeUnit<'_> {
        ChromosomeUnit {
            pipeline: self,
            chromosome: chromosome.to_string(),
            candidates,
        }
    }

    pub fn run_all(&self, units: Vec<ChromosomeUnit<'_>>) -> Result<Vec<UnitReport>, OligoError> {
        for stage in [MEASUREMENTS_DIR, FILTERED_DIR, SELECTED_DIR] {
            fs::create_dir_all(self.stage_dir(stage))?;
        }

        info!(
            "Processing {} chromosome(s) on up to {} thread(s)",
            units.len(),
            crate::utils::parallel::effective_threads(self.config.performance.threads)
        );
        run_bounded(units, self.config.performance.threads, |unit| {
            let report = unit.run()?;
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            Ok(report)
        })
    }

    /// Generate, then process every chromosome
    pub fn run(&self, genome: &Path) -> Result<RunReport, OligoError> {
        let started = Instant::now();
        fs::create_dir_all(&self.out_dir)?;
        let (lengths, _) = self.generate(genome)?;
        self.finish_run(lengths, started)
    }

    /// Process candidates written by an earlier `generate`
    pub fn resume(&self) -> Result<RunReport, OligoError> {
        let started = Instant::now();
        let lengths: IndexMap<String, u64> =
            crate::storage::load_json(self.out_dir.join(CHROMOSOMES_FILE))?;
        self.finish_run(lengths, started)
    }

    fn finish_run(
        &self,
        lengths: IndexMap<String, u64>,
        started: Instant,
    ) -> Result<RunReport, OligoError> {
        if let Some(progress) = &self.progress {
            progress.set_length(lengths.len() as u64);
        }
        let units = self.run_all(self.units_for(&lengths))?;

        let report = RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            min_size: self.config.window.min_size(),
            max_size: self.config.window.max_size(),
            chromosomes: lengths,
            generated: units.iter().map(|u| u.measure.read).sum(),
            units,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        if self.config.output.write_report {
            save_json(self.out_dir.join(REPORT_FILE), &report)?;
        }
        info!(
            "Run complete: {} measured, {} passed filters, {} selected in {:.1}s",
            report.measured(),
            report.filtered(),
            report.selected(),
            report.elapsed_secs
        );
        Ok(report)
    }
}

/// One chromosome's journey through measure, filter and select
pub struct ChromosomeUnit<'p> {
    pipeline: &'p Pipeline,
    chromosome: String,
    candidates: PathBuf,
}

impl ChromosomeUnit<'_> {
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    fn output(&self, stage: &str, ext: &str) -> PathBuf {
        self.pipeline
            .stage_dir(stage)
            .join(format!("{}.{}", file_stem_for(&self.chromosome), ext))
    }

    pub fn run(self) -> Result<UnitReport, OligoError> {
        let pipeline = self.pipeline;
        let config = &pipeline.config;
        let measured = self.output(MEASUREMENTS_DIR, MEASUREMENT_EXT);
        let filtered = self.output(FILTERED_DIR, MEASUREMENT_EXT);
        let selected = self.output(SELECTED_DIR, "tsv");

        let mut sequence_chain = pipeline.filters.sequence_chain(&config.sequence_filters)?;
        let measure = measure_file(
            &self.candidates,
            &measured,
            &pipeline.measurements,
            &config.measurements,
            &mut sequence_chain,
            &pipeline.resources,
        )?;

        let mut measurement_chain = pipeline
            .filters
            .measurement_chain(&config.measurement_filters)?;
        let filter = filter_file(
            &measured,
            &filtered,
            &pipeline.measurements,
            &config.measurements,
            &mut measurement_chain,
            &pipeline.resources,
        )?;

        let selections = select_file(
            &filtered,
            &measured,
            &pipeline.measurements,
            &config.measurements,
            config.selection_step(),
        )?;
        write_selections(&selected, &selections)?;

        info!(
            "{}: {} candidates, {} measured, {} passed filters, {} selected",
            self.chromosome,
            measure.read,
            measure.written,
            filter.written,
            selections.len()
        );
        Ok(UnitReport {
            chromosome: self.chromosome,
            measure,
            filter,
            selected: selections.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FilterSpec;

    #[test]
    fn test_unknown_names_fail_at_setup() {
        let dir = tempfile::TempDir::new().unwrap();

        let mut config = Config::default();
        config.measurements.push(MeasurementSpec::new("melting_temp", 0.0));
        assert!(matches!(
            Pipeline::new(config, dir.path()),
            Err(OligoError::Config(_))
        ));

        let mut config = Config::default();
        config.sequence_filters.push(FilterSpec::new("blast"));
        assert!(Pipeline::new(config, dir.path()).is_err());

        let mut config = Config::default();
        config
            .measurement_filters
            .push(FilterSpec::new("range").with_param("measurement", "length"));
        assert!(matches!(
            Pipeline::new(config, dir.path()),
            Err(OligoError::Config(_))
        ));
    }

    #[test]
    fn test_file_stem_sanitized() {
        assert_eq!(file_stem_for("chr/1"), "chr_1");
        assert_eq!(file_stem_for("chrI"), "chrI");
    }
}
