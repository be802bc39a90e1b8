//! Per-window selection of the best-scoring candidate.
//!
//! The genome is cut into fixed windows of `step` letters; each candidate
//! belongs to the window holding its start. Within a window the candidate
//! with the highest weighted score wins, and ties keep the earliest record.

use crate::bio::SubseqName;
use crate::core::config::MeasurementSpec;
use crate::measure::builtin::NameMeasurement;
use crate::measure::{AttributeVector, MeasurementRegistry};
use crate::storage::MeasurementReader;
use crate::OligoError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub chromosome: String,
    pub window: u64,
    pub id: i64,
    pub start: u64,
    pub length: u64,
    pub name: String,
    pub score: f64,
}

pub struct WindowSelector {
    step: u64,
    best: IndexMap<String, BTreeMap<u64, Selection>>,
    offered: u64,
}

impl WindowSelector {
    pub fn new(step: u64) -> Result<Self, OligoError> {
        if step == 0 {
            return Err(OligoError::Config(
                "selection step must be positive".to_string(),
            ));
        }
        Ok(Self {
            step,
            best: IndexMap::new(),
            offered: 0,
        })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn window_of(&self, start: u64) -> u64 {
        start / self.step
    }

    pub fn offered(&self) -> u64 {
        self.offered
    }

    /// Consider one candidate
    pub fn offer(&mut self, id: i64, name: &str, score: f64) -> Result<(), OligoError> {
        let subseq = SubseqName::parse(name)?;
        let window = self.window_of(subseq.start);
        self.offered += 1;

        let candidate = Selection {
            chromosome: subseq.chromosome.clone(),
            window,
            id,
            start: subseq.start,
            length: subseq.length,
            name: name.to_string(),
            score,
        };

        let windows = self.best.entry(subseq.chromosome).or_default();
        match windows.get_mut(&window) {
            Some(current) => {
                let better = score > current.score || (current.score.is_nan() && !score.is_nan());
                if better {
                    *current = candidate;
                }
            }
            None => {
                windows.insert(window, candidate);
            }
        }
        Ok(())
    }

    /// Winners ordered by chromosome appearance, then window
    pub fn finish(self) -> Vec<Selection> {
        self.best
            .into_values()
            .flat_map(|windows| windows.into_values())
            .collect()
    }
}

fn name_of(vector: &AttributeVector, idx: usize) -> Result<String, OligoError> {
    vector
        .value(idx)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| OligoError::Parse(format!("record {} has no candidate name", vector.id())))
}

/// Select per-window winners from a measurement file.
///
/// Statistics-based scores are normalized against `population`, the
/// measured candidates before measurement filtering, read in generation
/// order. `candidates` is then read once more and scored. Both files may be
/// the same when nothing was filtered.
pub fn select_file<P: AsRef<Path>, Q: AsRef<Path>>(
    candidates: P,
    population: Q,
    registry: &MeasurementRegistry,
    specs: &[MeasurementSpec],
    step: u64,
) -> Result<Vec<Selection>, OligoError> {
    let candidates = candidates.as_ref();
    let population = population.as_ref();
    let mut selector = WindowSelector::new(step)?;

    let mut reader = MeasurementReader::open(population, registry)?.with_specs(specs);
    let mut vector = reader.new_vector()?;
    let name_idx = vector.index_of(NameMeasurement::NAME).ok_or_else(|| {
        OligoError::Config(format!(
            "{}: selection requires the '{}' measurement",
            population.display(),
            NameMeasurement::NAME
        ))
    })?;

    while reader.next_into(&mut vector)? {
        vector.accumulate_stats();
    }
    debug!(
        "{}: accumulated statistics over {} records",
        population.display(),
        reader.records_read()
    );

    let mut reader = MeasurementReader::open(candidates, registry)?;
    while reader.next_into(&mut vector)? {
        let name = name_of(&vector, name_idx)?;
        selector.offer(vector.id(), &name, vector.score())?;
    }

    let offered = selector.offered();
    let selections = selector.finish();
    info!(
        "{}: selected {} of {} candidates (step {})",
        candidates.display(),
        selections.len(),
        offered,
        step
    );
    Ok(selections)
}

pub fn write_selections<P: AsRef<Path>>(
    path: P,
    selections: &[Selection],
) -> Result<(), OligoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "#chromosome\twindow\tstart\tlength\tid\tname\tscore")?;
    for s in selections {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.6}",
            s.chromosome, s.window, s.start, s.length, s.id, s.name, s.score
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::Sequence;
    use crate::measure::builtin::GcContent;
    use crate::measure::{Measurement, Value};
    use crate::storage::MeasurementWriter;
    use tempfile::TempDir;

    #[test]
    fn test_argmax_per_window() {
        let mut selector = WindowSelector::new(100).unwrap();
        selector.offer(0, "chrI:subseq(0,20)", 0.4).unwrap();
        selector.offer(1, "chrI:subseq(10,20)", 0.9).unwrap();
        selector.offer(2, "chrI:subseq(99,20)", 0.5).unwrap();
        selector.offer(3, "chrI:subseq(100,20)", 0.1).unwrap();
        selector.offer(4, "chrII:subseq(5,20)", 0.3).unwrap();

        let picks = selector.finish();
        let ids: Vec<i64> = picks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(picks[1].window, 1);
        assert_eq!(picks[2].chromosome, "chrII");
    }

    #[test]
    fn test_ties_keep_first() {
        let mut selector = WindowSelector::new(50).unwrap();
        selector.offer(7, "c:subseq(0,10)", 0.5).unwrap();
        selector.offer(8, "c:subseq(1,10)", 0.5).unwrap();
        assert_eq!(selector.finish()[0].id, 7);
    }

    #[test]
    fn test_nan_never_wins() {
        let mut selector = WindowSelector::new(50).unwrap();
        selector.offer(1, "c:subseq(0,10)", f64::NAN).unwrap();
        selector.offer(2, "c:subseq(1,10)", 0.1).unwrap();
        assert_eq!(selector.finish()[0].id, 2);
    }

    fn write_gc_file(path: &Path, letters: &[&str]) {
        let registry = MeasurementRegistry::with_builtins();
        let mut vector = AttributeVector::from_names(&registry, &["name", "gc"]).unwrap();
        let mut writer = MeasurementWriter::for_vector(path, &vector).unwrap();
        for (i, l) in letters.iter().enumerate() {
            let name = format!("chrI:subseq({},{})", i * 10, l.len());
            vector.bind(Sequence::new(i as i64, &name, l.as_bytes().to_vec()));
            vector.compute(false).unwrap();
            writer.write(&vector).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_zscore_normalized_against_population() {
        let dir = TempDir::new().unwrap();
        let measured = dir.path().join("measured.olgm");
        let filtered = dir.path().join("filtered.olgm");
        // gc 0.0, 0.45, 0.55, 1.0; filtering keeps the middle two
        let all = ["AAAAAAAAAAAAAAAAAAAA", "GGGGGGGGGAAAAAAAAAAA", "GGGGGGGGGGGAAAAAAAAA", "GGGGGGGGGGGGGGGGGGGG"];
        write_gc_file(&measured, &all);
        write_gc_file(&filtered, &all[1..3]);

        let registry = MeasurementRegistry::with_builtins();
        let specs = vec![
            MeasurementSpec::new("name", 0.0),
            MeasurementSpec::new("gc", 1.0).with_param("scoring", "zscore"),
        ];
        let picks = select_file(&filtered, &measured, &registry, &specs, 1000).unwrap();
        assert_eq!(picks.len(), 1);

        let mut expected = GcContent::default();
        expected.set_parameter("scoring", "zscore").unwrap();
        for v in [0.0, 0.45, 0.55, 1.0] {
            expected.add_to_stats(&Value::Float(v));
        }
        let want = expected.score(&Value::Float(0.45));
        assert!((picks[0].score - want).abs() < 1e-9, "{} != {}", picks[0].score, want);

        // Scoring against survivors only gives a different answer
        let survivors = select_file(&filtered, &filtered, &registry, &specs, 1000).unwrap();
        assert!((survivors[0].score - want).abs() > 1e-3);
    }

    #[test]
    fn test_invalid_input() {
        assert!(WindowSelector::new(0).is_err());
        let mut selector = WindowSelector::new(10).unwrap();
        assert!(selector.offer(0, "not a candidate", 1.0).is_err());
    }
}
