//! Uniqueness evidence from external short-read aligner output.
//!
//! The aligner is run outside this crate against the generated candidates.
//! Its result file is tab-delimited, one row per reported hit:
//!
//! | col | field                          |
//! |-----|--------------------------------|
//! | 0   | oligo name (`chr:subseq(s,l)`) |
//! | 1   | read sequence                  |
//! | 2   | quality string                 |
//! | 3   | number of hits                 |
//! | 4   | pair tag                       |
//! | 5   | matched length                 |
//! | 6   | strand (`+`/`-`)               |
//! | 7   | matched chromosome             |
//! | 8   | 1-based match start            |
//! | 9   | match type (0 = exact)         |
//!
//! Any further columns are ignored.

use crate::bio::{Sequence, SubseqName};
use crate::OligoError;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_RESULTS_SUFFIX: &str = ".soap";

const MIN_COLUMNS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRow {
    pub oligo: String,
    pub match_count: u64,
    pub match_length: u64,
    pub forward: bool,
    pub chromosome: String,
    /// 1-based, as reported
    pub start: u64,
    pub match_type: u32,
}

impl AlignmentRow {
    pub fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            return Err(format!(
                "expected at least {} columns, found {}",
                MIN_COLUMNS,
                fields.len()
            ));
        }

        let number = |idx: usize, what: &str| -> Result<u64, String> {
            fields[idx]
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid {} '{}'", what, fields[idx]))
        };

        let forward = match fields[6].trim() {
            "+" => true,
            "-" => false,
            other => return Err(format!("invalid strand '{}'", other)),
        };

        // The type column may carry mismatch details after the leading count
        let type_digits: String = fields[9]
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let match_type = type_digits
            .parse::<u32>()
            .map_err(|_| format!("invalid match type '{}'", fields[9]))?;

        Ok(Self {
            oligo: fields[0].trim().to_string(),
            match_count: number(3, "match count")?,
            match_length: number(5, "match length")?,
            forward,
            chromosome: fields[7].trim().to_string(),
            start: number(8, "match start")?,
            match_type,
        })
    }
}

/// Single-chromosome cache of unique, exact, in-place hits.
///
/// Switching chromosome discards the cache and reparses that chromosome's
/// result file. Processing chromosomes out of order is correct but costly.
pub struct RedundancyIndex {
    results_dir: PathBuf,
    suffix: String,
    name_offset: u64,
    chromosome: Option<String>,
    // (start, oligo length) -> matched length, None once proven ambiguous
    hits: HashMap<(u64, u64), Option<u64>>,
    loaded: HashSet<String>,
    reloads: usize,
}

impl RedundancyIndex {
    pub fn new<P: AsRef<Path>>(results_dir: P) -> Self {
        Self {
            results_dir: results_dir.as_ref().to_path_buf(),
            suffix: DEFAULT_RESULTS_SUFFIX.to_string(),
            name_offset: 0,
            chromosome: None,
            hits: HashMap::new(),
            loaded: HashSet::new(),
            reloads: 0,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set to 1 when candidate names carry 1-based starts
    pub fn with_name_offset(mut self, offset: u64) -> Self {
        self.name_offset = offset;
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn results_path(&self, chromosome: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{}", chromosome, self.suffix))
    }

    /// Chromosome currently held in the cache
    pub fn chromosome(&self) -> Option<&str> {
        self.chromosome.as_deref()
    }

    /// Number of times a chromosome had to be parsed again
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    pub fn accept(&mut self, sequence: &Sequence) -> Result<bool, OligoError> {
        self.accept_name(&sequence.name)
    }

    /// True iff the named candidate maps exactly once, forward, in place,
    /// over its full length
    pub fn accept_name(&mut self, name: &str) -> Result<bool, OligoError> {
        let subseq = SubseqName::parse(name)?;

        if self.chromosome.as_deref() != Some(subseq.chromosome.as_str()) {
            let path = self.results_path(&subseq.chromosome);
            let file = File::open(&path).map_err(|e| {
                OligoError::Alignment(format!(
                    "alignment results for {} ({}): {}",
                    subseq.chromosome,
                    path.display(),
                    e
                ))
            })?;
            self.load(
                &subseq.chromosome,
                BufReader::new(file),
                &path.display().to_string(),
            )?;
        }

        Ok(matches!(
            self.hits.get(&(subseq.start, subseq.length)),
            Some(Some(len)) if *len == subseq.length
        ))
    }

    /// Replace the cache with the hits of one chromosome
    pub fn load<R: BufRead>(
        &mut self,
        chromosome: &str,
        reader: R,
        source: &str,
    ) -> Result<(), OligoError> {
        if !self.loaded.insert(chromosome.to_string()) {
            self.reloads += 1;
            warn!(
                "Reparsing alignment results for {} (chromosomes processed out of order)",
                chromosome
            );
        }

        self.hits.clear();
        self.chromosome = None;
        let mut skipped = 0usize;

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let row = AlignmentRow::parse(&line).map_err(|e| {
                OligoError::Alignment(format!("{}:{}: {}", source, line_idx + 1, e))
            })?;
            let oligo = SubseqName::parse(&row.oligo)?;
            if oligo.chromosome != chromosome {
                skipped += 1;
                continue;
            }

            let key = (oligo.start, oligo.length);
            let in_place = row.start >= 1 && row.start - 1 + self.name_offset == oligo.start;
            let qualifies = row.match_count == 1
                && row.match_type == 0
                && row.forward
                && row.chromosome == oligo.chromosome
                && in_place;

            if qualifies {
                self.hits
                    .entry(key)
                    .and_modify(|slot| *slot = None)
                    .or_insert(Some(row.match_length));
            } else {
                self.hits.insert(key, None);
            }
        }

        if skipped > 0 {
            debug!("{}: skipped {} rows for other chromosomes", source, skipped);
        }
        debug!(
            "{}: {} candidates with alignment evidence",
            chromosome,
            self.hits.len()
        );
        self.chromosome = Some(chromosome.to_string());
        Ok(())
    }
}
