//! Sliding-window multi-length candidate generation.
//!
//! Every sub-sequence whose length lies in `[max(1, W - I), W + I]` is emitted
//! at every valid offset of every chromosome. Chromosomes are streamed line by
//! line through a rolling buffer, so memory stays proportional to the window.

use crate::bio::fasta::{FastaReader, FastaWriter, DEFAULT_LINE_WIDTH};
use crate::bio::{Sequence, SubseqName};
use crate::OligoError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Window size, half-width interval and coordinate base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub size: usize,
    pub interval: usize,
    #[serde(default)]
    pub start1: bool,
}

impl WindowSpec {
    pub fn new(size: usize, interval: usize) -> Self {
        Self {
            size,
            interval,
            start1: false,
        }
    }

    pub fn min_size(&self) -> usize {
        self.size.saturating_sub(self.interval).max(1)
    }

    pub fn max_size(&self) -> usize {
        self.size + self.interval
    }

    pub fn validate(&self) -> Result<(), OligoError> {
        if self.max_size() == 0 {
            return Err(OligoError::Config(
                "window size plus interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::new(60, 0)
    }
}

/// Receiver of generated candidates
pub trait CandidateSink {
    fn begin_chromosome(&mut self, _chromosome: &str) -> Result<(), OligoError> {
        Ok(())
    }

    fn emit(&mut self, chromosome: &str, start: u64, letters: &[u8]) -> Result<(), OligoError>;

    fn end_chromosome(&mut self, _chromosome: &str, _length: u64) -> Result<(), OligoError> {
        Ok(())
    }
}

/// Collects candidates in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub candidates: Vec<Sequence>,
}

impl CandidateSink for VecSink {
    fn emit(&mut self, chromosome: &str, start: u64, letters: &[u8]) -> Result<(), OligoError> {
        let name = SubseqName::new(chromosome, start, letters.len() as u64);
        let id = self.candidates.len() as i64;
        self.candidates
            .push(Sequence::new(id, name.to_string(), letters.to_vec()));
        Ok(())
    }
}

/// Writes one wrapped FASTA file of candidates per chromosome
pub struct FastaDirSink {
    out_dir: PathBuf,
    line_width: usize,
    current: Option<FastaWriter<Box<dyn Write>>>,
    files: IndexMap<String, PathBuf>,
}

impl FastaDirSink {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Result<Self, OligoError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir)?;
        Ok(Self {
            out_dir,
            line_width: DEFAULT_LINE_WIDTH,
            current: None,
            files: IndexMap::new(),
        })
    }

    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width.max(1);
        self
    }

    /// Candidate file path for a chromosome
    pub fn candidate_path(out_dir: &Path, chromosome: &str) -> PathBuf {
        let safe: String = chromosome
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        out_dir.join(format!("{}.fa", safe))
    }

    /// Files written so far, keyed by chromosome
    pub fn files(&self) -> &IndexMap<String, PathBuf> {
        &self.files
    }
}

impl CandidateSink for FastaDirSink {
    fn begin_chromosome(&mut self, chromosome: &str) -> Result<(), OligoError> {
        let path = Self::candidate_path(&self.out_dir, chromosome);
        if let Some((other, _)) = self.files.iter().find(|(_, p)| **p == path) {
            return Err(OligoError::Parse(format!(
                "chromosomes '{}' and '{}' share the candidate file {}",
                other,
                chromosome,
                path.display()
            )));
        }
        self.current = Some(FastaWriter::create(&path)?.with_line_width(self.line_width));
        self.files.insert(chromosome.to_string(), path);
        Ok(())
    }

    fn emit(&mut self, chromosome: &str, start: u64, letters: &[u8]) -> Result<(), OligoError> {
        let writer = self.current.as_mut().ok_or_else(|| {
            OligoError::Other(format!("no open candidate file for {}", chromosome))
        })?;
        let name = SubseqName::new(chromosome, start, letters.len() as u64);
        writer.write_record(&name.to_string(), letters)
    }

    fn end_chromosome(&mut self, _chromosome: &str, _length: u64) -> Result<(), OligoError> {
        if let Some(writer) = self.current.take() {
            writer.finish()?;
        }
        Ok(())
    }
}

pub struct CandidateGenerator {
    spec: WindowSpec,
    emitted: u64,
}

impl CandidateGenerator {
    pub fn new(spec: WindowSpec) -> Result<Self, OligoError> {
        spec.validate()?;
        Ok(Self { spec, emitted: 0 })
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Candidates emitted since construction
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Generate candidates for every chromosome of a FASTA file
    pub fn generate_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        sink: &mut dyn CandidateSink,
    ) -> Result<IndexMap<String, u64>, OligoError> {
        let mut reader = FastaReader::open(path)?;
        self.generate(&mut reader, sink)
    }

    /// Generate candidates for every chromosome of a FASTA stream.
    ///
    /// Returns the number of letters processed per chromosome, in input order.
    pub fn generate<R: BufRead>(
        &mut self,
        reader: &mut FastaReader<R>,
        sink: &mut dyn CandidateSink,
    ) -> Result<IndexMap<String, u64>, OligoError> {
        let mut lengths = IndexMap::new();

        while let Some(chromosome) = reader.next_header()? {
            if lengths.contains_key(&chromosome) {
                return Err(OligoError::Parse(format!(
                    "chromosome '{}' appears more than once",
                    chromosome
                )));
            }
            let before = self.emitted;
            sink.begin_chromosome(&chromosome)?;
            let length = self.generate_chromosome(&chromosome, reader, sink)?;
            sink.end_chromosome(&chromosome, length)?;

            debug!(
                "{}: {} letters, {} candidates",
                chromosome,
                length,
                self.emitted - before
            );
            lengths.insert(chromosome, length);
        }

        info!(
            "Generated {} candidates from {} chromosome(s) (sizes {}..={})",
            self.emitted,
            lengths.len(),
            self.spec.min_size(),
            self.spec.max_size()
        );
        Ok(lengths)
    }

    fn generate_chromosome<R: BufRead>(
        &mut self,
        chromosome: &str,
        reader: &mut FastaReader<R>,
        sink: &mut dyn CandidateSink,
    ) -> Result<u64, OligoError> {
        let min_size = self.spec.min_size();
        let max_size = self.spec.max_size();
        let first = u64::from(self.spec.start1);

        let mut buffer: Vec<u8> = Vec::with_capacity(max_size * 4);
        // Chromosome position of buffer[0]
        let mut base: u64 = 0;
        let mut total: u64 = 0;

        loop {
            let before = buffer.len();
            let more = reader.read_line_into(&mut buffer)?;
            total += (buffer.len() - before) as u64;

            if buffer.len() >= max_size {
                let last = buffer.len() - max_size;
                for k in 0..=last {
                    let start = base + k as u64 + first;
                    for size in min_size..=max_size {
                        sink.emit(chromosome, start, &buffer[k..k + size])?;
                    }
                    self.emitted += (max_size - min_size + 1) as u64;
                }
                buffer.drain(..=last);
                base += (last + 1) as u64;
            }

            if !more {
                break;
            }
        }

        // Taper the size range over the tail so nothing runs past the end
        for k in 0..buffer.len() {
            let remaining = buffer.len() - k;
            if remaining < min_size {
                break;
            }
            let start = base + k as u64 + first;
            let top = max_size.min(remaining);
            for size in min_size..=top {
                sink.emit(chromosome, start, &buffer[k..k + size])?;
            }
            self.emitted += (top - min_size + 1) as u64;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(fasta: &str, spec: WindowSpec) -> (Vec<Sequence>, IndexMap<String, u64>) {
        let mut generator = CandidateGenerator::new(spec).unwrap();
        let mut reader = FastaReader::new(Cursor::new(fasta.to_string()));
        let mut sink = VecSink::default();
        let lengths = generator.generate(&mut reader, &mut sink).unwrap();
        (sink.candidates, lengths)
    }

    #[test]
    fn test_size_range() {
        assert_eq!(WindowSpec::new(60, 5).min_size(), 55);
        assert_eq!(WindowSpec::new(60, 5).max_size(), 65);
        assert_eq!(WindowSpec::new(3, 5).min_size(), 1);
        assert!(WindowSpec::new(0, 0).validate().is_err());
    }

    #[test]
    fn test_single_size_windows() {
        let (candidates, lengths) = run(">chrI\nACGTA\n", WindowSpec::new(3, 0));
        let names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["chrI:subseq(0,3)", "chrI:subseq(1,3)", "chrI:subseq(2,3)"]
        );
        assert_eq!(candidates[1].letters, b"CGT".to_vec());
        assert_eq!(lengths.get("chrI"), Some(&5));
    }

    #[test]
    fn test_multi_size_with_taper() {
        // sizes 1..=3 over "ACGT"
        let (candidates, _) = run(">c\nAC\nGT\n", WindowSpec::new(2, 1));
        let got: Vec<_> = candidates
            .iter()
            .map(|c| (c.name.clone(), c.letters_str()))
            .collect();
        let expected: Vec<(String, String)> = vec![
            ("c:subseq(0,1)", "A"),
            ("c:subseq(0,2)", "AC"),
            ("c:subseq(0,3)", "ACG"),
            ("c:subseq(1,1)", "C"),
            ("c:subseq(1,2)", "CG"),
            ("c:subseq(1,3)", "CGT"),
            ("c:subseq(2,1)", "G"),
            ("c:subseq(2,2)", "GT"),
            ("c:subseq(3,1)", "T"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_start1_shifts_names() {
        let (candidates, _) = run(">c\nACGT\n", WindowSpec {
            size: 4,
            interval: 0,
            start1: true,
        });
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "c:subseq(1,4)");
    }

    #[test]
    fn test_empty_and_short_chromosomes() {
        let (candidates, lengths) = run(">empty\n>short\nAC\n", WindowSpec::new(5, 0));
        assert!(candidates.is_empty());
        assert_eq!(lengths.get("empty"), Some(&0));
        assert_eq!(lengths.get("short"), Some(&2));
    }

    #[test]
    fn test_repeated_chromosome_rejected() {
        let mut generator = CandidateGenerator::new(WindowSpec::new(2, 0)).unwrap();
        let mut reader = FastaReader::new(Cursor::new(">a\nACGT\n>b\nAC\n>a\nGG\n"));
        let mut sink = VecSink::default();
        let err = generator.generate(&mut reader, &mut sink).unwrap_err();
        assert!(matches!(err, OligoError::Parse(ref msg) if msg.contains("'a'")));
    }

    #[test]
    fn test_sanitized_names_cannot_share_a_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut generator = CandidateGenerator::new(WindowSpec::new(2, 0)).unwrap();
        let mut reader = FastaReader::new(Cursor::new(">chr/1\nACGT\n>chr_1\nAC\n"));
        let mut sink = FastaDirSink::new(dir.path()).unwrap();
        assert!(matches!(
            generator.generate(&mut reader, &mut sink),
            Err(OligoError::Parse(_))
        ));
    }

    #[test]
    fn test_emitted_counter() {
        let mut generator = CandidateGenerator::new(WindowSpec::new(2, 1)).unwrap();
        let mut reader = FastaReader::new(Cursor::new(">a\nACGT\n>b\nAC\n"));
        let mut sink = VecSink::default();
        generator.generate(&mut reader, &mut sink).unwrap();
        // "ACGT": 9 candidates, "AC": sizes 1..=2 at 0 and size 1 at 1
        assert_eq!(generator.emitted(), 12);
        assert_eq!(sink.candidates.len(), 12);
    }
}
