//! Open-reading-frame annotations and the monotonic overlap sweep.

use crate::OligoError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    /// Watson, forward
    W,
    /// Crick, reverse
    C,
}

impl Strand {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "W" | "w" | "+" => Some(Strand::W),
            "C" | "c" | "-" => Some(Strand::C),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orf {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub strand: Strand,
}

/// Every annotated ORF, grouped per chromosome and sorted by start.
///
/// Immutable once loaded; shared between processing units behind an `Arc`.
#[derive(Debug, Default)]
pub struct OrfAnnotations {
    by_chromosome: HashMap<String, Vec<Orf>>,
}

impl OrfAnnotations {
    /// Load a tab-delimited annotation file.
    ///
    /// Columns: name, chromosome, start, end, strand (`W`/`C`). Lines starting
    /// with `#` are comments. `offset` is subtracted from both coordinates.
    pub fn load<P: AsRef<Path>>(path: P, offset: u64) -> Result<Self, OligoError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            OligoError::Config(format!("ORF annotation file {}: {}", path.display(), e))
        })?;
        let annotations =
            Self::from_reader(BufReader::new(file), offset, &path.display().to_string())?;
        debug!(
            "Loaded {} ORFs on {} chromosome(s) from {}",
            annotations.len(),
            annotations.by_chromosome.len(),
            path.display()
        );
        Ok(annotations)
    }

    pub fn from_reader<R: BufRead>(
        reader: R,
        offset: u64,
        source: &str,
    ) -> Result<Self, OligoError> {
        let mut orfs = Vec::new();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let bad = |what: &str| {
                OligoError::Parse(format!("{}:{}: {}", source, line_idx + 1, what))
            };

            let fields: Vec<&str> = trimmed.split('\t').collect();
            if fields.len() < 5 {
                return Err(bad("expected 5 tab-separated columns"));
            }

            let start: u64 = fields[2].trim().parse().map_err(|_| bad("invalid start"))?;
            let end: u64 = fields[3].trim().parse().map_err(|_| bad("invalid end"))?;
            let strand = Strand::parse(fields[4].trim()).ok_or_else(|| bad("invalid strand"))?;

            // Reverse-strand rows may list the coordinates high to low
            let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
            let lo = lo
                .checked_sub(offset)
                .ok_or_else(|| bad("coordinate below the configured offset"))?;
            let hi = hi - offset;

            orfs.push(Orf {
                chromosome: fields[1].trim().to_string(),
                start: lo,
                end: hi,
                name: fields[0].trim().to_string(),
                strand,
            });
        }

        Ok(Self::from_orfs(orfs))
    }

    pub fn from_orfs(orfs: Vec<Orf>) -> Self {
        let mut by_chromosome: HashMap<String, Vec<Orf>> = HashMap::new();
        for orf in orfs {
            by_chromosome
                .entry(orf.chromosome.clone())
                .or_default()
                .push(orf);
        }
        for list in by_chromosome.values_mut() {
            list.sort_by(|a, b| {
                a.start
                    .cmp(&b.start)
                    .then(a.end.cmp(&b.end))
                    .then_with(|| a.name.cmp(&b.name))
            });
        }
        Self { by_chromosome }
    }

    /// ORFs of one chromosome in start order
    pub fn orfs(&self, chromosome: &str) -> &[Orf] {
        self.by_chromosome
            .get(chromosome)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.by_chromosome.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_chromosome.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// When an interval is declared unable to match any later query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Eviction {
    /// Interval ends at or before the query start. Safe for any stream with
    /// non-decreasing starts, including mixed candidate lengths.
    #[default]
    QueryStart,
    /// Interval ends before the query end. Only safe when query ends are
    /// non-decreasing too (single-length candidate streams).
    QueryEnd,
}

/// Per-unit sweep cursor over [`OrfAnnotations`].
///
/// Queries on one chromosome must arrive with non-decreasing start. This is
/// the caller's responsibility and is not checked: out-of-order queries
/// return wrong answers rather than failing.
pub struct OrfSweep {
    annotations: Arc<OrfAnnotations>,
    eviction: Eviction,
    chromosome: Option<String>,
    working: BTreeSet<usize>,
    stale: Vec<usize>,
    last_query: Option<(u64, u64)>,
    last_result: Option<usize>,
}

impl OrfSweep {
    pub fn new(annotations: Arc<OrfAnnotations>) -> Self {
        Self {
            annotations,
            eviction: Eviction::default(),
            chromosome: None,
            working: BTreeSet::new(),
            stale: Vec::new(),
            last_query: None,
            last_result: None,
        }
    }

    pub fn with_eviction(mut self, eviction: Eviction) -> Self {
        self.eviction = eviction;
        self
    }

    /// Intervals still eligible on the current chromosome
    pub fn working_len(&self) -> usize {
        self.working.len()
    }

    /// The ORF containing `[start, start + length)`, if any
    pub fn get_orf(&mut self, chromosome: &str, start: u64, length: u64) -> Option<&Orf> {
        let idx = self.find(chromosome, start, length)?;
        self.annotations.orfs(chromosome).get(idx)
    }

    fn find(&mut self, chromosome: &str, start: u64, length: u64) -> Option<usize> {
        let same_chromosome = self.chromosome.as_deref() == Some(chromosome);
        if same_chromosome && self.last_query == Some((start, length)) {
            return self.last_result;
        }

        if same_chromosome {
            // Evictions declared by the previous scan take effect now
            for idx in self.stale.drain(..) {
                self.working.remove(&idx);
            }
        } else {
            self.chromosome = Some(chromosome.to_string());
            self.working = (0..self.annotations.orfs(chromosome).len()).collect();
            self.stale.clear();
        }

        let end = start + length;
        let orfs = self.annotations.orfs(chromosome);
        let mut result = None;

        for &idx in &self.working {
            let orf = &orfs[idx];
            let expired = match self.eviction {
                Eviction::QueryStart => orf.end <= start,
                Eviction::QueryEnd => orf.end < end,
            };
            if expired {
                self.stale.push(idx);
                continue;
            }
            if orf.start > start {
                // Sorted by start: nothing further can contain the query
                break;
            }
            if end <= orf.end {
                result = Some(idx);
                break;
            }
        }

        self.last_query = Some((start, length));
        self.last_result = result;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn orf(name: &str, chromosome: &str, start: u64, end: u64) -> Orf {
        Orf {
            chromosome: chromosome.to_string(),
            start,
            end,
            name: name.to_string(),
            strand: Strand::W,
        }
    }

    #[test]
    fn test_load_annotations() {
        let data = "# name\tchr\tstart\tend\tstrand\n\
                    YAL001C\tchrI\t151166\t147594\tC\n\
                    YAL002W\tchrI\t143707\t147531\tW\n\
                    \n\
                    YBL001C\tchrII\t10\t20\tC\n";
        let annotations = OrfAnnotations::from_reader(Cursor::new(data), 1, "orfs.tab").unwrap();
        assert_eq!(annotations.len(), 3);

        let chr1 = annotations.orfs("chrI");
        assert_eq!(chr1[0].name, "YAL002W");
        assert_eq!(chr1[0].start, 143706);
        assert_eq!(chr1[1].name, "YAL001C");
        assert_eq!((chr1[1].start, chr1[1].end), (147593, 151165));
        assert_eq!(chr1[1].strand, Strand::C);
        assert!(annotations.orfs("chrIII").is_empty());
    }

    #[test]
    fn test_load_rejects_bad_rows() {
        let short = "YAL001C\tchrI\t1\n";
        match OrfAnnotations::from_reader(Cursor::new(short), 0, "orfs.tab") {
            Err(OligoError::Parse(msg)) => assert!(msg.contains("orfs.tab:1")),
            _ => panic!("Expected parse error"),
        }

        let strand = "YAL001C\tchrI\t1\t5\tX\n";
        assert!(OrfAnnotations::from_reader(Cursor::new(strand), 0, "orfs.tab").is_err());

        let below = "YAL001C\tchrI\t0\t5\tW\n";
        assert!(OrfAnnotations::from_reader(Cursor::new(below), 1, "orfs.tab").is_err());
    }

    #[test]
    fn test_monotonic_sweep() {
        let annotations = Arc::new(OrfAnnotations::from_orfs(vec![
            orf("A", "chrI", 100, 200),
            orf("B", "chrI", 150, 400),
        ]));
        let mut sweep = OrfSweep::new(annotations);

        assert_eq!(sweep.get_orf("chrI", 120, 50).map(|o| o.name.clone()), Some("A".into()));
        assert_eq!(sweep.get_orf("chrI", 160, 50).map(|o| o.name.clone()), Some("B".into()));
        assert_eq!(sweep.get_orf("chrI", 420, 50), None);
        // Both intervals were declared stale by the last scan
        assert_eq!(sweep.working_len(), 2);
        assert_eq!(sweep.get_orf("chrI", 430, 50), None);
        assert_eq!(sweep.working_len(), 0);
    }

    #[test]
    fn test_mixed_lengths_keep_matches() {
        let annotations = Arc::new(OrfAnnotations::from_orfs(vec![orf("A", "c", 0, 62)]));
        let mut sweep = OrfSweep::new(annotations);

        // Offset 0 sizes 55..=65 then offset 1 back to 55
        assert!(sweep.get_orf("c", 0, 65).is_none());
        assert!(sweep.get_orf("c", 1, 55).is_some());
    }

    #[test]
    fn test_query_end_eviction() {
        let annotations = Arc::new(OrfAnnotations::from_orfs(vec![
            orf("A", "chrI", 100, 200),
            orf("B", "chrI", 150, 400),
        ]));
        let mut sweep = OrfSweep::new(annotations).with_eviction(Eviction::QueryEnd);

        assert_eq!(sweep.get_orf("chrI", 120, 50).map(|o| o.name.as_str()), Some("A"));
        assert_eq!(sweep.get_orf("chrI", 160, 50).map(|o| o.name.as_str()), Some("B"));
        assert_eq!(sweep.get_orf("chrI", 170, 50).map(|o| o.name.as_str()), Some("B"));
        // A was declared stale by the 160 scan and dropped before the 170 scan
        assert_eq!(sweep.working_len(), 1);
    }

    #[test]
    fn test_repeat_query_uses_cache() {
        let annotations = Arc::new(OrfAnnotations::from_orfs(vec![orf("A", "c", 0, 10)]));
        let mut sweep = OrfSweep::new(annotations);
        assert!(sweep.get_orf("c", 20, 5).is_none());
        // The stale entry is only dropped by a different query
        assert!(sweep.get_orf("c", 20, 5).is_none());
        assert_eq!(sweep.working_len(), 1);
    }

    #[test]
    fn test_chromosome_switch_resets() {
        let annotations = Arc::new(OrfAnnotations::from_orfs(vec![
            orf("A", "c1", 0, 100),
            orf("B", "c2", 0, 100),
        ]));
        let mut sweep = OrfSweep::new(annotations);

        assert!(sweep.get_orf("c1", 200, 10).is_none());
        assert_eq!(sweep.get_orf("c2", 10, 10).map(|o| o.name.as_str()), Some("B"));
        assert_eq!(sweep.get_orf("c1", 10, 10).map(|o| o.name.as_str()), Some("A"));
    }
}
