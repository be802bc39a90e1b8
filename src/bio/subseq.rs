//! Structured candidate names: `<chromosome>:subseq(<start>,<length>)`.
//!
//! The name is the only channel through which later stages learn where a
//! candidate came from, so parsing is strict and any mismatch is fatal.

use crate::OligoError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static SUBSEQ_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*):subseq\((\d+),(\d+)\)$").expect("subseq pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubseqName {
    pub chromosome: String,
    pub start: u64,
    pub length: u64,
}

impl SubseqName {
    pub fn new(chromosome: impl Into<String>, start: u64, length: u64) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            length,
        }
    }

    pub fn parse(name: &str) -> Result<Self, OligoError> {
        let caps = SUBSEQ_RE.captures(name).ok_or_else(|| {
            OligoError::Parse(format!("Malformed candidate name: '{}'", name))
        })?;

        let start = caps[2]
            .parse::<u64>()
            .map_err(|e| OligoError::Parse(format!("Bad start in '{}': {}", name, e)))?;
        let length = caps[3]
            .parse::<u64>()
            .map_err(|e| OligoError::Parse(format!("Bad length in '{}': {}", name, e)))?;

        Ok(Self {
            chromosome: caps[1].to_string(),
            start,
            length,
        })
    }

    /// Exclusive end coordinate.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

impl fmt::Display for SubseqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:subseq({},{})", self.chromosome, self.start, self.length)
    }
}

impl FromStr for SubseqName {
    type Err = OligoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let name = SubseqName::new("chrIV", 1200, 60);
        assert_eq!(name.to_string(), "chrIV:subseq(1200,60)");
        assert_eq!(name.end(), 1260);
    }

    #[test]
    fn test_parse() {
        let name = SubseqName::parse("chr1:subseq(100,60)").unwrap();
        assert_eq!(name.chromosome, "chr1");
        assert_eq!(name.start, 100);
        assert_eq!(name.length, 60);
    }

    #[test]
    fn test_parse_chromosome_with_colon() {
        // The chromosome group is greedy, only the trailing suffix is structured
        let name = SubseqName::parse("scaffold:12:subseq(0,5)").unwrap();
        assert_eq!(name.chromosome, "scaffold:12");
        assert_eq!(name.start, 0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "chr1",
            "chr1:subseq(100,60",
            "chr1:subseq(-1,60)",
            "chr1:subseq(100,60) extra",
            "chr1:subseq(a,60)",
        ] {
            assert!(
                matches!(SubseqName::parse(bad), Err(OligoError::Parse(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_overflow_is_parse_error() {
        let result = SubseqName::parse("chr1:subseq(99999999999999999999999,1)");
        assert!(matches!(result, Err(OligoError::Parse(_))));
    }
}
