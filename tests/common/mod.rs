//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory that lives for the duration of a test
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        TestEnvironment {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }
}

/// Random DNA, deterministic for a given seed
pub fn pseudo_random_dna(len: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let bases = ['A', 'C', 'G', 'T'];
    (0..len).map(|_| bases[rng.gen_range(0..4)]).collect()
}

/// FASTA text with sequence lines wrapped at `width`
pub fn fasta(records: &[(&str, &str)], width: usize) -> String {
    let mut out = String::new();
    for (name, letters) in records {
        out.push('>');
        out.push_str(name);
        out.push('\n');
        for chunk in letters.as_bytes().chunks(width.max(1)) {
            out.push_str(std::str::from_utf8(chunk).unwrap());
            out.push('\n');
        }
    }
    out
}

/// One aligner result row in the column layout the redundancy index reads
pub fn alignment_row(
    oligo: &str,
    hits: u32,
    length: u64,
    strand: char,
    chromosome: &str,
    start1: u64,
    match_type: u32,
) -> String {
    format!(
        "{}\t{}\t{}\t{}\ta\t{}\t{}\t{}\t{}\t{}",
        oligo,
        "N".repeat(length as usize),
        "I".repeat(length as usize),
        hits,
        length,
        strand,
        chromosome,
        start1,
        match_type
    )
}
