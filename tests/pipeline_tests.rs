/// End-to-end runs: generate, measure, filter, select
mod common;

use common::{fasta, pseudo_random_dna, TestEnvironment};
use oligoscan::core::config::{Config, FilterSpec};
use oligoscan::core::generator::WindowSpec;
use oligoscan::core::pipeline::{Pipeline, RunReport, REPORT_FILE};
use oligoscan::storage::load_json;
use oligoscan::SubseqName;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn genome(env: &TestEnvironment) -> std::path::PathBuf {
    let chr_a = pseudo_random_dna(400, 7);
    let mut chr_b = pseudo_random_dna(300, 99);
    chr_b.replace_range(150..155, "NNNNN");
    env.write("genome.fa", &fasta(&[("chrA", &chr_a), ("chrB", &chr_b)], 60))
}

fn config(env: &TestEnvironment, threads: usize) -> Config {
    let orfs = env.write("orfs.tab", "geneA\tchrA\t50\t250\tW\ngeneB\tchrB\t0\t300\tC\n");

    let mut config = Config::default();
    config.window = WindowSpec::new(20, 1);
    config.performance.threads = threads;
    config.selection.step = Some(100);
    config.sequence_filters = vec![FilterSpec::new("mask"), FilterSpec::new("alphabet")];
    config.measurement_filters = vec![
        FilterSpec::new("range")
            .with_param("measurement", "gc")
            .with_param("min", "0.2")
            .with_param("max", "0.8"),
        FilterSpec::new("orf")
            .with_param("file", &orfs.display().to_string())
            .with_param("mode", "inside"),
    ];
    config
}

fn selected(dir: &Path, chromosome: &str) -> Vec<SubseqName> {
    fs::read_to_string(dir.join("selected").join(format!("{}.tsv", chromosome)))
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| SubseqName::parse(l.split('\t').nth(5).unwrap()).unwrap())
        .collect()
}

#[test]
fn test_full_run() {
    let env = TestEnvironment::new();
    let genome = genome(&env);
    let out = env.path("run");

    let pipeline = Pipeline::new(config(&env, 2), &out).unwrap();
    let report = pipeline.run(&genome).unwrap();

    // 3 lengths per offset: (400 - 19 + 1) + (400 - 20 + 1) + (400 - 21 + 1), same for 300
    assert_eq!(report.generated, 1143 + 843);
    assert_eq!(report.units.len(), 2);
    assert_eq!(report.chromosomes.get("chrA"), Some(&400));
    assert_eq!((report.min_size, report.max_size), (19, 21));

    let chr_b = &report.units[1];
    assert_eq!(chr_b.chromosome, "chrB");
    // Every window overlapping the 5 Ns is masked out
    assert!(chr_b.measure.filters[0].rejected >= 3 * 20);
    assert!(chr_b.measure.written < chr_b.measure.read);
    assert!(chr_b.filter.written <= chr_b.filter.read);

    for name in ["candidates/chrA.fa", "measurements/chrA.olgm", "filtered/chrB.olgm"] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    let picks = selected(&out, "chrA");
    assert!(!picks.is_empty() && picks.len() <= 3);
    let mut windows: Vec<u64> = picks.iter().map(|p| p.start / 100).collect();
    windows.dedup();
    assert_eq!(windows.len(), picks.len());
    for pick in &picks {
        assert!(pick.start >= 50 && pick.end() <= 250, "{} outside ORF", pick);
    }

    let saved: RunReport = load_json(out.join(REPORT_FILE)).unwrap();
    assert_eq!(saved.units, report.units);
}

#[test]
fn test_thread_count_does_not_change_output() {
    let env = TestEnvironment::new();
    let genome = genome(&env);

    let single = env.path("single");
    let many = env.path("many");
    Pipeline::new(config(&env, 1), &single).unwrap().run(&genome).unwrap();
    Pipeline::new(config(&env, 4), &many).unwrap().run(&genome).unwrap();

    for chromosome in ["chrA", "chrB"] {
        let a = fs::read_to_string(single.join(format!("selected/{}.tsv", chromosome))).unwrap();
        let b = fs::read_to_string(many.join(format!("selected/{}.tsv", chromosome))).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_resume_from_generated_candidates() {
    let env = TestEnvironment::new();
    let genome = genome(&env);
    let out = env.path("run");

    let pipeline = Pipeline::new(config(&env, 2), &out).unwrap();
    let (lengths, emitted) = pipeline.generate(&genome).unwrap();
    assert_eq!(lengths.len(), 2);

    let report = pipeline.resume().unwrap();
    assert_eq!(report.generated, emitted);
    assert_eq!(report.selected(), report.units.iter().map(|u| u.selected).sum::<u64>());
}

#[test]
fn test_missing_orf_file_fails_at_setup() {
    let env = TestEnvironment::new();
    let out = env.path("run");

    let mut config = config(&env, 1);
    config.measurement_filters = vec![FilterSpec::new("orf").with_param("file", "/nonexistent/orfs.tab")];

    match Pipeline::new(config, &out) {
        Err(oligoscan::OligoError::Config(msg)) => assert!(msg.contains("orfs.tab")),
        Err(e) => panic!("Expected config error, got {}", e),
        Ok(_) => panic!("Expected config error"),
    }
    assert!(!out.exists());
}

#[test]
fn test_missing_filter_parameter_fails_at_setup() {
    let env = TestEnvironment::new();
    let mut config = config(&env, 1);
    config.measurement_filters = vec![FilterSpec::new("range").with_param("min", "0.1")];
    assert!(Pipeline::new(config, env.path("run")).is_err());
}
