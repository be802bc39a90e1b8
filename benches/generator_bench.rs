use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use oligoscan::bio::FastaReader;
use oligoscan::core::generator::{CandidateGenerator, CandidateSink, WindowSpec};
use oligoscan::measure::{AttributeVector, MeasurementRegistry};
use oligoscan::{OligoError, Sequence};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::io::Cursor;

fn generate_genome(length: usize) -> String {
    let mut rng = StdRng::seed_from_u64(42); // Deterministic across runs
    let bases = ['A', 'C', 'G', 'T'];
    let mut content = String::from(">chrBench\n");
    for j in 0..length {
        content.push(bases[rng.gen_range(0..4)]);
        if (j + 1) % 60 == 0 {
            content.push('\n');
        }
    }
    content.push('\n');
    content
}

/// Counts letters without keeping candidates
#[derive(Default)]
struct CountingSink {
    letters: u64,
}

impl CandidateSink for CountingSink {
    fn emit(&mut self, _chromosome: &str, _start: u64, letters: &[u8]) -> Result<(), OligoError> {
        self.letters += letters.len() as u64;
        Ok(())
    }
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator/windows");
    let genome = generate_genome(100_000);
    group.throughput(Throughput::Bytes(100_000));

    for interval in [0usize, 2, 5] {
        group.bench_with_input(
            BenchmarkId::from_parameter(interval),
            &interval,
            |b, &interval| {
                b.iter(|| {
                    let mut generator =
                        CandidateGenerator::new(WindowSpec::new(60, interval)).unwrap();
                    let mut reader = FastaReader::new(Cursor::new(genome.as_bytes()));
                    let mut sink = CountingSink::default();
                    generator.generate(&mut reader, &mut sink).unwrap();
                    black_box(sink.letters);
                });
            },
        );
    }

    group.finish();
}

fn bench_measurement(c: &mut Criterion) {
    let registry = MeasurementRegistry::with_builtins();
    let mut vector =
        AttributeVector::from_names(&registry, &["name", "gc", "complexity", "homopolymer"])
            .unwrap();
    let letters = generate_genome(60).lines().nth(1).unwrap().as_bytes().to_vec();

    c.bench_function("measure/attribute_vector", |b| {
        b.iter(|| {
            vector.bind(Sequence::new(0, "chrBench:subseq(0,60)", letters.clone()));
            vector.compute(false).unwrap();
            black_box(vector.score());
        });
    });
}

criterion_group!(benches, bench_generation, bench_measurement);
criterion_main!(benches);
