pub mod config;
pub mod generator;
pub mod pipeline;
pub mod selector;

pub use config::Config;
pub use generator::{CandidateGenerator, CandidateSink, FastaDirSink, VecSink, WindowSpec};
pub use pipeline::{ChromosomeUnit, Pipeline, RunReport, UnitReport};
pub use selector::{Selection, WindowSelector};
