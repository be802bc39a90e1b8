pub mod bio;
pub mod cli;
pub mod core;
pub mod filter;
pub mod measure;
pub mod resources;
pub mod storage;
pub mod utils;

pub use crate::bio::{FastaReader, Sequence, SubseqName};
pub use crate::core::{CandidateGenerator, Config, Pipeline};
pub use crate::measure::{AttributeVector, Measurement, MeasurementRegistry, Value, ValueType};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OligoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl From<bincode::Error> for OligoError {
    fn from(err: bincode::Error) -> Self {
        OligoError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for OligoError {
    fn from(err: serde_json::Error) -> Self {
        OligoError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OligoError>;
