pub mod measurements;

pub use measurements::{MeasurementReader, MeasurementWriter, Record, HEADER_ID};

use crate::OligoError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a value as pretty-printed JSON
pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), OligoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, OligoError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
