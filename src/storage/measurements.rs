//! Binary persistence of attribute vectors.
//!
//! Layout: the magic bytes `OLGM`, one version byte, then length-prefixed
//! frames (`u32` little endian + bincode payload). The first frame is a
//! header record with id `-1` whose values are the measurement names in
//! column order; every later frame is one candidate.

use crate::core::config::MeasurementSpec;
use crate::measure::{AttributeVector, MeasurementRegistry, Value};
use crate::OligoError;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MEASUREMENT_MAGIC: &[u8; 4] = b"OLGM";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_ID: i64 = -1;

const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Length prefix for a payload, bounded by the limit readers enforce
fn frame_len(payload_len: usize) -> Result<u32, OligoError> {
    u32::try_from(payload_len)
        .ok()
        .filter(|&len| len <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            OligoError::Serialization(format!(
                "record of {} bytes exceeds the {} byte frame limit",
                payload_len, MAX_FRAME_LEN
            ))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub values: Vec<Value>,
}

impl Record {
    fn header(names: &[String]) -> Self {
        Self {
            id: HEADER_ID,
            values: names.iter().cloned().map(Value::String).collect(),
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("measurements"));
    name.push(".partial");
    path.with_file_name(name)
}

/// Streaming writer; the file only appears at its final path on `close`
pub struct MeasurementWriter {
    path: PathBuf,
    partial: PathBuf,
    writer: Option<BufWriter<File>>,
    names: Vec<String>,
    header_written: bool,
    records: u64,
}

impl MeasurementWriter {
    pub fn create<P: AsRef<Path>>(path: P, names: Vec<String>) -> Result<Self, OligoError> {
        let path = path.as_ref().to_path_buf();
        let partial = partial_path(&path);
        let mut writer = BufWriter::new(File::create(&partial)?);
        writer.write_all(MEASUREMENT_MAGIC)?;
        writer.write_u8(FORMAT_VERSION)?;

        Ok(Self {
            path,
            partial,
            writer: Some(writer),
            names,
            header_written: false,
            records: 0,
        })
    }

    /// Writer whose header lists the vector's measurements
    pub fn for_vector<P: AsRef<Path>>(
        path: P,
        vector: &AttributeVector,
    ) -> Result<Self, OligoError> {
        Self::create(path, vector.names())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    fn frame(&mut self, record: &Record) -> Result<(), OligoError> {
        let payload = bincode::serialize(record)?;
        let len = frame_len(payload.len())?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| OligoError::Other("measurement writer already closed".to_string()))?;
        writer.write_u32::<LittleEndian>(len)?;
        writer.write_all(&payload)?;
        Ok(())
    }

    fn ensure_header(&mut self) -> Result<(), OligoError> {
        if !self.header_written {
            let header = Record::header(&self.names);
            self.frame(&header)?;
            self.header_written = true;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &Record) -> Result<(), OligoError> {
        if record.id == HEADER_ID {
            return Err(OligoError::Other(format!(
                "record id {} is reserved for the header",
                HEADER_ID
            )));
        }
        if record.values.len() != self.names.len() {
            return Err(OligoError::Other(format!(
                "record {} has {} values, header has {} columns",
                record.id,
                record.values.len(),
                self.names.len()
            )));
        }

        self.ensure_header()?;
        self.frame(record)?;
        self.records += 1;
        Ok(())
    }

    /// Persist the vector's id and current values
    pub fn write(&mut self, vector: &AttributeVector) -> Result<(), OligoError> {
        let record = Record {
            id: vector.id(),
            values: vector.values().to_vec(),
        };
        self.write_record(&record)
    }

    /// Flush and move the file into place, returning its path
    pub fn close(mut self) -> Result<PathBuf, OligoError> {
        self.ensure_header()?;
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        fs::rename(&self.partial, &self.path)?;
        debug!(
            "Wrote {} measurement records to {}",
            self.records,
            self.path.display()
        );
        Ok(self.path.clone())
    }
}

impl Drop for MeasurementWriter {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.partial) {
                warn!(
                    "Could not remove partial file {}: {}",
                    self.partial.display(),
                    e
                );
            }
        }
    }
}

/// Streaming reader over a measurement file
pub struct MeasurementReader<'r, R = BufReader<File>> {
    reader: R,
    registry: &'r MeasurementRegistry,
    names: Vec<String>,
    specs: BTreeMap<String, MeasurementSpec>,
    source: String,
    records: u64,
}

impl<'r> MeasurementReader<'r, BufReader<File>> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        registry: &'r MeasurementRegistry,
    ) -> Result<Self, OligoError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::new(BufReader::new(file), registry, &path.display().to_string())
    }
}

impl<'r, R: Read> MeasurementReader<'r, R> {
    /// Read and validate the preamble and header record
    pub fn new(
        mut reader: R,
        registry: &'r MeasurementRegistry,
        source: &str,
    ) -> Result<Self, OligoError> {
        let mut preamble = [0u8; 5];
        reader.read_exact(&mut preamble).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                OligoError::Parse(format!("{}: not a measurement file", source))
            }
            _ => OligoError::Io(e),
        })?;
        if &preamble[..4] != MEASUREMENT_MAGIC {
            return Err(OligoError::Parse(format!(
                "{}: not a measurement file",
                source
            )));
        }
        if preamble[4] != FORMAT_VERSION {
            return Err(OligoError::Parse(format!(
                "{}: unsupported format version {}",
                source, preamble[4]
            )));
        }

        let mut this = Self {
            reader,
            registry,
            names: Vec::new(),
            specs: BTreeMap::new(),
            source: source.to_string(),
            records: 0,
        };

        let header = this
            .read_frame()?
            .ok_or_else(|| OligoError::Parse(format!("{}: missing header record", source)))?;
        if header.id != HEADER_ID {
            return Err(OligoError::Parse(format!(
                "{}: first record has id {}, expected header",
                source, header.id
            )));
        }

        for value in header.values {
            let name = match value {
                Value::String(name) => name,
                other => {
                    return Err(OligoError::Parse(format!(
                        "{}: header holds a {} value",
                        source,
                        other.value_type()
                    )))
                }
            };
            if !registry.contains(&name) {
                return Err(OligoError::Config(format!(
                    "{}: unknown measurement '{}'",
                    source, name
                )));
            }
            this.names.push(name);
        }
        Ok(this)
    }

    /// Weights and parameters used by [`next`](Self::next) when building vectors
    pub fn with_specs(mut self, specs: &[MeasurementSpec]) -> Self {
        self.specs = specs
            .iter()
            .map(|s| (s.name.to_ascii_lowercase(), s.clone()))
            .collect();
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn read_frame(&mut self) -> Result<Option<Record>, OligoError> {
        let mut len_buf = [0u8; 4];
        let mut filled = 0;
        while filled < len_buf.len() {
            match self.reader.read(&mut len_buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(OligoError::Parse(format!(
                        "{}: truncated frame length",
                        self.source
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let len = LittleEndian::read_u32(&len_buf);
        if len > MAX_FRAME_LEN {
            return Err(OligoError::Parse(format!(
                "{}: frame of {} bytes exceeds limit",
                self.source, len
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                OligoError::Parse(format!("{}: truncated record", self.source))
            }
            _ => OligoError::Io(e),
        })?;

        bincode::deserialize(&payload)
            .map(Some)
            .map_err(|e| OligoError::Parse(format!("{}: corrupt record: {}", self.source, e)))
    }

    /// Next raw data record, `None` at end of stream
    pub fn read_record(&mut self) -> Result<Option<Record>, OligoError> {
        let record = match self.read_frame()? {
            Some(record) => record,
            None => return Ok(None),
        };
        if record.id == HEADER_ID {
            return Err(OligoError::Parse(format!(
                "{}: unexpected second header record",
                self.source
            )));
        }
        if record.values.len() != self.names.len() {
            return Err(OligoError::Parse(format!(
                "{}: record {} has {} values, header has {}",
                self.source,
                record.id,
                record.values.len(),
                self.names.len()
            )));
        }
        self.records += 1;
        Ok(Some(record))
    }

    /// Load the next record into an existing vector.
    ///
    /// The vector must hold exactly the file's measurements, in any order.
    pub fn next_into(&mut self, vector: &mut AttributeVector) -> Result<bool, OligoError> {
        let record = match self.read_record()? {
            Some(record) => record,
            None => return Ok(false),
        };

        if vector.len() != self.names.len() {
            return Err(OligoError::Config(format!(
                "{}: file has {} measurements, vector has {}",
                self.source,
                self.names.len(),
                vector.len()
            )));
        }

        let in_order = self
            .names
            .iter()
            .enumerate()
            .all(|(idx, name)| vector.index_of(name) == Some(idx));

        let values = if in_order {
            record.values
        } else {
            let mut slots: Vec<Option<Value>> = vec![None; vector.len()];
            for (name, value) in self.names.iter().zip(record.values) {
                let idx = vector.index_of(name).ok_or_else(|| {
                    OligoError::Config(format!(
                        "{}: measurement '{}' is not part of the vector",
                        self.source, name
                    ))
                })?;
                slots[idx] = Some(value);
            }
            slots.into_iter().map(Option::unwrap_or_default).collect()
        };

        vector.set_id(record.id);
        vector.set_values(values)?;
        Ok(true)
    }

    /// Next record as a freshly built vector in file column order
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<AttributeVector>, OligoError> {
        let mut vector = self.new_vector()?;
        if self.next_into(&mut vector)? {
            Ok(Some(vector))
        } else {
            Ok(None)
        }
    }

    /// An empty vector matching this file's columns
    pub fn new_vector(&self) -> Result<AttributeVector, OligoError> {
        let mut vector = AttributeVector::new();
        for name in &self.names {
            let (measurement, weight) = match self.specs.get(&name.to_ascii_lowercase()) {
                Some(spec) => (self.registry.build(name, &spec.params)?, spec.weight),
                None => (self.registry.create(name)?, 1.0),
            };
            vector.add_measurement(measurement, weight)?;
        }
        Ok(vector)
    }
}
