use crate::bio::sequence::Sequence;
use crate::OligoError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::one_of,
    combinator::{opt, rest},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Line width used for every FASTA file this crate writes.
pub const DEFAULT_LINE_WIDTH: usize = 70;

/// Parse a FASTA header line into its name and optional description
fn parse_header(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, _) = tag(">")(input)?;
    let (input, name) = take_till(|c: char| c == ' ' || c == '\t')(input)?;
    let (input, description) = opt(preceded(one_of(" \t"), rest))(input)?;
    Ok((input, (name, description)))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}

/// Streaming FASTA reader.
///
/// Records are yielded lazily, one at a time, and ids are assigned from 0 in
/// file order. For chromosome-sized records the generator uses the lower
/// level [`next_header`](Self::next_header) / [`read_line_into`](Self::read_line_into)
/// pair so the whole record never has to sit in memory.
pub struct FastaReader<R> {
    reader: R,
    source: String,
    line: String,
    line_no: usize,
    pending_header: Option<String>,
    in_record: bool,
    next_id: i64,
}

impl FastaReader<Box<dyn BufRead>> {
    /// Open a FASTA file (supports .gz compression)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OligoError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            OligoError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;

        let reader: Box<dyn BufRead> = if is_gzip(path) {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(FastaReader::new(reader).with_source(path.display().to_string()))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            source: "<stream>".to_string(),
            line: String::new(),
            line_no: 0,
            pending_header: None,
            in_record: false,
            next_id: 0,
        }
    }

    /// Label used in error messages
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn read_raw_line(&mut self) -> Result<bool, OligoError> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        if n == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        let trimmed = self.line.trim_end().len();
        self.line.truncate(trimmed);
        Ok(true)
    }

    fn header_name(&self) -> Result<String, OligoError> {
        let (_, (name, _description)) = parse_header(&self.line).map_err(|_| {
            OligoError::Parse(format!(
                "{}:{}: malformed FASTA header",
                self.source, self.line_no
            ))
        })?;
        if name.is_empty() {
            return Err(OligoError::Parse(format!(
                "{}:{}: empty FASTA header",
                self.source, self.line_no
            )));
        }
        Ok(name.to_string())
    }

    /// Advance to the next record header and return its name.
    ///
    /// Unread sequence lines of the current record are skipped.
    pub fn next_header(&mut self) -> Result<Option<String>, OligoError> {
        if let Some(name) = self.pending_header.take() {
            self.in_record = true;
            return Ok(Some(name));
        }

        loop {
            if !self.read_raw_line()? {
                self.in_record = false;
                return Ok(None);
            }
            if self.line.starts_with('>') {
                let name = self.header_name()?;
                self.in_record = true;
                return Ok(Some(name));
            }
            if self.line.trim().is_empty() || self.in_record {
                continue;
            }
            return Err(OligoError::Parse(format!(
                "{}:{}: sequence data before first header",
                self.source, self.line_no
            )));
        }
    }

    /// Append the next sequence line of the current record to `buf`.
    ///
    /// Returns `false` once the record is exhausted (next header or EOF).
    pub fn read_line_into(&mut self, buf: &mut Vec<u8>) -> Result<bool, OligoError> {
        if !self.in_record || self.pending_header.is_some() {
            return Ok(false);
        }

        loop {
            if !self.read_raw_line()? {
                self.in_record = false;
                return Ok(false);
            }
            if self.line.starts_with('>') {
                self.pending_header = Some(self.header_name()?);
                self.in_record = false;
                return Ok(false);
            }

            let before = buf.len();
            buf.extend(self.line.bytes().filter(|c| !c.is_ascii_whitespace()));
            if buf.len() > before {
                return Ok(true);
            }
        }
    }

    /// Read one whole record
    pub fn next_record(&mut self) -> Result<Option<Sequence>, OligoError> {
        let name = match self.next_header()? {
            Some(name) => name,
            None => return Ok(None),
        };

        let mut letters = Vec::new();
        while self.read_line_into(&mut letters)? {}

        let id = self.next_id;
        self.next_id += 1;
        Ok(Some(Sequence::new(id, name, letters)))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<Sequence, OligoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// FASTA writer wrapping sequence lines at a fixed width
pub struct FastaWriter<W: Write> {
    writer: W,
    line_width: usize,
    records: u64,
}

impl FastaWriter<Box<dyn Write>> {
    /// Create a FASTA file (supports .gz compression)
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, OligoError> {
        let path = path.as_ref();
        let file = File::create(path)?;

        let writer: Box<dyn Write> = if is_gzip(path) {
            Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            Box::new(BufWriter::new(file))
        };

        Ok(FastaWriter::new(writer))
    }
}

impl<W: Write> FastaWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line_width: DEFAULT_LINE_WIDTH,
            records: 0,
        }
    }

    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width.max(1);
        self
    }

    pub fn write_record(&mut self, name: &str, letters: &[u8]) -> Result<(), OligoError> {
        writeln!(self.writer, ">{}", name)?;
        for chunk in letters.chunks(self.line_width) {
            self.writer.write_all(chunk)?;
            self.writer.write_all(b"\n")?;
        }
        self.records += 1;
        Ok(())
    }

    pub fn write_sequence(&mut self, sequence: &Sequence) -> Result<(), OligoError> {
        self.write_record(&sequence.name, &sequence.letters)
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W, OligoError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Read every record of a FASTA file
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, OligoError> {
    FastaReader::open(path)?.collect()
}

/// Write sequences to a FASTA file (supports .gz compression)
pub fn write_fasta<P: AsRef<Path>>(path: P, sequences: &[Sequence]) -> Result<(), OligoError> {
    let mut writer = FastaWriter::create(path)?;
    for seq in sequences {
        writer.write_sequence(seq)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_header() {
        let (_, (name, desc)) = parse_header(">chrI some description here").unwrap();
        assert_eq!(name, "chrI");
        assert_eq!(desc, Some("some description here"));

        let (_, (name, desc)) = parse_header(">chrI:subseq(0,60)").unwrap();
        assert_eq!(name, "chrI:subseq(0,60)");
        assert_eq!(desc, None);
    }

    #[test]
    fn test_reader_yields_records_lazily() {
        let data = ">chrI first\nACGT\nacgt\n\n>chrII\nTTTT\n";
        let mut reader = FastaReader::new(Cursor::new(data));

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.name, "chrI");
        assert_eq!(first.letters, b"ACGTacgt".to_vec());

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(second.name, "chrII");
        assert_eq!(second.letters, b"TTTT".to_vec());

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_line_streaming() {
        let data = ">chrI\nAC\nGT\n>chrII\nGG\n";
        let mut reader = FastaReader::new(Cursor::new(data));

        assert_eq!(reader.next_header().unwrap().as_deref(), Some("chrI"));
        let mut buf = Vec::new();
        assert!(reader.read_line_into(&mut buf).unwrap());
        assert_eq!(buf, b"AC".to_vec());
        assert!(reader.read_line_into(&mut buf).unwrap());
        assert_eq!(buf, b"ACGT".to_vec());
        assert!(!reader.read_line_into(&mut buf).unwrap());

        assert_eq!(reader.next_header().unwrap().as_deref(), Some("chrII"));
        buf.clear();
        assert!(reader.read_line_into(&mut buf).unwrap());
        assert!(!reader.read_line_into(&mut buf).unwrap());
        assert!(reader.next_header().unwrap().is_none());
    }

    #[test]
    fn test_next_header_skips_unread_letters() {
        let data = ">a\nAAAA\nCCCC\n>b\nGG\n";
        let mut reader = FastaReader::new(Cursor::new(data));
        assert_eq!(reader.next_header().unwrap().as_deref(), Some("a"));
        assert_eq!(reader.next_header().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_data_before_header_is_error() {
        let mut reader = FastaReader::new(Cursor::new("ACGT\n>a\nAC\n")).with_source("test.fa");
        match reader.next_record() {
            Err(OligoError::Parse(msg)) => assert!(msg.contains("test.fa:1")),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_writer_wraps_lines() {
        let mut writer = FastaWriter::new(Vec::new()).with_line_width(4);
        writer.write_record("chrI", b"ACGTACGTAC").unwrap();
        assert_eq!(writer.records_written(), 1);
        let out = writer.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">chrI\nACGT\nACGT\nAC\n");
    }

    #[test]
    fn test_empty_record_roundtrip() {
        let mut reader = FastaReader::new(Cursor::new(">empty\n>full\nAC\n"));
        let empty = reader.next_record().unwrap().unwrap();
        assert!(empty.is_empty());
        let full = reader.next_record().unwrap().unwrap();
        assert_eq!(full.letters, b"AC".to_vec());
    }
}
