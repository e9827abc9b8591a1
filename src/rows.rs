//! Streaming CSV row reader and encoder.
//!
//! Rows are read as raw byte records and re-encoded with minimal quoting
//! before they are written to a fragment. The encoder is also the single
//! source of truth for row sizes: the bytes measured are the bytes written.
//!
//! Blank source lines are rows too. The `csv` reader skips them, so a second
//! pass over the raw bytes runs in lockstep with it and reports each blank
//! line as an empty record, which encodes to a bare terminator.

use csv::{ByteRecord, Reader, ReaderBuilder, Terminator, WriterBuilder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Input buffer for the CSV reader (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Initial capacity of the per-row encode buffer.
const ROW_BUFFER: usize = 1024;

/// Errors that can occur while splitting or verifying.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, SplitError>;

/// Record terminator used when writing fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    #[default]
    Lf,
    Crlf,
}

impl LineTerminator {
    fn as_csv(self) -> Terminator {
        match self {
            LineTerminator::Lf => Terminator::Any(b'\n'),
            LineTerminator::Crlf => Terminator::CRLF,
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineTerminator::Lf => b"\n",
            LineTerminator::Crlf => b"\r\n",
        }
    }
}

/// Field state while stepping over one raw record.
#[derive(Clone, Copy)]
enum ScanState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Walks the raw source bytes record by record, following the same quoting
/// rules as the `csv` reader, to find the blank lines it skips.
struct BlankLineScanner<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> BlankLineScanner<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(DEFAULT_INPUT_BUFFER, inner),
        }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.inner.fill_buf()?.first().copied())
    }

    /// Consume a terminator at the current position. Returns true if it
    /// contained a `\n`, i.e. if it ended a counted line.
    fn consume_terminator(&mut self, first: u8) -> io::Result<bool> {
        self.inner.consume(1);
        if first == b'\r' {
            if self.peek()? == Some(b'\n') {
                self.inner.consume(1);
                return Ok(true);
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Skip consecutive blank lines, returning how many were skipped.
    fn skip_blank_lines(&mut self) -> io::Result<u64> {
        let mut blank = 0;
        while let Some(b) = self.peek()? {
            if b != b'\n' && b != b'\r' {
                break;
            }
            if self.consume_terminator(b)? {
                blank += 1;
            }
        }
        Ok(blank)
    }

    /// Skip one record, including its terminator.
    fn skip_record(&mut self) -> io::Result<()> {
        let mut state = ScanState::FieldStart;
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let mut used = 0;
            let mut end = None;
            for &b in buf {
                state = match (state, b) {
                    (ScanState::Quoted, b'"') => ScanState::QuoteInQuoted,
                    (ScanState::Quoted, _) => ScanState::Quoted,
                    (_, b'\n' | b'\r') => {
                        end = Some(b);
                        break;
                    }
                    (ScanState::FieldStart, b'"') => ScanState::Quoted,
                    (ScanState::QuoteInQuoted, b'"') => ScanState::Quoted,
                    (_, b',') => ScanState::FieldStart,
                    _ => ScanState::Unquoted,
                };
                used += 1;
            }
            self.inner.consume(used);
            if let Some(b) = end {
                self.consume_terminator(b)?;
                return Ok(());
            }
        }
    }
}

/// A streaming CSV row reader.
///
/// Rows may have differing field counts; no schema is enforced. A blank
/// line is returned as a record with no fields.
pub struct RowReader<R: Read> {
    reader: Reader<R>,
    scanner: BlankLineScanner<R>,
    pending_blank: u64,
    scanned: bool,
    rows_read: u64,
}

impl RowReader<File> {
    /// Open a CSV file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let records = File::open(path)?;
        let raw = File::open(path)?;
        Ok(Self::new(records, raw))
    }
}

impl<'a> RowReader<&'a [u8]> {
    /// Read rows from an in-memory buffer.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, bytes)
    }
}

impl<R: Read> RowReader<R> {
    /// Create a row reader from two independent handles on the same source:
    /// one parsed for records, one scanned for blank lines.
    pub fn new(records: R, raw: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .buffer_capacity(DEFAULT_INPUT_BUFFER)
            .from_reader(records);
        Self {
            reader,
            scanner: BlankLineScanner::new(raw),
            pending_blank: 0,
            scanned: false,
            rows_read: 0,
        }
    }

    /// Read the next row into `record`. Returns false at end of input.
    pub fn read_row(&mut self, record: &mut ByteRecord) -> Result<bool> {
        if !self.scanned {
            self.pending_blank = self.scanner.skip_blank_lines()?;
            self.scanned = true;
        }
        if self.pending_blank > 0 {
            self.pending_blank -= 1;
            record.clear();
            self.rows_read += 1;
            return Ok(true);
        }

        self.scanned = false;
        let more = self.reader.read_byte_record(record)?;
        if more {
            self.scanner.skip_record()?;
            self.rows_read += 1;
        }
        Ok(more)
    }

    /// Number of rows read so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Source bytes consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.reader.position().byte()
    }
}

/// Encodes rows exactly as they are written to fragments.
pub struct RowEncoder {
    builder: WriterBuilder,
    terminator: LineTerminator,
    buf: Vec<u8>,
}

impl Default for RowEncoder {
    fn default() -> Self {
        Self::new(LineTerminator::default())
    }
}

impl RowEncoder {
    pub fn new(terminator: LineTerminator) -> Self {
        let mut builder = WriterBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .terminator(terminator.as_csv())
            .buffer_capacity(ROW_BUFFER);
        Self {
            builder,
            terminator,
            buf: Vec::with_capacity(ROW_BUFFER),
        }
    }

    /// Encode a row, returning the encoded bytes including the terminator.
    ///
    /// The returned slice is valid until the next call. A record with no
    /// fields encodes to a bare terminator.
    pub fn encode(&mut self, record: &ByteRecord) -> Result<&[u8]> {
        self.buf.clear();
        if record.is_empty() {
            self.buf.extend_from_slice(self.terminator.as_bytes());
            return Ok(&self.buf);
        }
        let mut writer = self.builder.from_writer(&mut self.buf);
        writer.write_byte_record(record)?;
        writer.flush()?;
        drop(writer);
        Ok(&self.buf)
    }

    /// Encode a row into an owned buffer.
    pub fn encode_owned(&mut self, record: &ByteRecord) -> Result<Vec<u8>> {
        self.encode(record).map(<[u8]>::to_vec)
    }
}

/// Byte length of `record` once encoded for a fragment.
pub fn measured_row_size(encoder: &mut RowEncoder, record: &ByteRecord) -> Result<u64> {
    Ok(encoder.encode(record)?.len() as u64)
}
