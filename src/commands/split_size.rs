//! Size-bounded splitting.
//!
//! A fragment's byte size counts its header copy plus every encoded row.
//! Rows are never split: a row that alone exceeds the budget is written
//! whole into the fragment that is current when it arrives, and the next
//! row starts a new fragment.

use super::read_header;
use crate::accounting::{file_size_bytes, mb_to_bytes};
use crate::fragment::{FragmentSequence, SplitResult};
use crate::progress::{NoProgress, ProgressSink, ProgressUnit, PROGRESS_INTERVAL};
use crate::rows::{LineTerminator, Result, RowEncoder, RowReader, SplitError};
use csv::ByteRecord;
use log::{info, warn};
use std::path::Path;
use std::time::Instant;

/// Split a CSV file into fragments of bounded byte size.
#[derive(Debug, Clone)]
pub struct SizeSplitCommand {
    /// Maximum fragment size in megabytes (1 MB = 1024 * 1024 bytes)
    pub max_size_mb: f64,
    /// Treat the first row as a header and repeat it in every fragment
    pub duplicate_header: bool,
    pub terminator: LineTerminator,
}

impl SizeSplitCommand {
    pub fn new(max_size_mb: f64) -> Self {
        Self {
            max_size_mb,
            duplicate_header: false,
            terminator: LineTerminator::default(),
        }
    }

    pub fn with_duplicate_header(mut self, duplicate_header: bool) -> Self {
        self.duplicate_header = duplicate_header;
        self
    }

    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Byte budget per fragment.
    pub fn max_bytes(&self) -> Result<u64> {
        if !self.max_size_mb.is_finite() || self.max_size_mb <= 0.0 {
            return Err(SplitError::InvalidArgument(format!(
                "max size must be a positive number of MB, got {}",
                self.max_size_mb
            )));
        }
        Ok(mb_to_bytes(self.max_size_mb))
    }

    /// Run the split without progress reporting.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output_prefix: Q,
    ) -> Result<SplitResult> {
        self.run_with_progress(input, output_prefix, &mut NoProgress)
    }

    /// Run the split, reporting `(source bytes consumed, source bytes)`.
    pub fn run_with_progress<P: AsRef<Path>, Q: AsRef<Path>, S: ProgressSink + ?Sized>(
        &self,
        input: P,
        output_prefix: Q,
        progress: &mut S,
    ) -> Result<SplitResult> {
        let budget = self.max_bytes()?;

        let start = Instant::now();
        let input = input.as_ref();
        let total = file_size_bytes(input)?;
        let mut reader = RowReader::from_path(input)?;
        let mut encoder = RowEncoder::new(self.terminator);

        let header = read_header(&mut reader, &mut encoder, self.duplicate_header)?;

        info!(
            "Splitting {} by size: {} bytes per file, duplicate header: {}",
            input.display(),
            budget,
            self.duplicate_header
        );

        let mut fragments = FragmentSequence::new(output_prefix, header);
        let header_len = fragments.header_len();
        let mut record = ByteRecord::new();
        let mut rows: u64 = 0;

        while reader.read_row(&mut record)? {
            let encoded = encoder.encode(&record)?;
            let row_size = encoded.len() as u64;

            let full = fragments.current_rows() > 0
                && fragments.current_bytes() + row_size > budget;
            if !fragments.is_open() || full {
                fragments.open_next()?;
            }
            if header_len + row_size > budget {
                warn!(
                    "Row {} ({} bytes) exceeds the {} byte budget; written whole",
                    reader.rows_read(),
                    row_size,
                    budget
                );
            }
            fragments.write_row(encoded)?;
            rows += 1;

            if rows % PROGRESS_INTERVAL == 0 {
                progress.update(reader.bytes_consumed(), total, ProgressUnit::Bytes);
            }
        }
        progress.update(reader.bytes_consumed(), total, ProgressUnit::Bytes);

        let result = fragments.finish(self.duplicate_header, rows, start.elapsed())?;
        info!("Split complete: {}", result.stats);
        Ok(result)
    }
}
