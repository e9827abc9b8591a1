//! Row-bounded splitting.
//!
//! Every fragment but the last holds exactly `lines_per_file` data rows;
//! the last holds the remainder.

use super::read_header;
use crate::accounting::count_rows;
use crate::fragment::{FragmentSequence, SplitResult};
use crate::progress::{NoProgress, ProgressSink, ProgressUnit, PROGRESS_INTERVAL};
use crate::rows::{LineTerminator, Result, RowEncoder, RowReader, SplitError};
use csv::ByteRecord;
use log::info;
use std::path::Path;
use std::time::Instant;

/// Split a CSV file into fragments of a fixed row count.
#[derive(Debug, Clone)]
pub struct LineSplitCommand {
    /// Data rows per fragment (must be >= 1)
    pub lines_per_file: u64,
    /// Treat the first row as a header and repeat it in every fragment
    pub duplicate_header: bool,
    pub terminator: LineTerminator,
}

impl LineSplitCommand {
    pub fn new(lines_per_file: u64) -> Self {
        Self {
            lines_per_file,
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

    /// Reject a zero row bound before any output is produced.
    pub fn validate(&self) -> Result<()> {
        if self.lines_per_file == 0 {
            return Err(SplitError::InvalidArgument(
                "lines per file must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Run the split without progress reporting.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output_prefix: Q,
    ) -> Result<SplitResult> {
        self.run_with_progress(input, output_prefix, &mut NoProgress)
    }

    /// Run the split, reporting `(rows done, total rows)` to `progress`.
    pub fn run_with_progress<P: AsRef<Path>, Q: AsRef<Path>, S: ProgressSink + ?Sized>(
        &self,
        input: P,
        output_prefix: Q,
        progress: &mut S,
    ) -> Result<SplitResult> {
        self.validate()?;

        let start = Instant::now();
        let input = input.as_ref();
        let mut total = count_rows(input)?;
        let mut reader = RowReader::from_path(input)?;
        let mut encoder = RowEncoder::new(self.terminator);

        let header = read_header(&mut reader, &mut encoder, self.duplicate_header)?;
        if self.duplicate_header {
            total = total.saturating_sub(1);
        }

        info!(
            "Splitting {} by lines: {} per file, duplicate header: {}",
            input.display(),
            self.lines_per_file,
            self.duplicate_header
        );

        let mut fragments = FragmentSequence::new(output_prefix, header);
        let mut record = ByteRecord::new();
        let mut rows: u64 = 0;

        while reader.read_row(&mut record)? {
            if !fragments.is_open() || fragments.current_rows() >= self.lines_per_file {
                fragments.open_next()?;
            }
            fragments.write_row(encoder.encode(&record)?)?;
            rows += 1;

            if rows % PROGRESS_INTERVAL == 0 {
                progress.update(rows, total, ProgressUnit::Rows);
            }
        }
        progress.update(rows, total, ProgressUnit::Rows);

        let result = fragments.finish(self.duplicate_header, rows, start.elapsed())?;
        info!("Split complete: {}", result.stats);
        Ok(result)
    }
}
