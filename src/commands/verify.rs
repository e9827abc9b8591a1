//! Post-split row-count reconciliation.
//!
//! This is a count check only: it cannot detect corrupted or reordered rows.

use crate::accounting::count_rows;
use crate::fragment::SplitResult;
use crate::rows::Result;
use log::{info, warn};
use std::path::Path;

/// Outcome of an integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Source lines minus the source header line
    pub original_data_rows: u64,
    /// Data lines across all fragments
    pub split_total: u64,
    pub fragments: usize,
}

impl IntegrityReport {
    pub fn passed(&self) -> bool {
        self.original_data_rows == self.split_total
    }

    /// `original_data_rows - split_total`; positive means rows went missing.
    pub fn difference(&self) -> i64 {
        self.original_data_rows as i64 - self.split_total as i64
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Original file lines (excluding header): {}",
            format_count(self.original_data_rows)
        )?;
        writeln!(
            f,
            "Total lines in split files:             {}",
            format_count(self.split_total)
        )?;
        if self.passed() {
            write!(f, "Line integrity check passed: all lines accounted for.")
        } else {
            write!(
                f,
                "Line integrity check failed! Difference: {} lines",
                format_signed(self.difference())
            )
        }
    }
}

/// Integrity verifier configuration.
#[derive(Debug, Clone, Default)]
pub struct VerifyCommand {
    /// Every fragment starts with a copy of the header
    pub duplicate_header: bool,
}

impl VerifyCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_header(mut self, duplicate_header: bool) -> Self {
        self.duplicate_header = duplicate_header;
        self
    }

    /// Reconcile the source row count against the given fragments.
    ///
    /// Without header duplication the source header is distributed as the
    /// first line of fragment 1, so it is subtracted once from the split
    /// total instead of once per fragment.
    pub fn run<P: AsRef<Path>, F: AsRef<Path>>(
        &self,
        source: P,
        fragments: &[F],
    ) -> Result<IntegrityReport> {
        let original_data_rows = count_rows(source.as_ref())?.saturating_sub(1);

        let mut split_total: u64 = 0;
        for fragment in fragments {
            let lines = count_rows(fragment.as_ref())?;
            split_total += if self.duplicate_header {
                lines.saturating_sub(1)
            } else {
                lines
            };
        }
        if !self.duplicate_header {
            split_total = split_total.saturating_sub(1);
        }

        let report = IntegrityReport {
            original_data_rows,
            split_total,
            fragments: fragments.len(),
        };

        if report.passed() {
            info!(
                "Integrity check passed: {} rows across {} fragments",
                report.split_total, report.fragments
            );
        } else {
            warn!(
                "Integrity check failed: source {} rows, fragments {} rows (difference {})",
                report.original_data_rows,
                report.split_total,
                format_signed(report.difference())
            );
        }
        Ok(report)
    }

    /// Verify the fragments of a finished split, using the header mode the
    /// split was made with.
    pub fn run_split<P: AsRef<Path>>(
        &self,
        source: P,
        split: &SplitResult,
    ) -> Result<IntegrityReport> {
        self.clone()
            .with_duplicate_header(split.duplicate_header)
            .run(source, &split.paths())
    }
}

/// Format a count with thousands separators: `1234567` -> `1,234,567`.
pub fn format_count(count: u64) -> String {
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(count).as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, &d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(d as char);
    }
    out
}

/// Format a signed difference with an explicit sign: `+1,000`, `-3`, `+0`.
pub fn format_signed(value: i64) -> String {
    let sign = if value < 0 { '-' } else { '+' };
    format!("{}{}", sign, format_count(value.unsigned_abs()))
}
