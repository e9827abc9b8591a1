//! Fragment files: naming, the sequential writer and the split result.

use crate::rows::Result;
use log::debug;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output buffer per open fragment (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Path of fragment `index`: `{prefix}_{index}.csv`.
pub fn fragment_path<P: AsRef<Path>>(prefix: P, index: usize) -> PathBuf {
    let mut itoa_buf = itoa::Buffer::new();
    let mut name = OsString::from(prefix.as_ref().as_os_str());
    name.push("_");
    name.push(itoa_buf.format(index));
    name.push(".csv");
    PathBuf::from(name)
}

/// Prefix used when only an output directory is given: `{dir}/{stem}_split`.
pub fn default_output_prefix<P: AsRef<Path>, D: AsRef<Path>>(input: P, output_dir: D) -> PathBuf {
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.as_ref().join(format!("{}_split", stem))
}

/// One closed output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 1-based position in the split.
    pub index: usize,
    pub path: PathBuf,
    /// Data rows, header excluded.
    pub rows: u64,
    /// Bytes written, header included.
    pub bytes: u64,
}

/// Statistics from a split operation.
#[derive(Debug, Default, Clone)]
pub struct SplitStats {
    pub rows_read: u64,
    pub bytes_written: u64,
    pub fragments: usize,
    pub elapsed: Duration,
}

impl std::fmt::Display for SplitStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rows: {}, Bytes: {}, Fragments: {}, Elapsed: {:.2}s",
            self.rows_read,
            self.bytes_written,
            self.fragments,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Ordered fragments produced by one split.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub fragments: Vec<Fragment>,
    pub duplicate_header: bool,
    pub stats: SplitStats,
}

impl SplitResult {
    /// Fragment paths in creation order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.fragments.iter().map(|f| f.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Data rows per fragment, in order.
    pub fn rows_per_fragment(&self) -> Vec<u64> {
        self.fragments.iter().map(|f| f.rows).collect()
    }
}

struct OpenFragment {
    writer: BufWriter<File>,
    fragment: Fragment,
}

/// Writes fragments strictly one at a time in increasing index order.
///
/// Dropping the sequence (for instance on an early `?` return) closes the
/// open fragment; fragments already closed stay on disk.
pub struct FragmentSequence {
    prefix: PathBuf,
    header: Option<Vec<u8>>,
    current: Option<OpenFragment>,
    closed: Vec<Fragment>,
    bytes_written: u64,
}

impl FragmentSequence {
    /// `header` is the encoded header row written at the top of every fragment.
    pub fn new<P: AsRef<Path>>(prefix: P, header: Option<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.as_ref().to_path_buf(),
            header,
            current: None,
            closed: Vec::new(),
            bytes_written: 0,
        }
    }

    /// Close the current fragment, if any, and open the next one.
    pub fn open_next(&mut self) -> Result<()> {
        self.close_current()?;

        let index = self.closed.len() + 1;
        let path = fragment_path(&self.prefix, index);
        let file = File::create(&path)?;
        let mut open = OpenFragment {
            writer: BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, file),
            fragment: Fragment {
                index,
                path,
                rows: 0,
                bytes: 0,
            },
        };

        if let Some(header) = &self.header {
            open.writer.write_all(header)?;
            open.fragment.bytes += header.len() as u64;
            self.bytes_written += header.len() as u64;
        }

        self.current = Some(open);
        Ok(())
    }

    /// Append an encoded row to the current fragment, opening one if needed.
    pub fn write_row(&mut self, encoded: &[u8]) -> Result<()> {
        if self.current.is_none() {
            self.open_next()?;
        }
        if let Some(open) = self.current.as_mut() {
            open.writer.write_all(encoded)?;
            open.fragment.rows += 1;
            open.fragment.bytes += encoded.len() as u64;
            self.bytes_written += encoded.len() as u64;
        }
        Ok(())
    }

    /// Data rows in the open fragment (0 when none is open).
    pub fn current_rows(&self) -> u64 {
        self.current.as_ref().map_or(0, |o| o.fragment.rows)
    }

    /// Bytes in the open fragment, header included (0 when none is open).
    pub fn current_bytes(&self) -> u64 {
        self.current.as_ref().map_or(0, |o| o.fragment.bytes)
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Encoded header length, or 0 without a header.
    pub fn header_len(&self) -> u64 {
        self.header.as_ref().map_or(0, |h| h.len() as u64)
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(mut open) = self.current.take() {
            open.writer.flush()?;
            debug!(
                "Closed fragment {} ({} rows, {} bytes): {}",
                open.fragment.index,
                open.fragment.rows,
                open.fragment.bytes,
                open.fragment.path.display()
            );
            self.closed.push(open.fragment);
        }
        Ok(())
    }

    /// Close the last fragment and assemble the result.
    pub fn finish(
        mut self,
        duplicate_header: bool,
        rows_read: u64,
        elapsed: Duration,
    ) -> Result<SplitResult> {
        self.close_current()?;
        let stats = SplitStats {
            rows_read,
            bytes_written: self.bytes_written,
            fragments: self.closed.len(),
            elapsed,
        };
        Ok(SplitResult {
            fragments: self.closed,
            duplicate_header,
            stats,
        })
    }
}
