//! Byte-size and row accounting for source and fragment files.
//!
//! Row counts are raw newline counts, not CSV record counts: a quoted field
//! with an embedded newline counts as two rows.

use crate::rows::Result;
use memchr::memchr_iter;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Buffer size for counting reads (256KB).
const BUF_SIZE: usize = 256 * 1024;

/// Minimum file size to use mmap (smaller files use buffered I/O)
const MMAP_THRESHOLD: u64 = 64 * 1024;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Exact byte length of a file on disk.
pub fn file_size_bytes<P: AsRef<Path>>(path: P) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// File size in megabytes (MiB).
pub fn file_size_mb<P: AsRef<Path>>(path: P) -> Result<f64> {
    Ok(bytes_to_mb(file_size_bytes(path)?))
}

#[inline]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Convert a megabyte budget to bytes, truncating the fraction.
#[inline]
pub fn mb_to_bytes(mb: f64) -> u64 {
    (mb * BYTES_PER_MB) as u64
}

/// Count newline-delimited rows in a file, header included.
///
/// A last line without a trailing newline still counts.
pub fn count_rows<P: AsRef<Path>>(path: P) -> Result<u64> {
    let file = File::open(path.as_ref())?;
    let len = file.metadata()?.len();

    if len >= MMAP_THRESHOLD {
        // SAFETY: the source is treated as read-only for the whole run.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(count_lines_in(&mmap))
    } else {
        count_rows_reader(file)
    }
}

/// Count newline-delimited rows from any reader.
pub fn count_rows_reader<R: Read>(mut reader: R) -> Result<u64> {
    let mut buf = vec![0u8; BUF_SIZE];
    let mut newlines = 0u64;
    let mut last = None;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        newlines += memchr_iter(b'\n', &buf[..n]).count() as u64;
        last = Some(buf[n - 1]);
    }

    Ok(match last {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    })
}

fn count_lines_in(data: &[u8]) -> u64 {
    let newlines = memchr_iter(b'\n', data).count() as u64;
    match data.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}
