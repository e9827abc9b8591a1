//! Command implementations for csvsplit.

pub mod split_lines;
pub mod split_size;
pub mod verify;

pub use split_lines::LineSplitCommand;
pub use split_size::SizeSplitCommand;
pub use verify::{format_count, format_signed, IntegrityReport, VerifyCommand};

use crate::rows::{Result, RowEncoder, RowReader};
use csv::ByteRecord;
use std::io::Read;

/// Consume the first row as the header when duplication is requested.
///
/// Returns the header already encoded for fragments, or `None` when the
/// header is not duplicated or the source is empty.
pub(crate) fn read_header<R: Read>(
    reader: &mut RowReader<R>,
    encoder: &mut RowEncoder,
    duplicate_header: bool,
) -> Result<Option<Vec<u8>>> {
    if !duplicate_header {
        return Ok(None);
    }
    let mut record = ByteRecord::new();
    if reader.read_row(&mut record)? {
        Ok(Some(encoder.encode_owned(&record)?))
    } else {
        Ok(None)
    }
}
