//! csvsplit: split large CSV files into smaller fragments.
//!
//! This library splits a CSV file either by a fixed number of data rows per
//! fragment or by a maximum byte size per fragment, optionally repeating the
//! header row in every fragment, and reconciles row counts afterwards.
//!
//! # Features
//!
//! - **Streaming I/O**: the source is read once; one fragment is open at a time
//! - **Exact size accounting**: row sizes are measured on the encoded bytes
//! - **Integrity check**: line-count reconciliation between source and fragments
//!
//! # Example
//!
//! ```rust,no_run
//! use csvsplit::commands::{LineSplitCommand, VerifyCommand};
//!
//! let split = LineSplitCommand::new(100_000)
//!     .with_duplicate_header(true)
//!     .run("data.csv", "out/data_split")
//!     .unwrap();
//!
//! let report = VerifyCommand::new()
//!     .with_duplicate_header(true)
//!     .run_split("data.csv", &split)
//!     .unwrap();
//! assert!(report.passed());
//! ```

pub mod accounting;
pub mod commands;
pub mod fragment;
pub mod logging;
pub mod progress;
pub mod rows;

// Re-export commonly used types
pub use accounting::{count_rows, file_size_bytes, file_size_mb};
pub use fragment::{fragment_path, Fragment, SplitResult, SplitStats};
pub use rows::{measured_row_size, LineTerminator, Result, SplitError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::accounting::{count_rows, file_size_bytes, file_size_mb};
    pub use crate::commands::{IntegrityReport, LineSplitCommand, SizeSplitCommand, VerifyCommand};
    pub use crate::fragment::{Fragment, SplitResult};
    pub use crate::progress::{NoProgress, ProgressSink, ProgressUnit};
    pub use crate::rows::{LineTerminator, SplitError};
}
