//! csvsplit: split large CSV files by row count or byte size
//!
//! Usage: csvsplit <COMMAND> [OPTIONS]

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use csvsplit::accounting::{count_rows, file_size_mb};
use csvsplit::commands::{format_count, LineSplitCommand, SizeSplitCommand, VerifyCommand};
use csvsplit::fragment::{default_output_prefix, SplitResult};
use csvsplit::logging::init_logger;
use csvsplit::progress::{ChannelProgress, NoProgress, ProgressSink, StderrProgress};
use csvsplit::rows::{LineTerminator, SplitError};

/// Pending progress updates kept for the renderer thread.
const PROGRESS_QUEUE: usize = 64;

#[derive(Parser)]
#[command(name = "csvsplit")]
#[command(version)]
#[command(about = "Split large CSV files into row- or size-bounded fragments", long_about = None)]
struct Cli {
    /// Log progress details to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split into fragments holding a fixed number of data rows
    Lines {
        /// Data rows per output file
        #[arg(short = 'n', long)]
        lines: u64,

        #[command(flatten)]
        split: SplitArgs,
    },

    /// Split into fragments no larger than a size in MB
    Size {
        /// Maximum size of each output file in MB
        #[arg(short = 'm', long = "max-size")]
        max_size: f64,

        #[command(flatten)]
        split: SplitArgs,
    },

    /// Check that fragment row counts add up to the source
    Verify {
        /// Source CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Fragments start with a copy of the header
        #[arg(long)]
        duplicate_header: bool,

        /// Fragment files, in order
        fragments: Vec<PathBuf>,
    },

    /// Print size and row count of a CSV file
    Info {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct SplitArgs {
    /// Input CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Repeat the header row at the top of every output file
    #[arg(long)]
    duplicate_header: bool,

    /// Output prefix; files are named PREFIX_1.csv, PREFIX_2.csv, ...
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Output directory; files are named <input stem>_split_N.csv
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Write CRLF record terminators instead of LF
    #[arg(long)]
    crlf: bool,

    /// Skip the row-count integrity check
    #[arg(long)]
    no_verify: bool,

    /// Do not draw a progress line
    #[arg(long)]
    no_progress: bool,

    /// Print split statistics to stderr
    #[arg(long)]
    stats: bool,
}

impl SplitArgs {
    fn terminator(&self) -> LineTerminator {
        if self.crlf {
            LineTerminator::Crlf
        } else {
            LineTerminator::Lf
        }
    }

    /// Resolve the output prefix and make sure its directory exists.
    fn output_prefix(&self) -> Result<PathBuf, SplitError> {
        let prefix = match (&self.output, &self.output_dir) {
            (Some(prefix), _) => prefix.clone(),
            (None, Some(dir)) => default_output_prefix(&self.input, dir),
            (None, None) => {
                let dir = self
                    .input
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                default_output_prefix(&self.input, dir)
            }
        };

        if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(prefix)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Lines { lines, split } => run_lines(lines, split),
        Commands::Size { max_size, split } => run_size(max_size, split),
        Commands::Verify {
            input,
            duplicate_header,
            fragments,
        } => run_verify(input, duplicate_header, fragments),
        Commands::Info { input } => run_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_lines(lines: u64, args: SplitArgs) -> Result<(), SplitError> {
    let cmd = LineSplitCommand::new(lines)
        .with_duplicate_header(args.duplicate_header)
        .with_terminator(args.terminator());
    cmd.validate()?;

    run_split(&args, "Splitting by lines", |prefix, progress| {
        cmd.run_with_progress(&args.input, prefix, progress)
    })
}

fn run_size(max_size: f64, args: SplitArgs) -> Result<(), SplitError> {
    let cmd = SizeSplitCommand::new(max_size)
        .with_duplicate_header(args.duplicate_header)
        .with_terminator(args.terminator());
    // Reject bad budgets before touching the output directory.
    cmd.max_bytes()?;

    run_split(&args, "Splitting by size", |prefix, progress| {
        cmd.run_with_progress(&args.input, prefix, progress)
    })
}

/// Shared driver: report the source, split, report fragments, verify.
fn run_split<F>(args: &SplitArgs, label: &str, split: F) -> Result<(), SplitError>
where
    F: FnOnce(&Path, &mut dyn ProgressSink) -> Result<SplitResult, SplitError>,
{
    print_source_summary(&args.input)?;
    let prefix = args.output_prefix()?;

    let result = if args.no_progress {
        split(prefix.as_path(), &mut NoProgress)
    } else {
        let (tx, rx) = crossbeam_channel::bounded(PROGRESS_QUEUE);
        let label = label.to_string();
        let renderer = thread::spawn(move || {
            let mut bar = StderrProgress::new(label);
            for update in rx {
                bar.render(update);
            }
            bar.finish();
        });

        let mut sink = ChannelProgress::new(tx);
        let result = split(prefix.as_path(), &mut sink);
        drop(sink);
        let _ = renderer.join();
        result
    }?;

    println!(
        "\nDone! Created {} files in {:.2}s",
        result.len(),
        result.stats.elapsed.as_secs_f64()
    );
    println!("Split files saved with prefix: {}_#.csv", prefix.display());
    if args.stats {
        eprintln!("Split stats: {}", result.stats);
    }

    if !args.no_verify {
        let report = VerifyCommand::new().run_split(&args.input, &result)?;
        println!("\nVerifying line integrity...");
        println!("{}", report);
    }

    Ok(())
}

fn print_source_summary(input: &Path) -> Result<(), SplitError> {
    let size_mb = file_size_mb(input)?;
    let data_rows = count_rows(input)?.saturating_sub(1);
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    println!("Loaded file: {}", name);
    println!("Size: {:.2} MB | Lines: {}", size_mb, format_count(data_rows));
    Ok(())
}

fn run_verify(
    input: PathBuf,
    duplicate_header: bool,
    fragments: Vec<PathBuf>,
) -> Result<(), SplitError> {
    let report = VerifyCommand::new()
        .with_duplicate_header(duplicate_header)
        .run(&input, &fragments)?;
    println!("{}", report);
    Ok(())
}

fn run_info(input: PathBuf) -> Result<(), SplitError> {
    print_source_summary(&input)
}
