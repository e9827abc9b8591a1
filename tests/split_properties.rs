//! Property-style tests for both splitters and the verifier.
//!
//! Inputs are generated from fixed seeds so failures reproduce.

use csv::ReaderBuilder;
use csvsplit::commands::{LineSplitCommand, SizeSplitCommand, VerifyCommand};
use csvsplit::fragment::fragment_path;
use csvsplit::LineTerminator;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

const HEADER: [&str; 3] = ["__id__", "__label__", "__amount__"];

/// Random rows with commas and quotes in some fields, no embedded newlines.
fn random_rows(seed: u64, count: usize) -> Vec<Vec<String>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let len = rng.gen_range(0..24);
            let mut label: String = (0..len)
                .map(|_| (b'a' + rng.gen_range(0..26)) as char)
                .collect();
            match rng.gen_range(0..5) {
                0 => label.push_str(", with comma"),
                1 => label.push_str(" \"quoted\""),
                _ => {}
            }
            vec![i.to_string(), label, rng.gen_range(0..100_000u32).to_string()]
        })
        .collect()
}

fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(header).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

fn read_all(path: &Path) -> Vec<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn header_row() -> Vec<String> {
    HEADER.iter().map(|s| s.to_string()).collect()
}

/// Data rows of all fragments concatenated, header copies removed.
fn concatenated_rows(paths: &[PathBuf], duplicate_header: bool) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for path in paths {
        let mut rows = read_all(path);
        if duplicate_header {
            assert_eq!(rows.remove(0), header_row(), "{}", path.display());
        }
        out.extend(rows);
    }
    out
}

fn setup(seed: u64, count: usize) -> (TempDir, PathBuf, Vec<Vec<String>>) {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.csv");
    let rows = random_rows(seed, count);
    write_csv(&source, &HEADER, &rows);
    (dir, source, rows)
}

// =============================================================================
// Row-bounded splitter
// =============================================================================

#[test]
fn test_lines_fragment_count_and_order() {
    for (seed, count, bound) in [(1, 100, 7), (2, 64, 8), (3, 1, 5), (4, 250, 1), (5, 33, 100)] {
        let (dir, source, rows) = setup(seed, count);
        let split = LineSplitCommand::new(bound)
            .with_duplicate_header(true)
            .run(&source, dir.path().join("out"))
            .unwrap();

        let expected = count.div_ceil(bound as usize);
        assert_eq!(split.len(), expected, "seed {}", seed);

        let sizes = split.rows_per_fragment();
        for (i, size) in sizes.iter().enumerate() {
            if i + 1 < sizes.len() {
                assert_eq!(*size, bound);
            } else {
                assert!((1..=bound).contains(size));
            }
        }

        assert_eq!(concatenated_rows(&split.paths(), true), rows);
    }
}

#[test]
fn test_lines_without_header_duplication() {
    let (dir, source, rows) = setup(11, 40);
    let split = LineSplitCommand::new(9)
        .run(&source, dir.path().join("out"))
        .unwrap();

    let all = concatenated_rows(&split.paths(), false);
    assert_eq!(all[0], header_row());
    assert_eq!(&all[1..], &rows[..]);

    // Only fragment 1 carries the header text.
    for path in split.paths().iter().skip(1) {
        assert!(read_all(path).iter().all(|r| r != &header_row()));
    }
}

#[test]
fn test_lines_numbering_is_contiguous() {
    let (dir, source, _) = setup(12, 45);
    let prefix = dir.path().join("parts");
    let split = LineSplitCommand::new(10)
        .with_duplicate_header(true)
        .run(&source, &prefix)
        .unwrap();

    for (i, fragment) in split.fragments.iter().enumerate() {
        assert_eq!(fragment.index, i + 1);
        assert_eq!(fragment.path, fragment_path(&prefix, i + 1));
    }
    assert!(!fragment_path(&prefix, split.len() + 1).exists());
}

#[test]
fn test_lines_idempotent() {
    let (dir, source, _) = setup(13, 77);

    let first = LineSplitCommand::new(10)
        .with_duplicate_header(true)
        .run(&source, dir.path().join("a"))
        .unwrap();
    let first_bytes: Vec<Vec<u8>> = first.paths().iter().map(|p| fs::read(p).unwrap()).collect();

    for path in first.paths() {
        fs::remove_file(path).unwrap();
    }

    let second = LineSplitCommand::new(10)
        .with_duplicate_header(true)
        .run(&source, dir.path().join("a"))
        .unwrap();
    let second_bytes: Vec<Vec<u8>> = second.paths().iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first.paths(), second.paths());
    assert_eq!(first_bytes, second_bytes);
}

// =============================================================================
// Size-bounded splitter
// =============================================================================

#[test]
fn test_size_fragments_within_budget() {
    for (seed, budget_bytes) in [(21u64, 256u64), (22, 1000), (23, 4096)] {
        let (dir, source, rows) = setup(seed, 300);
        let max_mb = budget_bytes as f64 / (1024.0 * 1024.0);

        let split = SizeSplitCommand::new(max_mb)
            .with_duplicate_header(true)
            .run(&source, dir.path().join("out"))
            .unwrap();

        assert!(split.len() > 1);
        for fragment in &split.fragments {
            let on_disk = fs::metadata(&fragment.path).unwrap().len();
            assert_eq!(on_disk, fragment.bytes);
            assert!(on_disk <= budget_bytes, "seed {}: {} > {}", seed, on_disk, budget_bytes);
        }
        assert_eq!(concatenated_rows(&split.paths(), true), rows);
    }
}

#[test]
fn test_size_fragments_are_maximal() {
    // Each fragment is closed only because the next row would not fit.
    let (dir, source, _) = setup(24, 200);
    let budget = 512u64;
    let split = SizeSplitCommand::new(budget as f64 / (1024.0 * 1024.0))
        .with_duplicate_header(true)
        .run(&source, dir.path().join("out"))
        .unwrap();

    let fragments = &split.fragments;
    for pair in fragments.windows(2) {
        let next_first_row = fs::read_to_string(&pair[1].path)
            .unwrap()
            .lines()
            .nth(1)
            .map(|l| l.len() as u64 + 1)
            .unwrap();
        assert!(pair[0].bytes + next_first_row > budget);
    }
}

#[test]
fn test_size_oversized_row_counted_by_verifier() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.csv");
    let huge = "z".repeat(2048);
    let rows = vec![
        vec!["1".to_string(), "small".to_string(), "1".to_string()],
        vec!["2".to_string(), huge, "2".to_string()],
        vec!["3".to_string(), "small".to_string(), "3".to_string()],
    ];
    write_csv(&source, &HEADER, &rows);

    let split = SizeSplitCommand::new(100.0 / (1024.0 * 1024.0))
        .with_duplicate_header(true)
        .run(&source, dir.path().join("out"))
        .unwrap();

    assert_eq!(split.rows_per_fragment(), vec![1, 1, 1]);
    assert!(split.fragments[1].bytes > 100);

    let report = VerifyCommand::new()
        .with_duplicate_header(true)
        .run_split(&source, &split)
        .unwrap();
    assert!(report.passed());
    assert_eq!(report.original_data_rows, 3);
}

#[test]
fn test_size_crlf_round_trip() {
    let (dir, source, rows) = setup(25, 60);
    let split = SizeSplitCommand::new(600.0 / (1024.0 * 1024.0))
        .with_duplicate_header(true)
        .with_terminator(LineTerminator::Crlf)
        .run(&source, dir.path().join("out"))
        .unwrap();

    for path in split.paths() {
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.ends_with(b"\r\n"));
    }
    assert_eq!(concatenated_rows(&split.paths(), true), rows);

    let report = VerifyCommand::new()
        .with_duplicate_header(true)
        .run_split(&source, &split)
        .unwrap();
    assert!(report.passed());
}

// =============================================================================
// Verifier
// =============================================================================

#[test]
fn test_verifier_ten_rows_bound_three() {
    let (dir, source, _) = setup(31, 10);
    let split = LineSplitCommand::new(3)
        .with_duplicate_header(true)
        .run(&source, dir.path().join("out"))
        .unwrap();
    assert_eq!(split.rows_per_fragment(), vec![3, 3, 3, 1]);

    let report = VerifyCommand::new()
        .with_duplicate_header(true)
        .run(&source, &split.paths())
        .unwrap();
    assert_eq!(report.original_data_rows, 10);
    assert_eq!(report.split_total, 10);
    assert!(report.passed());
}

#[test]
fn test_verifier_reports_signed_difference() {
    let (dir, source, _) = setup(32, 12);
    let split = LineSplitCommand::new(5)
        .with_duplicate_header(true)
        .run(&source, dir.path().join("out"))
        .unwrap();

    // Drop the last fragment: rows go missing.
    let paths = split.paths();
    let report = VerifyCommand::new()
        .with_duplicate_header(true)
        .run(&source, &paths[..paths.len() - 1])
        .unwrap();
    assert!(!report.passed());
    assert_eq!(report.difference(), 2);

    // Count one fragment twice: too many rows.
    let mut doubled = paths.clone();
    doubled.push(paths[0].clone());
    let report = VerifyCommand::new()
        .with_duplicate_header(true)
        .run(&source, &doubled)
        .unwrap();
    assert_eq!(report.difference(), -5);
}

#[test]
fn test_empty_source_both_modes() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("empty.csv");
    write_csv(&source, &HEADER, &[]);

    let by_lines = LineSplitCommand::new(10)
        .with_duplicate_header(true)
        .run(&source, dir.path().join("l"))
        .unwrap();
    let by_size = SizeSplitCommand::new(1.0)
        .with_duplicate_header(true)
        .run(&source, dir.path().join("s"))
        .unwrap();
    assert!(by_lines.is_empty());
    assert!(by_size.is_empty());

    let report = VerifyCommand::new()
        .with_duplicate_header(true)
        .run_split(&source, &by_lines)
        .unwrap();
    assert!(report.passed());
    assert_eq!(report.split_total, 0);
}
