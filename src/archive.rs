// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Writes fetched data to disk.
//!
//! Raw responses are archived as JSON Lines exactly as the API returned
//! them, so they can be re-normalized later. Normalized rows go to CSV
//! with a fixed column order. Every file is written to a temporary
//! sibling first and renamed into place.

use crate::normalize::{COLUMNS, NormalizedRow};
use log::debug;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the raw file for a counts request made at `tag`.
pub fn counts_file_name(query_key: &str, tag: &str) -> String {
    format!("counts_{query_key}_{tag}.jsonl")
}

/// Name of the raw file for a search request made at `tag`.
pub fn raw_fetch_file_name(query_key: &str, tag: &str) -> String {
    format!("fetch_{query_key}_{tag}.jsonl")
}

/// Name of the clean file for a search request made at `tag`.
pub fn clean_fetch_file_name(query_key: &str, tag: &str) -> String {
    format!("fetch_{query_key}_{tag}.csv")
}

/// Writes `records` to `path`, one compact JSON object per line.
pub fn save_jsonl(records: &[Value], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    write_atomic(path, &buf)?;
    debug!("wrote {} records to {}", records.len(), path.display());
    Ok(path.to_path_buf())
}

/// Writes `rows` to `path` as CSV, header first.
///
/// The header is always written, even with no rows, and columns follow
/// [`COLUMNS`]. Missing values are empty fields.
pub fn write_clean_csv(rows: &[NormalizedRow], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let buf = writer
        .into_inner()
        .map_err(|err| Error::Io {
            path: path.to_path_buf(),
            source: err.into_error(),
        })?;
    write_atomic(path, &buf)?;
    debug!("wrote {} rows to {}", rows.len(), path.display());
    Ok(path.to_path_buf())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, contents).map_err(io_error)?;
    fs::rename(&tmp, path).map_err(io_error)
}

/// The result of writing an artifact.
pub type Result<T> = std::result::Result<T, Error>;

/// An artifact could not be written.
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be written.
    #[error("could not write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// A raw record could not be serialized.
    #[error("could not serialize record: {0}")]
    Json(#[from] serde_json::Error),

    /// A row could not be serialized.
    #[error("could not serialize row: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{load_rows, row};
    use serde_json::json;
    use tempfile::TempDir;

    mod names {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn it_names_artifacts_by_key_and_tag() {
            assert_eq!(
                counts_file_name("rizin_ufc", "20250523171300"),
                "counts_rizin_ufc_20250523171300.jsonl"
            );
            assert_eq!(
                raw_fetch_file_name("rizin_ufc", "20250523171300"),
                "fetch_rizin_ufc_20250523171300.jsonl"
            );
            assert_eq!(
                clean_fetch_file_name("rizin_ufc", "20250523171300"),
                "fetch_rizin_ufc_20250523171300.csv"
            );
        }
    }

    mod jsonl {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn it_writes_one_record_per_line() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("raw.jsonl");
            let records = vec![json!({"a": 1}), json!({"b": [2, 3]})];
            save_jsonl(&records, &path).unwrap();
            let contents = fs::read_to_string(&path).unwrap();
            assert_eq!(contents, "{\"a\":1}\n{\"b\":[2,3]}\n");
        }

        #[test]
        fn it_leaves_no_temporary_files_behind() {
            let dir = TempDir::new().unwrap();
            save_jsonl(&[json!({})], dir.path().join("raw.jsonl")).unwrap();
            let names: Vec<_> = fs::read_dir(dir.path())
                .unwrap()
                .map(|entry| entry.unwrap().file_name())
                .collect();
            assert_eq!(names, vec!["raw.jsonl"]);
        }

        #[test]
        fn it_reports_unwritable_paths() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("missing").join("raw.jsonl");
            assert!(matches!(
                save_jsonl(&[json!({})], path),
                Err(Error::Io { .. })
            ));
        }
    }

    mod clean {
        use super::*;
        use pretty_assertions::assert_eq;

        fn read(path: &Path) -> Vec<Vec<String>> {
            ::csv::ReaderBuilder::new()
                .has_headers(false)
                .from_path(path)
                .unwrap()
                .records()
                .map(|record| record.unwrap().iter().map(String::from).collect())
                .collect()
        }

        #[test]
        fn it_writes_the_header_first() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("clean.csv");
            write_clean_csv(&load_rows(), &path).unwrap();
            let records = read(&path);
            assert_eq!(records[0], COLUMNS.to_vec());
            assert_eq!(records.len(), 9);
        }

        #[test]
        fn it_writes_a_header_without_rows() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("clean.csv");
            write_clean_csv(&[], &path).unwrap();
            assert_eq!(read(&path), vec![COLUMNS.to_vec()]);
        }

        #[test]
        fn it_keeps_rows_in_order() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("clean.csv");
            write_clean_csv(&load_rows(), &path).unwrap();
            let records = read(&path);
            assert_eq!(records[1][1], "1926012345678901234");
            assert_eq!(records[8][1], "1926012345678901227");
        }

        #[test]
        fn it_writes_missing_values_as_empty_fields() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("clean.csv");
            write_clean_csv(&[row(Some(4), None)], &path).unwrap();
            let records = read(&path);
            let field = |name| {
                let i = COLUMNS.iter().position(|c| *c == name).unwrap();
                records[1][i].clone()
            };
            assert_eq!(field("engagement_likes"), "4");
            assert_eq!(field("engagement_retweets"), "");
            assert_eq!(field("engagement_total"), "4");
            assert_eq!(field("author_username"), "");
            assert_eq!(field("source_platform"), "x");
        }
    }
}
