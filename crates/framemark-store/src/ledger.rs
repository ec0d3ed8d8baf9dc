//! Shared CSV annotation ledger.
//!
//! Every save rewrites the whole file: existing rows are read, rows with the
//! incoming `(user_id, article_index)` key are dropped, the new record is
//! appended, and the result is written atomically. Rows written by other
//! users, or carrying columns this configuration does not know, survive the
//! rewrite.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use framemark_core::{
    defaults, format_flag, frame_column, parse_flag, AnnotationLedger, AnnotationRecord, Error,
    Result, TaskConfig,
};
use tracing::{debug, error, info, warn};

use crate::fs::atomic_write;

const USER_ID: &str = "user_id";
const ARTICLE_INDEX: &str = "article_index";
const NOTES: &str = "notes";
const FLAGGED: &str = "flagged";
const URI: &str = "uri";
const ORIGINAL_TEXT: &str = "original_text";
const TRANSLATED_TEXT: &str = "translated_text";

/// Suffix of the copy kept when an existing ledger cannot be parsed.
pub const UNREADABLE_SUFFIX: &str = ".unreadable";

type Row = HashMap<String, String>;

fn csv_error(e: csv::Error) -> Error {
    Error::Csv(e.to_string())
}

/// CSV-backed [`AnnotationLedger`].
#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
    columns: Vec<String>,
    frame_labels: Vec<String>,
    primary_column: String,
    mirror_dirs: Vec<PathBuf>,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>, config: &TaskConfig) -> Self {
        Self {
            path: path.into(),
            columns: config.ledger_columns(),
            frame_labels: config.frame_labels.clone(),
            primary_column: config.primary_label.column.clone(),
            mirror_dirs: Vec::new(),
        }
    }

    /// Ledger at the configured path, mirrored to the configured directories.
    pub fn from_config(config: &TaskConfig) -> Self {
        Self::new(&config.ledger_path, config).with_mirrors(config.mirror_dirs.clone())
    }

    pub fn with_mirrors(mut self, dirs: Vec<PathBuf>) -> Self {
        self.mirror_dirs = dirs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Existing rows plus the header they were written with.
    ///
    /// A missing file reads as empty. An unparsable file also reads as empty,
    /// but a copy is kept next to it so the next rewrite does not destroy it.
    fn read_rows(&self) -> (Vec<String>, Vec<Row>) {
        if !self.path.exists() {
            return (Vec::new(), Vec::new());
        }
        match self.parse_rows() {
            Ok(parsed) => parsed,
            Err(e) => {
                let backup = self.backup_path();
                let copied = fs::copy(&self.path, &backup);
                error!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    backup_ok = copied.is_ok(),
                    error = %e,
                    "Ledger unreadable, treating as empty"
                );
                (Vec::new(), Vec::new())
            }
        }
    }

    fn parse_rows(&self) -> Result<(Vec<String>, Vec<Row>)> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(csv_error)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            let row: Row = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(row);
        }
        Ok((headers, rows))
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(UNREADABLE_SUFFIX);
        self.path.with_file_name(name)
    }

    /// Configured columns first, then any extra columns already in the file.
    fn header_for(&self, existing: &[String]) -> Vec<String> {
        let mut header = self.columns.clone();
        for column in existing {
            if !header.contains(column) {
                header.push(column.clone());
            }
        }
        header
    }

    fn record_to_row(&self, record: &AnnotationRecord) -> Row {
        let mut row = Row::new();
        row.insert(USER_ID.to_string(), record.user_id.clone());
        row.insert(ARTICLE_INDEX.to_string(), record.article_index.to_string());
        row.insert(NOTES.to_string(), record.notes.clone());
        row.insert(FLAGGED.to_string(), format_flag(record.flagged).to_string());
        row.insert(URI.to_string(), record.uri.clone());
        row.insert(ORIGINAL_TEXT.to_string(), record.original_text.clone());
        row.insert(TRANSLATED_TEXT.to_string(), record.translated_text.clone());
        row.insert(self.primary_column.clone(), record.primary_label.clone());
        for (label, present) in &record.frames {
            let cell = if *present {
                defaults::PRESENT
            } else {
                defaults::NOT_PRESENT
            };
            row.insert(frame_column(label), cell.to_string());
        }
        row
    }

    fn row_to_record(&self, row: &Row) -> Option<AnnotationRecord> {
        let cell = |name: &str| row.get(name).cloned().unwrap_or_default();
        let article_index = row.get(ARTICLE_INDEX)?.trim().parse::<usize>().ok()?;

        let mut frames = std::collections::BTreeMap::new();
        for label in &self.frame_labels {
            if let Some(value) = row.get(&frame_column(label)) {
                frames.insert(label.clone(), is_present(value));
            }
        }
        for (column, value) in row {
            if let Some(label) = column.strip_suffix(defaults::PRESENT_SUFFIX) {
                frames
                    .entry(label.to_string())
                    .or_insert_with(|| is_present(value));
            }
        }

        Some(AnnotationRecord {
            user_id: cell(USER_ID),
            article_index,
            primary_label: cell(&self.primary_column),
            notes: cell(NOTES),
            flagged: parse_flag(&cell(FLAGGED)),
            frames,
            uri: cell(URI),
            original_text: cell(ORIGINAL_TEXT),
            translated_text: cell(TRANSLATED_TEXT),
        })
    }

    fn encode(header: &[String], rows: &[Row]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header).map_err(csv_error)?;
        for row in rows {
            writer
                .write_record(
                    header
                        .iter()
                        .map(|column| row.get(column).map(String::as_str).unwrap_or("")),
                )
                .map_err(csv_error)?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Csv(e.to_string()))
    }

    /// Copy the freshly written ledger into every mirror directory.
    ///
    /// Failures are logged and otherwise ignored; the primary file is the
    /// ledger of record.
    fn write_mirrors(&self, bytes: &[u8]) {
        let Some(file_name) = self.path.file_name() else {
            return;
        };
        for dir in &self.mirror_dirs {
            let target = dir.join(file_name);
            match atomic_write(&target, bytes) {
                Ok(()) => debug!(mirror = %target.display(), "Ledger mirrored"),
                Err(e) => warn!(mirror = %target.display(), error = %e, "Ledger mirror failed"),
            }
        }
    }
}

fn is_present(value: &str) -> bool {
    value.trim() == defaults::PRESENT || parse_flag(value)
}

fn row_key(row: &Row) -> Option<(&str, usize)> {
    let user = row.get(USER_ID)?;
    let index = row.get(ARTICLE_INDEX)?.trim().parse::<usize>().ok()?;
    Some((user.as_str(), index))
}

impl AnnotationLedger for CsvLedger {
    fn upsert(&self, record: &AnnotationRecord) -> Result<()> {
        let (existing_header, mut rows) = self.read_rows();
        let before = rows.len();
        rows.retain(|row| row_key(row) != Some(record.key()));
        let replaced = before - rows.len();
        rows.push(self.record_to_row(record));

        let header = self.header_for(&existing_header);
        let bytes = Self::encode(&header, &rows)?;
        atomic_write(&self.path, &bytes)?;

        info!(
            user_id = %record.user_id,
            article_index = record.article_index,
            replaced,
            row_count = rows.len(),
            path = %self.path.display(),
            "Ledger record saved"
        );

        self.write_mirrors(&bytes);
        Ok(())
    }

    fn records(&self) -> Vec<AnnotationRecord> {
        let (_, rows) = self.read_rows();
        rows.iter()
            .filter_map(|row| {
                let record = self.row_to_record(row);
                if record.is_none() {
                    warn!(path = %self.path.display(), "Skipping ledger row without a valid article_index");
                }
                record
            })
            .collect()
    }
}
