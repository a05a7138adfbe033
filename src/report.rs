//! Text and JSON reports for batch runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::batch::FileOutcome;
use crate::detection::{BlockVotes, DetectionSegment};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One `"<file name>, <detections>"` line per processed file.
pub fn format_text_report(files: &[FileOutcome]) -> String {
    files
        .iter()
        .map(|file| format!("{}, {}\n", file.file_name, file.detections()))
        .collect()
}

pub fn write_text_report(path: &Path, files: &[FileOutcome]) -> Result<(), ReportError> {
    write_file(path, format_text_report(files).as_bytes())
}

#[derive(Debug, Serialize)]
struct JsonFileReport<'a> {
    filename: &'a str,
    detections: usize,
    frames: usize,
    duration_seconds: f64,
    threshold: f64,
    source_sample_rate: u32,
    source_channels: u16,
    blocks: BlockVotes,
    segments: &'a [DetectionSegment],
}

pub fn format_json_report(files: &[FileOutcome]) -> Result<String, ReportError> {
    let entries: Vec<JsonFileReport<'_>> = files
        .iter()
        .map(|file| JsonFileReport {
            filename: &file.file_name,
            detections: file.summary.detections,
            frames: file.summary.frames,
            duration_seconds: file.duration_seconds,
            threshold: file.summary.threshold,
            source_sample_rate: file.source_sample_rate,
            source_channels: file.source_channels,
            blocks: file.summary.blocks,
            segments: &file.summary.segments,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

pub fn write_json_report(path: &Path, files: &[FileOutcome]) -> Result<(), ReportError> {
    let json = format_json_report(files)?;
    write_file(path, json.as_bytes())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let write_error = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(write_error)?;
    file.write_all(contents).map_err(write_error)?;
    file.flush().map_err(write_error)
}
