//! Directory batch runs: list audio files, analyze each, keep going past bad files.

use std::path::{Path, PathBuf};
use std::thread;

use thiserror::Error;

use crate::analysis::audio::load_mono;
use crate::analysis::audio_decode::DecodeError;
use crate::detection::{DetectionSummary, Detector};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Input directory {path} does not exist or is not a directory")]
    NotADirectory { path: PathBuf },
    #[error("Failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Analysis result for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub file_name: String,
    pub source_sample_rate: u32,
    pub source_channels: u16,
    /// Length of the resampled signal.
    pub duration_seconds: f64,
    pub summary: DetectionSummary,
}

impl FileOutcome {
    pub fn detections(&self) -> usize {
        self.summary.detections
    }
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: DecodeError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully analyzed files, in input order.
    pub processed: Vec<FileOutcome>,
    pub skipped: Vec<SkippedFile>,
}

impl BatchOutcome {
    pub fn total_detections(&self) -> usize {
        self.processed.iter().map(FileOutcome::detections).sum()
    }
}

/// Regular files in `dir` whose extension is in `extensions` (case-insensitive), in
/// directory-listing order.
pub fn list_audio_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BatchError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
}

/// Decode, resample and analyze one file.
pub fn process_file(detector: &Detector, path: &Path) -> Result<FileOutcome, DecodeError> {
    let audio = load_mono(path, detector.settings().sample_rate)?;
    let summary = detector.analyze_signal(&audio.samples);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::info!(
        "{}: {} detection(s) in {} frames",
        file_name,
        summary.detections,
        summary.frames
    );
    Ok(FileOutcome {
        path: path.to_path_buf(),
        file_name,
        source_sample_rate: audio.source_sample_rate,
        source_channels: audio.source_channels,
        duration_seconds: audio.duration_seconds(),
        summary,
    })
}

/// Worker count for `requested` (0 = available parallelism), never more than `jobs`.
pub fn resolve_workers(requested: usize, jobs: usize) -> usize {
    let workers = if requested == 0 {
        thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
    } else {
        requested
    };
    workers.clamp(1, jobs.max(1))
}

/// Analyze `files`, spreading them over `workers` scoped threads that share `detector`.
///
/// Files that fail to decode are logged and skipped; results keep the input order.
pub fn run_batch(detector: &Detector, files: &[PathBuf], workers: usize) -> BatchOutcome {
    let workers = resolve_workers(workers, files.len());
    let results: Vec<Result<FileOutcome, DecodeError>> = if workers <= 1 {
        files.iter().map(|path| process_file(detector, path)).collect()
    } else {
        let chunk_size = files.len().div_ceil(workers);
        tracing::debug!(
            "Processing {} files on {} workers ({} per worker)",
            files.len(),
            workers,
            chunk_size
        );
        thread::scope(|scope| {
            let handles: Vec<_> = files
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|path| process_file(detector, path))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    };

    let mut outcome = BatchOutcome::default();
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(file) => outcome.processed.push(file),
            Err(error) => {
                tracing::warn!("Skipping {}: {error}", path.display());
                outcome.skipped.push(SkippedFile {
                    path: path.clone(),
                    error,
                });
            }
        }
    }
    outcome
}
