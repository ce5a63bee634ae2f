// Batch conversion over a file or directory tree.
//
// `process()` walks the target path depth-first (file-name order), picks the
// files eligible for the requested direction by the `.dvpl` suffix rule, and
// converts each one independently:
//
//   read -> encode/decode -> write -> (remove source | keep)
//
// A failure at any step ends that file only; its source is never removed.
// Every visited file gets a `FileReport`, so partial failures are visible to
// the caller instead of only in the log.

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::codec::backend::Lz4Block;
use crate::codec::decoder::{self, DecodeError};
use crate::codec::encoder::{self, EncodeError, EncodeOptions};
use crate::format::{DVPL_EXTENSION, DVPL_SUFFIX};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Plain files -> `<name>.dvpl`.
    Compress,
    /// `<name>.dvpl` -> plain files.
    Decompress,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compress => "compress",
            Self::Decompress => "decompress",
        }
    }

    /// Past tense, for log lines.
    pub fn done(self) -> &'static str {
        match self {
            Self::Compress => "compressed",
            Self::Decompress => "decompressed",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub direction: Direction,
    /// Leave source files in place after a successful conversion.
    pub keep_originals: bool,
    /// Run the codec but write and remove nothing.
    pub check_only: bool,
    /// Encoder settings (compress direction only).
    pub encode: EncodeOptions,
}

impl ProcessConfig {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            keep_originals: false,
            check_only: false,
            encode: EncodeOptions::default(),
        }
    }

    pub fn keep_originals(mut self, keep: bool) -> Self {
        self.keep_originals = keep;
        self
    }

    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    pub fn encode_options(mut self, opts: EncodeOptions) -> Self {
        self.encode = opts;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure converting a single file. Never aborts the rest of the batch.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("cannot traverse {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error encoding {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },
    #[error("error decoding {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The output was written but the source could not be removed.
    #[error("error deleting {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure that prevents the batch from running at all.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot access {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to one visited file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Output written; source removed unless originals are kept.
    Converted {
        output: PathBuf,
        input_size: u64,
        output_size: u64,
        source_removed: bool,
        /// SHA-256 of the written output (`file-io` feature).
        output_sha256: Option<[u8; 32]>,
    },
    /// Codec ran in check-only mode; nothing touched on disk.
    Checked { input_size: u64, output_size: u64 },
    /// Not eligible for this direction.
    Skipped,
    Failed(FileError),
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed(_))
    }
}

/// Per-file results of a batch run, in traversal order.
#[derive(Debug)]
pub struct BatchReport {
    direction: Direction,
    entries: Vec<FileReport>,
}

impl BatchReport {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entries(&self) -> &[FileReport] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<FileReport> {
        self.entries
    }

    /// Files run through the codec successfully (converted or checked).
    pub fn processed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    FileOutcome::Converted { .. } | FileOutcome::Checked { .. }
                )
            })
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, FileOutcome::Skipped))
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.entries.iter().filter(|e| e.is_failed())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// True when no file failed.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

fn has_dvpl_suffix(name: &OsStr) -> bool {
    name.as_encoded_bytes().ends_with(DVPL_SUFFIX.as_bytes())
}

/// Whether `path` is converted in `direction`.
///
/// Compress takes every file whose name does not end in `.dvpl`; decompress
/// takes `<name>.dvpl` with a non-empty `<name>`.
pub fn is_eligible(path: &Path, direction: Direction) -> bool {
    output_path(path, direction).is_some()
}

/// Output path for `path` in `direction`, or `None` when not eligible.
pub fn output_path(path: &Path, direction: Direction) -> Option<PathBuf> {
    let name = path.file_name()?;
    match direction {
        Direction::Compress => {
            if has_dvpl_suffix(name) {
                return None;
            }
            let mut out = name.to_os_string();
            out.push(DVPL_SUFFIX);
            Some(path.with_file_name(out))
        }
        Direction::Decompress => {
            // `Path::extension` ignores a leading dot, so a bare ".dvpl" has none.
            if path.extension() != Some(OsStr::new(DVPL_EXTENSION)) {
                return None;
            }
            Some(path.with_extension(""))
        }
    }
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

/// Convert `path` (a file, or every file below a directory).
///
/// Only an inaccessible `path` fails the whole run; per-file problems are
/// recorded in the returned report.
pub fn process(path: &Path, config: &ProcessConfig) -> Result<BatchReport, BatchError> {
    let meta = fs::metadata(path).map_err(|source| BatchError::Inaccessible {
        path: path.to_path_buf(),
        source,
    })?;

    let targets = if meta.is_dir() {
        collect_targets(path)
    } else {
        vec![Target::File(path.to_path_buf())]
    };

    log::debug!(
        "{}: {} entries under {}",
        config.direction,
        targets.len(),
        path.display()
    );

    #[cfg(feature = "parallel")]
    let entries = resolve_parallel(targets, config);

    #[cfg(not(feature = "parallel"))]
    let entries: Vec<FileReport> = targets
        .into_iter()
        .map(|target| target.resolve(config))
        .collect();

    Ok(BatchReport {
        direction: config.direction,
        entries,
    })
}

/// Convert independent targets on the rayon pool, then chained ones in walk
/// order. Report order is walk order either way.
#[cfg(feature = "parallel")]
fn resolve_parallel(targets: Vec<Target>, config: &ProcessConfig) -> Vec<FileReport> {
    let chained = chained_targets(&targets, config.direction);

    let (serial, independent): (Vec<_>, Vec<_>) = targets
        .into_iter()
        .enumerate()
        .partition(|(index, _)| chained[*index]);

    let mut entries: Vec<(usize, FileReport)> = independent
        .into_par_iter()
        .map(|(index, target)| (index, target.resolve(config)))
        .collect();
    entries.extend(
        serial
            .into_iter()
            .map(|(index, target)| (index, target.resolve(config))),
    );

    entries.sort_by_key(|(index, _)| *index);
    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Marks files that write another collected file or are written by one.
///
/// Decompressing `x.dvpl.dvpl` produces `x.dvpl`, which is itself an input;
/// run concurrently, the second conversion can remove the first one's output.
#[cfg(feature = "parallel")]
fn chained_targets(targets: &[Target], direction: Direction) -> Vec<bool> {
    use std::collections::HashSet;

    let inputs: HashSet<&Path> = targets
        .iter()
        .filter_map(|target| match target {
            Target::File(path) => Some(path.as_path()),
            _ => None,
        })
        .collect();
    let outputs: HashSet<PathBuf> = inputs
        .iter()
        .filter_map(|path| output_path(path, direction))
        .filter(|output| inputs.contains(output.as_path()))
        .collect();

    targets
        .iter()
        .map(|target| match target {
            Target::File(path) => {
                outputs.contains(path)
                    || output_path(path, direction).is_some_and(|out| outputs.contains(&out))
            }
            _ => false,
        })
        .collect()
}

enum Target {
    File(PathBuf),
    /// Not a regular file (socket, fifo, ...).
    Other(PathBuf),
    Unreadable(PathBuf, walkdir::Error),
}

impl Target {
    fn resolve(self, config: &ProcessConfig) -> FileReport {
        match self {
            Self::File(path) => {
                let outcome = process_file(&path, config);
                FileReport { path, outcome }
            }
            Self::Other(path) => {
                log::debug!("ignoring {}: not a regular file", path.display());
                FileReport {
                    path,
                    outcome: FileOutcome::Skipped,
                }
            }
            Self::Unreadable(path, source) => {
                let err = FileError::Walk {
                    path: path.clone(),
                    source,
                };
                log::warn!("{err}");
                FileReport {
                    path,
                    outcome: FileOutcome::Failed(err),
                }
            }
        }
    }
}

/// Depth-first listing of everything below `root`, directories excluded.
///
/// The listing is taken before any file is written, so outputs created
/// during the run are never picked up as inputs.
fn collect_targets(root: &Path) -> Vec<Target> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) if entry.file_type().is_file() => Some(Target::File(entry.into_path())),
            Ok(entry) => Some(Target::Other(entry.into_path())),
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                Some(Target::Unreadable(path, err))
            }
        })
        .collect()
}

/// Convert one file. Ineligible files are skipped.
pub fn process_file(path: &Path, config: &ProcessConfig) -> FileOutcome {
    let Some(output) = output_path(path, config.direction) else {
        log::debug!("ignoring {}", path.display());
        return FileOutcome::Skipped;
    };

    match convert(path, output, config) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::warn!("{err}");
            FileOutcome::Failed(err)
        }
    }
}

fn convert(path: &Path, output: PathBuf, config: &ProcessConfig) -> Result<FileOutcome, FileError> {
    let input = fs::read(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let converted = match config.direction {
        Direction::Compress => encoder::encode_with(&input, &Lz4Block, &config.encode)
            .map_err(|source| FileError::Encode {
                path: path.to_path_buf(),
                source,
            })?,
        Direction::Decompress => decoder::decode(&input).map_err(|source| FileError::Decode {
            path: path.to_path_buf(),
            source,
        })?,
    };

    let input_size = input.len() as u64;
    let output_size = converted.len() as u64;

    if config.check_only {
        log::info!("{} ok ({input_size} -> {output_size} bytes)", path.display());
        return Ok(FileOutcome::Checked {
            input_size,
            output_size,
        });
    }

    let output_sha256 =
        crate::io::write_output(&output, &converted).map_err(|source| FileError::Write {
            path: output.clone(),
            source,
        })?;

    log::info!(
        "{} {} into {}",
        path.display(),
        config.direction.done(),
        output.display()
    );

    // Write has completed (and flushed) before the source goes away.
    let source_removed = if config.keep_originals {
        false
    } else {
        fs::remove_file(path).map_err(|source| FileError::Remove {
            path: path.to_path_buf(),
            source,
        })?;
        true
    };

    Ok(FileOutcome::Converted {
        output,
        input_size,
        output_size,
        source_removed,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
