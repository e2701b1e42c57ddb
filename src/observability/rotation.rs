//! Time-based log file rotation.
//!
//! # Responsibilities
//! - Name rotated files (`<stem>_<date>.log`)
//! - Roll the active file over when a time boundary elapses
//! - Prune rotated files beyond the retention count
//!
//! # Design Decisions
//! - Boundaries are `last rollover + period`, seeded from the file's mtime
//! - Every record is flushed so a crash never loses acknowledged lines
//! - All file state sits behind one mutex; close is idempotent

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::interval::{RotationPolicy, RotationUnit};

/// Date suffix lengths produced by [`RotationUnit::date_format`].
const DATE_SUFFIX_LENGTHS: [usize; 4] = [8, 10, 12, 14];

/// Strip every extension from a file name.
fn strip_extensions(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(0) | None => file_name,
        Some(idx) => &file_name[..idx],
    }
}

fn is_date_suffix(suffix: &str) -> bool {
    DATE_SUFFIX_LENGTHS.contains(&suffix.len()) && suffix.bytes().all(|b| b.is_ascii_digit())
}

/// Strip every extension, plus a date suffix left by a previous rotation.
fn base_stem(file_name: &str) -> &str {
    let stem = strip_extensions(file_name);
    match stem.rsplit_once('_') {
        Some((head, suffix)) if !head.is_empty() && is_date_suffix(suffix) => head,
        _ => stem,
    }
}

fn rotated_name(stem: &str, unit: RotationUnit, at: DateTime<Local>) -> String {
    format!("{stem}_{}.log", at.format(unit.date_format()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sibling(path: &Path, name: String) -> PathBuf {
    match path.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Compute the path a log file is renamed to when it rotates.
///
/// The directory of `default_name` is preserved; the file name becomes
/// `<stem>_<date>.log` with the date rendered at the unit's granularity.
/// Applied to its own output, the earlier date suffix is replaced.
pub fn rotation_filename(default_name: &Path, unit: RotationUnit, at: DateTime<Local>) -> PathBuf {
    let file_name = file_name_of(default_name);
    sibling(default_name, rotated_name(base_stem(&file_name), unit, at))
}

/// Mutable state of an open rotating file.
#[derive(Debug)]
struct FileState {
    file: Option<File>,
    next_rollover: DateTime<Local>,
    closed: bool,
}

/// Append-only log file that rotates on time boundaries.
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    /// Active file name without extensions; rotated files are `<stem>_<date>.log`.
    stem: String,
    policy: RotationPolicy,
    backup_count: usize,
    state: Mutex<FileState>,
}

impl RotatingFileWriter {
    /// Open (or create) the active log file at `path`.
    ///
    /// The parent directory is created if missing.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy, backup_count: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let file = open_append(&path)?;
        let last_rollover = file
            .metadata()
            .and_then(|m| m.modified())
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        tracing::debug!(
            path = %path.display(),
            unit = ?policy.unit,
            magnitude = policy.magnitude,
            backup_count,
            "Rotating log file opened"
        );

        let stem = strip_extensions(&file_name_of(&path)).to_string();

        Ok(Self {
            path,
            stem,
            policy,
            backup_count,
            state: Mutex::new(FileState {
                file: Some(file),
                next_rollover: last_rollover + policy.period(),
                closed: false,
            }),
        })
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured retention ceiling (0 keeps every rotated file).
    pub fn backup_count(&self) -> usize {
        self.backup_count
    }

    /// Append one line, rotating first if a boundary has passed.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.write_line_at(line, Local::now())
    }

    pub(crate) fn write_line_at(&self, line: &str, now: DateTime<Local>) -> io::Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Ok(());
        }

        if now >= state.next_rollover {
            self.rollover(&mut state, now)?;
        }

        let file = match state.file.as_mut() {
            Some(file) => file,
            None => return Ok(()),
        };
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()
    }

    /// Flush buffered data to disk.
    pub fn flush(&self) -> io::Result<()> {
        match self.lock().file.as_mut() {
            Some(file) => file.sync_data(),
            None => Ok(()),
        }
    }

    /// Flush and close the active file. Later writes are dropped.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.lock();
        state.closed = true;
        match state.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rollover(&self, state: &mut FileState, now: DateTime<Local>) -> io::Result<()> {
        drop(state.file.take());

        let target = sibling(&self.path, rotated_name(&self.stem, self.policy.unit, now));
        if target.exists() {
            fs::remove_file(&target)?;
        }
        if self.path.exists() {
            fs::rename(&self.path, &target)?;
        }

        tracing::info!(
            log = %self.path.display(),
            rotated_to = %target.display(),
            "Rotated log file"
        );

        if self.backup_count > 0 {
            prune_rotated(&self.path, &self.stem, self.backup_count);
        }

        state.file = Some(open_append(&self.path)?);

        let period = self.policy.period();
        let mut next = state.next_rollover + period;
        while next <= now {
            next += period;
        }
        state.next_rollover = next;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Delete the oldest rotated siblings of `log_path` so at most `keep` remain.
fn prune_rotated(log_path: &Path, stem: &str, keep: usize) {
    let dir = match log_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };

    let mut rotated: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p != log_path && is_rotated_sibling(p, stem))
            .collect(),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to scan log directory");
            return;
        }
    };

    // Date suffixes sort chronologically.
    rotated.sort();

    let excess = rotated.len().saturating_sub(keep);
    for path in rotated.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Deleted old rotated log"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to delete old rotated log"
            ),
        }
    }
}

fn is_rotated_sibling(path: &Path, stem: &str) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    let suffix = match name
        .strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(".log"))
    {
        Some(s) => s,
        None => return false,
    };
    is_date_suffix(suffix)
}
