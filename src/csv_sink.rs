//! # CSV Log Sink Module
//!
//! Append-only persistence of telemetry records, one file per logging session.
//!
//! ## File Layout
//! ```text
//! <documents>/ksmeasuring/KSM_YYYYMMDD_HHMMSS.csv
//! \u{FEFF}Timestamp(v2),NetworkType,...,SIMカード状態   <- written once, on the first append
//! 2024-05-01 12:00:00,LTE,...,READY
//! 2024-05-01 12:00:01,LTE,...,READY
//! ```
//!
//! ## Guarantees
//! - A session never reuses an existing file; a name collision gets a `_N` suffix
//! - The byte-order mark and header are written together with the first row
//! - Each append is a single unbuffered write of complete rows. A write that
//!   fails partway is cut back to the previous end of file, so the file stays
//!   parseable and the header is never repeated
//! - Values containing a comma, double quote or newline are quoted, with
//!   embedded quotes doubled

use crate::error::PersistenceError;
use crate::metrics::TelemetryRecord;
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

const BYTE_ORDER_MARK: &str = "\u{FEFF}";
const FILE_PREFIX: &str = "KSM_";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Quote a field if it contains a comma, double quote or newline
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn join_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut row = cells.map(escape_field).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

/// File name for a session activated at `at`
pub fn session_file_name(at: DateTime<Local>) -> String {
    format!("{}{}.csv", FILE_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// Append-only storage behind a session
pub trait SessionFile: Write + Send {
    /// Current end of the stored bytes
    fn size(&self) -> io::Result<u64>;

    /// Drop everything past `size`
    fn truncate_to(&mut self, size: u64) -> io::Result<()>;
}

impl SessionFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, size: u64) -> io::Result<()> {
        self.set_len(size)
    }
}

/// Opens a fresh session for each activation of the sampling loop
pub trait SessionSource: Send + Sync {
    fn open_session(&self, at: DateTime<Local>) -> Result<LogSession, PersistenceError>;
}

/// Where session files go
#[derive(Debug, Clone)]
pub struct CsvSink {
    directory: PathBuf,
}

impl CsvSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl SessionSource for CsvSink {
    /// Create the directory if needed and a fresh session file named after `at`
    fn open_session(&self, at: DateTime<Local>) -> Result<LogSession, PersistenceError> {
        fs::create_dir_all(&self.directory).map_err(|source| PersistenceError::CreateDir {
            path: self.directory.clone(),
            source,
        })?;

        let base = session_file_name(at);
        let stem = base.trim_end_matches(".csv");
        let mut path = self.directory.join(&base);
        let mut attempt = 1;
        loop {
            match LogSession::open(&path) {
                Err(PersistenceError::Open { source, .. })
                    if source.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS =>
                {
                    log::debug!("{} already exists, trying next suffix", path.display());
                    attempt += 1;
                    path = self.directory.join(format!("{}_{}.csv", stem, attempt));
                }
                result => return result,
            }
        }
    }
}

/// One logging session's file
pub struct LogSession {
    path: PathBuf,
    file: Box<dyn SessionFile>,
    header_written: bool,
    /// Bytes of a failed append could not be removed; end that line first
    pending_newline: bool,
    rows_written: u64,
}

impl fmt::Debug for LogSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSession")
            .field("path", &self.path)
            .field("header_written", &self.header_written)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl LogSession {
    /// Create `path`; fails if it already exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?;

        log::info!("Opened log session: {}", path.display());
        Ok(Self::from_file(path, Box::new(file)))
    }

    /// Session over already-open storage that holds no rows yet
    pub fn from_file(path: impl Into<PathBuf>, file: Box<dyn SessionFile>) -> Self {
        Self {
            path: path.into(),
            file,
            header_written: false,
            pending_newline: false,
            rows_written: 0,
        }
    }

    /// Append one value row, preceded by BOM and header on the first call
    pub fn append(&mut self, record: &TelemetryRecord) -> Result<(), PersistenceError> {
        let mut payload = String::new();
        if self.pending_newline {
            payload.push('\n');
        }
        if !self.header_written {
            payload.push_str(BYTE_ORDER_MARK);
            payload.push_str(&join_row(record.names()));
        }
        payload.push_str(&join_row(record.values()));

        let size_before = self.file.size().map_err(|source| self.write_error(source))?;
        if let Err(source) = self
            .file
            .write_all(payload.as_bytes())
            .and_then(|_| self.file.flush())
        {
            self.discard_partial(size_before);
            return Err(self.write_error(source));
        }

        self.header_written = true;
        self.pending_newline = false;
        self.rows_written += 1;
        log::trace!("Appended row {} to {}", self.rows_written, self.path.display());
        Ok(())
    }

    /// Cut the file back to `size_before` after a failed write
    fn discard_partial(&mut self, size_before: u64) {
        match self.file.truncate_to(size_before) {
            Ok(()) => log::debug!("Discarded partial row in {}", self.path.display()),
            Err(e) => {
                log::error!("Failed to discard partial row in {}: {}", self.path.display(), e);
                let grew = self.file.size().map_or(true, |size| size > size_before);
                if grew {
                    // whatever landed stays; the header must not follow it again
                    self.header_written = true;
                    self.pending_newline = true;
                }
            }
        }
    }

    fn write_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Value rows appended so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if self.header_written() {
            log::info!(
                "Closed log session: {} ({} rows)",
                self.path.display(),
                self.rows_written()
            );
        } else {
            log::info!("Closed empty log session: {}", self.path.display());
        }
    }
}
