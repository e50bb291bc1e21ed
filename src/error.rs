//! # Error Types Module
//!
//! Error types for the parts of KS Measuring that can actually fail.
//!
//! ## Error Types
//! - `ConfigError`: configuration file I/O and parsing errors
//! - `PersistenceError`: CSV session directory, file or row write failures
//! - `ProviderError`: host traffic counters could not be read
//!
//! Nothing here stops sampling. Missing permission, a missing serving cell
//! and redundant start/stop requests are not errors at all: they degrade the
//! record or become a logged no-op.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::WriteFailed(e) => write!(f, "Failed to write config file: {}", e),
            ConfigError::ParseFailed(e) => write!(f, "Failed to parse config file: {}", e),
            ConfigError::SerializeFailed(e) => write!(f, "Failed to serialize config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

/// Errors writing a log session to disk
#[derive(Debug)]
pub enum PersistenceError {
    /// Log directory could not be created
    CreateDir { path: PathBuf, source: std::io::Error },
    /// Session file could not be created
    Open { path: PathBuf, source: std::io::Error },
    /// A header or value row could not be written
    Write { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::CreateDir { path, source } => {
                write!(f, "Failed to create log directory {}: {}", path.display(), source)
            }
            PersistenceError::Open { path, source } => {
                write!(f, "Failed to create log file {}: {}", path.display(), source)
            }
            PersistenceError::Write { path, source } => {
                write!(f, "Failed to append to log file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::CreateDir { source, .. }
            | PersistenceError::Open { source, .. }
            | PersistenceError::Write { source, .. } => Some(source),
        }
    }
}

/// Errors reading data from the host
#[derive(Debug)]
pub enum ProviderError {
    /// Counter source could not be read
    CountersUnavailable(std::io::Error),
    /// Counter source had an unexpected layout
    Parse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::CountersUnavailable(e) => {
                write!(f, "Traffic counters unavailable: {}", e)
            }
            ProviderError::Parse(msg) => write!(f, "Failed to parse traffic counters: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::CountersUnavailable(e) => Some(e),
            ProviderError::Parse(_) => None,
        }
    }
}
