//! Error taxonomy shared by every stage of a write.
//!
//! Each variant belongs to exactly one [`Phase`]. A pre-publish error guarantees the
//! destination was not touched (atomic mode) and the caller may retry. A post-publish
//! error means the new content is already at the destination; it only reports that
//! its durability could not be confirmed.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Raw platform code (errno / Win32) plus its human readable message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PlatformError {
    /// `-1` when the underlying error did not come from the OS.
    pub code: i32,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<&io::Error> for PlatformError {
    fn from(e: &io::Error) -> Self {
        Self { code: e.raw_os_error().unwrap_or(-1), message: e.to_string() }
    }
}

impl From<io::Error> for PlatformError {
    fn from(e: io::Error) -> Self { Self::from(&e) }
}

/// Which attribute a metadata preservation step was handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetadataAttribute {
    /// Reading the existing destination.
    Stat,
    Permissions,
    Ownership,
    Timestamps,
    ExtendedAttributes,
    Acls,
}

impl fmt::Display for MetadataAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetadataAttribute::Stat => "stat",
            MetadataAttribute::Permissions => "permissions",
            MetadataAttribute::Ownership => "ownership",
            MetadataAttribute::Timestamps => "timestamps",
            MetadataAttribute::ExtendedAttributes => "extended attributes",
            MetadataAttribute::Acls => "acls",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    PrePublish,
    PostPublish,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("parent directory of {path} unavailable: {source}")]
    ParentVerificationFailed { path: PathBuf, source: PlatformError },
    #[error("cannot create {path}: {source}")]
    TempCreationFailed { path: PathBuf, source: PlatformError },
    #[error("write to {path} failed after {bytes_written} bytes: {source}")]
    WriteFailed { path: PathBuf, bytes_written: u64, source: PlatformError },
    #[error("sync of {path} failed: {source}")]
    SyncFailed { path: PathBuf, source: PlatformError },
    #[error("close of {path} failed: {source}")]
    CloseFailed { path: PathBuf, source: PlatformError },
    #[error("preserving {attribute} for {path} failed: {source}")]
    MetadataPreservationFailed { path: PathBuf, attribute: MetadataAttribute, source: PlatformError },
    #[error("rename {from} -> {to} failed: {source}")]
    RenameFailed { from: PathBuf, to: PathBuf, source: PlatformError },
    #[error("destination {path} already exists")]
    DestinationExists { path: PathBuf, source: PlatformError },
    #[error("{path} was written but syncing directory {directory} failed: {source}")]
    DirectorySyncFailedAfterCommit { path: PathBuf, directory: PathBuf, source: PlatformError },
    #[error("secure random generation for {path} failed: {source}")]
    RandomGenerationFailed { path: PathBuf, source: PlatformError },
    #[error("{path}: platform incompatible: {message}")]
    PlatformIncompatible { path: PathBuf, message: String },
}

impl WriteError {
    pub fn phase(&self) -> Phase {
        match self {
            WriteError::DirectorySyncFailedAfterCommit { .. } => Phase::PostPublish,
            WriteError::ParentVerificationFailed { .. }
            | WriteError::TempCreationFailed { .. }
            | WriteError::WriteFailed { .. }
            | WriteError::SyncFailed { .. }
            | WriteError::CloseFailed { .. }
            | WriteError::MetadataPreservationFailed { .. }
            | WriteError::RenameFailed { .. }
            | WriteError::DestinationExists { .. }
            | WriteError::RandomGenerationFailed { .. }
            | WriteError::PlatformIncompatible { .. } => Phase::PrePublish,
        }
    }

    /// True when the destination already holds the new content.
    pub fn is_post_commit(&self) -> bool { self.phase() == Phase::PostPublish }

    pub fn platform_error(&self) -> Option<&PlatformError> {
        match self {
            WriteError::ParentVerificationFailed { source, .. }
            | WriteError::TempCreationFailed { source, .. }
            | WriteError::WriteFailed { source, .. }
            | WriteError::SyncFailed { source, .. }
            | WriteError::CloseFailed { source, .. }
            | WriteError::MetadataPreservationFailed { source, .. }
            | WriteError::RenameFailed { source, .. }
            | WriteError::DestinationExists { source, .. }
            | WriteError::DirectorySyncFailedAfterCommit { source, .. }
            | WriteError::RandomGenerationFailed { source, .. } => Some(source),
            WriteError::PlatformIncompatible { .. } => None,
        }
    }

    pub fn platform_code(&self) -> Option<i32> { self.platform_error().map(|e| e.code) }

    /// Paths involved, most specific first.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            WriteError::ParentVerificationFailed { path, .. }
            | WriteError::TempCreationFailed { path, .. }
            | WriteError::WriteFailed { path, .. }
            | WriteError::SyncFailed { path, .. }
            | WriteError::CloseFailed { path, .. }
            | WriteError::MetadataPreservationFailed { path, .. }
            | WriteError::DestinationExists { path, .. }
            | WriteError::RandomGenerationFailed { path, .. }
            | WriteError::PlatformIncompatible { path, .. } => vec![path.as_path()],
            WriteError::RenameFailed { from, to, .. } => vec![from.as_path(), to.as_path()],
            WriteError::DirectorySyncFailedAfterCommit { path, directory, .. } => {
                vec![path.as_path(), directory.as_path()]
            }
        }
    }
}
