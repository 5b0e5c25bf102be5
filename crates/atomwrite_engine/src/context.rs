//! Multi-phase write: `open` -> `write_chunk`* -> `commit` | `cleanup`.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use atomwrite_core::{
    CommitMode, DirectMode, Durability, MetadataFailure, MetadataSnapshot, OpenMode, Options,
    Platform, PlatformError, Preserve, Strategy, WriteError,
};
use atomwrite_fs::{util, TempNamer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Opened,
    Writing,
    Released,
}

/// An in-progress write. Owns its file handle and, in atomic mode, its temp file.
///
/// Consumed by [`commit`](Self::commit) or [`cleanup`](Self::cleanup). Dropping a
/// context without either discards it the same way `cleanup` does.
pub struct WriteContext {
    platform: Platform,
    file: Option<File>,
    /// Path the handle points at: the temp file, or the destination in direct mode.
    target: PathBuf,
    destination: PathBuf,
    directory: PathBuf,
    /// `Some` in atomic mode.
    publish: Option<Strategy>,
    durability: Durability,
    preserve: Preserve,
    snapshot: Option<MetadataSnapshot>,
    bytes_written: u64,
    state: State,
}

impl WriteContext {
    pub(crate) fn open(platform: Platform, path: &Path, options: &Options) -> Result<Self, WriteError> {
        let destination = path.to_path_buf();
        let directory = util::parent_dir(&destination);

        let (target, publish, mode) = match options.commit {
            CommitMode::Atomic => {
                // Drawn before anything touches the disk.
                let temp = TempNamer::name(platform.entropy.as_ref(), &destination)?;
                (temp, Some(options.strategy), OpenMode::CreateNew)
            }
            // NoClobber still refuses an existing destination when writing in place.
            CommitMode::Direct { mode: DirectMode::Truncate } if options.strategy == Strategy::ReplaceExisting => {
                (destination.clone(), None, OpenMode::Truncate)
            }
            CommitMode::Direct { .. } => (destination.clone(), None, OpenMode::CreateNew),
        };

        platform
            .fs
            .verify_parent(&destination, options.create_intermediates)
            .map_err(|e| WriteError::ParentVerificationFailed { path: destination.clone(), source: PlatformError::from(&e) })?;

        let snapshot = platform
            .preserver
            .capture(&destination, &options.preserve)
            .map_err(|f| metadata_error(&destination, f))?;

        let file = platform.fs.open(&target, mode).map_err(|e| {
            if publish.is_none() && e.kind() == io::ErrorKind::AlreadyExists {
                WriteError::DestinationExists { path: destination.clone(), source: PlatformError::from(&e) }
            } else {
                WriteError::TempCreationFailed { path: target.clone(), source: PlatformError::from(&e) }
            }
        })?;
        debug!("opened {} for {}", target.display(), destination.display());

        Ok(Self {
            platform,
            file: Some(file),
            target,
            destination,
            directory,
            publish,
            durability: options.durability,
            preserve: options.preserve,
            snapshot,
            bytes_written: 0,
            state: State::Opened,
        })
    }

    pub fn destination(&self) -> &Path { &self.destination }

    /// The temp file being written, in atomic mode.
    pub fn temp_path(&self) -> Option<&Path> { self.publish.map(|_| self.target.as_path()) }

    pub fn bytes_written(&self) -> u64 { self.bytes_written }

    pub fn durability(&self) -> Durability { self.durability }

    pub fn is_atomic(&self) -> bool { self.publish.is_some() }

    /// Append `bytes`, retrying short and interrupted writes until the whole chunk is down.
    pub fn write_chunk(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        let Some(file) = self.file.as_mut() else {
            return Err(released(&self.target));
        };
        let mut remaining = bytes;
        while !remaining.is_empty() {
            match self.platform.fs.write(file, remaining) {
                Ok(0) => {
                    let e = io::Error::new(io::ErrorKind::WriteZero, "write returned zero bytes");
                    return Err(WriteError::WriteFailed {
                        path: self.target.clone(),
                        bytes_written: self.bytes_written,
                        source: PlatformError::from(&e),
                    });
                }
                Ok(n) => {
                    self.bytes_written += n as u64;
                    remaining = &remaining[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(WriteError::WriteFailed {
                        path: self.target.clone(),
                        bytes_written: self.bytes_written,
                        source: PlatformError::from(&e),
                    });
                }
            }
        }
        self.state = State::Writing;
        Ok(())
    }

    /// Sync, close and publish. Returns only once the content is durable per the
    /// requested tier. On a pre-publish failure the temp file is removed before returning.
    pub fn commit(mut self) -> Result<(), WriteError> {
        let Some(file) = self.file.take() else {
            return Err(released(&self.target));
        };
        self.state = State::Released;
        let result = self.finish(file);
        if let Err(e) = &result {
            if !e.is_post_commit() && self.is_atomic() {
                self.discard_temp();
            }
        }
        result
    }

    /// Abandon the write: close ignoring errors and, in atomic mode, remove the temp file.
    /// The destination is never touched.
    pub fn cleanup(mut self) {
        self.release();
    }

    fn finish(&self, file: File) -> Result<(), WriteError> {
        if let Some(snapshot) = &self.snapshot {
            if let Err(f) = self.platform.preserver.apply(snapshot, &file, &self.target, &self.preserve) {
                self.close_quietly(file);
                return Err(metadata_error(&self.target, f));
            }
        }

        if let Err(e) = self.platform.syncer.sync_file(&file, self.durability) {
            self.close_quietly(file);
            return Err(WriteError::SyncFailed { path: self.target.clone(), source: PlatformError::from(&e) });
        }

        self.platform
            .fs
            .close(file)
            .map_err(|e| WriteError::CloseFailed { path: self.target.clone(), source: PlatformError::from(&e) })?;

        if let Some(strategy) = self.publish {
            self.platform
                .publisher
                .publish(&self.target, &self.destination, strategy)
                .map_err(|e| publish_error(&self.target, &self.destination, strategy, e))?;
            debug!("published {} ({} bytes)", self.destination.display(), self.bytes_written);
        }

        // From here on the new content is at the destination.
        if self.durability.syncs_directory() {
            self.platform.syncer.sync_directory(&self.directory).map_err(|e| {
                WriteError::DirectorySyncFailedAfterCommit {
                    path: self.destination.clone(),
                    directory: self.directory.clone(),
                    source: PlatformError::from(&e),
                }
            })?;
        }
        Ok(())
    }

    fn close_quietly(&self, file: File) {
        if let Err(e) = self.platform.fs.close(file) {
            debug!("ignoring close error on {}: {e}", self.target.display());
        }
    }

    fn discard_temp(&self) {
        match self.platform.fs.remove(&self.target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove temp file {}: {e}", self.target.display()),
        }
    }

    fn release(&mut self) {
        if let Some(file) = self.file.take() {
            self.close_quietly(file);
        }
        if self.state != State::Released && self.is_atomic() {
            self.discard_temp();
        }
        self.state = State::Released;
    }
}

impl Drop for WriteContext {
    fn drop(&mut self) {
        if self.state != State::Released {
            warn!("write to {} dropped before commit; discarding", self.destination.display());
            self.release();
        }
    }
}

impl fmt::Debug for WriteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteContext")
            .field("destination", &self.destination)
            .field("target", &self.target)
            .field("publish", &self.publish)
            .field("durability", &self.durability)
            .field("bytes_written", &self.bytes_written)
            .field("state", &self.state)
            .finish()
    }
}

fn released(path: &Path) -> WriteError {
    WriteError::PlatformIncompatible { path: path.to_path_buf(), message: "write context already released".into() }
}

fn metadata_error(path: &Path, f: MetadataFailure) -> WriteError {
    if f.source.kind() == io::ErrorKind::Unsupported {
        return WriteError::PlatformIncompatible { path: path.to_path_buf(), message: f.source.to_string() };
    }
    WriteError::MetadataPreservationFailed {
        path: path.to_path_buf(),
        attribute: f.attribute,
        source: PlatformError::from(&f.source),
    }
}

fn publish_error(temp: &Path, destination: &Path, strategy: Strategy, e: io::Error) -> WriteError {
    match e.kind() {
        io::ErrorKind::AlreadyExists if strategy == Strategy::NoClobber => {
            WriteError::DestinationExists { path: destination.to_path_buf(), source: PlatformError::from(&e) }
        }
        io::ErrorKind::Unsupported => WriteError::PlatformIncompatible {
            path: destination.to_path_buf(),
            message: format!("cannot publish: {e}"),
        },
        _ => WriteError::RenameFailed {
            from: temp.to_path_buf(),
            to: destination.to_path_buf(),
            source: PlatformError::from(&e),
        },
    }
}
