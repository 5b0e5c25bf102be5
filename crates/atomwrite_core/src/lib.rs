//! Shared types and ports for crash-safe file writing.
//!
//! The engine never talks to the OS directly: every side effect goes through one of the
//! port traits below. `atomwrite_fs` provides the native adapters; tests substitute
//! their own to inject failures.

pub mod error;
pub mod options;

pub use error::{MetadataAttribute, Phase, PlatformError, WriteError};
pub use options::{CommitMode, DirectMode, Durability, Options, Preserve, Strategy};

use std::ffi::OsString;
use std::fs::{File, Permissions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

// -----------------------
// Metadata types
// -----------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// Result of a `stat` on the pre-existing destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataInfo {
    pub permissions: Permissions,
    /// `None` where the platform has no uid/gid ownership model.
    pub owner: Option<Owner>,
    pub accessed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedAttribute {
    pub name: OsString,
    pub value: Vec<u8>,
}

/// Everything captured from the old destination that may be re-applied to the new content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataSnapshot {
    pub info: MetadataInfo,
    /// Plain extended attributes and ACL attributes, as requested by [`Preserve`].
    pub xattrs: Vec<ExtendedAttribute>,
}

/// A failed preservation step and the attribute it was working on.
#[derive(Debug)]
pub struct MetadataFailure {
    pub attribute: MetadataAttribute,
    pub source: io::Error,
}

impl MetadataFailure {
    pub fn new(attribute: MetadataAttribute, source: io::Error) -> Self {
        Self { attribute, source }
    }
}

// -----------------------
// Ports
// -----------------------

/// How the engine opens the file it writes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Exclusive create; fails with `AlreadyExists` if the path is taken.
    CreateNew,
    /// Create or truncate.
    Truncate,
}

/// Descriptor lifecycle and the parent-directory check.
pub trait FileSystem: Send + Sync + 'static {
    /// Ensure the directory that will hold `path` exists, creating it when asked.
    fn verify_parent(&self, path: &Path, create_intermediates: bool) -> io::Result<()>;
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<File>;
    /// One write call; may be short.
    fn write(&self, file: &mut File, buf: &[u8]) -> io::Result<usize>;
    /// Close reporting the OS result instead of swallowing it like `Drop` does.
    fn close(&self, file: File) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Cryptographically secure random bytes. Implementations must fail rather than
/// fall back to a weaker source.
pub trait EntropySource: Send + Sync + 'static {
    fn fill_bytes(&self, dest: &mut [u8]) -> io::Result<()>;
}

pub trait DurabilitySyncer: Send + Sync + 'static {
    /// Force `file` to storage as strongly as `durability` asks. `Durability::None` is a no-op.
    fn sync_file(&self, file: &File, durability: Durability) -> io::Result<()>;
    fn sync_directory(&self, dir: &Path) -> io::Result<()>;
}

pub trait AtomicPublisher: Send + Sync + 'static {
    /// Move `temp` to `destination` in one indivisible step. Under `NoClobber` an
    /// existing destination must surface as `io::ErrorKind::AlreadyExists`.
    fn publish(&self, temp: &Path, destination: &Path, strategy: Strategy) -> io::Result<()>;
}

pub trait MetadataPreserver: Send + Sync + 'static {
    /// Read what `preserve` asks for from `destination`. `Ok(None)` when nothing is
    /// requested or the destination does not exist yet.
    fn capture(&self, destination: &Path, preserve: &Preserve) -> Result<Option<MetadataSnapshot>, MetadataFailure>;
    /// Apply a snapshot to the open file that will become the destination.
    fn apply(&self, snapshot: &MetadataSnapshot, file: &File, target: &Path, preserve: &Preserve) -> Result<(), MetadataFailure>;
}

// -----------------------
// Composite platform (aggregates ports)
// -----------------------

/// The set of adapters a write runs against. Cheap to clone.
#[derive(Clone)]
pub struct Platform {
    pub fs: Arc<dyn FileSystem>,
    pub entropy: Arc<dyn EntropySource>,
    pub syncer: Arc<dyn DurabilitySyncer>,
    pub publisher: Arc<dyn AtomicPublisher>,
    pub preserver: Arc<dyn MetadataPreserver>,
}

impl Platform {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        entropy: Arc<dyn EntropySource>,
        syncer: Arc<dyn DurabilitySyncer>,
        publisher: Arc<dyn AtomicPublisher>,
        preserver: Arc<dyn MetadataPreserver>,
    ) -> Self {
        Self { fs, entropy, syncer, publisher, preserver }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn with_syncer(mut self, syncer: Arc<dyn DurabilitySyncer>) -> Self {
        self.syncer = syncer;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn AtomicPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_preserver(mut self, preserver: Arc<dyn MetadataPreserver>) -> Self {
        self.preserver = preserver;
        self
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
