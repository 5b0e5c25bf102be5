//! atomwrite engine (library)
//! Crash-safe file writes: after a call returns, the destination holds either the
//! complete new content or whatever it held before.
//!
//! ```no_run
//! use atomwrite_engine::{Options, Strategy};
//!
//! atomwrite_engine::write("/tmp/x.txt", b"hello", &Options::default())?;
//!
//! let mut ctx = atomwrite_engine::open("/tmp/y.txt", &Options::new().with_strategy(Strategy::NoClobber))?;
//! ctx.write_chunk(b"AAA")?;
//! ctx.write_chunk(b"BBB")?;
//! ctx.commit()?;
//! # Ok::<(), atomwrite_engine::WriteError>(())
//! ```
//!
//! Every call blocks the calling thread. Concurrent writes to different destinations
//! share nothing; two writes racing on the same destination end with whichever
//! rename lands last.

pub mod context;

use std::path::Path;

pub use atomwrite_core::{
    CommitMode, DirectMode, Durability, MetadataAttribute, Options, Phase, Platform,
    PlatformError, Preserve, Strategy, WriteError,
};
pub use context::WriteContext;

/// Entry point owning the platform adapters every write runs against.
#[derive(Clone, Debug)]
pub struct AtomicWriter {
    platform: Platform,
}

impl AtomicWriter {
    /// Writer backed by the native filesystem.
    pub fn new() -> Self {
        Self { platform: atomwrite_fs::native_platform() }
    }

    /// Writer with custom adapters (alternate filesystems, fault injection).
    pub fn with_platform(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Write one complete buffer to `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P, bytes: &[u8], options: &Options) -> Result<(), WriteError> {
        self.write_chunks(path, std::iter::once(bytes), options)
    }

    /// Stream a sequence of buffers to `path` without concatenating them first.
    pub fn write_chunks<P, I>(&self, path: P, chunks: I, options: &Options) -> Result<(), WriteError>
    where
        P: AsRef<Path>,
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut ctx = self.open(path, options)?;
        for chunk in chunks {
            if let Err(e) = ctx.write_chunk(chunk.as_ref()) {
                ctx.cleanup();
                return Err(e);
            }
        }
        ctx.commit()
    }

    /// Start a multi-phase write. The returned context must end in `commit` or `cleanup`.
    pub fn open<P: AsRef<Path>>(&self, path: P, options: &Options) -> Result<WriteContext, WriteError> {
        WriteContext::open(self.platform.clone(), path.as_ref(), options)
    }
}

impl Default for AtomicWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// [`AtomicWriter::write`] on the native platform.
pub fn write<P: AsRef<Path>>(path: P, bytes: &[u8], options: &Options) -> Result<(), WriteError> {
    AtomicWriter::new().write(path, bytes, options)
}

/// [`AtomicWriter::write_chunks`] on the native platform.
pub fn write_chunks<P, I>(path: P, chunks: I, options: &Options) -> Result<(), WriteError>
where
    P: AsRef<Path>,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    AtomicWriter::new().write_chunks(path, chunks, options)
}

/// [`AtomicWriter::open`] on the native platform.
pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> Result<WriteContext, WriteError> {
    AtomicWriter::new().open(path, options)
}
