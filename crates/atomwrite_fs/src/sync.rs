use std::fs::File;
use std::io;
use std::path::Path;

use atomwrite_core::{Durability, DurabilitySyncer};

use crate::util;

/// Strongest sync primitive per tier, chosen at build time.
///
/// | tier | Linux / BSD | Apple | Windows |
/// |---|---|---|---|
/// | `Full` | `fsync` | `F_FULLFSYNC` (falls back to `fsync`) | `FlushFileBuffers` |
/// | `DataOnly` | `fdatasync` | `fsync` | `FlushFileBuffers` |
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSyncer;

impl DurabilitySyncer for OsSyncer {
    fn sync_file(&self, file: &File, durability: Durability) -> io::Result<()> {
        match durability {
            Durability::Full => full_sync(file),
            Durability::DataOnly => data_sync(file),
            Durability::None => Ok(()),
        }
    }

    fn sync_directory(&self, dir: &Path) -> io::Result<()> {
        util::fsync_dir(dir)
    }
}

#[cfg(target_vendor = "apple")]
fn full_sync(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    if unsafe { libc::fcntl(fd, libc::F_FULLFSYNC) } != -1 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Network and FUSE filesystems reject F_FULLFSYNC.
        Some(libc::ENOTSUP) | Some(libc::EINVAL) | Some(libc::ENOTTY) => data_sync(file),
        _ => Err(err),
    }
}

#[cfg(target_vendor = "apple")]
fn data_sync(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    if unsafe { libc::fsync(file.as_raw_fd()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_vendor = "apple"))]
fn full_sync(file: &File) -> io::Result<()> {
    file.sync_all()
}

#[cfg(not(target_vendor = "apple"))]
fn data_sync(file: &File) -> io::Result<()> {
    file.sync_data()
}
