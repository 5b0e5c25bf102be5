//! Small filesystem helpers shared by the adapters (dir fsync, close, path parts).

use std::{fs, io, path::{Path, PathBuf}};

/// Fsync a directory so a rename or create inside it survives power loss.
#[cfg(unix)]
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    let file = fs::File::open(dir)?;
    sync_dir_handle(&file)
}

// NTFS journals directory entries; a directory handle cannot be flushed without
// backup semantics, so there is nothing further to force here.
#[cfg(not(unix))]
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    fs::metadata(dir).map(|_| ())
}

#[cfg(all(unix, target_vendor = "apple"))]
fn sync_dir_handle(file: &fs::File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    if unsafe { libc::fsync(file.as_raw_fd()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(all(unix, not(target_vendor = "apple")))]
fn sync_dir_handle(file: &fs::File) -> io::Result<()> {
    file.sync_all()
}

/// Close a file and report the result. `EINTR` is not retried: on Linux the
/// descriptor is already released when close returns it.
#[cfg(unix)]
pub fn close_file(file: fs::File) -> io::Result<()> {
    use std::os::unix::io::IntoRawFd;
    let fd = file.into_raw_fd();
    if unsafe { libc::close(fd) } == -1 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn close_file(file: fs::File) -> io::Result<()> {
    drop(file);
    Ok(())
}

/// Directory that holds `path`. A bare file name resolves to `.`.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Last component of `path`, rejecting `/`, `..` and friends.
pub fn file_name(path: &Path) -> io::Result<&std::ffi::OsStr> {
    path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file name", path.display()))
    })
}
