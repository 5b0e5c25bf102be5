//! Atomic publish of a finished temp file.
//!
//! `ReplaceExisting` is a plain `rename` (`MoveFileExW` with `REPLACE_EXISTING` on
//! Windows). `NoClobber` uses the platform's exclusive rename where one exists and
//! otherwise `link` + `unlink`, which fails atomically if the destination is present.

use std::fs;
use std::io;
use std::path::Path;

use atomwrite_core::{AtomicPublisher, Strategy};

#[derive(Debug, Default, Clone, Copy)]
pub struct OsPublisher;

impl AtomicPublisher for OsPublisher {
    fn publish(&self, temp: &Path, destination: &Path, strategy: Strategy) -> io::Result<()> {
        match strategy {
            Strategy::ReplaceExisting => fs::rename(temp, destination),
            Strategy::NoClobber => rename_noreplace(temp, destination),
        }
    }
}

#[cfg(unix)]
fn c_path(path: &Path) -> io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("{} contains a nul byte", path.display())))
}

#[cfg(target_os = "linux")]
fn rename_noreplace(from: &Path, to: &Path) -> io::Result<()> {
    let from_c = c_path(from)?;
    let to_c = c_path(to)?;
    let rc = unsafe {
        libc::syscall(
            libc::SYS_renameat2,
            libc::AT_FDCWD,
            from_c.as_ptr(),
            libc::AT_FDCWD,
            to_c.as_ptr(),
            libc::RENAME_NOREPLACE,
        )
    };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Old kernel, or a filesystem without RENAME_NOREPLACE support.
        Some(libc::ENOSYS) | Some(libc::EINVAL) | Some(libc::EOPNOTSUPP) => {
            log::debug!("renameat2 unavailable for {} ({err}); using link fallback", to.display());
            link_then_unlink(from, to)
        }
        _ => Err(err),
    }
}

#[cfg(target_vendor = "apple")]
fn rename_noreplace(from: &Path, to: &Path) -> io::Result<()> {
    let from_c = c_path(from)?;
    let to_c = c_path(to)?;
    if unsafe { libc::renamex_np(from_c.as_ptr(), to_c.as_ptr(), libc::RENAME_EXCL) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ENOTSUP) | Some(libc::EINVAL) => {
            log::debug!("renamex_np unavailable for {} ({err}); using link fallback", to.display());
            link_then_unlink(from, to)
        }
        _ => Err(err),
    }
}

#[cfg(not(any(target_os = "linux", target_vendor = "apple")))]
fn rename_noreplace(from: &Path, to: &Path) -> io::Result<()> {
    link_then_unlink(from, to)
}

/// `link` refuses an existing target, so the destination appears fully formed or not
/// at all. Once the link exists the content is published; a leftover temp name is
/// only logged.
fn link_then_unlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::hard_link(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        log::warn!("published {} but could not remove {}: {e}", to.display(), from.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_fallback_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join(".a.tmp");
        let dst = dir.path().join("a");
        fs::write(&tmp, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();

        let err = link_then_unlink(&tmp, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dst).unwrap(), b"old");
        assert!(tmp.exists());
    }

    #[test]
    fn link_fallback_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join(".a.tmp");
        let dst = dir.path().join("a");
        fs::write(&tmp, b"new").unwrap();

        link_then_unlink(&tmp, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"new");
        assert!(!tmp.exists());
    }
}
