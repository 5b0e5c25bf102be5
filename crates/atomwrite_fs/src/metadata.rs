//! Metadata capture from the old destination and re-application to the new file.
//!
//! Apply order: ownership (a `chown` may clear set-id bits), plain extended attributes,
//! permissions, ACLs (an ACL overrides the group bits of the mode), timestamps last.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

use atomwrite_core::{
    ExtendedAttribute, MetadataAttribute, MetadataFailure, MetadataInfo, MetadataPreserver,
    MetadataSnapshot, Preserve,
};

/// POSIX ACLs as the Linux kernel exposes them.
pub const ACL_XATTRS: &[&str] = &["system.posix_acl_access", "system.posix_acl_default"];

/// `stat` of `path`; `Ok(None)` if it does not exist.
pub fn stat_info(path: &Path) -> io::Result<Option<MetadataInfo>> {
    match fs::metadata(path) {
        Ok(m) => Ok(Some(info_from(&m))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn info_from(m: &fs::Metadata) -> MetadataInfo {
    MetadataInfo {
        permissions: m.permissions(),
        owner: owner_of(m),
        accessed: m.accessed().ok(),
        modified: m.modified().ok(),
    }
}

#[cfg(unix)]
fn owner_of(m: &fs::Metadata) -> Option<atomwrite_core::Owner> {
    use std::os::unix::fs::MetadataExt;
    Some(atomwrite_core::Owner { uid: m.uid(), gid: m.gid() })
}

#[cfg(not(unix))]
fn owner_of(_m: &fs::Metadata) -> Option<atomwrite_core::Owner> {
    None
}

fn is_acl_name(name: &std::ffi::OsStr) -> bool {
    ACL_XATTRS.iter().any(|acl| name == *acl)
}

fn unsupported(attribute: MetadataAttribute) -> MetadataFailure {
    MetadataFailure::new(
        attribute,
        io::Error::new(io::ErrorKind::Unsupported, format!("preserving {attribute} is not supported on this platform")),
    )
}

/// Reject requests this build cannot honour before anything touches the disk.
fn check_supported(preserve: &Preserve) -> Result<(), MetadataFailure> {
    if preserve.wants_ownership() && !cfg!(unix) {
        return Err(unsupported(MetadataAttribute::Ownership));
    }
    if preserve.extended_attributes && !cfg!(unix) {
        return Err(unsupported(MetadataAttribute::ExtendedAttributes));
    }
    if preserve.acls && !cfg!(any(target_os = "linux", target_os = "android")) {
        return Err(unsupported(MetadataAttribute::Acls));
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsPreserver;

impl MetadataPreserver for OsPreserver {
    fn capture(&self, destination: &Path, preserve: &Preserve) -> Result<Option<MetadataSnapshot>, MetadataFailure> {
        if !preserve.any() {
            return Ok(None);
        }
        check_supported(preserve)?;
        let info = match stat_info(destination).map_err(|e| MetadataFailure::new(MetadataAttribute::Stat, e))? {
            Some(info) => info,
            None => return Ok(None),
        };
        let xattrs = if preserve.wants_xattrs() { read_xattrs(destination, preserve)? } else { Vec::new() };
        Ok(Some(MetadataSnapshot { info, xattrs }))
    }

    fn apply(&self, snapshot: &MetadataSnapshot, file: &File, target: &Path, preserve: &Preserve) -> Result<(), MetadataFailure> {
        if preserve.wants_ownership() {
            apply_ownership(file, target, &snapshot.info, preserve.strict_ownership)?;
        }
        // A read-only mode would make the kernel refuse `user.*` attributes for
        // non-root callers, so plain xattrs go on before the mode.
        write_xattrs(file, snapshot.xattrs.iter().filter(|a| !is_acl_name(&a.name)))?;
        if preserve.permissions {
            file.set_permissions(snapshot.info.permissions.clone())
                .map_err(|e| MetadataFailure::new(MetadataAttribute::Permissions, e))?;
        }
        write_xattrs(file, snapshot.xattrs.iter().filter(|a| is_acl_name(&a.name)))?;
        if preserve.timestamps {
            let mut times = FileTimes::new();
            if let Some(t) = snapshot.info.accessed {
                times = times.set_accessed(t);
            }
            if let Some(t) = snapshot.info.modified {
                times = times.set_modified(t);
            }
            file.set_times(times).map_err(|e| MetadataFailure::new(MetadataAttribute::Timestamps, e))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn apply_ownership(file: &File, target: &Path, info: &MetadataInfo, strict: bool) -> Result<(), MetadataFailure> {
    let Some(owner) = info.owner else { return Ok(()) };
    match std::os::unix::fs::fchown(file, Some(owner.uid), Some(owner.gid)) {
        Ok(()) => Ok(()),
        Err(e) if !strict && e.kind() == io::ErrorKind::PermissionDenied => {
            log::warn!("cannot give {} to {}:{} ({e}); keeping current owner", target.display(), owner.uid, owner.gid);
            Ok(())
        }
        Err(e) => Err(MetadataFailure::new(MetadataAttribute::Ownership, e)),
    }
}

#[cfg(not(unix))]
fn apply_ownership(_file: &File, _target: &Path, _info: &MetadataInfo, _strict: bool) -> Result<(), MetadataFailure> {
    Err(unsupported(MetadataAttribute::Ownership))
}

/// Security labels are assigned by policy when the temp file is created and are not copied.
#[cfg(unix)]
fn read_xattrs(path: &Path, preserve: &Preserve) -> Result<Vec<ExtendedAttribute>, MetadataFailure> {
    let names = xattr::list(path).map_err(|e| MetadataFailure::new(MetadataAttribute::ExtendedAttributes, e))?;
    let mut out = Vec::new();
    for name in names {
        let acl = is_acl_name(&name);
        if (acl && !preserve.acls) || (!acl && !preserve.extended_attributes) {
            continue;
        }
        if name.to_str().is_some_and(|n| n.starts_with("security.")) {
            continue;
        }
        let attribute = if acl { MetadataAttribute::Acls } else { MetadataAttribute::ExtendedAttributes };
        match xattr::get(path, &name) {
            Ok(Some(value)) => out.push(ExtendedAttribute { name, value }),
            Ok(None) => {}
            Err(e) => return Err(MetadataFailure::new(attribute, e)),
        }
    }
    Ok(out)
}

#[cfg(not(unix))]
fn read_xattrs(_path: &Path, _preserve: &Preserve) -> Result<Vec<ExtendedAttribute>, MetadataFailure> {
    Err(unsupported(MetadataAttribute::ExtendedAttributes))
}

#[cfg(unix)]
fn write_xattrs<'a>(file: &File, attrs: impl Iterator<Item = &'a ExtendedAttribute>) -> Result<(), MetadataFailure> {
    use xattr::FileExt;
    for attr in attrs {
        let attribute = if is_acl_name(&attr.name) { MetadataAttribute::Acls } else { MetadataAttribute::ExtendedAttributes };
        file.set_xattr(&attr.name, &attr.value).map_err(|e| MetadataFailure::new(attribute, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn write_xattrs<'a>(_file: &File, mut attrs: impl Iterator<Item = &'a ExtendedAttribute>) -> Result<(), MetadataFailure> {
    if attrs.next().is_none() {
        return Ok(());
    }
    Err(unsupported(MetadataAttribute::ExtendedAttributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(stat_info(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn nothing_requested_captures_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("f");
        fs::write(&p, b"x").unwrap();
        assert!(OsPreserver.capture(&p, &Preserve::default()).unwrap().is_none());
    }

    #[test]
    fn missing_destination_captures_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let preserve = Preserve { permissions: true, timestamps: true, ..Preserve::default() };
        assert!(OsPreserver.capture(&dir.path().join("nope"), &preserve).unwrap().is_none());
    }

    #[test]
    fn acl_names() {
        assert!(is_acl_name(std::ffi::OsStr::new("system.posix_acl_access")));
        assert!(!is_acl_name(std::ffi::OsStr::new("user.note")));
    }
}
