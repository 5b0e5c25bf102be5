//! Temp file naming: `.<basename>.<16 hex>.tmp` next to the destination.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use atomwrite_core::{EntropySource, PlatformError, WriteError};

use crate::util;

pub const TEMP_SUFFIX: &str = ".tmp";
const RANDOM_BYTES: usize = 8;
/// Longest file name most filesystems accept (`NAME_MAX`).
const NAME_MAX: usize = 255;
/// Bytes the temp name adds around the embedded base name.
const OVERHEAD: usize = 2 + RANDOM_BYTES * 2 + TEMP_SUFFIX.len();
const MAX_BASE: usize = NAME_MAX - OVERHEAD;

/// Kernel CSPRNG via `getrandom`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> io::Result<()> {
        getrandom::getrandom(dest).map_err(|e| match e.raw_os_error() {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(io::ErrorKind::Other, e.to_string()),
        })
    }
}

pub struct TempNamer;

impl TempNamer {
    /// Temp path for `destination`, in the same directory so the final rename never
    /// crosses a filesystem. Only the directory is deterministic.
    pub fn name(entropy: &dyn EntropySource, destination: &Path) -> Result<PathBuf, WriteError> {
        let base = util::file_name(destination).map_err(|e| WriteError::TempCreationFailed {
            path: destination.to_path_buf(),
            source: PlatformError::from(&e),
        })?;
        let mut bytes = [0u8; RANDOM_BYTES];
        entropy
            .fill_bytes(&mut bytes)
            .map_err(|e| WriteError::RandomGenerationFailed {
                path: destination.to_path_buf(),
                source: PlatformError::from(&e),
            })?;

        let mut name = OsString::from(".");
        name.push(embedded_base(base));
        name.push(format!(".{}{}", hex::encode(bytes), TEMP_SUFFIX));
        Ok(util::parent_dir(destination).join(name))
    }

    /// Whether `candidate` (a bare file name) looks like a temp produced for `destination`.
    pub fn is_temp_for(destination: &Path, candidate: &OsStr) -> bool {
        let Some(base) = destination.file_name() else { return false };
        let base = embedded_base(base);
        let Some(base) = base.to_str() else { return false };
        let Some(name) = candidate.to_str() else { return false };
        let Some(rest) = name.strip_prefix('.').and_then(|r| r.strip_prefix(base)) else { return false };
        let Some(random) = rest.strip_prefix('.').and_then(|r| r.strip_suffix(TEMP_SUFFIX)) else { return false };
        random.len() == RANDOM_BYTES * 2 && random.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

/// The part of the destination's name carried into the temp name, shortened so the
/// temp name stays within `NAME_MAX`. UTF-8 names are cut on a char boundary.
fn embedded_base(base: &OsStr) -> OsString {
    if base.len() <= MAX_BASE {
        return base.to_os_string();
    }
    if let Some(text) = base.to_str() {
        let mut end = MAX_BASE;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        return OsString::from(&text[..end]);
    }
    truncate_raw(base)
}

#[cfg(unix)]
fn truncate_raw(base: &OsStr) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(&base.as_bytes()[..MAX_BASE]).to_os_string()
}

#[cfg(not(unix))]
fn truncate_raw(base: &OsStr) -> OsString {
    base.to_string_lossy().chars().take(MAX_BASE).collect::<String>().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u8);

    impl EntropySource for Fixed {
        fn fill_bytes(&self, dest: &mut [u8]) -> io::Result<()> {
            dest.fill(self.0);
            Ok(())
        }
    }

    struct Broken;

    impl EntropySource for Broken {
        fn fill_bytes(&self, _dest: &mut [u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "entropy pool unavailable"))
        }
    }

    #[test]
    fn name_is_colocated_and_embeds_basename() {
        let p = TempNamer::name(&Fixed(0xab), Path::new("/data/state/x.json")).unwrap();
        assert_eq!(p, PathBuf::from("/data/state/.x.json.abababababababab.tmp"));
        assert!(TempNamer::is_temp_for(Path::new("/data/state/x.json"), p.file_name().unwrap()));
    }

    #[test]
    fn bare_destination_lands_in_cwd() {
        let p = TempNamer::name(&Fixed(0), Path::new("x")).unwrap();
        assert_eq!(p.parent().unwrap(), Path::new("."));
    }

    #[test]
    fn os_entropy_gives_distinct_names() {
        let a = TempNamer::name(&OsEntropy, Path::new("/d/f")).unwrap();
        let b = TempNamer::name(&OsEntropy, Path::new("/d/f")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn entropy_failure_is_fatal() {
        let err = TempNamer::name(&Broken, Path::new("/d/f")).unwrap_err();
        assert!(matches!(err, WriteError::RandomGenerationFailed { .. }));
    }

    #[test]
    fn destination_without_file_name() {
        let err = TempNamer::name(&Fixed(1), Path::new("/")).unwrap_err();
        assert!(matches!(err, WriteError::TempCreationFailed { .. }));
    }

    #[test]
    fn long_base_name_is_shortened_to_fit() {
        let base = "a".repeat(250);
        let dest = PathBuf::from("/d").join(&base);
        let p = TempNamer::name(&Fixed(7), &dest).unwrap();
        let name = p.file_name().unwrap();
        assert_eq!(name.len(), NAME_MAX);
        assert!(name.to_str().unwrap().starts_with(&format!(".{}.", &base[..MAX_BASE])));
        assert!(TempNamer::is_temp_for(&dest, name));
    }

    #[test]
    fn shortening_keeps_utf8_intact() {
        // 3-byte chars; MAX_BASE (233) is not a multiple of 3.
        let base = "\u{20ac}".repeat(80);
        let dest = PathBuf::from("/d").join(&base);
        let p = TempNamer::name(&Fixed(7), &dest).unwrap();
        let name = p.file_name().unwrap().to_str().unwrap();
        assert!(name.len() <= NAME_MAX);
        assert!(name.starts_with(&format!(".{}.", "\u{20ac}".repeat(77))));
        assert!(TempNamer::is_temp_for(&dest, p.file_name().unwrap()));
    }

    #[test]
    fn is_temp_for_rejects_lookalikes() {
        let dest = Path::new("/d/x.txt");
        assert!(!TempNamer::is_temp_for(dest, OsStr::new("x.txt")));
        assert!(!TempNamer::is_temp_for(dest, OsStr::new(".x.txt.zz.tmp")));
        assert!(!TempNamer::is_temp_for(dest, OsStr::new(".y.txt.0011223344556677.tmp")));
        assert!(TempNamer::is_temp_for(dest, OsStr::new(".x.txt.0011223344556677.tmp")));
    }
}
