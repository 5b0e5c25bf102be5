use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use atomwrite_core::{FileSystem, OpenMode};

use crate::util;

/// Native descriptor lifecycle + parent-directory check.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsBackend;

impl FsBackend {
    pub fn new() -> Self { Self }
}

impl FileSystem for FsBackend {
    fn verify_parent(&self, path: &Path, create_intermediates: bool) -> io::Result<()> {
        let dir = util::parent_dir(path);
        if create_intermediates {
            fs::create_dir_all(&dir)?;
        }
        let meta = fs::metadata(&dir)?;
        if !meta.is_dir() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a directory", dir.display())));
        }
        Ok(())
    }

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.write(true);
        match mode {
            OpenMode::CreateNew => { opts.create_new(true); }
            OpenMode::Truncate => { opts.create(true).truncate(true); }
        }
        opts.open(path)
    }

    fn write(&self, file: &mut File, buf: &[u8]) -> io::Result<usize> {
        file.write(buf)
    }

    fn close(&self, file: File) -> io::Result<()> {
        util::close_file(file)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
