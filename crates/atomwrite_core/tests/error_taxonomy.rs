// Error taxonomy: phase classification and carried context

use atomwrite_core::{MetadataAttribute, Phase, PlatformError, WriteError};
use std::io;
use std::path::{Path, PathBuf};

fn src() -> PlatformError {
    PlatformError::new(5, "Input/output error")
}

#[test]
fn only_directory_sync_is_post_publish() {
    let all = vec![
        WriteError::ParentVerificationFailed { path: "a".into(), source: src() },
        WriteError::TempCreationFailed { path: "a".into(), source: src() },
        WriteError::WriteFailed { path: "a".into(), bytes_written: 3, source: src() },
        WriteError::SyncFailed { path: "a".into(), source: src() },
        WriteError::CloseFailed { path: "a".into(), source: src() },
        WriteError::MetadataPreservationFailed { path: "a".into(), attribute: MetadataAttribute::Ownership, source: src() },
        WriteError::RenameFailed { from: "a".into(), to: "b".into(), source: src() },
        WriteError::DestinationExists { path: "b".into(), source: src() },
        WriteError::RandomGenerationFailed { path: "a".into(), source: src() },
        WriteError::PlatformIncompatible { path: "a".into(), message: "no renameat2".into() },
    ];
    for e in &all {
        assert_eq!(e.phase(), Phase::PrePublish, "{e}");
        assert!(!e.is_post_commit());
        assert!(!e.paths().is_empty(), "{e:?} carries no path");
    }

    let post = WriteError::DirectorySyncFailedAfterCommit {
        path: "/d/x.txt".into(),
        directory: "/d".into(),
        source: src(),
    };
    assert_eq!(post.phase(), Phase::PostPublish);
    assert!(post.is_post_commit());
}

#[test]
fn errors_carry_paths_and_platform_code() {
    let e = WriteError::RenameFailed { from: "/d/.x.tmp".into(), to: "/d/x".into(), source: src() };
    assert_eq!(e.paths(), vec![Path::new("/d/.x.tmp"), Path::new("/d/x")]);
    assert_eq!(e.platform_code(), Some(5));
    let msg = e.to_string();
    assert!(msg.contains("/d/.x.tmp") && msg.contains("/d/x") && msg.contains("Input/output error"));

    let e = WriteError::PlatformIncompatible { path: "/d/x".into(), message: "no ACLs here".into() };
    assert_eq!(e.paths(), vec![Path::new("/d/x")]);
    assert_eq!(e.platform_code(), None);
    assert!(e.to_string().contains("/d/x"));

    let e = WriteError::RandomGenerationFailed { path: "/d/y".into(), source: src() };
    assert_eq!(e.paths(), vec![Path::new("/d/y")]);
    assert_eq!(e.platform_code(), Some(5));
}

#[test]
fn write_failed_reports_bytes() {
    let e = WriteError::WriteFailed { path: PathBuf::from("/t/y"), bytes_written: 3, source: src() };
    assert!(e.to_string().contains("after 3 bytes"));
}

#[test]
fn platform_error_from_io() {
    let os = io::Error::from_raw_os_error(2);
    let pe = PlatformError::from(&os);
    assert_eq!(pe.code, 2);
    assert!(!pe.message.is_empty());

    let custom = io::Error::new(io::ErrorKind::Other, "simulated");
    let pe = PlatformError::from(custom);
    assert_eq!(pe.code, -1);
    assert_eq!(pe.message, "simulated");
}

#[test]
fn source_chain_reaches_platform_error() {
    use std::error::Error;
    let e = WriteError::SyncFailed { path: "a".into(), source: src() };
    let inner = e.source().expect("source");
    assert_eq!(inner.to_string(), "Input/output error");
}
