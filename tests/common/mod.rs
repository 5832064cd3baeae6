//! Common test utilities for execstream tests

#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Absolute path of a script under `tests/fixture`
pub fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixture")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Creates a temporary directory containing empty files with the given names
pub fn create_listing_dir(names: &[&str]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for name in names {
        std::fs::write(dir.path().join(name), "").expect("Failed to write file");
    }
    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Read a stream to end-of-data and return it as text
pub async fn drain<R: AsyncRead + Unpin>(reader: &mut R) -> String {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .await
        .expect("Failed to read output");
    String::from_utf8_lossy(&out).into_owned()
}
