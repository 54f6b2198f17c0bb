// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The generated source bundle.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Output of [`crate::generate`]: a package name plus relative path -> file content.
///
/// Paths always use `/` separators and are ordered, so iteration (and the checksum)
/// is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    pub package_name: String,
    pub process_id: String,
    pub files: BTreeMap<String, String>,
}

impl GeneratedCode {
    pub fn new(package_name: impl Into<String>, process_id: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            process_id: process_id.into(),
            files: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Content of a file by relative path.
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// All relative paths in order.
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// SHA-256 over every path and content, hex encoded.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(content.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Materialize the bundle under `dir`, creating parent directories.
    ///
    /// Existing files at the same paths are overwritten; other files are left alone.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<()> {
        for (path, content) in &self.files {
            let target = path
                .split('/')
                .fold(dir.to_path_buf(), |acc, segment| acc.join(segment));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, content)?;
        }
        tracing::debug!(
            dir = %dir.display(),
            files = self.files.len(),
            "Materialized generated code"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GeneratedCode {
        let mut code = GeneratedCode::new("review", "review");
        code.insert("src/main.rs", "fn main() {}");
        code.insert("Cargo.toml", "[package]");
        code
    }

    #[test]
    fn test_paths_are_sorted() {
        assert_eq!(sample().paths(), vec!["Cargo.toml", "src/main.rs"]);
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.checksum().len(), 64);

        b.insert("src/main.rs", "fn main() { }");
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_checksum_separates_path_and_content() {
        let mut a = GeneratedCode::new("p", "p");
        a.insert("ab", "c");
        let mut b = GeneratedCode::new("p", "p");
        b.insert("a", "bc");
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_write_to_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        sample().write_to(dir.path()).unwrap();

        let main = std::fs::read_to_string(dir.path().join("src").join("main.rs")).unwrap();
        assert_eq!(main, "fn main() {}");
        assert!(dir.path().join("Cargo.toml").exists());
    }
}
