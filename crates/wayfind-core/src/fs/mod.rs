//! Filesystem access for the resolver.
//!
//! [`FileSystem`] is the collaborator contract: asynchronous primitives,
//! with [`SyncFileSystem`] adding blocking twins. [`CachedFileSystem`]
//! wraps any implementation with request coalescing and a time-bounded
//! result cache.

mod backend;
mod cached;
mod os;

use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

pub use backend::{StorageMode, MAX_CACHE_DURATION};
pub use cached::{CachedFileSystem, FsAccess};
pub(crate) use cached::{AsyncAccess, SyncAccess};
pub use os::OsFileSystem;

/// What a stat call reports about an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// The subset of file metadata the resolver looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub kind: FileKind,
    pub len: u64,
}

impl Stats {
    #[must_use]
    pub fn file(len: u64) -> Self {
        Self {
            kind: FileKind::File,
            len,
        }
    }

    #[must_use]
    pub fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            len: 0,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

impl From<&std::fs::Metadata> for Stats {
    fn from(meta: &std::fs::Metadata) -> Self {
        let ft = meta.file_type();
        let kind = if ft.is_symlink() {
            FileKind::Symlink
        } else if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };
        Self {
            kind,
            len: meta.len(),
        }
    }
}

/// A failed filesystem primitive. Cheap to clone so cached failures can be
/// handed to every waiter.
#[derive(Debug, Clone)]
pub struct FsError {
    syscall: &'static str,
    path: String,
    source: Arc<io::Error>,
}

impl FsError {
    #[must_use]
    pub fn new(syscall: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        Self {
            syscall,
            path: path.into(),
            source: Arc::new(source),
        }
    }

    #[must_use]
    pub fn syscall(&self) -> &'static str {
        self.syscall
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == io::ErrorKind::NotFound
    }

    /// The content was read but is not valid JSON.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        self.kind() == io::ErrorKind::InvalidData
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.syscall, self.path, self.source)
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Parse file content as JSON. Empty content is an error.
pub fn parse_json(content: &[u8]) -> io::Result<Value> {
    if content.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "No file content"));
    }
    serde_json::from_slice(content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Asynchronous filesystem primitives.
///
/// Returned futures own everything they need so they can be shared
/// between waiters and outlive the call.
pub trait FileSystem: Send + Sync + 'static {
    fn lstat(&self, path: &str) -> BoxFuture<'static, io::Result<Stats>>;

    fn stat(&self, path: &str) -> BoxFuture<'static, io::Result<Stats>>;

    /// Entry names of a directory, without the directory prefix.
    fn read_dir(&self, path: &str) -> BoxFuture<'static, io::Result<Vec<String>>>;

    fn read_file(&self, path: &str) -> BoxFuture<'static, io::Result<Bytes>>;

    fn read_link(&self, path: &str) -> BoxFuture<'static, io::Result<String>>;

    /// Read and parse a JSON file. Defaults to `read_file` plus [`parse_json`].
    fn read_json(&self, path: &str) -> BoxFuture<'static, io::Result<Value>> {
        let content = self.read_file(path);
        async move { parse_json(&content.await?) }.boxed()
    }
}

/// Blocking twins of the [`FileSystem`] primitives.
pub trait SyncFileSystem: FileSystem {
    fn lstat_sync(&self, path: &str) -> io::Result<Stats>;

    fn stat_sync(&self, path: &str) -> io::Result<Stats>;

    fn read_dir_sync(&self, path: &str) -> io::Result<Vec<String>>;

    fn read_file_sync(&self, path: &str) -> io::Result<Bytes>;

    fn read_link_sync(&self, path: &str) -> io::Result<String>;

    fn read_json_sync(&self, path: &str) -> io::Result<Value> {
        parse_json(&self.read_file_sync(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_empty_is_invalid_data() {
        let err = parse_json(b"").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "No file content");
    }

    #[test]
    fn test_fs_error_classification() {
        let missing = FsError::new(
            "stat",
            "/nope",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(missing.is_not_found());
        assert!(!missing.is_parse_error());
        assert_eq!(missing.to_string(), "stat '/nope': gone");

        let bad = FsError::new("readJson", "/p.json", parse_json(b"{").unwrap_err());
        assert!(bad.is_parse_error());
        assert_eq!(bad.clone().path(), "/p.json");
    }
}
