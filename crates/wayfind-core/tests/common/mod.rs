//! Shared fixtures for resolver integration tests.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde_json::Value;
use tempfile::TempDir;
use wayfind_core::fs::{FileSystem, OsFileSystem, Stats, SyncFileSystem};

/// A package tree on disk.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// The fixture root as a string path.
    pub fn root(&self) -> String {
        self.dir.path().to_str().unwrap().to_string()
    }

    /// Absolute path of `rel` inside the fixture.
    pub fn path(&self, rel: &str) -> String {
        self.dir.path().join(rel).to_str().unwrap().to_string()
    }

    pub fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn json(&self, rel: &str, value: &Value) -> &Self {
        self.file(rel, &serde_json::to_string_pretty(value).unwrap())
    }

    pub fn dir(&self, rel: &str) -> &Self {
        std::fs::create_dir_all(self.dir.path().join(rel)).unwrap();
        self
    }

    pub fn as_path(&self) -> &Path {
        self.dir.path()
    }
}

/// Primitive call counts of a [`CountingFileSystem`].
#[derive(Debug, Default)]
pub struct Calls {
    pub stat: AtomicUsize,
    pub lstat: AtomicUsize,
    pub read_dir: AtomicUsize,
    pub read_file: AtomicUsize,
    pub read_link: AtomicUsize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.stat.load(Ordering::SeqCst)
            + self.lstat.load(Ordering::SeqCst)
            + self.read_dir.load(Ordering::SeqCst)
            + self.read_file.load(Ordering::SeqCst)
            + self.read_link.load(Ordering::SeqCst)
    }
}

/// The host filesystem, counting every primitive call.
#[derive(Debug, Clone, Default)]
pub struct CountingFileSystem {
    pub calls: Arc<Calls>,
}

impl CountingFileSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

impl FileSystem for CountingFileSystem {
    fn lstat(&self, path: &str) -> BoxFuture<'static, io::Result<Stats>> {
        bump(&self.calls.lstat);
        OsFileSystem.lstat(path)
    }

    fn stat(&self, path: &str) -> BoxFuture<'static, io::Result<Stats>> {
        bump(&self.calls.stat);
        OsFileSystem.stat(path)
    }

    fn read_dir(&self, path: &str) -> BoxFuture<'static, io::Result<Vec<String>>> {
        bump(&self.calls.read_dir);
        OsFileSystem.read_dir(path)
    }

    fn read_file(&self, path: &str) -> BoxFuture<'static, io::Result<Bytes>> {
        bump(&self.calls.read_file);
        OsFileSystem.read_file(path)
    }

    fn read_link(&self, path: &str) -> BoxFuture<'static, io::Result<String>> {
        bump(&self.calls.read_link);
        OsFileSystem.read_link(path)
    }
}

impl SyncFileSystem for CountingFileSystem {
    fn lstat_sync(&self, path: &str) -> io::Result<Stats> {
        bump(&self.calls.lstat);
        OsFileSystem.lstat_sync(path)
    }

    fn stat_sync(&self, path: &str) -> io::Result<Stats> {
        bump(&self.calls.stat);
        OsFileSystem.stat_sync(path)
    }

    fn read_dir_sync(&self, path: &str) -> io::Result<Vec<String>> {
        bump(&self.calls.read_dir);
        OsFileSystem.read_dir_sync(path)
    }

    fn read_file_sync(&self, path: &str) -> io::Result<Bytes> {
        bump(&self.calls.read_file);
        OsFileSystem.read_file_sync(path)
    }

    fn read_link_sync(&self, path: &str) -> io::Result<String> {
        bump(&self.calls.read_link);
        OsFileSystem.read_link_sync(path)
    }
}
